//! Device function descriptors for devfn.
//!
//! A [`Function`] is a named kernel-language procedure with typed [`Parameter`]s, a body and
//! the functions it depends on. Functions are built from parts ([`Function::define`]) or parsed
//! from source text ([`Function::parse`]), and render themselves to compilable code.
//!
//! # Module Organization
//!
//! - [`parameter`] - Parameter (name + type descriptor)
//! - [`function`] - Function descriptor, structural identity
//! - [`parser`] - Grammar for function declarations
//! - [`graph`] - Dependency graph traversal and cycle detection
//! - [`emit`] - Signature, definition and guarded code emission
//! - [`error`] - Error types and result handling

pub mod emit;
pub mod error;
pub mod function;
pub mod graph;
pub mod parameter;
pub mod parser;


pub use error::{Error, Result};
pub use function::Function;
pub use parameter::Parameter;

pub use devfn_dtype::{AddrSpace, Qualifier, TypeDescriptor, VectorWidth};

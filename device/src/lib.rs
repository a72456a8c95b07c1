//! Compute device abstraction for devfn.
//!
//! - [`Device`] compiles kernel source into a shareable [`Program`]
//! - [`Session`] owns the buffers, argument bindings and queue of one execution
//! - [`LaunchDims`] describes a one-dimensional launch with a global offset
//!
//! Backends: OpenCL (feature `opencl`) and an in-process fake (feature `testing`).

pub mod device;
pub mod error;
pub mod launch;

#[cfg(any(test, feature = "testing"))]
pub mod fake;
#[cfg(feature = "opencl")]
pub mod opencl;

#[cfg(test)]
pub mod test;

pub use device::*;
pub use error::*;
pub use launch::LaunchDims;

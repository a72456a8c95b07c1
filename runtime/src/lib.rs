//! Parallel evaluation of devfn functions.
//!
//! [`evaluate`] runs a [`devfn_ir::Function`] once per instance over named host inputs, on
//! every configured device at once:
//!
//! - **Configuration**: [`RuntimeInfo`] (devices, precision, load balancer, compiler flags)
//! - **Balancing**: [`LoadBalancer`] weights and [`partition`] into per-device sub-ranges
//! - **Caching**: compiled programs are reused per device and source ([`cache`])
//! - **Execution**: one [`Worker`] per device, joined by [`dispatch::apply`]
//!
//! # Usage
//!
//! ```ignore
//! let square = Function::parse("double square(double x){ return x * x; }")?;
//! let info = RuntimeInfo::builder().devices(devices).precision(Precision::Double).build();
//! let options = EvaluateOptions::builder().runtime_info(Arc::new(info)).build();
//! let squares = evaluate(&square, [("x", Input::from(vec![1.0, 2.0, 3.0]))], &options)?;
//! ```

pub mod balance;
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod evaluate;
pub mod worker;


pub use balance::{LoadBalancer, partition};
pub use config::{CompileFlags, ConfigGuard, RuntimeInfo, config_context};
pub use error::*;
pub use evaluate::{EvaluateOptions, FunctionExt, Input, evaluate};
pub use worker::Worker;

//! Kernel data marshalling and kernel source generation for devfn.
//!
//! Turns a [`devfn_ir::Function`] plus a set of named host inputs into a compilable kernel:
//!
//! - **Data**: host inputs wrapped as [`KernelData`] (scalar, per-instance array, zeros)
//! - **Layout**: [`KernelDataManager`] packs them into the per-instance `devfn_data_struct`
//! - **Address spaces**: [`AddressSpaceTransform`] adds private/local scratch copies
//! - **Rendering**: [`kernel::render`] emits the `run_procedure` entry point
//!
//! # Usage
//!
//! ```ignore
//! let manager = KernelDataManager::new(items, Precision::Double)?;
//! let kernel = devfn_codegen::kernel::render(&function, &manager, false)?;
//! ```

pub mod address_space;
pub mod data;
pub mod error;
pub mod kernel;
pub mod manager;
pub mod types;


pub use address_space::AddressSpaceTransform;
pub use data::{AccessMode, Element, HostArray, HostBuffer, KernelData};
pub use error::*;
pub use kernel::{ENTRY_POINT, RESULTS_NAME};
pub use manager::KernelDataManager;
pub use types::*;

//! Kernel source generation.
//!
//! The generated program is, in order: the precision dependent float type aliases, the
//! `devfn_data_struct` declaration, the wrapped function with all its dependencies, and the
//! `run_procedure` entry point:
//!
//! ```c
//! __kernel void run_procedure(global double* x, ...){
//!     ulong gid = get_global_id(0);
//!     devfn_data_struct data = {x + gid * 1, ...};
//!     /* scratch copy-in */
//!     *(data._results) = square(data.x[0]);
//!     /* scratch copy-out */
//! }
//! ```

use devfn_dtype::{DATA_STRUCT_TYPE, FLOAT_TYPE_ALIAS, Precision, ScalarDType, VectorWidth};
use devfn_ir::Function;
use itertools::Itertools;
use snafu::ensure;
use strum::VariantArray;

use crate::address_space::AddressSpaceTransform;
use crate::error::*;
use crate::manager::KernelDataManager;
use crate::types::RenderedKernel;

/// Name of the kernel entry point.
pub const ENTRY_POINT: &str = "run_procedure";

/// Kernel data name of the per-instance return values.
pub const RESULTS_NAME: &str = "_results";

/// `typedef`s of `devfn_float_type` and its vector forms.
pub fn float_type_definition(precision: Precision) -> String {
    let base = precision.scalar();
    let mut code = String::new();
    code.push_str(&format!("typedef {base} {FLOAT_TYPE_ALIAS};\n"));
    for width in VectorWidth::VARIANTS {
        let lanes = width.lanes();
        code.push_str(&format!("typedef {base}{lanes} {FLOAT_TYPE_ALIAS}{lanes};\n"));
    }
    code
}

fn extension_pragmas(precision: Precision, manager: &KernelDataManager) -> String {
    let mut code = String::new();
    if precision.is_double() || manager.uses(ScalarDType::Double) {
        code.push_str("#pragma OPENCL EXTENSION cl_khr_fp64 : enable\n");
    }
    if manager.uses(ScalarDType::Half) {
        code.push_str("#pragma OPENCL EXTENSION cl_khr_fp16 : enable\n");
    }
    code
}

/// Renders the kernel wrapping `function` over the data laid out by `manager`.
///
/// With `use_local_reduction` every instance runs as one workgroup and the instance index is
/// the workgroup index. Kernels with local scratch are indexed the same way even without it,
/// and are launched with single work item groups.
pub fn render(function: &Function, manager: &KernelDataManager, use_local_reduction: bool) -> Result<RenderedKernel> {
    let transform = AddressSpaceTransform::new(function, manager)?;
    let returns = !function.is_void();
    ensure!(
        !returns || manager.read_data_back(RESULTS_NAME) == Some(true),
        MissingDataSnafu { name: RESULTS_NAME }
    );

    let mut code = extension_pragmas(manager.precision(), manager);
    code.push_str(&float_type_definition(manager.precision()));
    code.push('\n');
    code.push_str(&manager.struct_definition());
    code.push('\n');
    code.push_str(&function.cl_code());
    code.push('\n');

    let parameters = manager.kernel_parameters();
    if parameters.is_empty() {
        code.push_str(&format!("__kernel void {ENTRY_POINT}(){{\n"));
    } else {
        code.push_str(&format!("__kernel void {ENTRY_POINT}(\n        {}){{\n", parameters.iter().join(",\n        ")));
    }

    let grouped = use_local_reduction || transform.uses_local_memory();
    let gid = if grouped { "(ulong)(get_global_id(0) / get_local_size(0))" } else { "get_global_id(0)" };
    let mut body = vec![
        format!("ulong gid = {gid};"),
        format!("{DATA_STRUCT_TYPE} data = {};", manager.struct_initializer("gid")),
    ];
    body.extend(transform.prologue());

    let assignment = if returns { format!("*(data.{RESULTS_NAME}) = ") } else { String::new() };
    body.push(format!("{assignment}{}({});", function.name(), transform.call_arguments().join(", ")));
    body.extend(transform.epilogue());

    for line in body {
        code.push_str("    ");
        code.push_str(&line);
        code.push('\n');
    }
    code.push_str("}\n");

    tracing::trace!(function = function.name(), source = %code, "rendered kernel");

    let mut kernel = RenderedKernel::new(code, ENTRY_POINT.to_string(), function.name().to_string());
    kernel.args = manager.kernel_args();
    kernel.use_local_reduction = use_local_reduction;
    kernel.grouped = grouped;
    Ok(kernel)
}

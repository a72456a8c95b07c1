use devfn_dtype::Precision;

use super::{function, items, manager};
use crate::kernel::{float_type_definition, render};
use crate::*;

fn square_manager() -> KernelDataManager {
    manager(vec![
        ("x", KernelData::array(vec![1.0f64, 2.0, 3.0, 4.0], "double", AccessMode::ReadWrite).unwrap()),
        (RESULTS_NAME, KernelData::zeros(vec![4], "double").unwrap()),
    ])
}

#[test]
fn float_alias_follows_precision() {
    let single = float_type_definition(Precision::Single);
    assert!(single.starts_with("typedef float devfn_float_type;\n"));
    assert!(single.contains("typedef float3 devfn_float_type3;\n"));
    assert!(single.contains("typedef float16 devfn_float_type16;\n"));
    assert!(float_type_definition(Precision::Double).starts_with("typedef double devfn_float_type;\n"));
}

#[test]
fn returning_function_stores_result() {
    let square = function("double square(double x){ return x*x; }");
    let kernel = render(&square, &square_manager(), false).unwrap();

    assert_eq!(kernel.entry_point, ENTRY_POINT);
    assert_eq!(kernel.name, "square");
    assert!(kernel.code.starts_with("#pragma OPENCL EXTENSION cl_khr_fp64 : enable\n"));
    assert!(kernel.code.contains(
        "__kernel void run_procedure(\n        global double* x,\n        global double* _results){\n"
    ));
    assert!(kernel.code.contains("    ulong gid = get_global_id(0);\n"));
    assert!(kernel.code.contains("    devfn_data_struct data = {x + gid * 1, _results + gid * 1};\n"));
    assert!(kernel.code.contains("    *(data._results) = square(data.x[0]);\n"));
    assert!(kernel.code.ends_with("}\n"));
    assert_eq!(kernel.write_out().collect::<Vec<_>>(), vec![0, 1]);
}

#[test]
fn sections_are_ordered() {
    let square = function("double square(double x){ return x*x; }");
    let code = render(&square, &square_manager(), false).unwrap().code;

    let alias = code.find("typedef double devfn_float_type;").unwrap();
    let structure = code.find("} devfn_data_struct;").unwrap();
    let guard = code.find("#ifndef INCLUDE_GUARD_square").unwrap();
    let entry = code.find("__kernel void run_procedure").unwrap();
    assert!(alias < structure && structure < guard && guard < entry);
}

#[test]
fn void_function_keeps_scratch_around_call() {
    let add_one = function("void add_one(private double* x){ x[0] = x[0] + 1; }");
    let manager = manager(vec![("x", KernelData::array(vec![0.0f64, 1.0, 2.0], "double", AccessMode::ReadWrite).unwrap())]);
    let code = render(&add_one, &manager, false).unwrap().code;

    let copy_in = code.find("x_private[i] = data.x[i];").unwrap();
    let call = code.find("    add_one(x_private);\n").unwrap();
    let copy_out = code.find("data.x[i] = x_private[i];").unwrap();
    assert!(copy_in < call && call < copy_out);
    assert!(!code.contains("_results"));
}

#[test]
fn local_reduction_indexes_by_workgroup() {
    let square = function("double square(double x){ return x*x; }");
    let kernel = render(&square, &square_manager(), true).unwrap();
    assert!(kernel.use_local_reduction);
    assert!(kernel.code.contains("ulong gid = (ulong)(get_global_id(0) / get_local_size(0));"));
}

#[test]
fn local_scratch_indexes_by_workgroup_without_local_reduction() {
    let scale = function("void scale(local double* x){ x[0] = 2 * x[0]; }");
    let manager = manager(vec![("x", KernelData::array(vec![1.0f64, 2.0], "double", AccessMode::ReadWrite).unwrap())]);
    let kernel = render(&scale, &manager, false).unwrap();

    assert!(!kernel.use_local_reduction);
    assert!(kernel.grouped);
    assert!(kernel.code.contains("ulong gid = (ulong)(get_global_id(0) / get_local_size(0));"));
}

#[test]
fn private_scratch_stays_flat() {
    let add_one = function("void add_one(private double* x){ x[0] = x[0] + 1; }");
    let manager = manager(vec![("x", KernelData::array(vec![0.0f64], "double", AccessMode::ReadWrite).unwrap())]);
    let kernel = render(&add_one, &manager, false).unwrap();

    assert!(!kernel.grouped);
    assert!(kernel.code.contains("ulong gid = get_global_id(0);"));
}

#[test]
fn returning_function_needs_result_buffer() {
    let square = function("double square(double x){ return x*x; }");
    let manager = manager(vec![("x", KernelData::scalar(2.0))]);
    let err = render(&square, &manager, false).unwrap_err();
    assert!(matches!(err, Error::MissingData { name } if name == RESULTS_NAME));
}

#[test]
fn dependencies_are_included() {
    let inner = function("double twice(double x){ return 2 * x; }");
    let outer = devfn_ir::Function::parse_with("double quad(double x){ return twice(twice(x)); }", vec![inner], None)
        .unwrap();
    let code = render(&outer, &square_manager(), false).unwrap().code;
    assert!(code.find("INCLUDE_GUARD_twice").unwrap() < code.find("INCLUDE_GUARD_quad").unwrap());
}

#[test]
fn single_precision_float_kernel_has_no_fp64_pragma() {
    let negate = function("devfn_float_type negate(devfn_float_type x){ return -x; }");
    let items = items(vec![
        ("x", KernelData::array(vec![1.0f32], "devfn_float_type", AccessMode::ReadOnly).unwrap()),
        (RESULTS_NAME, KernelData::zeros(vec![1], "devfn_float_type").unwrap()),
    ]);
    let manager = KernelDataManager::new(items, Precision::Single).unwrap();
    let code = render(&negate, &manager, false).unwrap().code;
    assert!(!code.contains("cl_khr_fp64"));
    assert!(code.contains("global devfn_float_type* x"));
}

#[test]
fn rendering_is_deterministic() {
    let square = function("double square(double x){ return x*x; }");
    let manager = square_manager();
    assert_eq!(render(&square, &manager, false).unwrap().code, render(&square, &manager, false).unwrap().code);
}

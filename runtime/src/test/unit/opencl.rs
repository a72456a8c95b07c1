use std::sync::Arc;

use devfn_dtype::Precision;

use super::function;
use crate::{EvaluateOptions, Input, RuntimeInfo, evaluate};

#[test]
#[ignore = "needs an OpenCL platform"]
fn square_on_every_opencl_device() {
    let devices = devfn_device::opencl::all_devices().unwrap();
    assert!(!devices.is_empty());
    let info = RuntimeInfo::builder().devices(devices).precision(Precision::Double).build();
    let options = EvaluateOptions::builder().runtime_info(Arc::new(info)).build();
    let x: Vec<f64> = (0..1000).map(|i| i as f64).collect();

    let squares = evaluate(&function("double square(double x){ return x * x; }"), [("x", Input::from(x.clone()))], &options)
        .unwrap()
        .unwrap();

    assert_eq!(squares.to_vec::<f64>().unwrap(), x.iter().map(|x| x * x).collect::<Vec<_>>());
}

#[test]
#[ignore = "needs an OpenCL platform"]
fn local_scratch_round_trip_on_opencl() {
    let devices = devfn_device::opencl::all_devices().unwrap();
    let info = RuntimeInfo::builder().devices(devices).precision(Precision::Double).build();
    let options =
        EvaluateOptions::builder().instances(64).use_local_reduction(true).runtime_info(Arc::new(info)).build();
    let x: Vec<f64> = (0..64).map(|i| i as f64).collect();
    let array = devfn_codegen::HostArray::from(x.clone());

    let scale = function("void scale(local double* x){ if(get_local_id(0) == 0){ x[0] = 2 * x[0]; } }");
    evaluate(&scale, [("x", Input::from(array.clone()))], &options).unwrap();

    assert_eq!(array.to_vec::<f64>().unwrap(), x.iter().map(|x| 2.0 * x).collect::<Vec<_>>());
}

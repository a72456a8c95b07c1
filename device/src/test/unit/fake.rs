use std::sync::Arc;

use crate::fake::FakeDevice;
use crate::*;

fn spec(args: Vec<ArgLayout>) -> ProgramSpec {
    ProgramSpec { name: "test".into(), entry_point: "run_procedure".into(), source: "kernel".into(), args }
}

fn doubling() -> FakeDevice {
    FakeDevice::new("fake", |instance| {
        let x: f64 = instance.read("x", 0);
        let factor: f64 = instance.read("factor", 0);
        instance.write("x", 0, x * factor);
    })
}

fn layout() -> Vec<ArgLayout> {
    vec![ArgLayout { name: "x".into(), stride: Some(8) }, ArgLayout { name: "factor".into(), stride: None }]
}

fn f64_bytes(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|value| value.to_ne_bytes()).collect()
}

#[test]
fn runs_body_for_launched_instances_only() {
    let device = doubling();
    let program = device.compile(&spec(layout()), "-cl-mad-enable").unwrap();
    let mut session = program.session().unwrap();

    let buffer = session.create_buffer(32).unwrap();
    session.write_buffer(buffer, 0, &f64_bytes(&[1.0, 2.0, 3.0, 4.0])).unwrap();
    session.set_arg(0, ArgValue::Buffer(buffer)).unwrap();
    session.set_arg(1, ArgValue::Bytes(&3.0f64.to_ne_bytes())).unwrap();
    session.launch(LaunchDims::flat(1, 2)).unwrap();

    let ticket = session.enqueue_read(buffer, 0, 32).unwrap();
    assert_eq!(session.wait_read(ticket).unwrap(), f64_bytes(&[1.0, 6.0, 9.0, 4.0]));

    let log = device.log();
    assert_eq!(log.sources, vec!["kernel"]);
    assert_eq!(log.options, vec!["-cl-mad-enable"]);
    assert_eq!(log.launches, vec![LaunchDims::flat(1, 2)]);
    assert_eq!(log.writes, vec![(0, 32)]);
    assert_eq!(log.reads, vec![(0, 32)]);
}

#[test]
fn grouped_launch_runs_each_instance_once() {
    let device = FakeDevice::new("fake", |instance| {
        let count: u32 = instance.read("count", 0);
        instance.write("count", 0, count + 1);
    })
    .with_work_group_multiple(16);
    let program = device.compile(&spec(vec![ArgLayout { name: "count".into(), stride: Some(4) }]), "").unwrap();
    assert_eq!(program.preferred_work_group_multiple().unwrap(), 16);

    let mut session = program.session().unwrap();
    let buffer = session.create_buffer(12).unwrap();
    session.set_arg(0, ArgValue::Buffer(buffer)).unwrap();
    session.launch(LaunchDims::grouped(0, 3, 16)).unwrap();

    let ticket = session.enqueue_read(buffer, 0, 12).unwrap();
    let counts: Vec<u32> = session.wait_read(ticket).unwrap().chunks_exact(4).map(bytemuck::pod_read_unaligned).collect();
    assert_eq!(counts, vec![1, 1, 1]);
}

#[test]
fn unbound_argument_fails_launch() {
    let program = doubling().compile(&spec(layout()), "").unwrap();
    let mut session = program.session().unwrap();
    let buffer = session.create_buffer(8).unwrap();
    session.set_arg(0, ArgValue::Buffer(buffer)).unwrap();
    assert!(matches!(session.launch(LaunchDims::flat(0, 1)), Err(Error::Launch { .. })));
}

#[test]
fn out_of_range_transfer_fails() {
    let program = doubling().compile(&spec(layout()), "").unwrap();
    let mut session = program.session().unwrap();
    let buffer = session.create_buffer(8).unwrap();
    assert!(matches!(session.write_buffer(buffer, 4, &[0; 8]), Err(Error::Transfer { .. })));
    assert!(matches!(session.enqueue_read(buffer, 0, 16), Err(Error::Transfer { .. })));
    assert!(matches!(session.wait_read(ReadTicket::new(7)), Err(Error::Transfer { .. })));
}

#[test]
fn failing_device_reports_log() {
    let device = doubling().failing("error: expected ';'");
    let err = device.compile(&spec(layout()), "").err().unwrap();
    match err {
        Error::Compile { device, log } => {
            assert_eq!(device, "fake");
            assert_eq!(log, "error: expected ';'");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(device.log().sources.len(), 1);
}

#[test]
fn clones_share_identity_and_log() {
    let device = doubling();
    let shared: Arc<dyn Device> = device.clone().into_device();
    let other = doubling();

    assert_eq!(shared.cache_key(), device.cache_key());
    assert_ne!(other.cache_key(), device.cache_key());
    shared.compile(&spec(layout()), "").unwrap();
    assert_eq!(device.log().sources.len(), 1);
}

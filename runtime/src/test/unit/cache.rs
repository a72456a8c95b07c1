use std::sync::Arc;

use devfn_device::fake::FakeDevice;
use devfn_device::{ArgLayout, Device, ProgramSpec};

use crate::cache::{evict_device, get_or_compile, programs_for};

fn spec(source: &str) -> ProgramSpec {
    ProgramSpec {
        name: "kernel".into(),
        entry_point: "run_procedure".into(),
        source: source.into(),
        args: vec![ArgLayout { name: "x".into(), stride: Some(8) }],
    }
}

#[test]
fn same_source_and_options_compile_once() {
    let device = FakeDevice::new("cached", |_| {});
    let first = get_or_compile(&device, &spec("kernel a"), "-cl-mad-enable").unwrap();
    let second = get_or_compile(&device, &spec("kernel a"), "-cl-mad-enable").unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(device.log().sources.len(), 1);
    assert_eq!(first.device, device.cache_key());
    assert_eq!(first.options, "-cl-mad-enable");
}

#[test]
fn source_or_options_change_recompiles() {
    let device = FakeDevice::new("cached", |_| {});
    get_or_compile(&device, &spec("kernel a"), "").unwrap();
    get_or_compile(&device, &spec("kernel b"), "").unwrap();
    get_or_compile(&device, &spec("kernel a"), "-cl-mad-enable").unwrap();

    assert_eq!(device.log().sources, vec!["kernel a", "kernel b", "kernel a"]);
}

#[test]
fn devices_with_same_name_do_not_share_programs() {
    let first = FakeDevice::new("twin", |_| {});
    let second = FakeDevice::new("twin", |_| {});
    get_or_compile(&first, &spec("kernel"), "").unwrap();
    get_or_compile(&second, &spec("kernel"), "").unwrap();

    assert_eq!(first.log().sources.len(), 1);
    assert_eq!(second.log().sources.len(), 1);
}

#[test]
fn failed_compilation_is_not_cached() {
    let device = FakeDevice::new("broken", |_| {}).failing("error: expected ';'");
    assert!(get_or_compile(&device, &spec("kernel"), "").is_err());
    assert!(get_or_compile(&device, &spec("kernel"), "").is_err());
    assert_eq!(device.log().sources.len(), 2);
}

#[test]
fn evicting_a_device_recompiles_on_next_use() {
    let device = FakeDevice::new("retired", |_| {});
    let other = FakeDevice::new("kept", |_| {});
    get_or_compile(&device, &spec("kernel a"), "").unwrap();
    get_or_compile(&device, &spec("kernel b"), "").unwrap();
    get_or_compile(&other, &spec("kernel a"), "").unwrap();
    assert_eq!(programs_for(&device), 2);

    assert_eq!(evict_device(&device), 2);
    assert_eq!(programs_for(&device), 0);
    assert_eq!(programs_for(&other), 1);

    get_or_compile(&device, &spec("kernel a"), "").unwrap();
    assert_eq!(device.log().sources, vec!["kernel a", "kernel b", "kernel a"]);
}

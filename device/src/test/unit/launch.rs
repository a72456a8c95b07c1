use crate::LaunchDims;

#[test]
fn flat_launch_covers_range() {
    let dims = LaunchDims::flat(4, 3);
    assert_eq!(dims, LaunchDims { global_offset: 4, global_size: 3, local_size: None });
    assert_eq!(dims.instances(), 4..7);
    assert_eq!(dims.group(), 1);
}

#[test]
fn grouped_launch_scales_by_group() {
    let dims = LaunchDims::grouped(4, 3, 32);
    assert_eq!(dims, LaunchDims { global_offset: 128, global_size: 96, local_size: Some(32) });
    assert_eq!(dims.instances(), 4..7);
}

#[test]
fn empty_launch_has_no_instances() {
    assert!(LaunchDims::flat(9, 0).instances().is_empty());
}

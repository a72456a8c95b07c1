//! Launch geometry.

use std::ops::Range;

/// One-dimensional launch: global size, global offset and optional workgroup size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LaunchDims {
    pub global_offset: usize,
    pub global_size: usize,
    pub local_size: Option<usize>,
}

impl LaunchDims {
    /// One work item per instance of `start..start + len`.
    pub const fn flat(start: usize, len: usize) -> Self {
        Self { global_offset: start, global_size: len, local_size: None }
    }

    /// One workgroup of `group` work items per instance of `start..start + len`.
    pub const fn grouped(start: usize, len: usize, group: usize) -> Self {
        Self { global_offset: start * group, global_size: len * group, local_size: Some(group) }
    }

    /// Work items per instance.
    pub fn group(&self) -> usize {
        self.local_size.unwrap_or(1).max(1)
    }

    /// Instances covered by this launch.
    pub fn instances(&self) -> Range<usize> {
        let group = self.group();
        self.global_offset / group..(self.global_offset + self.global_size) / group
    }
}

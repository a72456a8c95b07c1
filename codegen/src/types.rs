//! Types for code generation.

/// How a kernel argument is passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgKind {
    /// Raw bytes of a by-value argument.
    Value(Vec<u8>),
    /// Flat device buffer with one row of `stride` bytes per instance.
    Buffer {
        stride: usize,
        /// Host rows are written to the device before the launch.
        upload: bool,
        /// Device rows are copied back into the host array after the launch.
        read_back: bool,
    },
}

/// One top-level kernel argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelArg {
    pub name: String,
    /// Declaration as written in the kernel signature.
    pub declaration: String,
    pub kind: ArgKind,
}

impl KernelArg {
    pub fn is_buffer(&self) -> bool {
        matches!(self.kind, ArgKind::Buffer { .. })
    }
}

/// A rendered kernel ready for compilation and execution.
#[derive(Debug, Clone)]
pub struct RenderedKernel {
    /// Complete kernel-language source.
    pub code: String,

    /// Entry point function name.
    pub entry_point: String,

    /// Name of the wrapped function (for debugging/caching).
    pub name: String,

    /// Arguments in signature order.
    pub args: Vec<KernelArg>,

    /// Whether each instance runs as a whole workgroup.
    pub use_local_reduction: bool,

    /// Whether instances are launched as explicit workgroups. Set with local reduction and
    /// whenever a parameter lives in local memory, so no two instances share a scratch copy.
    pub grouped: bool,
}

impl RenderedKernel {
    pub fn new(code: String, entry_point: String, name: String) -> Self {
        Self { code, entry_point, name, args: Vec::new(), use_local_reduction: false, grouped: false }
    }

    /// Indices of the buffer arguments copied back after the launch.
    pub fn write_out(&self) -> impl Iterator<Item = usize> + '_ {
        self.args
            .iter()
            .enumerate()
            .filter(|(_, arg)| matches!(arg.kind, ArgKind::Buffer { read_back: true, .. }))
            .map(|(index, _)| index)
    }
}

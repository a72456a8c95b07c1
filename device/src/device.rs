//! Device abstraction.
//!
//! A [`Device`] compiles kernel source into a [`Program`]. A program is shared (and cached)
//! across callers; every caller opens its own [`Session`], which owns the device buffers,
//! argument bindings and command queue of one execution.

use std::sync::Arc;

use crate::error::Result;
use crate::launch::LaunchDims;

/// Broad device category, used by load balancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum DeviceKind {
    Cpu,
    Gpu,
    Accelerator,
    Other,
}

impl DeviceKind {
    /// GPUs and accelerators.
    pub const fn is_gpu_like(&self) -> bool {
        matches!(self, Self::Gpu | Self::Accelerator)
    }
}

/// Layout of one kernel argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgLayout {
    pub name: String,
    /// Bytes per instance row for buffer arguments, `None` for by-value arguments.
    pub stride: Option<usize>,
}

/// Kernel source plus everything a backend needs to build and bind it.
#[derive(Debug, Clone)]
pub struct ProgramSpec {
    /// Kernel name (for debugging/profiling).
    pub name: String,

    /// Entry point function name.
    pub entry_point: String,

    /// Kernel-language source.
    pub source: String,

    /// Arguments in signature order.
    pub args: Vec<ArgLayout>,
}

/// A compute device.
pub trait Device: Send + Sync {
    /// Human readable name.
    fn name(&self) -> &str;

    fn kind(&self) -> DeviceKind;

    /// Identity used to key compiled programs.
    ///
    /// Programs compiled for one device are never valid on another, so two devices must never
    /// share a key. Defaults to [`Self::name`].
    fn cache_key(&self) -> String {
        self.name().to_string()
    }

    /// Builds `spec` with the given compiler options.
    fn compile(&self, spec: &ProgramSpec, options: &str) -> Result<Arc<dyn Program>>;
}

/// A compiled program.
pub trait Program: Send + Sync {
    fn name(&self) -> &str;

    /// Preferred multiple of the workgroup size for the entry point.
    fn preferred_work_group_multiple(&self) -> Result<usize>;

    /// Opens an execution session with its own buffers and queue.
    fn session(&self) -> Result<Box<dyn Session>>;
}

/// Handle of a device buffer within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(usize);

impl BufferId {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(&self) -> usize {
        self.0
    }
}

/// Pending device to host copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReadTicket(usize);

impl ReadTicket {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(&self) -> usize {
        self.0
    }
}

/// Value bound to a kernel argument.
#[derive(Debug, Clone, Copy)]
pub enum ArgValue<'a> {
    Buffer(BufferId),
    Bytes(&'a [u8]),
}

/// One execution on one device.
///
/// Commands run in submission order. Reads are asynchronous: the bytes of an
/// [`Session::enqueue_read`] are only available after [`Session::wait_read`].
pub trait Session {
    fn create_buffer(&mut self, bytes: usize) -> Result<BufferId>;

    /// Copies `data` into `buffer` starting at byte `offset`.
    fn write_buffer(&mut self, buffer: BufferId, offset: usize, data: &[u8]) -> Result<()>;

    fn set_arg(&mut self, index: usize, value: ArgValue<'_>) -> Result<()>;

    fn launch(&mut self, dims: LaunchDims) -> Result<()>;

    /// Starts copying `len` bytes from byte `offset` of `buffer` back to the host.
    fn enqueue_read(&mut self, buffer: BufferId, offset: usize, len: usize) -> Result<ReadTicket>;

    /// Blocks until the read completes and returns its bytes.
    fn wait_read(&mut self, ticket: ReadTicket) -> Result<Vec<u8>>;
}

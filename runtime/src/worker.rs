//! Per-device execution of a rendered kernel over a sub-range of instances.

use std::ops::Range;
use std::sync::Arc;

use devfn_codegen::{ArgKind, KernelDataManager, RenderedKernel};
use devfn_device::{ArgLayout, ArgValue, BufferId, Device, LaunchDims, ProgramSpec};
use snafu::ResultExt;

use crate::cache::{self, CachedProgram};
use crate::error::*;

/// Program description handed to the device compiler.
pub fn program_spec(kernel: &RenderedKernel) -> ProgramSpec {
    let args = kernel
        .args
        .iter()
        .map(|arg| ArgLayout {
            name: arg.name.clone(),
            stride: match arg.kind {
                ArgKind::Buffer { stride, .. } => Some(stride),
                ArgKind::Value(_) => None,
            },
        })
        .collect();
    ProgramSpec {
        name: kernel.name.clone(),
        entry_point: kernel.entry_point.clone(),
        source: kernel.code.clone(),
        args,
    }
}

/// A kernel compiled for one device.
pub struct Worker {
    device: Arc<dyn Device>,
    program: Arc<CachedProgram>,
    /// Work items per instance.
    work_group: usize,
}

impl Worker {
    /// Compiles (or fetches from the cache) `kernel` for `device`.
    ///
    /// With local reduction every instance runs as one workgroup of the device's preferred
    /// workgroup multiple, otherwise as a single work item.
    pub fn new(device: Arc<dyn Device>, kernel: &RenderedKernel, options: &str) -> Result<Self> {
        let program = cache::get_or_compile(device.as_ref(), &program_spec(kernel), options).context(DeviceSnafu)?;
        let work_group = if kernel.use_local_reduction {
            program.program.preferred_work_group_multiple().context(DeviceSnafu)?.max(1)
        } else {
            1
        };
        Ok(Self { device, program, work_group })
    }

    pub fn device(&self) -> &dyn Device {
        self.device.as_ref()
    }

    pub fn work_group(&self) -> usize {
        self.work_group
    }

    /// Launch geometry for `range`.
    ///
    /// Grouped kernels always get an explicit workgroup size, one work item when local
    /// reduction is off.
    pub fn launch_dims(&self, kernel: &RenderedKernel, range: &Range<usize>) -> LaunchDims {
        if kernel.grouped {
            LaunchDims::grouped(range.start, range.len(), self.work_group)
        } else {
            LaunchDims::flat(range.start, range.len())
        }
    }

    /// Runs instances `range` of `instances`.
    ///
    /// Device buffers hold a row for every instance, since the kernel indexes them with the
    /// absolute instance id; only the rows of `range` are written and read back. Read-backs are
    /// all enqueued before the first wait.
    pub fn run(
        &self,
        kernel: &RenderedKernel,
        manager: &KernelDataManager,
        instances: usize,
        range: Range<usize>,
    ) -> Result<()> {
        if range.is_empty() {
            return Ok(());
        }

        let mut session = self.program.program.session().context(DeviceSnafu)?;
        let mut buffers: Vec<Option<(BufferId, usize)>> = Vec::with_capacity(kernel.args.len());
        for (index, arg) in kernel.args.iter().enumerate() {
            match &arg.kind {
                ArgKind::Value(bytes) => {
                    session.set_arg(index, ArgValue::Bytes(bytes)).context(DeviceSnafu)?;
                    buffers.push(None);
                }
                ArgKind::Buffer { stride, upload, .. } => {
                    let buffer = session.create_buffer(stride * instances).context(DeviceSnafu)?;
                    if *upload {
                        let bytes = manager.pack_rows(index, range.clone()).context(CodegenSnafu)?;
                        session.write_buffer(buffer, range.start * stride, &bytes).context(DeviceSnafu)?;
                    }
                    session.set_arg(index, ArgValue::Buffer(buffer)).context(DeviceSnafu)?;
                    buffers.push(Some((buffer, *stride)));
                }
            }
        }

        let dims = self.launch_dims(kernel, &range);
        tracing::debug!(
            device = self.device.name(),
            kernel = kernel.name.as_str(),
            start = range.start,
            end = range.end,
            global_size = dims.global_size,
            local_size = ?dims.local_size,
            "launching kernel"
        );
        session.launch(dims).context(DeviceSnafu)?;

        let mut tickets = Vec::new();
        for index in kernel.write_out() {
            let Some((buffer, stride)) = buffers[index] else {
                continue;
            };
            let ticket = session.enqueue_read(buffer, range.start * stride, range.len() * stride).context(DeviceSnafu)?;
            tickets.push((index, ticket));
        }
        for (index, ticket) in tickets {
            let bytes = session.wait_read(ticket).context(DeviceSnafu)?;
            manager.unpack_rows(index, range.clone(), &bytes).context(CodegenSnafu)?;
        }

        tracing::debug!(device = self.device.name(), start = range.start, end = range.end, "copied back results");
        Ok(())
    }
}

//! OpenCL backend on top of `ocl::core`.
//!
//! One [`OpenClDevice`] per (platform, device) pair, each with its own context. Programs are
//! built per device; every [`Session`] creates its own kernel object and in-order command queue,
//! so one program can serve concurrent sessions.

use std::collections::HashMap;
use std::ffi::{CString, c_void};
use std::sync::Arc;

use ocl::core::{
    self, ArgVal, CommandQueue, Context, ContextProperties, DeviceId, DeviceInfo, DeviceInfoResult, DeviceType,
    Event, Kernel, KernelWorkGroupInfo, KernelWorkGroupInfoResult, Mem, PlatformId, ProgramBuildInfo,
};

use crate::device::*;
use crate::error::*;
use crate::launch::LaunchDims;

/// Every device of every OpenCL platform.
pub fn all_devices() -> Result<Vec<Arc<dyn Device>>> {
    let platforms = core::get_platform_ids().map_err(|e| Error::Discovery { reason: e.to_string() })?;
    let mut devices: Vec<Arc<dyn Device>> = Vec::new();
    for (platform_index, platform) in platforms.into_iter().enumerate() {
        let ids = core::get_device_ids(platform, None, None).map_err(|e| Error::Discovery { reason: e.to_string() })?;
        for (device_index, id) in ids.into_iter().enumerate() {
            let device = OpenClDevice::new(platform, id, platform_index, device_index)?;
            tracing::debug!(device = device.name(), kind = %device.kind(), "found OpenCL device");
            devices.push(Arc::new(device));
        }
    }
    Ok(devices)
}

/// One OpenCL device with its context.
pub struct OpenClDevice {
    name: String,
    kind: DeviceKind,
    device: DeviceId,
    context: Context,
}

impl OpenClDevice {
    pub fn new(platform: PlatformId, device: DeviceId, platform_index: usize, device_index: usize) -> Result<Self> {
        let discovery = |e: core::Error| Error::Discovery { reason: e.to_string() };

        let label = core::get_device_info(device, DeviceInfo::Name).map_err(discovery)?.to_string();
        let kind = match core::get_device_info(device, DeviceInfo::Type).map_err(discovery)? {
            DeviceInfoResult::Type(ty) if ty.contains(DeviceType::GPU) => DeviceKind::Gpu,
            DeviceInfoResult::Type(ty) if ty.contains(DeviceType::CPU) => DeviceKind::Cpu,
            DeviceInfoResult::Type(ty) if ty.contains(DeviceType::ACCELERATOR) => DeviceKind::Accelerator,
            _ => DeviceKind::Other,
        };

        let properties = ContextProperties::new().platform(platform);
        let context = core::create_context(Some(&properties), &[device], None, None).map_err(discovery)?;

        let name = format!("{} [{platform_index}:{device_index}]", label.trim());
        Ok(Self { name, kind, device, context })
    }
}

impl Device for OpenClDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DeviceKind {
        self.kind
    }

    fn compile(&self, spec: &ProgramSpec, options: &str) -> Result<Arc<dyn Program>> {
        let failed = |log: String| Error::Compile { device: self.name.clone(), log };

        let source = CString::new(spec.source.as_str()).map_err(|e| failed(e.to_string()))?;
        let options = CString::new(options).map_err(|e| failed(e.to_string()))?;
        let program = core::create_program_with_source(&self.context, &[source]).map_err(|e| failed(e.to_string()))?;

        if let Err(error) = core::build_program(&program, Some(&[self.device]), &options, None, None) {
            let log = core::get_program_build_info(&program, self.device, ProgramBuildInfo::BuildLog)
                .map(|log| log.to_string())
                .unwrap_or_else(|_| error.to_string());
            return Err(failed(log));
        }

        // The kernel object is only needed for the work group query; sessions create their own.
        let kernel = core::create_kernel(&program, &spec.entry_point).map_err(|e| failed(e.to_string()))?;
        let work_group_multiple = match core::get_kernel_work_group_info(
            &kernel,
            self.device,
            KernelWorkGroupInfo::PreferredWorkGroupSizeMultiple,
        ) {
            Ok(KernelWorkGroupInfoResult::PreferredWorkGroupSizeMultiple(multiple)) => multiple.max(1),
            Ok(_) => 1,
            Err(e) => return Err(failed(e.to_string())),
        };

        tracing::debug!(device = self.name.as_str(), kernel = spec.name.as_str(), work_group_multiple, "built program");
        Ok(Arc::new(OpenClProgram {
            device_name: self.name.clone(),
            device: self.device,
            context: self.context.clone(),
            program,
            entry_point: spec.entry_point.clone(),
            name: spec.name.clone(),
            work_group_multiple,
        }))
    }
}

struct OpenClProgram {
    device_name: String,
    device: DeviceId,
    context: Context,
    program: core::Program,
    entry_point: String,
    name: String,
    work_group_multiple: usize,
}

impl Program for OpenClProgram {
    fn name(&self) -> &str {
        &self.name
    }

    fn preferred_work_group_multiple(&self) -> Result<usize> {
        Ok(self.work_group_multiple)
    }

    fn session(&self) -> Result<Box<dyn Session>> {
        let launch = |e: core::Error| Error::Launch { device: self.device_name.clone(), reason: e.to_string() };
        let queue = core::create_command_queue(&self.context, self.device, None).map_err(launch)?;
        let kernel = core::create_kernel(&self.program, &self.entry_point).map_err(launch)?;
        Ok(Box::new(OpenClSession {
            device_name: self.device_name.clone(),
            context: self.context.clone(),
            queue,
            kernel,
            buffers: Vec::new(),
            pending: HashMap::new(),
            next_ticket: 0,
        }))
    }
}

struct OpenClSession {
    device_name: String,
    context: Context,
    queue: CommandQueue,
    kernel: Kernel,
    buffers: Vec<Mem>,
    /// Destination memory must stay put until the read event completes.
    pending: HashMap<usize, (Event, Vec<u8>)>,
    next_ticket: usize,
}

impl OpenClSession {
    fn transfer_error(&self, e: core::Error) -> Error {
        Error::Transfer { device: self.device_name.clone(), reason: e.to_string() }
    }

    fn launch_error(&self, e: core::Error) -> Error {
        Error::Launch { device: self.device_name.clone(), reason: e.to_string() }
    }

    fn buffer(&self, buffer: BufferId) -> Result<&Mem> {
        self.buffers.get(buffer.index()).ok_or_else(|| Error::Transfer {
            device: self.device_name.clone(),
            reason: format!("unknown buffer {}", buffer.index()),
        })
    }
}

impl Session for OpenClSession {
    fn create_buffer(&mut self, bytes: usize) -> Result<BufferId> {
        // Zero-sized buffers are invalid in OpenCL.
        let mem = unsafe { core::create_buffer::<u8>(&self.context, core::MEM_READ_WRITE, bytes.max(1), None) }
            .map_err(|e| self.transfer_error(e))?;
        self.buffers.push(mem);
        Ok(BufferId::new(self.buffers.len() - 1))
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: usize, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let mem = self.buffer(buffer)?;
        unsafe {
            core::enqueue_write_buffer(&self.queue, mem, true, offset, data, None::<Event>, None::<&mut Event>)
        }
        .map_err(|e| self.transfer_error(e))
    }

    fn set_arg(&mut self, index: usize, value: ArgValue<'_>) -> Result<()> {
        let index = index as u32;
        let result = match value {
            ArgValue::Buffer(buffer) => {
                let mem = self.buffer(buffer)?;
                core::set_kernel_arg(&self.kernel, index, ArgVal::mem(mem))
            }
            ArgValue::Bytes(bytes) => {
                let value = unsafe { ArgVal::from_raw(bytes.len(), bytes.as_ptr() as *const c_void, false) };
                core::set_kernel_arg(&self.kernel, index, value)
            }
        };
        result.map_err(|e| self.launch_error(e))
    }

    fn launch(&mut self, dims: LaunchDims) -> Result<()> {
        tracing::debug!(device = self.device_name.as_str(), ?dims, "enqueue kernel");
        unsafe {
            core::enqueue_kernel(
                &self.queue,
                &self.kernel,
                1,
                Some([dims.global_offset, 0, 0]),
                &[dims.global_size, 1, 1],
                dims.local_size.map(|local| [local, 1, 1]),
                None::<Event>,
                None::<&mut Event>,
            )
        }
        .map_err(|e| self.launch_error(e))
    }

    fn enqueue_read(&mut self, buffer: BufferId, offset: usize, len: usize) -> Result<ReadTicket> {
        let mut data = vec![0u8; len];
        let mut event = Event::null();
        if len > 0 {
            let mem = self.buffer(buffer)?;
            unsafe {
                core::enqueue_read_buffer(
                    &self.queue,
                    mem,
                    false,
                    offset,
                    &mut data,
                    None::<Event>,
                    Some(&mut event),
                )
            }
            .map_err(|e| self.transfer_error(e))?;
        }

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.pending.insert(ticket, (event, data));
        Ok(ReadTicket::new(ticket))
    }

    fn wait_read(&mut self, ticket: ReadTicket) -> Result<Vec<u8>> {
        let Some((event, data)) = self.pending.remove(&ticket.index()) else {
            return Err(Error::Transfer { device: self.device_name.clone(), reason: "unknown read ticket".into() });
        };
        if !event.is_null() {
            core::wait_for_event(&event).map_err(|e| self.transfer_error(e))?;
        }
        Ok(data)
    }
}

impl Drop for OpenClSession {
    fn drop(&mut self) {
        // Outstanding reads write into `pending`; let them land before it is freed.
        if let Err(error) = core::finish(&self.queue) {
            tracing::warn!(device = self.device_name.as_str(), %error, "failed to drain command queue");
        }
    }
}

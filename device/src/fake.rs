//! In-process fake device.
//!
//! Compiles nothing: the "kernel" is a Rust closure run once per launched instance against the
//! packed argument bytes. Every compile, launch and transfer is recorded so tests can check
//! what the dispatcher asked for.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::device::*;
use crate::error::*;
use crate::launch::LaunchDims;

type Body = dyn Fn(&mut Instance<'_>) + Send + Sync;

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

/// Everything a fake device was asked to do.
#[derive(Debug, Clone, Default)]
pub struct FakeLog {
    pub sources: Vec<String>,
    pub options: Vec<String>,
    pub launches: Vec<LaunchDims>,
    /// (byte offset, length) of every host to device write.
    pub writes: Vec<(usize, usize)>,
    /// (byte offset, length) of every device to host read.
    pub reads: Vec<(usize, usize)>,
}

/// Device running a closure per instance.
#[derive(Clone)]
pub struct FakeDevice {
    id: usize,
    name: String,
    kind: DeviceKind,
    work_group_multiple: usize,
    compile_error: Option<String>,
    body: Arc<Body>,
    log: Arc<Mutex<FakeLog>>,
}

impl FakeDevice {
    pub fn new(name: impl Into<String>, body: impl Fn(&mut Instance<'_>) + Send + Sync + 'static) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            kind: DeviceKind::Cpu,
            work_group_multiple: 1,
            compile_error: None,
            body: Arc::new(body),
            log: Arc::default(),
        }
    }

    pub fn with_kind(mut self, kind: DeviceKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_work_group_multiple(mut self, multiple: usize) -> Self {
        self.work_group_multiple = multiple;
        self
    }

    /// Every compilation fails with `log`.
    pub fn failing(mut self, log: impl Into<String>) -> Self {
        self.compile_error = Some(log.into());
        self
    }

    pub fn log(&self) -> FakeLog {
        self.log.lock().clone()
    }

    pub fn into_device(self) -> Arc<dyn Device> {
        Arc::new(self)
    }
}

impl fmt::Debug for FakeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeDevice").field("id", &self.id).field("name", &self.name).field("kind", &self.kind).finish()
    }
}

impl Device for FakeDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DeviceKind {
        self.kind
    }

    fn cache_key(&self) -> String {
        format!("fake#{}:{}", self.id, self.name)
    }

    fn compile(&self, spec: &ProgramSpec, options: &str) -> Result<Arc<dyn Program>> {
        {
            let mut log = self.log.lock();
            log.sources.push(spec.source.clone());
            log.options.push(options.to_string());
        }
        if let Some(log) = &self.compile_error {
            return CompileSnafu { device: self.name.as_str(), log: log.as_str() }.fail();
        }
        Ok(Arc::new(FakeProgram { device: self.clone(), name: spec.name.clone(), args: spec.args.clone() }))
    }
}

struct FakeProgram {
    device: FakeDevice,
    name: String,
    args: Vec<ArgLayout>,
}

impl Program for FakeProgram {
    fn name(&self) -> &str {
        &self.name
    }

    fn preferred_work_group_multiple(&self) -> Result<usize> {
        Ok(self.device.work_group_multiple)
    }

    fn session(&self) -> Result<Box<dyn Session>> {
        Ok(Box::new(FakeSession {
            device: self.device.clone(),
            layout: self.args.clone(),
            buffers: Vec::new(),
            bound: vec![None; self.args.len()],
            pending: HashMap::new(),
            next_ticket: 0,
        }))
    }
}

#[derive(Debug, Clone)]
enum Bound {
    Buffer(BufferId),
    Bytes(Vec<u8>),
}

struct FakeSession {
    device: FakeDevice,
    layout: Vec<ArgLayout>,
    buffers: Vec<Vec<u8>>,
    bound: Vec<Option<Bound>>,
    pending: HashMap<usize, Vec<u8>>,
    next_ticket: usize,
}

impl FakeSession {
    fn buffer_range(&self, buffer: BufferId, offset: usize, len: usize) -> Result<std::ops::Range<usize>> {
        let size = self.buffers.get(buffer.index()).map(Vec::len);
        match size {
            Some(size) if offset + len <= size => Ok(offset..offset + len),
            _ => TransferSnafu {
                device: self.device.name.as_str(),
                reason: format!("{len} bytes at {offset} are outside buffer {}", buffer.index()),
            }
            .fail(),
        }
    }
}

impl Session for FakeSession {
    fn create_buffer(&mut self, bytes: usize) -> Result<BufferId> {
        self.buffers.push(vec![0; bytes]);
        Ok(BufferId::new(self.buffers.len() - 1))
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: usize, data: &[u8]) -> Result<()> {
        let range = self.buffer_range(buffer, offset, data.len())?;
        self.buffers[buffer.index()][range].copy_from_slice(data);
        self.device.log.lock().writes.push((offset, data.len()));
        Ok(())
    }

    fn set_arg(&mut self, index: usize, value: ArgValue<'_>) -> Result<()> {
        let Some(slot) = self.bound.get_mut(index) else {
            return LaunchSnafu { device: self.device.name.as_str(), reason: format!("no argument {index}") }.fail();
        };
        *slot = Some(match value {
            ArgValue::Buffer(buffer) => Bound::Buffer(buffer),
            ArgValue::Bytes(bytes) => Bound::Bytes(bytes.to_vec()),
        });
        Ok(())
    }

    fn launch(&mut self, dims: LaunchDims) -> Result<()> {
        let mut bound = Vec::with_capacity(self.bound.len());
        for (index, value) in self.bound.iter().enumerate() {
            match value {
                Some(value) => bound.push(value.clone()),
                None => {
                    return LaunchSnafu { device: self.device.name.as_str(), reason: format!("argument {index} not set") }
                        .fail();
                }
            }
        }

        self.device.log.lock().launches.push(dims);
        for index in dims.instances() {
            let mut instance = Instance { index, layout: &self.layout, bound: &bound, buffers: &mut self.buffers };
            (self.device.body)(&mut instance);
        }
        Ok(())
    }

    fn enqueue_read(&mut self, buffer: BufferId, offset: usize, len: usize) -> Result<ReadTicket> {
        let range = self.buffer_range(buffer, offset, len)?;
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.pending.insert(ticket, self.buffers[buffer.index()][range].to_vec());
        self.device.log.lock().reads.push((offset, len));
        Ok(ReadTicket::new(ticket))
    }

    fn wait_read(&mut self, ticket: ReadTicket) -> Result<Vec<u8>> {
        match self.pending.remove(&ticket.index()) {
            Some(bytes) => Ok(bytes),
            None => TransferSnafu { device: self.device.name.as_str(), reason: "unknown read ticket" }.fail(),
        }
    }
}

/// View of the kernel arguments of one instance.
///
/// Buffer arguments address the instance's row; by-value arguments are shared.
///
/// # Panics
///
/// Accessors panic on unknown argument names and out of range lanes, like an out of bounds
/// kernel access would fault.
pub struct Instance<'a> {
    index: usize,
    layout: &'a [ArgLayout],
    bound: &'a [Bound],
    buffers: &'a mut [Vec<u8>],
}

impl Instance<'_> {
    pub fn index(&self) -> usize {
        self.index
    }

    fn position(&self, name: &str) -> usize {
        self.layout
            .iter()
            .position(|arg| arg.name == name)
            .unwrap_or_else(|| panic!("no kernel argument named `{name}`"))
    }

    /// Lane `lane` of this instance's value of argument `name`.
    pub fn read<T: bytemuck::Pod>(&self, name: &str, lane: usize) -> T {
        let position = self.position(name);
        let size = std::mem::size_of::<T>();
        match (&self.bound[position], self.layout[position].stride) {
            (Bound::Bytes(bytes), _) => bytemuck::pod_read_unaligned(&bytes[lane * size..(lane + 1) * size]),
            (Bound::Buffer(buffer), stride) => {
                let start = self.index * stride.unwrap_or(0) + lane * size;
                bytemuck::pod_read_unaligned(&self.buffers[buffer.index()][start..start + size])
            }
        }
    }

    /// Stores lane `lane` of this instance's row of buffer argument `name`.
    pub fn write<T: bytemuck::Pod>(&mut self, name: &str, lane: usize, value: T) {
        let position = self.position(name);
        let Bound::Buffer(buffer) = &self.bound[position] else {
            panic!("kernel argument `{name}` is passed by value");
        };
        let size = std::mem::size_of::<T>();
        let start = self.index * self.layout[position].stride.unwrap_or(0) + lane * size;
        self.buffers[buffer.index()][start..start + size].copy_from_slice(bytemuck::bytes_of(&value));
    }
}

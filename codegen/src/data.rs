//! Host data handed to a kernel invocation.
//!
//! Inputs are wrapped once per call into a [`KernelData`]: a by-value [`KernelData::Scalar`],
//! a per-instance [`KernelData::Array`] backed by a shared [`HostArray`], or a
//! zero-initialized [`KernelData::Zeros`] output.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use devfn_dtype::{FLOAT_TYPE_ALIAS, ScalarDType, TypeDescriptor};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use smallvec::SmallVec;
use snafu::{ResultExt, ensure};

use crate::error::*;

/// Host element type with a kernel-language counterpart.
pub trait Element: bytemuck::Pod + Send + Sync + 'static {
    const DTYPE: ScalarDType;
}

macro_rules! element {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(impl Element for $ty {
            const DTYPE: ScalarDType = ScalarDType::$dtype;
        })*
    };
}

element!(
    i8 => Char,
    u8 => UChar,
    i16 => Short,
    u16 => UShort,
    i32 => Int,
    u32 => UInt,
    i64 => Long,
    u64 => ULong,
    half::f16 => Half,
    f32 => Float,
    f64 => Double,
);

/// Dense, row-major host array. The first axis indexes instances.
#[derive(Clone, PartialEq)]
pub struct HostBuffer {
    dtype: ScalarDType,
    shape: Vec<usize>,
    bytes: Vec<u8>,
}

impl HostBuffer {
    pub fn from_slice<T: Element>(values: &[T], shape: impl Into<Vec<usize>>) -> Result<Self> {
        let shape = shape.into();
        ensure!(shape.iter().product::<usize>() == values.len(), ShapeMismatchSnafu { shape, len: values.len() });
        Ok(Self { dtype: T::DTYPE, shape, bytes: bytemuck::cast_slice(values).to_vec() })
    }

    /// One-dimensional buffer, one value per instance.
    pub fn from_vec<T: Element>(values: Vec<T>) -> Self {
        Self { dtype: T::DTYPE, shape: vec![values.len()], bytes: bytemuck::cast_slice(&values).to_vec() }
    }

    /// Converts each value to `dtype` with `as` semantics.
    pub fn from_f64(dtype: ScalarDType, values: &[f64], shape: impl Into<Vec<usize>>) -> Result<Self> {
        let shape = shape.into();
        ensure!(shape.iter().product::<usize>() == values.len(), ShapeMismatchSnafu { shape, len: values.len() });
        let mut bytes = Vec::with_capacity(values.len() * dtype.bytes());
        values.iter().for_each(|&value| dtype.encode(value, &mut bytes));
        Ok(Self { dtype, shape, bytes })
    }

    pub fn zeros(dtype: ScalarDType, shape: impl Into<Vec<usize>>) -> Self {
        let shape = shape.into();
        let bytes = vec![0; shape.iter().product::<usize>() * dtype.bytes()];
        Self { dtype, shape, bytes }
    }

    pub fn dtype(&self) -> ScalarDType {
        self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Total number of values.
    pub fn len(&self) -> usize {
        self.bytes.len() / self.dtype.bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Length of the first axis; a zero-dimensional buffer is one row.
    pub fn rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(1)
    }

    /// Values per row.
    pub fn row_len(&self) -> usize {
        self.shape.iter().skip(1).product()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        ensure!(self.dtype == T::DTYPE, ElementTypeSnafu { expected: T::DTYPE, found: self.dtype });
        Ok(self.bytes.chunks_exact(std::mem::size_of::<T>()).map(bytemuck::pod_read_unaligned).collect())
    }

    pub fn to_f64(&self) -> Vec<f64> {
        self.bytes.chunks_exact(self.dtype.bytes()).map(|chunk| self.dtype.decode(chunk)).collect()
    }

    /// Copy with every value converted to `dtype`.
    pub fn converted(&self, dtype: ScalarDType) -> Self {
        if dtype == self.dtype {
            return self.clone();
        }
        let mut bytes = Vec::with_capacity(self.len() * dtype.bytes());
        for value in self.to_f64() {
            dtype.encode(value, &mut bytes);
        }
        Self { dtype, shape: self.shape.clone(), bytes }
    }

    pub(crate) fn row_bytes(&self) -> usize {
        self.row_len() * self.dtype.bytes()
    }

    pub(crate) fn rows_bytes(&self, rows: Range<usize>) -> &[u8] {
        let width = self.row_bytes();
        &self.bytes[rows.start * width..rows.end * width]
    }

    pub(crate) fn rows_bytes_mut(&mut self, rows: Range<usize>) -> &mut [u8] {
        let width = self.row_bytes();
        &mut self.bytes[rows.start * width..rows.end * width]
    }
}

impl fmt::Debug for HostBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostBuffer").field("dtype", &self.dtype).field("shape", &self.shape).finish_non_exhaustive()
    }
}

impl<T: Element> From<Vec<T>> for HostBuffer {
    fn from(values: Vec<T>) -> Self {
        Self::from_vec(values)
    }
}

/// Host buffer shared between the caller and the dispatcher.
///
/// Read-back writes into the shared buffer, so every clone observes kernel output.
#[derive(Clone)]
pub struct HostArray(Arc<RwLock<HostBuffer>>);

impl HostArray {
    pub fn new(buffer: HostBuffer) -> Self {
        Self(Arc::new(RwLock::new(buffer)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, HostBuffer> {
        self.0.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, HostBuffer> {
        self.0.write()
    }

    pub fn ptr_eq(&self, other: &HostArray) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn dtype(&self) -> ScalarDType {
        self.read().dtype()
    }

    pub fn shape(&self) -> Vec<usize> {
        self.read().shape().to_vec()
    }

    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        self.read().to_vec()
    }

    pub fn to_f64(&self) -> Vec<f64> {
        self.read().to_f64()
    }
}

impl fmt::Debug for HostArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HostArray").field(&*self.read()).finish()
    }
}

impl From<HostBuffer> for HostArray {
    fn from(buffer: HostBuffer) -> Self {
        Self::new(buffer)
    }
}

impl<T: Element> From<Vec<T>> for HostArray {
    fn from(values: Vec<T>) -> Self {
        Self::new(HostBuffer::from_vec(values))
    }
}

/// Direction of host/device transfers for a buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[derive(strum::EnumString, strum::Display)]
pub enum AccessMode {
    /// Uploaded, never read back.
    #[strum(serialize = "r")]
    ReadOnly,
    /// Read back, never uploaded.
    #[strum(serialize = "w")]
    WriteOnly,
    #[default]
    #[strum(serialize = "rw")]
    ReadWrite,
}

impl AccessMode {
    pub const fn is_readable(&self) -> bool {
        matches!(self, Self::ReadOnly | Self::ReadWrite)
    }

    pub const fn is_writable(&self) -> bool {
        matches!(self, Self::WriteOnly | Self::ReadWrite)
    }
}

/// One named input of a kernel invocation.
#[derive(Debug, Clone)]
pub enum KernelData {
    /// Same value for every instance, passed by value. `values` holds one entry per vector lane.
    Scalar { values: SmallVec<[f64; 4]>, ctype: TypeDescriptor },
    /// One row per instance, passed through a device buffer.
    Array { data: HostArray, ctype: TypeDescriptor, mode: AccessMode },
    /// Zero-initialized output buffer of `shape` elements, allocated when the kernel data is laid out.
    Zeros { shape: Vec<usize>, ctype: TypeDescriptor },
}

impl KernelData {
    /// Scalar of the configured floating point type.
    pub fn scalar(value: f64) -> Self {
        Self::Scalar { values: SmallVec::from_slice(&[value]), ctype: TypeDescriptor::new(FLOAT_TYPE_ALIAS) }
    }

    /// Scalar or small vector literal of an explicit type, e.g. `double3`.
    pub fn typed_scalar(values: impl IntoIterator<Item = f64>, ctype: &str) -> Result<Self> {
        Ok(Self::Scalar { values: values.into_iter().collect(), ctype: parse_ctype(ctype)? })
    }

    pub fn array(data: impl Into<HostArray>, ctype: &str, mode: AccessMode) -> Result<Self> {
        Ok(Self::Array { data: data.into(), ctype: parse_ctype(ctype)?, mode })
    }

    /// Array typed after its own element type.
    pub fn array_like(data: impl Into<HostArray>, mode: AccessMode) -> Self {
        let data = data.into();
        let ctype = TypeDescriptor::new(data.dtype().to_string());
        Self::Array { data, ctype, mode }
    }

    pub fn zeros(shape: impl Into<Vec<usize>>, ctype: &str) -> Result<Self> {
        Ok(Self::Zeros { shape: shape.into(), ctype: parse_ctype(ctype)? })
    }

    pub fn ctype(&self) -> &TypeDescriptor {
        match self {
            Self::Scalar { ctype, .. } | Self::Array { ctype, .. } | Self::Zeros { ctype, .. } => ctype,
        }
    }

    /// Whether the value reaches the kernel through a device buffer.
    pub fn loaded_as_pointer(&self) -> bool {
        !matches!(self, Self::Scalar { .. })
    }

    /// Whether device results are copied back into the host data.
    pub fn read_data_back(&self) -> bool {
        match self {
            Self::Scalar { .. } => false,
            Self::Array { mode, .. } => mode.is_writable(),
            Self::Zeros { .. } => true,
        }
    }

    /// Number of instance rows, `None` for scalars.
    pub fn rows(&self) -> Option<usize> {
        match self {
            Self::Scalar { .. } => None,
            Self::Array { data, .. } => Some(data.read().rows()),
            Self::Zeros { shape, .. } => Some(shape.first().copied().unwrap_or(1)),
        }
    }
}

fn parse_ctype(ctype: &str) -> Result<TypeDescriptor> {
    TypeDescriptor::from_declaration(ctype).context(InvalidTypeSnafu { ctype })
}

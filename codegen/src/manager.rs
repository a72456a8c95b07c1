//! Layout of kernel data in device memory.
//!
//! Every named [`KernelData`] becomes one field of the per-instance `devfn_data_struct`.
//! Scalars are passed by value. Arrays and zero-initialized outputs get a flat device buffer
//! holding one row per instance, and the struct field points at the instance's row:
//!
//! ```text
//! typedef struct {
//!     global double* x;      // buffer, x + gid * 4
//!     devfn_float_type a;    // by value
//! } devfn_data_struct;
//! ```
//!
//! Three-component vectors occupy four lanes on the device. Packing pads them and unpacking
//! strips the padding again.

use std::ops::Range;

use devfn_dtype::{DATA_STRUCT_TYPE, Precision, ScalarDType, TypeDescriptor};
use indexmap::IndexMap;
use itertools::Itertools;
use snafu::{OptionExt, ensure};

use crate::data::{AccessMode, HostArray, HostBuffer, KernelData};
use crate::error::*;
use crate::types::{ArgKind, KernelArg};

#[derive(Debug)]
struct Field {
    ctype: TypeDescriptor,
    scalar: ScalarDType,
    storage: Storage,
}

#[derive(Debug)]
enum Storage {
    Value(Vec<u8>),
    Buffer {
        data: HostArray,
        mode: AccessMode,
        read_back: bool,
        /// Elements per instance.
        length: usize,
    },
}

impl Field {
    fn lane_bytes(&self) -> usize {
        self.scalar.bytes()
    }

    /// Device bytes of one instance row.
    fn stride(&self, length: usize) -> usize {
        length * self.ctype.storage_lanes() * self.lane_bytes()
    }
}

/// Device layout of the named kernel data of one execution.
#[derive(Debug)]
pub struct KernelDataManager {
    precision: Precision,
    fields: IndexMap<String, Field>,
}

impl KernelDataManager {
    /// Lays out `items` in iteration order.
    ///
    /// Arrays whose element type differs from the declared type are converted into a fresh host
    /// array; [`Self::host_data`] returns the array actually transferred.
    pub fn new(items: IndexMap<String, KernelData>, precision: Precision) -> Result<Self> {
        let mut fields = IndexMap::with_capacity(items.len());
        for (name, item) in items {
            let field = layout(&name, item, precision)?;
            fields.insert(name, field);
        }
        Ok(Self { precision, fields })
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Whether any field stores values of `scalar`.
    pub fn uses(&self, scalar: ScalarDType) -> bool {
        self.fields.values().any(|field| field.scalar == scalar)
    }

    pub fn loaded_as_pointer(&self, name: &str) -> Option<bool> {
        self.fields.get(name).map(|field| matches!(field.storage, Storage::Buffer { .. }))
    }

    pub fn read_data_back(&self, name: &str) -> Option<bool> {
        self.fields.get(name).map(|field| matches!(field.storage, Storage::Buffer { read_back: true, .. }))
    }

    /// Elements per instance, one for by-value data.
    pub fn data_length(&self, name: &str) -> Option<usize> {
        self.fields.get(name).map(|field| match field.storage {
            Storage::Value(_) => 1,
            Storage::Buffer { length, .. } => length,
        })
    }

    /// Host array backing a buffer field.
    pub fn host_data(&self, name: &str) -> Option<HostArray> {
        match &self.fields.get(name)?.storage {
            Storage::Value(_) => None,
            Storage::Buffer { data, .. } => Some(data.clone()),
        }
    }

    /// Fails unless every buffer has a row for each of `instances` instances.
    pub fn check_instances(&self, instances: usize) -> Result<()> {
        for (name, field) in &self.fields {
            if let Storage::Buffer { data, .. } = &field.storage {
                let rows = data.read().rows();
                ensure!(rows >= instances, TooFewRowsSnafu { name, rows, instances });
            }
        }
        Ok(())
    }

    /// Declaration of `devfn_data_struct`.
    pub fn struct_definition(&self) -> String {
        let mut code = String::from("typedef struct {\n");
        if self.fields.is_empty() {
            code.push_str("    char _empty;\n");
        }
        for (name, field) in &self.fields {
            let ctype = field.ctype.ctype();
            match field.storage {
                Storage::Value(_) => code.push_str(&format!("    {ctype} {name};\n")),
                Storage::Buffer { .. } => code.push_str(&format!("    global {ctype}* {name};\n")),
            }
        }
        code.push_str(&format!("}} {DATA_STRUCT_TYPE};\n"));
        code
    }

    /// Brace initializer building the struct of instance `index` from the kernel arguments.
    pub fn struct_initializer(&self, index: &str) -> String {
        if self.fields.is_empty() {
            return "{0}".to_string();
        }
        let values = self.fields.iter().map(|(name, field)| match field.storage {
            Storage::Value(_) => name.clone(),
            Storage::Buffer { length, .. } => format!("{name} + {index} * {length}"),
        });
        format!("{{{}}}", values.format(", "))
    }

    /// Kernel parameter declarations, in the order of [`Self::kernel_args`].
    pub fn kernel_parameters(&self) -> Vec<String> {
        self.kernel_args().into_iter().map(|arg| arg.declaration).collect()
    }

    /// Kernel arguments in struct field order.
    pub fn kernel_args(&self) -> Vec<KernelArg> {
        self.fields
            .iter()
            .map(|(name, field)| {
                let ctype = field.ctype.ctype();
                match &field.storage {
                    Storage::Value(bytes) => KernelArg {
                        name: name.clone(),
                        declaration: format!("{ctype} {name}"),
                        kind: ArgKind::Value(bytes.clone()),
                    },
                    Storage::Buffer { mode, read_back, length, .. } => KernelArg {
                        name: name.clone(),
                        declaration: format!("global {ctype}* {name}"),
                        kind: ArgKind::Buffer {
                            stride: field.stride(*length),
                            upload: mode.is_readable(),
                            read_back: *read_back,
                        },
                    },
                }
            })
            .collect()
    }

    /// Argument index and name of every buffer copied back after the launch.
    pub fn items_to_write_out(&self) -> Vec<(usize, &str)> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, (_, field))| matches!(field.storage, Storage::Buffer { read_back: true, .. }))
            .map(|(index, (name, _))| (index, name.as_str()))
            .collect()
    }

    /// Device bytes of `rows` of the buffer argument at `index`.
    pub fn pack_rows(&self, index: usize, rows: Range<usize>) -> Result<Vec<u8>> {
        let (name, field, data) = self.buffer(index)?;
        let buffer = data.read();
        ensure!(rows.end <= buffer.rows(), TooFewRowsSnafu { name, rows: buffer.rows(), instances: rows.end });

        let host = buffer.rows_bytes(rows);
        let (lanes, storage_lanes) = (field.ctype.lanes(), field.ctype.storage_lanes());
        if lanes == storage_lanes {
            return Ok(host.to_vec());
        }

        let element = lanes * field.lane_bytes();
        let padding = (storage_lanes - lanes) * field.lane_bytes();
        let mut out = Vec::with_capacity(host.len() / element * (element + padding));
        for chunk in host.chunks_exact(element) {
            out.extend_from_slice(chunk);
            out.resize(out.len() + padding, 0);
        }
        Ok(out)
    }

    /// Stores device bytes of `rows` into the host array of the buffer argument at `index`.
    pub fn unpack_rows(&self, index: usize, rows: Range<usize>, bytes: &[u8]) -> Result<()> {
        let (name, field, data) = self.buffer(index)?;
        let Storage::Buffer { length, .. } = field.storage else {
            return ArgumentIndexSnafu { index }.fail();
        };
        ensure!(
            bytes.len() == rows.len() * field.stride(length),
            TransferSizeSnafu { name, start: rows.start, end: rows.end, len: bytes.len() }
        );

        let mut buffer = data.write();
        ensure!(rows.end <= buffer.rows(), TooFewRowsSnafu { name, rows: buffer.rows(), instances: rows.end });
        let host = buffer.rows_bytes_mut(rows);
        let (lanes, storage_lanes) = (field.ctype.lanes(), field.ctype.storage_lanes());
        if lanes == storage_lanes {
            host.copy_from_slice(bytes);
            return Ok(());
        }

        let element = lanes * field.lane_bytes();
        let device_element = storage_lanes * field.lane_bytes();
        for (target, source) in host.chunks_exact_mut(element).zip(bytes.chunks_exact(device_element)) {
            target.copy_from_slice(&source[..element]);
        }
        Ok(())
    }

    fn buffer(&self, index: usize) -> Result<(&str, &Field, &HostArray)> {
        let (name, field) = self.fields.get_index(index).context(ArgumentIndexSnafu { index })?;
        match &field.storage {
            Storage::Buffer { data, .. } => Ok((name.as_str(), field, data)),
            Storage::Value(_) => ArgumentIndexSnafu { index }.fail(),
        }
    }
}

fn layout(name: &str, item: KernelData, precision: Precision) -> Result<Field> {
    let ctype = item.ctype().clone();
    let scalar = ctype.scalar_dtype(precision).context(UnresolvedTypeSnafu { name, ctype: ctype.ctype() })?;
    let lanes = ctype.lanes();

    let storage = match item {
        KernelData::Scalar { values, .. } => {
            ensure!(values.len() == lanes, ScalarWidthSnafu { name, expected: lanes, found: values.len() });
            let mut bytes = Vec::with_capacity(ctype.storage_lanes() * scalar.bytes());
            values.iter().for_each(|&value| scalar.encode(value, &mut bytes));
            bytes.resize(ctype.storage_lanes() * scalar.bytes(), 0);
            Storage::Value(bytes)
        }
        KernelData::Array { data, mode, .. } => {
            let (row_len, dtype) = {
                let buffer = data.read();
                (buffer.row_len(), buffer.dtype())
            };
            ensure!(row_len > 0 && row_len % lanes == 0, RowWidthSnafu { name, row_len, lanes });

            let data = if dtype == scalar {
                data
            } else {
                tracing::debug!(name, from = %dtype, to = %scalar, "converting kernel data");
                HostArray::new(data.read().converted(scalar))
            };
            Storage::Buffer { data, mode, read_back: mode.is_writable(), length: row_len / lanes }
        }
        KernelData::Zeros { shape, .. } => {
            let mut host_shape = shape;
            if host_shape.is_empty() {
                host_shape.push(1);
            }
            let length = host_shape.iter().skip(1).product::<usize>();
            if lanes > 1 {
                host_shape.push(lanes);
            }
            let data = HostArray::new(HostBuffer::zeros(scalar, host_shape));
            Storage::Buffer { data, mode: AccessMode::ReadWrite, read_back: true, length }
        }
    };

    Ok(Field { ctype, scalar, storage })
}

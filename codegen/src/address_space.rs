//! Address space materialization around the wrapped function call.
//!
//! Kernel data lives in global buffers. A pointer parameter declared `private` or `local` gets
//! a scratch array in that address space: filled before the call, passed instead of the struct
//! field, and copied back afterwards when the data is read back.
//!
//! Local scratch is shared by the workgroup, so only work item 0 copies and every copy is
//! fenced by a barrier on both sides of the call.

use devfn_dtype::AddrSpace;
use devfn_ir::Function;
use snafu::{OptionExt, ensure};

use crate::error::*;
use crate::manager::KernelDataManager;

const INDENT: &str = "    ";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Binding {
    /// The whole per-instance struct.
    Struct,
    /// Expression passed as is.
    Direct(String),
    Scratch(Scratch),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Scratch {
    name: String,
    space: AddrSpace,
    ctype: String,
    length: usize,
    write_back: bool,
}

impl Scratch {
    fn variable(&self) -> String {
        format!("{}_{}", self.name, self.space.keyword())
    }

    fn copy_loop(&self, target: &str, source: &str) -> Vec<String> {
        vec![
            format!("for(uint i = 0; i < {}; i++){{", self.length),
            format!("{INDENT}{target}[i] = {source}[i];"),
            "}".to_string(),
        ]
    }

    fn prologue(&self) -> Vec<String> {
        let variable = self.variable();
        let field = format!("data.{}", self.name);
        match self.space {
            AddrSpace::Local => {
                let mut lines = vec![
                    format!("local {} {variable}[{}];", self.ctype, self.length),
                    "if(get_local_id(0) == 0){".to_string(),
                ];
                lines.extend(self.copy_loop(&variable, &field).into_iter().map(|line| format!("{INDENT}{line}")));
                lines.push("}".to_string());
                lines.push("barrier(CLK_LOCAL_MEM_FENCE);".to_string());
                lines
            }
            _ => {
                let mut lines = vec![format!("{} {variable}[{}];", self.ctype, self.length)];
                lines.extend(self.copy_loop(&variable, &field));
                lines
            }
        }
    }

    fn epilogue(&self) -> Vec<String> {
        if !self.write_back {
            return Vec::new();
        }
        let variable = self.variable();
        let field = format!("data.{}", self.name);
        match self.space {
            AddrSpace::Local => {
                let mut lines = vec!["barrier(CLK_LOCAL_MEM_FENCE);".to_string(), "if(get_local_id(0) == 0){".to_string()];
                lines.extend(self.copy_loop(&field, &variable).into_iter().map(|line| format!("{INDENT}{line}")));
                lines.push("}".to_string());
                lines
            }
            _ => self.copy_loop(&field, &variable),
        }
    }
}

/// Call arguments, scratch set-up and write-back for one function over one data layout.
#[derive(Debug, Clone)]
pub struct AddressSpaceTransform {
    bindings: Vec<Binding>,
}

impl AddressSpaceTransform {
    /// Binds every parameter of `function` to its data in `manager`.
    ///
    /// Parameter data is looked up by the parameter's device name. A `devfn_data_struct`
    /// parameter receives the address of the whole struct.
    pub fn new(function: &Function, manager: &KernelDataManager) -> Result<Self> {
        let mut bindings = Vec::with_capacity(function.parameters().len());
        for parameter in function.parameters() {
            let dtype = parameter.dtype();
            if dtype.is_data_struct() {
                bindings.push(Binding::Struct);
                continue;
            }

            let name = parameter.cl_name();
            let pointer_loaded = manager.loaded_as_pointer(&name).context(MissingDataSnafu { name: name.as_str() })?;
            ensure!(pointer_loaded || !dtype.is_pointer(), PointerWithoutBufferSnafu { name: name.as_str() });

            let binding = match dtype.address_space() {
                _ if !pointer_loaded => Binding::Direct(format!("data.{name}")),
                _ if !dtype.is_pointer() => Binding::Direct(format!("data.{name}[0]")),
                Some(space) if space.needs_scratch() => Binding::Scratch(Scratch {
                    space,
                    ctype: dtype.ctype(),
                    length: manager.data_length(&name).unwrap_or(1),
                    write_back: manager.read_data_back(&name).unwrap_or(false),
                    name,
                }),
                _ => Binding::Direct(format!("data.{name}")),
            };
            bindings.push(binding);
        }
        Ok(Self { bindings })
    }

    /// Expressions passed to the function, in parameter order.
    pub fn call_arguments(&self) -> Vec<String> {
        self.bindings
            .iter()
            .map(|binding| match binding {
                Binding::Struct => "&data".to_string(),
                Binding::Direct(expression) => expression.clone(),
                Binding::Scratch(scratch) => scratch.variable(),
            })
            .collect()
    }

    /// Scratch declarations and copy-in, one statement per line.
    pub fn prologue(&self) -> Vec<String> {
        self.scratches().flat_map(Scratch::prologue).collect()
    }

    /// Copy-out of read-back scratch arrays.
    pub fn epilogue(&self) -> Vec<String> {
        self.scratches().flat_map(Scratch::epilogue).collect()
    }

    /// Whether any parameter is materialized in local memory.
    pub fn uses_local_memory(&self) -> bool {
        self.scratches().any(|scratch| scratch.space == AddrSpace::Local)
    }

    fn scratches(&self) -> impl Iterator<Item = &Scratch> {
        self.bindings.iter().filter_map(|binding| match binding {
            Binding::Scratch(scratch) => Some(scratch),
            _ => None,
        })
    }
}

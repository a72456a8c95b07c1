//! Evaluating a function over host inputs.
//!
//! [`evaluate`] is the single entry point the rest of a program needs: it wraps every input as
//! [`KernelData`], infers the instance count, lays the data out, dispatches over the configured
//! devices and returns the per-instance return values of non-void functions.
//!
//! Input wrapping, per parameter:
//!
//! | input                              | parameter            | kernel data                  |
//! |------------------------------------|----------------------|------------------------------|
//! | [`Input::Data`]                    | any                  | as given                     |
//! | three values                       | vector type          | scalar of the parameter type |
//! | [`Input::Number`]                  | not a pointer        | `devfn_float_type` scalar    |
//! | [`Input::Number`]                  | pointer              | array, value per instance    |
//! | [`Input::Values`] / [`Input::Array`] | any                | read-write array             |
//! | [`Input::Group`]                   | `devfn_data_struct*` | every entry, by its own name |

use std::sync::Arc;

use bon::bon;
use devfn_codegen::{AccessMode, HostArray, HostBuffer, KernelData, KernelDataManager, RESULTS_NAME};
use devfn_ir::{Function, Parameter};
use indexmap::IndexMap;
use snafu::{ResultExt, ensure};

use crate::config::{self, RuntimeInfo};
use crate::dispatch;
use crate::error::*;

/// Host value supplied for one parameter.
#[derive(Debug, Clone)]
pub enum Input {
    /// A single number.
    Number(f64),
    /// One value per instance, or a vector literal for a vector typed parameter.
    Values(Vec<f64>),
    /// Host array with one row per instance. Read-back data lands in this array.
    Array(HostArray),
    /// Already wrapped data.
    Data(KernelData),
    /// Named kernel data for a `devfn_data_struct` parameter.
    Group(IndexMap<String, KernelData>),
}

impl Input {
    /// Values of an input that squeezes to exactly three elements.
    fn vector_literal(&self) -> Option<Vec<f64>> {
        match self {
            Self::Values(values) if values.len() == 3 => Some(values.clone()),
            Self::Array(array) if array.read().len() == 3 => Some(array.to_f64()),
            _ => None,
        }
    }

    fn is_vector_literal(&self) -> bool {
        match self {
            Self::Values(values) => values.len() == 3,
            Self::Array(array) => array.read().len() == 3,
            _ => false,
        }
    }
}

impl From<f64> for Input {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<f32> for Input {
    fn from(value: f32) -> Self {
        Self::Number(value.into())
    }
}

impl From<i32> for Input {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<Vec<f64>> for Input {
    fn from(values: Vec<f64>) -> Self {
        Self::Values(values)
    }
}

impl From<&[f64]> for Input {
    fn from(values: &[f64]) -> Self {
        Self::Values(values.to_vec())
    }
}

impl From<HostArray> for Input {
    fn from(array: HostArray) -> Self {
        Self::Array(array)
    }
}

impl From<HostBuffer> for Input {
    fn from(buffer: HostBuffer) -> Self {
        Self::Array(buffer.into())
    }
}

impl From<KernelData> for Input {
    fn from(data: KernelData) -> Self {
        Self::Data(data)
    }
}

impl From<IndexMap<String, KernelData>> for Input {
    fn from(group: IndexMap<String, KernelData>) -> Self {
        Self::Group(group)
    }
}

/// Options of one [`evaluate`] call.
#[derive(Debug, Clone, Default)]
pub struct EvaluateOptions {
    instances: Option<usize>,
    use_local_reduction: bool,
    runtime_info: Option<Arc<RuntimeInfo>>,
}

#[bon]
impl EvaluateOptions {
    /// * `instances` - number of instances, inferred from the inputs when absent
    /// * `use_local_reduction` - run every instance as one workgroup
    /// * `runtime_info` - devices and settings, the process default when absent
    #[builder]
    pub fn new(
        instances: Option<usize>,
        #[builder(default)] use_local_reduction: bool,
        runtime_info: Option<Arc<RuntimeInfo>>,
    ) -> Self {
        Self { instances, use_local_reduction, runtime_info }
    }

    pub fn instances(&self) -> Option<usize> {
        self.instances
    }

    pub fn use_local_reduction(&self) -> bool {
        self.use_local_reduction
    }

    pub fn runtime_info(&self) -> Option<&Arc<RuntimeInfo>> {
        self.runtime_info.as_ref()
    }
}

/// Runs `function` once per instance over `inputs`, keyed by parameter name.
///
/// Returns the per-instance return values for non-void functions, `None` for void ones.
/// Writable [`Input::Array`] inputs receive the device results in place.
pub fn evaluate<K: Into<String>>(
    function: &Function,
    inputs: impl IntoIterator<Item = (K, Input)>,
    options: &EvaluateOptions,
) -> Result<Option<HostArray>> {
    let mut inputs: IndexMap<String, Input> = inputs.into_iter().map(|(name, input)| (name.into(), input)).collect();
    check_inputs(function, &inputs)?;

    let info = options.runtime_info.clone().unwrap_or_else(config::current);
    let instances = options.instances.unwrap_or_else(|| minimum_instances(function, &inputs));

    let mut items = IndexMap::with_capacity(inputs.len() + 1);
    for parameter in function.parameters() {
        let Some(input) = inputs.swap_remove(parameter.name()) else {
            continue;
        };
        if parameter.dtype().is_data_struct() {
            let Input::Group(group) = input else {
                return ConfigurationSnafu {
                    reason: format!("`{}` takes the data struct, pass a group of kernel data", parameter.name()),
                }
                .fail();
            };
            items.extend(group);
        } else {
            items.insert(parameter.cl_name(), wrap(parameter, input, instances)?);
        }
    }
    for name in inputs.keys() {
        tracing::debug!(function = function.name(), name = name.as_str(), "ignoring input without parameter");
    }

    if !function.is_void() {
        let results = KernelData::zeros(vec![instances], function.return_type()).context(CodegenSnafu)?;
        items.insert(RESULTS_NAME.to_string(), results);
    }

    let manager = KernelDataManager::new(items, info.precision()).context(CodegenSnafu)?;
    dispatch::apply(function, &manager, instances, options.use_local_reduction, &info)?;

    if function.is_void() {
        return Ok(None);
    }
    Ok(manager.host_data(RESULTS_NAME))
}

/// Method form of [`evaluate`].
pub trait FunctionExt {
    fn evaluate<K: Into<String>>(
        &self,
        inputs: impl IntoIterator<Item = (K, Input)>,
        options: &EvaluateOptions,
    ) -> Result<Option<HostArray>>;
}

impl FunctionExt for Function {
    fn evaluate<K: Into<String>>(
        &self,
        inputs: impl IntoIterator<Item = (K, Input)>,
        options: &EvaluateOptions,
    ) -> Result<Option<HostArray>> {
        evaluate(self, inputs, options)
    }
}

fn check_inputs(function: &Function, inputs: &IndexMap<String, Input>) -> Result<()> {
    let names: Vec<&str> = function.parameters().iter().map(Parameter::name).collect();
    let missing: Vec<&str> = names.iter().copied().filter(|name| !inputs.contains_key(*name)).collect();
    ensure!(
        missing.is_empty(),
        ConfigurationSnafu {
            reason: format!(
                "some parameters are missing an input value, required parameters are: {names:?}, missing inputs are: {missing:?}"
            )
        }
    );
    Ok(())
}

/// Largest row count among per-instance inputs, at least one.
fn minimum_instances(function: &Function, inputs: &IndexMap<String, Input>) -> usize {
    function
        .parameters()
        .iter()
        .filter_map(|parameter| {
            let input = inputs.get(parameter.name())?;
            match input {
                Input::Number(_) | Input::Group(_) => None,
                Input::Data(data) => data.rows(),
                _ if parameter.dtype().is_vector() && input.is_vector_literal() => None,
                Input::Values(values) => Some(values.len()),
                Input::Array(array) => Some(array.read().rows()),
            }
        })
        .fold(1, usize::max)
}

fn wrap(parameter: &Parameter, input: Input, instances: usize) -> Result<KernelData> {
    let dtype = parameter.dtype();
    let ctype = dtype.ctype();

    if dtype.is_vector()
        && let Some(values) = input.vector_literal()
    {
        return KernelData::typed_scalar(values, &ctype).context(CodegenSnafu);
    }

    let data = match input {
        Input::Data(data) => return Ok(data),
        Input::Number(value) if !dtype.is_pointer() => return Ok(KernelData::scalar(value)),
        Input::Number(value) => HostArray::from(vec![value; instances]),
        Input::Values(values) => HostArray::from(values),
        Input::Array(array) => array,
        Input::Group(_) => {
            return ConfigurationSnafu {
                reason: format!("group input for `{}`, which is not a data struct parameter", parameter.name()),
            }
            .fail();
        }
    };
    KernelData::array(data, &ctype, AccessMode::ReadWrite).context(CodegenSnafu)
}

//! Runtime configuration.
//!
//! [`RuntimeInfo`] carries everything an evaluation needs besides its inputs: the devices to
//! run on, the precision behind `devfn_float_type`, the load balancing strategy and the
//! compiler flags. A process-wide default is used when an evaluation does not bring its own;
//! [`config_context`] overrides it for a scope.

use std::fmt;
use std::sync::Arc;

use bon::bon;
use devfn_device::Device;
use devfn_dtype::Precision;
use indexmap::IndexMap;
use itertools::Itertools;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::balance::LoadBalancer;

/// Flags enabled unless switched off.
pub const DEFAULT_COMPILE_FLAGS: [&str; 4] =
    ["-cl-single-precision-constant", "-cl-denorms-are-zero", "-cl-mad-enable", "-cl-no-signed-zeros"];

// ============================================================================
// COMPILE FLAGS
// ============================================================================

/// Compiler flags, switched on or off globally and per function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileFlags {
    general: IndexMap<String, bool>,
    specific: IndexMap<String, IndexMap<String, bool>>,
}

impl Default for CompileFlags {
    fn default() -> Self {
        Self {
            general: DEFAULT_COMPILE_FLAGS.iter().map(|flag| (flag.to_string(), true)).collect(),
            specific: IndexMap::new(),
        }
    }
}

impl CompileFlags {
    /// No flags at all.
    pub fn empty() -> Self {
        Self { general: IndexMap::new(), specific: IndexMap::new() }
    }

    pub fn set(&mut self, flag: impl Into<String>, enabled: bool) -> &mut Self {
        self.general.insert(flag.into(), enabled);
        self
    }

    /// Overrides `flag` for the function named `function` only.
    pub fn set_for(&mut self, function: impl Into<String>, flag: impl Into<String>, enabled: bool) -> &mut Self {
        self.specific.entry(function.into()).or_default().insert(flag.into(), enabled);
        self
    }

    /// General flags merged with the overrides of `function`.
    pub fn for_function(&self, function: &str) -> IndexMap<String, bool> {
        let mut flags = self.general.clone();
        if let Some(specific) = self.specific.get(function) {
            flags.extend(specific.iter().map(|(flag, enabled)| (flag.clone(), *enabled)));
        }
        flags
    }

    /// Compiler option string for `function`: the enabled flags separated by spaces.
    pub fn options(&self, function: &str) -> String {
        self.for_function(function).into_iter().filter(|(_, enabled)| *enabled).map(|(flag, _)| flag).join(" ")
    }
}

// ============================================================================
// RUNTIME INFO
// ============================================================================

/// Devices and settings of an evaluation.
#[derive(Clone)]
pub struct RuntimeInfo {
    devices: Vec<Arc<dyn Device>>,
    precision: Precision,
    load_balancer: LoadBalancer,
    compile_flags: CompileFlags,
}

#[bon]
impl RuntimeInfo {
    #[builder]
    pub fn new(
        #[builder(default)] devices: Vec<Arc<dyn Device>>,
        #[builder(default)] precision: Precision,
        #[builder(default)] load_balancer: LoadBalancer,
        #[builder(default)] compile_flags: CompileFlags,
    ) -> Self {
        Self { devices, precision, load_balancer, compile_flags }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `DEVFN_DOUBLE=1` - Double precision `devfn_float_type` (default: single)
    /// * `DEVFN_LOAD_BALANCER` - `even`, `gpu`, `cpu` or `device:<index>` (default: even)
    ///
    /// With the `opencl` feature every OpenCL device is used, otherwise the device list is empty.
    pub fn from_env() -> Self {
        let double = std::env::var("DEVFN_DOUBLE").ok().and_then(|s| s.parse::<u8>().ok()).unwrap_or(0) > 0;
        let precision = if double { Precision::Double } else { Precision::Single };
        let load_balancer = std::env::var("DEVFN_LOAD_BALANCER").ok().and_then(|s| s.parse().ok()).unwrap_or_default();

        Self { devices: default_devices(), precision, load_balancer, compile_flags: CompileFlags::default() }
    }

    pub fn devices(&self) -> &[Arc<dyn Device>] {
        &self.devices
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn load_balancer(&self) -> &LoadBalancer {
        &self.load_balancer
    }

    pub fn compile_flags(&self) -> &CompileFlags {
        &self.compile_flags
    }

    pub fn set_devices(&mut self, devices: Vec<Arc<dyn Device>>) -> &mut Self {
        self.devices = devices;
        self
    }

    pub fn set_precision(&mut self, precision: Precision) -> &mut Self {
        self.precision = precision;
        self
    }

    pub fn set_load_balancer(&mut self, load_balancer: LoadBalancer) -> &mut Self {
        self.load_balancer = load_balancer;
        self
    }

    pub fn compile_flags_mut(&mut self) -> &mut CompileFlags {
        &mut self.compile_flags
    }
}

impl fmt::Debug for RuntimeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeInfo")
            .field("devices", &self.devices.iter().map(|device| device.name()).collect::<Vec<_>>())
            .field("precision", &self.precision)
            .field("load_balancer", &self.load_balancer)
            .field("compile_flags", &self.compile_flags)
            .finish()
    }
}

#[cfg(feature = "opencl")]
fn default_devices() -> Vec<Arc<dyn Device>> {
    match devfn_device::opencl::all_devices() {
        Ok(devices) => devices,
        Err(error) => {
            tracing::warn!(%error, "no OpenCL devices available");
            Vec::new()
        }
    }
}

#[cfg(not(feature = "opencl"))]
fn default_devices() -> Vec<Arc<dyn Device>> {
    Vec::new()
}

// ============================================================================
// PROCESS-WIDE DEFAULT
// ============================================================================

static DEFAULT: Lazy<RwLock<Arc<RuntimeInfo>>> = Lazy::new(|| RwLock::new(Arc::new(RuntimeInfo::from_env())));

/// Current default configuration.
pub fn current() -> Arc<RuntimeInfo> {
    DEFAULT.read().clone()
}

/// Replaces the default configuration and returns the previous one.
pub fn set_default(info: RuntimeInfo) -> Arc<RuntimeInfo> {
    std::mem::replace(&mut *DEFAULT.write(), Arc::new(info))
}

/// Applies `action` to a copy of the default configuration and makes the result the default
/// until the returned guard is dropped.
///
/// ```ignore
/// let _guard = config_context(|info| {
///     info.set_precision(Precision::Double);
/// });
/// ```
pub fn config_context(action: impl FnOnce(&mut RuntimeInfo)) -> ConfigGuard {
    let mut info = (*current()).clone();
    action(&mut info);
    ConfigGuard { previous: Some(set_default(info)) }
}

/// Restores the configuration replaced by [`config_context`] on drop.
#[must_use = "the previous configuration is restored when the guard is dropped"]
pub struct ConfigGuard {
    previous: Option<Arc<RuntimeInfo>>,
}

impl Drop for ConfigGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            *DEFAULT.write() = previous;
        }
    }
}

//! Load-balanced dispatch of one function over all configured devices.

use devfn_codegen::{KernelDataManager, kernel};
use devfn_device::DeviceKind;
use devfn_ir::Function;
use parking_lot::Mutex;
use snafu::{ResultExt, ensure};

use crate::balance::partition;
use crate::config::RuntimeInfo;
use crate::error::*;
use crate::worker::Worker;

/// Runs `function` for instances `[0, instances)` over the data laid out by `manager`.
///
/// The range is partitioned across the devices of `info` by its load balancer. Every device
/// with a non-empty sub-range gets its own [`Worker`]; workers compile and run concurrently and
/// this call returns once all of them are done. Read-back data is in the host arrays of
/// `manager` afterwards. The first failure of any worker fails the call.
pub fn apply(
    function: &Function,
    manager: &KernelDataManager,
    instances: usize,
    use_local_reduction: bool,
    info: &RuntimeInfo,
) -> Result<()> {
    ensure!(!info.devices().is_empty(), ConfigurationSnafu { reason: "no compute device configured" });
    ensure!(
        manager.precision() == info.precision(),
        ConfigurationSnafu {
            reason: format!(
                "kernel data laid out for {:?} precision, runtime uses {:?}",
                manager.precision(),
                info.precision()
            )
        }
    );
    manager.check_instances(instances).context(CodegenSnafu)?;

    let kernel = kernel::render(function, manager, use_local_reduction).context(CodegenSnafu)?;
    let options = info.compile_flags().options(function.name());

    let kinds: Vec<DeviceKind> = info.devices().iter().map(|device| device.kind()).collect();
    let weights = info.load_balancer().weights(&kinds)?;
    let ranges = partition(instances, &weights);

    let errors: Mutex<Vec<Error>> = Mutex::new(Vec::new());
    rayon::scope(|s| {
        for (device, range) in info.devices().iter().zip(ranges) {
            if range.is_empty() {
                continue;
            }
            let errors_ref = &errors;
            let kernel = &kernel;
            let options = options.as_str();
            s.spawn(move |_| {
                tracing::debug!(device = device.name(), start = range.start, end = range.end, "assigned sub-range");
                let result = Worker::new(device.clone(), kernel, options)
                    .and_then(|worker| worker.run(kernel, manager, instances, range));
                if let Err(e) = result {
                    errors_ref.lock().push(e);
                }
            });
        }
    });

    match errors.into_inner().into_iter().next() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

//! Load balancing across devices.
//!
//! A [`LoadBalancer`] turns the device list into one relative weight per device, and
//! [`partition`] splits the instance range `[0, n)` into one contiguous sub-range per weight.
//! Sub-ranges are pairwise disjoint and cover `[0, n)` exactly, so every instance runs on
//! exactly one device.

use std::ops::Range;
use std::str::FromStr;

use devfn_device::DeviceKind;
use snafu::ensure;

use crate::error::*;

/// Strategy assigning work to devices.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LoadBalancer {
    /// Same share for every device.
    #[default]
    EvenDistribution,

    /// Explicit relative speed per device, in device order. Empty means equal weights.
    Weighted(Vec<f64>),

    /// Only GPUs and accelerators; all devices when there are none.
    PreferGpu,

    /// Only CPUs; all devices when there are none.
    PreferCpu,

    /// Only the device at this index.
    PreferSpecific(usize),
}

impl LoadBalancer {
    /// Relative weight of every device. Zero-weight devices get no work.
    pub fn weights(&self, kinds: &[DeviceKind]) -> Result<Vec<f64>> {
        let count = kinds.len();
        let weights = match self {
            Self::EvenDistribution => vec![1.0; count],
            Self::Weighted(weights) if weights.is_empty() => vec![1.0; count],
            Self::Weighted(weights) => {
                ensure!(
                    weights.len() == count,
                    ConfigurationSnafu { reason: format!("{} load balancer weights for {count} devices", weights.len()) }
                );
                ensure!(
                    weights.iter().all(|weight| weight.is_finite() && *weight >= 0.0),
                    ConfigurationSnafu { reason: format!("load balancer weights must be finite and >= 0, got {weights:?}") }
                );
                weights.clone()
            }
            Self::PreferGpu => prefer(kinds, DeviceKind::is_gpu_like),
            Self::PreferCpu => prefer(kinds, |kind| *kind == DeviceKind::Cpu),
            Self::PreferSpecific(index) => {
                ensure!(
                    *index < count,
                    ConfigurationSnafu { reason: format!("preferred device {index} out of range for {count} devices") }
                );
                (0..count).map(|i| if i == *index { 1.0 } else { 0.0 }).collect()
            }
        };

        ensure!(
            count == 0 || weights.iter().any(|weight| *weight > 0.0),
            ConfigurationSnafu { reason: "load balancer assigns no work to any device" }
        );
        Ok(weights)
    }
}

fn prefer(kinds: &[DeviceKind], predicate: impl Fn(&DeviceKind) -> bool) -> Vec<f64> {
    if !kinds.iter().any(&predicate) {
        return vec![1.0; kinds.len()];
    }
    kinds.iter().map(|kind| if predicate(kind) { 1.0 } else { 0.0 }).collect()
}

impl FromStr for LoadBalancer {
    type Err = Error;

    /// Parses `even`, `gpu`, `cpu` or `device:<index>`.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "even" => Ok(Self::EvenDistribution),
            "gpu" => Ok(Self::PreferGpu),
            "cpu" => Ok(Self::PreferCpu),
            other => match other.strip_prefix("device:").map(str::parse) {
                Some(Ok(index)) => Ok(Self::PreferSpecific(index)),
                _ => ConfigurationSnafu { reason: format!("unknown load balancer `{s}`") }.fail(),
            },
        }
    }
}

/// Splits `[0, n)` into one contiguous range per weight, in weight order.
///
/// Zero-weight entries receive an empty range. When `n` is at least the number of positive
/// weights every such entry gets at least one instance and the rest is shared proportionally
/// (largest remainder first, ties to the lower index). Otherwise the `n` heaviest entries get
/// one instance each. If no weight is positive all entries are treated as equal.
pub fn partition(n: usize, weights: &[f64]) -> Vec<Range<usize>> {
    let mut active: Vec<(usize, f64)> =
        weights.iter().copied().enumerate().filter(|(_, weight)| *weight > 0.0).collect();
    if active.is_empty() {
        active = (0..weights.len()).map(|index| (index, 1.0)).collect();
    }

    let mut counts = vec![0usize; weights.len()];
    if n >= active.len() {
        active.iter().for_each(|(index, _)| counts[*index] = 1);

        let rest = n - active.len();
        let total: f64 = active.iter().map(|(_, weight)| weight).sum();
        let mut assigned = 0;
        let mut remainders = Vec::with_capacity(active.len());
        for &(index, weight) in &active {
            let quota = rest as f64 * weight / total;
            let whole = (quota.floor() as usize).min(rest - assigned);
            counts[index] += whole;
            assigned += whole;
            remainders.push((index, quota - quota.floor()));
        }

        // Stable sort keeps lower indices first among equal remainders.
        remainders.sort_by(|a, b| b.1.total_cmp(&a.1));
        for (index, _) in remainders.iter().cycle().take(rest - assigned) {
            counts[*index] += 1;
        }
    } else {
        active.sort_by(|a, b| b.1.total_cmp(&a.1));
        active.iter().take(n).for_each(|(index, _)| counts[*index] = 1);
    }

    let mut start = 0;
    counts
        .into_iter()
        .map(|count| {
            let range = start..start + count;
            start += count;
            range
        })
        .collect()
}

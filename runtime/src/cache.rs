//! Global compiled program cache.
//!
//! Maps (device, kernel source + compiler options) to the program compiled for it. Uses
//! papaya's lock-free HashMap, so workers of concurrent evaluations look up and insert
//! without explicit locking.
//!
//! The key uses [`Device::cache_key`], never the display name: two devices with the same
//! name must not share programs.
//!
//! Entries are never dropped on their own. Long-running callers that retire a device call
//! [`evict_device`]; [`clear_all`] drops everything.

use std::sync::{Arc, OnceLock};

use devfn_device::{Device, Program, ProgramSpec};
use papaya::HashMap;
use xxhash_rust::xxh64::Xxh64;

/// A compiled program and what it was built from.
pub struct CachedProgram {
    pub program: Arc<dyn Program>,
    /// Cache key of the device it was built for.
    pub device: String,
    pub source: String,
    pub options: String,
}

/// Cache key: (device cache key, xxh64 of source and options).
type ProgramKey = (String, u64);

static PROGRAMS: OnceLock<HashMap<ProgramKey, Arc<CachedProgram>>> = OnceLock::new();

fn programs() -> &'static HashMap<ProgramKey, Arc<CachedProgram>> {
    PROGRAMS.get_or_init(HashMap::new)
}

fn source_hash(source: &str, options: &str) -> u64 {
    let mut hasher = Xxh64::new(0);
    hasher.update(source.as_bytes());
    hasher.update(&[0]);
    hasher.update(options.as_bytes());
    hasher.digest()
}

/// Get or compile `spec` with `options` on `device`.
///
/// If several threads miss on the same key concurrently each compiles, the first insert wins
/// and everyone gets that program.
pub fn get_or_compile(
    device: &dyn Device,
    spec: &ProgramSpec,
    options: &str,
) -> devfn_device::Result<Arc<CachedProgram>> {
    let key = (device.cache_key(), source_hash(&spec.source, options));
    let map = programs();
    let guard = map.guard();

    if let Some(cached) = map.get(&key, &guard) {
        tracing::debug!(device = device.name(), kernel = spec.name.as_str(), "program cache hit");
        return Ok(Arc::clone(cached));
    }

    tracing::debug!(
        device = device.name(),
        kernel = spec.name.as_str(),
        source_len = spec.source.len(),
        options,
        "compiling program"
    );
    let cached = Arc::new(CachedProgram {
        program: device.compile(spec, options)?,
        device: key.0.clone(),
        source: spec.source.clone(),
        options: options.to_string(),
    });

    use papaya::{Compute, Operation};
    match map.compute(
        key,
        |entry| match entry {
            Some((_, existing)) => Operation::Abort(Arc::clone(existing)),
            None => Operation::Insert(Arc::clone(&cached)),
        },
        &guard,
    ) {
        Compute::Inserted(_, program) => Ok(Arc::clone(program)),
        Compute::Aborted(program) => Ok(program),
        _ => Ok(cached),
    }
}

/// Drops every cached program.
pub fn clear_all() {
    let guard = programs().guard();
    programs().clear(&guard);
}

/// Number of programs cached for `device`.
pub fn programs_for(device: &dyn Device) -> usize {
    let key = device.cache_key();
    let guard = programs().guard();
    programs().iter(&guard).filter(|((device, _), _)| *device == key).count()
}

/// Drops every program compiled for `device`, returning how many were removed.
pub fn evict_device(device: &dyn Device) -> usize {
    let key = device.cache_key();
    let map = programs();
    let guard = map.guard();

    // Collect first, the map can't be mutated while iterating.
    let stale: Vec<ProgramKey> =
        map.iter(&guard).filter(|((device, _), _)| *device == key).map(|(k, _)| k.clone()).collect();
    for k in &stale {
        map.remove(k, &guard);
    }

    tracing::debug!(device = device.name(), removed = stale.len(), "evicted device programs");
    stale.len()
}

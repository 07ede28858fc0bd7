//! Offline latency profile table for skip-join priority assignment.
//!
//! When `use_skip_join` is enabled, a newly arriving request's starting
//! priority is estimated from a profile of prompt-phase latencies keyed
//! by `(pipeline_parallel, tensor_parallel, batch_size, beam_width,
//! input_len)`, rather than always starting at priority 0. The
//! reference implementation disables this path (the profiling database
//! load is commented out) and notes it "needs profiling results"; per
//! the distilled spec's open question, this crate implements the table
//! as a real, working lookup and falls back to priority 0 when no entry
//! matches, since the profile may legitimately be absent or incomplete.

use std::collections::HashMap;
use std::time::Duration;

/// Key identifying one profiled configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProfileKey {
    /// Pipeline-parallel degree.
    pub pipeline_parallel: u32,
    /// Tensor-parallel degree.
    pub tensor_parallel: u32,
    /// Batch size the profile was collected at.
    pub batch_size: usize,
    /// Beam width (or `best_of` for parallel sampling).
    pub beam_width: usize,
    /// Prompt length in tokens.
    pub input_len: usize,
}

/// An offline table of measured prompt-phase latencies.
#[derive(Debug, Clone, Default)]
pub struct ProfileTable {
    entries: HashMap<ProfileKey, Duration>,
}

impl ProfileTable {
    /// An empty table — every lookup misses, so skip-join falls back to
    /// priority 0 for every request.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Insert a measured latency for a configuration.
    pub fn insert(&mut self, key: ProfileKey, latency: Duration) {
        self.entries.insert(key, latency);
    }

    /// Estimated prompt-phase latency for `key`, if profiled.
    #[must_use]
    pub fn latency(&self, key: &ProfileKey) -> Option<Duration> {
        self.entries.get(key).copied()
    }

    /// Number of profiled entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Estimate the starting priority for a request of the given profile
/// shape: the smallest `p` such that `base_quantum * threshold^p >=
/// estimated_latency`. Returns `0` when the table has no matching
/// entry.
#[must_use]
pub fn estimate_priority(
    table: &ProfileTable,
    key: &ProfileKey,
    base_quantum: Duration,
    threshold: u32,
) -> u32 {
    let Some(latency) = table.latency(key) else {
        return 0;
    };
    let mut priority: u32 = 0;
    let mut quantum = base_quantum;
    while quantum < latency && priority < 63 {
        priority += 1;
        quantum = base_quantum.saturating_mul(threshold.saturating_pow(priority));
    }
    priority
}

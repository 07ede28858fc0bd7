//! Scheduler counters for dashboard export.
//!
//! Lock-free `AtomicU64` counters incremented on the scheduling hot
//! path, read only on export — the same design the wider corpus uses
//! for its own runtime metrics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of cumulative scheduler activity since startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Requests admitted into a prompt-phase batch.
    pub admitted: u64,
    /// Requests preempted (either mode).
    pub preempted: u64,
    /// Preemptions that used swap (as opposed to recompute).
    pub preempted_by_swap: u64,
    /// Preemptions that used recompute.
    pub preempted_by_recompute: u64,
    /// Requests swapped back in.
    pub swapped_in: u64,
    /// Requests demoted a priority level by the feedback policy.
    pub demoted: u64,
    /// Requests promoted to priority 0 by the starvation guard.
    pub starvation_promoted: u64,
    /// Requests rejected at admission (oversized or `NEVER`).
    pub ignored: u64,
    /// Requests aborted by the caller.
    pub aborted: u64,
}

/// Atomic counters for scheduler activity.
#[derive(Debug, Default)]
pub struct SchedulerMetrics {
    admitted: AtomicU64,
    preempted_by_swap: AtomicU64,
    preempted_by_recompute: AtomicU64,
    swapped_in: AtomicU64,
    demoted: AtomicU64,
    starvation_promoted: AtomicU64,
    ignored: AtomicU64,
    aborted: AtomicU64,
}

impl SchedulerMetrics {
    /// Zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_admitted(&self, count: u64) {
        self.admitted.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_preempted_by_swap(&self) {
        self.preempted_by_swap.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_preempted_by_recompute(&self) {
        self.preempted_by_recompute.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_swapped_in(&self, count: u64) {
        self.swapped_in.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_demoted(&self, count: u64) {
        self.demoted.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_starvation_promoted(&self, count: u64) {
        self.starvation_promoted.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_ignored(&self, count: u64) {
        self.ignored.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_aborted(&self, count: u64) {
        self.aborted.fetch_add(count, Ordering::Relaxed);
    }

    /// Read a point-in-time snapshot of every counter.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let preempted_by_swap = self.preempted_by_swap.load(Ordering::Relaxed);
        let preempted_by_recompute = self.preempted_by_recompute.load(Ordering::Relaxed);
        MetricsSnapshot {
            admitted: self.admitted.load(Ordering::Relaxed),
            preempted: preempted_by_swap + preempted_by_recompute,
            preempted_by_swap,
            preempted_by_recompute,
            swapped_in: self.swapped_in.load(Ordering::Relaxed),
            demoted: self.demoted.load(Ordering::Relaxed),
            starvation_promoted: self.starvation_promoted.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            aborted: self.aborted.load(Ordering::Relaxed),
        }
    }
}

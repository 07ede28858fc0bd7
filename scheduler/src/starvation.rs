//! Starvation Guard (§4.7) — periodically promotes requests that have
//! waited longer than the starvation threshold to priority 0.

use std::collections::VecDeque;
use std::time::Instant;

use tracing::debug;

use crate::ladder::PriorityLadder;
use crate::scheduler::MlfqScheduler;
use crate::types::Request;

impl MlfqScheduler {
    /// Sweep both the waiting and swapped ladders, promoting any
    /// request that has sat past `starvation_threshold` to priority 0
    /// and the front of its new queue. Runs every `starvation_period`
    /// completed `schedule()` calls (§4.3).
    pub(crate) fn run_starvation_guard(&mut self, now: Instant) {
        let threshold = self.config.starvation_threshold();
        let promoted_waiting = promote_starved(&mut self.waiting, now, threshold);
        let promoted_swapped = promote_starved(&mut self.swapped, now, threshold);
        let total = promoted_waiting + promoted_swapped;
        if total > 0 {
            debug!(promoted = total, "starvation guard promoted requests to priority 0");
            self.metrics.record_starvation_promoted(total as u64);
        }
    }
}

/// Drain every per-priority queue, splitting requests older than
/// `threshold` out into a promotion batch while restoring the rest in
/// their original order, then push the promoted batch to the front at
/// priority 0. Returns the number of requests promoted.
fn promote_starved(ladder: &mut PriorityLadder, now: Instant, threshold: std::time::Duration) -> usize {
    let mut promoted: Vec<Request> = Vec::new();
    let mut keep: VecDeque<Request> = VecDeque::new();

    for mut request in ladder.drain_all() {
        if now.duration_since(request.arrival_time) >= threshold {
            request.priority = 0;
            promoted.push(request);
        } else {
            keep.push_back(request);
        }
    }
    for request in keep {
        ladder.push_back(request);
    }

    let count = promoted.len();
    // Pushing to the front one at a time inverts order, so walk the
    // promotion batch back-to-front: the earliest-popped request ends up
    // pushed last and lands at the very head, preserving pop order.
    for request in promoted.into_iter().rev() {
        ladder.push_front(request);
    }
    count
}

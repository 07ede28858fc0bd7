//! Request State Registry — answers "which pool is this request in?"
//!
//! The scheduler itself owns the waiting ladder, running deque, and
//! swapped ladder directly (there is no separate owning structure
//! duplicating that state). This module is the thin queryable facade
//! over those three pools that the distilled spec names as its own
//! component: it never stores anything, it only looks.

use crate::ladder::PriorityLadder;
use crate::types::{Request, RequestId};
use std::collections::VecDeque;

/// Which of the four pools a request currently occupies.
///
/// Invariant: a request occupies exactly one of these at any time.
/// `Finished` is not tracked by the registry directly — once a request
/// leaves waiting/running/swapped with every sequence finished, it is
/// simply no longer present in any pool, so `locate` returning `None`
/// for a previously-seen id means "finished or never existed".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestLocation {
    /// Queued in the waiting priority ladder.
    Waiting,
    /// Resident in the running deque.
    Running,
    /// Queued in the swapped priority ladder.
    Swapped,
}

/// Locate `id` across the three live pools. Returns `None` if the
/// request is not present in any of them (finished, aborted, or
/// unknown).
#[must_use]
pub fn locate(
    waiting: &PriorityLadder,
    running: &VecDeque<Request>,
    swapped: &PriorityLadder,
    id: &RequestId,
) -> Option<RequestLocation> {
    if waiting.contains(id) {
        return Some(RequestLocation::Waiting);
    }
    if running.iter().any(|r| &r.request_id == id) {
        return Some(RequestLocation::Running);
    }
    if swapped.contains(id) {
        return Some(RequestLocation::Swapped);
    }
    None
}

/// Total number of requests still tracked by the scheduler (not yet
/// fully finished): the sum of the waiting ladder, running deque, and
/// swapped ladder lengths.
#[must_use]
pub fn count_unfinished(waiting: &PriorityLadder, running: &VecDeque<Request>, swapped: &PriorityLadder) -> usize {
    waiting.len() + running.len() + swapped.len()
}

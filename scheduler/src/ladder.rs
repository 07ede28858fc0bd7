//! Priority Ladder — an ordered array of FIFO queues indexed by integer
//! priority, used for both the waiting pool and the swapped pool.
//!
//! Invariant: a request in `queues[i]` always has `priority == i`.
//! Priority is never mutated while a request is enqueued — every
//! priority change is a remove followed by a reinsertion, enforced by
//! only ever exposing whole-request push/pop operations.

use std::collections::VecDeque;

use crate::types::{Request, RequestId};

/// An ordered array of per-priority FIFO queues.
///
/// New priority levels are appended lazily as they're first needed;
/// the ladder never shrinks (an emptied queue at a low priority is left
/// in place rather than removed, since it is likely to be reused).
#[derive(Debug, Default)]
pub struct PriorityLadder {
    queues: Vec<VecDeque<Request>>,
}

impl PriorityLadder {
    /// Create an empty ladder.
    #[must_use]
    pub fn new() -> Self {
        Self { queues: Vec::new() }
    }

    fn ensure_queue(&mut self, priority: u32) {
        let priority = priority as usize;
        if priority >= self.queues.len() {
            self.queues.resize_with(priority + 1, VecDeque::new);
        }
    }

    /// Append `request` to the back of its priority's queue.
    pub fn push_back(&mut self, request: Request) {
        self.ensure_queue(request.priority);
        self.queues[request.priority as usize].push_back(request);
    }

    /// Prepend `request` to the front of its priority's queue.
    pub fn push_front(&mut self, request: Request) {
        self.ensure_queue(request.priority);
        self.queues[request.priority as usize].push_front(request);
    }

    /// Remove and return the head of the lowest non-empty priority
    /// queue (lowest priority number is served first), or `None` if the
    /// ladder is empty.
    pub fn pop_front(&mut self) -> Option<Request> {
        for queue in &mut self.queues {
            if let Some(request) = queue.pop_front() {
                return Some(request);
            }
        }
        None
    }

    /// Peek at the head of the lowest non-empty priority queue without
    /// removing it.
    #[must_use]
    pub fn peek_front(&self) -> Option<&Request> {
        self.queues.iter().find_map(|q| q.front())
    }

    /// Prepend a batch of requests, each to the front of its own
    /// priority queue, preserving the incoming order — the first
    /// element of `requests` ends up at the very head of its queue.
    ///
    /// Implemented by iterating front-to-back and pushing each
    /// individually to the front of its priority's queue: processing
    /// later elements last means they end up closer to the front,
    /// which inverts `requests`' order within a shared priority level.
    /// Combined with callers building that batch via repeated
    /// `push_front` while *skipping* requests during a scan (which
    /// itself reverses encounter order), the two reversals cancel out
    /// and restore original encounter order. See `admission` and
    /// `swap_in` for the matching accumulation pattern.
    pub fn extend_front(&mut self, requests: VecDeque<Request>) {
        for request in requests {
            self.push_front(request);
        }
    }

    /// Remove the first request found with the given id, scanning
    /// queues from lowest to highest priority. At most one match is
    /// removed.
    pub fn remove_by_id(&mut self, id: &str) -> Option<Request> {
        for queue in &mut self.queues {
            if let Some(pos) = queue.iter().position(|r| r.request_id == id) {
                return queue.remove(pos);
            }
        }
        None
    }

    /// Total number of requests across all priority levels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }

    /// Whether the ladder holds no requests.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queues.iter().all(VecDeque::is_empty)
    }

    /// Count of requests at the lowest non-empty priority level plus the
    /// next `window - 1` levels. Used by admission-style heuristics that
    /// want to know how much work sits near the front of the ladder.
    #[must_use]
    pub fn top_window_count(&self, window: usize) -> usize {
        let Some(lowest) = self.queues.iter().position(|q| !q.is_empty()) else {
            return 0;
        };
        self.queues[lowest..]
            .iter()
            .take(window.max(1))
            .map(VecDeque::len)
            .sum()
    }

    /// Iterate over every request currently in the ladder, lowest
    /// priority first, for diagnostics and invariant checks.
    pub fn iter(&self) -> impl Iterator<Item = &Request> {
        self.queues.iter().flat_map(VecDeque::iter)
    }

    /// Check the ladder invariant: every request in `queues[i]` has
    /// `priority == i`. Exposed for tests and debug assertions, not
    /// used on the hot path.
    #[must_use]
    pub fn check_invariant(&self) -> bool {
        self.queues
            .iter()
            .enumerate()
            .all(|(i, q)| q.iter().all(|r| r.priority as usize == i))
    }

    /// Find a request by id without removing it.
    #[must_use]
    pub fn contains(&self, id: &RequestId) -> bool {
        self.queues.iter().any(|q| q.iter().any(|r| &r.request_id == id))
    }

    /// Remove and return every request currently held, lowest priority
    /// first, emptying every queue. Used by the starvation guard, which
    /// needs to re-partition the whole ladder in one pass.
    pub fn drain_all(&mut self) -> Vec<Request> {
        self.queues.iter_mut().flat_map(|q| q.drain(..)).collect()
    }
}

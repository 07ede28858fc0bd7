//! The block-space manager contract.
//!
//! The block manager is an external collaborator: it is the single
//! arbiter of KV-cache capacity and answers every allocation/swap/copy
//! question the scheduler asks. This crate only defines the contract;
//! production callers supply a real implementation backed by their GPU
//! and host memory pools. `tests/common` provides a fake used by this
//! crate's own integration tests.

use std::collections::HashMap;

use crate::types::{Request, SequenceId};

/// Identifier for a single KV-cache block, device or host.
pub type BlockId = u64;

/// Outcome of asking whether a request's prompt can be admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocStatus {
    /// Blocks are available now.
    Ok,
    /// Blocks are not available now but may be later; the caller should
    /// stop trying to admit further requests this iteration rather than
    /// skip past this one (head-of-line blocking by design).
    Later,
    /// The request can never be allocated (e.g. it would require more
    /// blocks than the device could ever provide).
    Never,
}

/// The block-space manager contract.
///
/// Capacity answers must be consistent across a single `schedule()`
/// call — no concurrent mutation from outside the scheduler is
/// permitted while a call is in progress, since the scheduler is
/// single-threaded and cooperative and never re-checks a prior answer.
pub trait BlockManager {
    /// Can `request`'s prompt be allocated device blocks right now?
    fn can_allocate(&self, request: &Request) -> AllocStatus;

    /// Allocate device blocks for `request`'s prompt sequence.
    fn allocate(&mut self, request: &Request);

    /// Can every RUNNING sequence of `request` be given one more token
    /// slot without exceeding device capacity?
    fn can_append_slot(&self, request: &Request) -> bool;

    /// Reserve the next token slot for `seq_id` within `request`,
    /// optionally returning a copy-on-write directive
    /// `(src_block, dst_block)` when a shared prefix block had to be
    /// forked.
    fn append_slot(&mut self, request_id: &str, seq_id: SequenceId) -> Option<(BlockId, BlockId)>;

    /// Can `request` be swapped back in from host memory right now?
    fn can_swap_in(&self, request: &Request) -> bool;

    /// Swap `request`'s blocks from host to device, returning the
    /// host-block → device-block mapping.
    fn swap_in(&mut self, request: &Request) -> HashMap<BlockId, BlockId>;

    /// Can `request` be swapped out to host memory right now?
    fn can_swap_out(&self, request: &Request) -> bool;

    /// Swap `request`'s blocks from device to host, returning the
    /// device-block → host-block mapping.
    fn swap_out(&mut self, request: &Request) -> HashMap<BlockId, BlockId>;

    /// Free all blocks held by a single sequence (e.g. on completion,
    /// abort, or recompute-preemption).
    fn free(&mut self, request_id: &str, seq_id: SequenceId);

    /// Record that `child` forks its block table from `parent` (e.g.
    /// beam-search branching).
    fn fork(&mut self, request_id: &str, parent: SequenceId, child: SequenceId);

    /// Mark every block of `seq_id` as accessed at `now`, for LRU/cache
    /// bookkeeping.
    fn access_all_blocks_in_seq(&mut self, request_id: &str, seq_id: SequenceId, now: std::time::Instant);

    /// Current device block table for a RUNNING sequence.
    fn get_block_table(&self, request_id: &str, seq_id: SequenceId) -> Vec<BlockId>;

    /// Prefix-cache hint: block ids common to every sequence in
    /// `request` that are already computed.
    fn get_common_computed_block_ids(&self, request: &Request) -> Vec<BlockId>;

    /// Mark `request`'s currently-computed blocks as computed, for
    /// prefix-cache bookkeeping.
    fn mark_blocks_as_computed(&mut self, request: &Request);
}

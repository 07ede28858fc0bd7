//! The per-iteration schedule plan handed to the executor.

use std::collections::HashMap;

use crate::block_manager::BlockId;
use crate::types::{Request, RequestId, SamplingParams, SequenceId};

/// Immutable record of what a single `schedule()` call decided.
///
/// Invariant: `blocks_to_swap_in` and `blocks_to_swap_out` are never
/// both non-empty — a single iteration either admits/continues/swaps-in
/// requests, or preempts by swapping out, never both (the swap-in
/// controller only runs when no preemption happened this iteration).
#[derive(Debug, Clone, Default)]
pub struct SchedulePlan {
    /// Requests to execute this step, in execution order. When
    /// adapters are in use this is stably sorted by `(adapter_id,
    /// request_id)`.
    pub scheduled: Vec<Request>,
    /// Whether this iteration is a prompt-admission (prefill) step, as
    /// opposed to a decode step.
    pub is_prompt_phase: bool,
    /// Total tokens the executor must process this step: for a prompt
    /// plan, `scheduled.len() * max(prompt_lens)` (rectangular padding);
    /// for a decode plan, the number of RUNNING sequences.
    pub num_batched_tokens: usize,
    /// Host block → device block, populated only on swap-in.
    pub blocks_to_swap_in: HashMap<BlockId, BlockId>,
    /// Device block → host block, populated only on swap-out.
    pub blocks_to_swap_out: HashMap<BlockId, BlockId>,
    /// Copy-on-write directives: source device block → destination
    /// device blocks.
    pub blocks_to_copy: HashMap<BlockId, Vec<BlockId>>,
    /// Requests rejected this iteration (oversized prompt, block
    /// manager `NEVER` verdict). Never double-counted in `scheduled`.
    pub ignored: Vec<Request>,
}

impl SchedulePlan {
    /// A plan with nothing scheduled, ignored, or moved — used as the
    /// base before a phase fills it in.
    #[must_use]
    pub fn empty(is_prompt_phase: bool) -> Self {
        Self {
            is_prompt_phase,
            ..Self::default()
        }
    }

    /// Whether this plan has no scheduled work, block movement, or
    /// ignored requests.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scheduled.is_empty()
            && self.ignored.is_empty()
            && self.blocks_to_swap_in.is_empty()
            && self.blocks_to_swap_out.is_empty()
            && self.blocks_to_copy.is_empty()
    }

    /// Stably sort `scheduled` by `(adapter_id, request_id)`, as
    /// required whenever adapters are enabled.
    pub fn sort_by_adapter(&mut self) {
        self.scheduled
            .sort_by(|a, b| (a.adapter_int_id(), &a.request_id).cmp(&(b.adapter_int_id(), &b.request_id)));
    }
}

/// Per-request metadata handed to the executor alongside a
/// [`SchedulePlan`]: token data locations, block tables, and sampling
/// configuration for each scheduled request.
#[derive(Debug, Clone)]
pub struct SequenceMetadata {
    /// Which request this metadata describes.
    pub request_id: RequestId,
    /// Whether this is a prompt (prefill) step for the request.
    pub is_prompt: bool,
    /// Sequence ids with RUNNING status, paired with their current
    /// device block table.
    pub block_tables: HashMap<SequenceId, Vec<BlockId>>,
    /// Sampling parameters to use for this step's generation.
    pub sampling_params: SamplingParams,
    /// Adapter handle, if any.
    pub adapter_id: Option<u32>,
    /// Prefix-cache hint: block ids already known to be computed.
    pub computed_block_ids: Vec<BlockId>,
}

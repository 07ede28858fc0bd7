//! The Iteration Orchestrator: ties the priority ladder, admission
//! controller, preemption engine, swap-in controller, demotion policy,
//! and starvation guard into a single `schedule()` step.

use std::collections::VecDeque;
use std::time::Instant;

use tracing::{debug, instrument, warn};

use crate::block_manager::BlockManager;
use crate::config::{CacheConfig, SchedulerConfig};
use crate::error::{Result, SchedulerError};
use crate::ladder::PriorityLadder;
use crate::metrics::SchedulerMetrics;
use crate::plan::{SchedulePlan, SequenceMetadata};
use crate::profile::{self, ProfileKey, ProfileTable};
use crate::registry::{self, RequestLocation};
use crate::types::{Request, RequestId, SequenceStatus};

/// The MLFQ scheduler: the core decision-making component of a batched
/// LLM inference server.
///
/// Single-threaded and cooperative (§5): no operation here suspends or
/// blocks, and `schedule()` is synchronous. Callers needing shared
/// access across threads wrap an `MlfqScheduler` themselves; the crate
/// does not impose a locking strategy.
pub struct MlfqScheduler {
    pub(crate) config: SchedulerConfig,
    pub(crate) cache_config: CacheConfig,
    pub(crate) block_manager: Box<dyn BlockManager>,
    pub(crate) profile_table: Option<ProfileTable>,

    pub(crate) waiting: PriorityLadder,
    pub(crate) running: VecDeque<Request>,
    pub(crate) swapped: PriorityLadder,

    pub(crate) iteration_num: u64,
    pub(crate) metrics: SchedulerMetrics,
}

impl MlfqScheduler {
    /// Construct a new scheduler. `profile_table` is consulted only
    /// when `config.use_skip_join` is set; pass `None` to always start
    /// requests at priority 0 regardless of the config flag.
    #[must_use]
    pub fn new(
        config: SchedulerConfig,
        cache_config: CacheConfig,
        block_manager: Box<dyn BlockManager>,
        profile_table: Option<ProfileTable>,
    ) -> Self {
        Self {
            config,
            cache_config,
            block_manager,
            profile_table,
            waiting: PriorityLadder::new(),
            running: VecDeque::new(),
            swapped: PriorityLadder::new(),
            iteration_num: 0,
            metrics: SchedulerMetrics::new(),
        }
    }

    /// Read-only access to the scheduler's configuration.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Read-only access to the cache configuration.
    #[must_use]
    pub fn cache_config(&self) -> &CacheConfig {
        &self.cache_config
    }

    /// Current scheduler metrics.
    #[must_use]
    pub fn metrics(&self) -> &SchedulerMetrics {
        &self.metrics
    }

    /// Number of completed `schedule()` calls.
    #[must_use]
    pub fn iteration_num(&self) -> u64 {
        self.iteration_num
    }

    /// Read-only view of the waiting priority ladder, for diagnostics
    /// and tests.
    #[must_use]
    pub fn waiting(&self) -> &PriorityLadder {
        &self.waiting
    }

    /// Read-only view of the running deque, for diagnostics and tests.
    #[must_use]
    pub fn running(&self) -> &VecDeque<Request> {
        &self.running
    }

    /// Read-only view of the swapped priority ladder, for diagnostics
    /// and tests.
    #[must_use]
    pub fn swapped(&self) -> &PriorityLadder {
        &self.swapped
    }

    // -- Request ingestion (§4.2) ------------------------------------

    /// Admit a newly-arrived request into the waiting pool.
    ///
    /// When `use_skip_join` is enabled, the starting priority is
    /// estimated from the offline profile table; otherwise (or when no
    /// profile table was supplied) every request starts at priority 0.
    #[instrument(skip(self, request), fields(request_id = %request.request_id))]
    pub fn add_request(&mut self, mut request: Request) {
        request.priority = if self.config.use_skip_join {
            self.estimate_skip_join_priority(&request)
        } else {
            0
        };
        debug!(priority = request.priority, "admitting request into waiting pool");
        self.waiting.push_back(request);
    }

    fn estimate_skip_join_priority(&self, request: &Request) -> u32 {
        let Some(table) = &self.profile_table else {
            return 0;
        };
        let beam_width = if request.sampling_params.use_beam_search {
            request.sampling_params.best_of
        } else {
            1
        };
        let key = ProfileKey {
            pipeline_parallel: 1,
            tensor_parallel: 1,
            batch_size: self.config.max_batch_size,
            beam_width,
            input_len: request.input_len(),
        };
        profile::estimate_priority(table, &key, self.config.base_quantum(), self.config.threshold)
    }

    /// Abort one or more requests by id.
    ///
    /// Checks the running deque first (freeing any unfinished sequence
    /// as `FINISHED_ABORTED`), then falls back to the waiting and
    /// swapped ladders. O(total requests); completes before the caller
    /// may observe any subsequent `schedule()` call. Aborted requests
    /// never appear in a later plan.
    pub fn abort_request(&mut self, ids: impl IntoIterator<Item = RequestId>) {
        for id in ids {
            if let Some(pos) = self.running.iter().position(|r| r.request_id == id) {
                let mut request = self.running.remove(pos).expect("position just found");
                for seq in &mut request.sequences {
                    if !seq.status.is_finished() {
                        seq.status = SequenceStatus::FinishedAborted;
                        self.block_manager.free(&request.request_id, seq.id);
                    }
                }
                self.metrics.record_aborted(1);
                continue;
            }
            if self.waiting.remove_by_id(&id).is_some() {
                self.metrics.record_aborted(1);
                continue;
            }
            if self.swapped.remove_by_id(&id).is_some() {
                self.metrics.record_aborted(1);
            }
        }
    }

    // -- Iteration orchestrator (§4.3) -------------------------------

    /// Run one scheduling iteration, producing the plan the executor
    /// should run next.
    ///
    /// Attempts the prompt-admission phase first; if it admitted or
    /// ignored nothing, falls through to the decode phase (preemption +
    /// swap-in) within the same call. Exactly one `SchedulePlan` comes
    /// out. `iteration_num` is incremented exactly once per call
    /// regardless of how many phases ran, and the starvation guard runs
    /// at most once, gated on the post-increment count being a multiple
    /// of `starvation_period`.
    #[instrument(skip(self))]
    pub fn schedule(&mut self) -> Result<SchedulePlan> {
        let now = Instant::now();

        let mut plan = if self.should_run_admission_phase() {
            let admission_plan = self.run_admission_phase(now)?;
            if admission_plan.scheduled.is_empty() && admission_plan.ignored.is_empty() {
                self.run_decode_phase(now)?
            } else {
                admission_plan
            }
        } else {
            self.run_decode_phase(now)?
        };

        self.iteration_num += 1;
        self.maybe_run_starvation_guard(now);
        if self.config.adapters_enabled() {
            plan.sort_by_adapter();
        }
        Ok(plan)
    }

    /// Decide whether this iteration should attempt prompt admission.
    ///
    /// Condition (§4.3): the swapped pool is empty, or the waiting
    /// head dominates the swapped head — `waiting.priority >=
    /// swapped.priority` AND `waiting.arrival_time <=
    /// swapped.arrival_time`. The `>=` on priority is intentional: ties
    /// go to the waiting queue, so new work at least as high priority
    /// and no newer than the swapped work is admitted first.
    fn should_run_admission_phase(&self) -> bool {
        if self.swapped.is_empty() {
            return true;
        }
        let (Some(waiting_head), Some(swapped_head)) =
            (self.waiting.peek_front(), self.swapped.peek_front())
        else {
            return false;
        };
        waiting_head.priority >= swapped_head.priority
            && waiting_head.arrival_time <= swapped_head.arrival_time
    }

    fn maybe_run_starvation_guard(&mut self, now: Instant) {
        if self.iteration_num % self.config.starvation_period == 0 {
            self.run_starvation_guard(now);
        }
    }

    /// Build the per-request `SequenceMetadata` the executor consumes
    /// alongside `plan` (§6): block tables for every RUNNING sequence,
    /// sampling parameters, adapter handle, and the prefix-cache hint.
    ///
    /// Also performs the bookkeeping the original does in the same
    /// metadata-assembly pass: stamps `first_scheduled_time` on each
    /// scheduled request's live entry in `running` the first time it is
    /// ever seen here, and tells the block manager every RUNNING
    /// sequence was just touched (LRU/cache accounting).
    ///
    /// Queries the block manager directly rather than caching block
    /// tables from `schedule()` itself — they can change shape between
    /// the scheduling decision and the executor reading them back (e.g.
    /// a copy-on-write fork just recorded in `blocks_to_copy`).
    pub fn sequence_metadata(&mut self, plan: &SchedulePlan) -> Vec<SequenceMetadata> {
        let now = std::time::SystemTime::now();
        for request in &mut self.running {
            if plan.scheduled.iter().any(|r| r.request_id == request.request_id) {
                request.maybe_set_first_scheduled_time(now);
            }
        }

        for scheduled in &plan.scheduled {
            for seq in scheduled.seqs_with_status(SequenceStatus::Running) {
                self.block_manager
                    .access_all_blocks_in_seq(&scheduled.request_id, seq.id, Instant::now());
            }
        }

        plan.scheduled
            .iter()
            .map(|request| {
                let block_tables = request
                    .seqs_with_status(SequenceStatus::Running)
                    .map(|seq| {
                        let table = self.block_manager.get_block_table(&request.request_id, seq.id);
                        (seq.id, table)
                    })
                    .collect();
                SequenceMetadata {
                    request_id: request.request_id.clone(),
                    is_prompt: plan.is_prompt_phase,
                    block_tables,
                    sampling_params: request.sampling_params.clone(),
                    adapter_id: request.adapter_id,
                    computed_block_ids: self.block_manager.get_common_computed_block_ids(request),
                }
            })
            .collect()
    }

    // -- Derived utilities (§4.9) -------------------------------------

    /// Delegate a beam-search fork to the block manager.
    pub fn fork_seq(&mut self, request_id: &str, parent: crate::types::SequenceId, child: crate::types::SequenceId) {
        self.block_manager.fork(request_id, parent, child);
    }

    /// Delegate freeing a single sequence's blocks to the block
    /// manager.
    pub fn free_seq(&mut self, request_id: &str, seq_id: crate::types::SequenceId) {
        self.block_manager.free(request_id, seq_id);
    }

    /// Delegate prefix-cache bookkeeping to the block manager.
    pub fn mark_computed(&mut self, request: &Request) {
        self.block_manager.mark_blocks_as_computed(request);
    }

    /// Where is `id` right now? `None` means finished, aborted, or
    /// unknown.
    #[must_use]
    pub fn locate(&self, id: &RequestId) -> Option<RequestLocation> {
        registry::locate(&self.waiting, &self.running, &self.swapped, id)
    }

    /// True iff any of the waiting, running, or swapped pools holds a
    /// request — i.e. there is still work for the executor to do.
    ///
    /// The reference implementation's `has_unfinished_seqs` only checks
    /// `waiting`, which silently ignores running and swapped requests;
    /// this crate implements the corrected, documented behavior from
    /// the distilled spec instead (see `DESIGN.md`).
    #[must_use]
    pub fn has_unfinished(&self) -> bool {
        !self.waiting.is_empty() || !self.running.is_empty() || !self.swapped.is_empty()
    }

    /// Total number of requests still tracked across all three pools.
    #[must_use]
    pub fn count_unfinished(&self) -> usize {
        registry::count_unfinished(&self.waiting, &self.running, &self.swapped)
    }

    pub(crate) fn fail_capacity_exhausted(&self, request_id: &str) -> SchedulerError {
        warn!(request_id, "host swap space exhausted during preemption");
        SchedulerError::CapacityExhausted {
            request_id: request_id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_support::mock::MockBlockManager;
    use crate::types::SamplingParams;

    fn scheduler(config: SchedulerConfig) -> MlfqScheduler {
        MlfqScheduler::new(config, CacheConfig::default(), Box::new(MockBlockManager::new()), None)
    }

    #[test]
    fn add_request_without_skip_join_starts_at_priority_zero() {
        let mut sched = scheduler(SchedulerConfig::default());
        sched.add_request(Request::new("r1", 10, SamplingParams::default(), None));
        assert_eq!(sched.waiting.peek_front().unwrap().priority, 0);
    }

    #[test]
    fn abort_before_admit_removes_from_waiting() {
        let mut sched = scheduler(SchedulerConfig::default());
        sched.add_request(Request::new("r1", 10, SamplingParams::default(), None));
        sched.abort_request(["r1".to_string()]);
        assert!(sched.locate(&"r1".to_string()).is_none());
        assert_eq!(sched.count_unfinished(), 0);
    }

    #[test]
    fn sequence_metadata_covers_every_scheduled_request() {
        let mut sched = scheduler(SchedulerConfig::default());
        sched.add_request(Request::new("r1", 10, SamplingParams::default(), None));

        let plan = sched.schedule().expect("schedule ok");
        let metadata = sched.sequence_metadata(&plan);
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata[0].request_id, "r1");
        assert!(metadata[0].is_prompt);
        assert_eq!(metadata[0].block_tables.len(), 1);

        let running = sched.running().iter().find(|r| r.request_id == "r1").unwrap();
        assert!(running.first_scheduled_time.is_some());
    }

    #[test]
    fn has_unfinished_reflects_all_three_pools() {
        let mut sched = scheduler(SchedulerConfig::default());
        assert!(!sched.has_unfinished());
        sched.add_request(Request::new("r1", 10, SamplingParams::default(), None));
        assert!(sched.has_unfinished());
    }
}

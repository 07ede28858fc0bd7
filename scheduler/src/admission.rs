//! Admission Controller (§4.4) — fills a single prompt-phase batch from
//! the waiting ladder, enforcing token, sequence, padding, adapter-slot,
//! and block-allocation budgets.

use std::collections::{HashSet, VecDeque};
use std::time::Instant;

use tracing::warn;

use crate::block_manager::AllocStatus;
use crate::error::{Result, SchedulerError};
use crate::plan::SchedulePlan;
use crate::scheduler::MlfqScheduler;
use crate::types::SequenceStatus;

impl MlfqScheduler {
    /// Run the prompt-admission phase: §4.4 of the design.
    pub(crate) fn run_admission_phase(&mut self, _now: Instant) -> Result<SchedulePlan> {
        let mut num_curr_seqs: usize = self
            .running
            .iter()
            .map(crate::types::Request::max_num_running_seqs)
            .sum();
        let adapters_enabled = self.config.adapters_enabled();
        let mut curr_loras: HashSet<u32> = if adapters_enabled {
            self.running.iter().map(crate::types::Request::adapter_int_id).collect()
        } else {
            HashSet::new()
        };

        let mut seq_lens: Vec<usize> = Vec::new();
        let mut scheduled = Vec::new();
        let mut ignored = Vec::new();
        let mut leftover: VecDeque<crate::types::Request> = VecDeque::new();
        let prompt_limit = self.config.prompt_limit();

        while let Some(mut request) = self.waiting.pop_front() {
            let waiting_seq_count = request.num_seqs(SequenceStatus::Waiting);
            if waiting_seq_count != 1 {
                return Err(SchedulerError::InvariantViolation(format!(
                    "request {} has {} WAITING sequences, expected exactly 1",
                    request.request_id, waiting_seq_count
                )));
            }
            let num_prompt_tokens = request.input_len();

            if num_prompt_tokens > prompt_limit {
                warn!(
                    request_id = %request.request_id,
                    num_prompt_tokens,
                    prompt_limit,
                    "prompt too long, exceeds prompt_limit"
                );
                for seq in request.seqs_with_status_mut(SequenceStatus::Waiting) {
                    seq.status = SequenceStatus::FinishedIgnored;
                }
                ignored.push(request);
                continue;
            }

            match self.block_manager.can_allocate(&request) {
                AllocStatus::Later => {
                    self.waiting.push_front(request);
                    break;
                }
                AllocStatus::Never => {
                    warn!(
                        request_id = %request.request_id,
                        num_prompt_tokens,
                        "prompt exceeds block manager capacity"
                    );
                    for seq in request.seqs_with_status_mut(SequenceStatus::Waiting) {
                        seq.status = SequenceStatus::FinishedIgnored;
                    }
                    ignored.push(request);
                    continue;
                }
                AllocStatus::Ok => {}
            }

            let adapter_id = request.adapter_int_id();
            if adapters_enabled
                && adapter_id > 0
                && !curr_loras.contains(&adapter_id)
                && curr_loras.len() >= self.config.max_loras
            {
                // No free adapter slot: skip for this iteration, restore
                // at the head of waiting afterward in original order.
                leftover.push_front(request);
                continue;
            }

            let mut new_seq_lens = seq_lens.clone();
            new_seq_lens.push(num_prompt_tokens);
            let padded_tokens = new_seq_lens.len() * new_seq_lens.iter().copied().max().unwrap_or(0);
            if padded_tokens > self.config.max_num_batched_tokens {
                self.waiting.push_front(request);
                break;
            }

            let num_new_seqs = request.max_num_running_seqs();
            if num_curr_seqs + num_new_seqs > self.config.max_num_seqs {
                self.waiting.push_front(request);
                break;
            }

            let num_paddings = padded_tokens - new_seq_lens.iter().sum::<usize>();
            if num_paddings > self.config.max_paddings {
                self.waiting.push_front(request);
                break;
            }

            seq_lens = new_seq_lens;
            if adapter_id > 0 {
                curr_loras.insert(adapter_id);
            }
            self.block_manager.allocate(&request);
            for seq in request.seqs_with_status_mut(SequenceStatus::Waiting) {
                seq.status = SequenceStatus::Running;
            }
            num_curr_seqs += num_new_seqs;
            scheduled.push(request.clone());
            self.running.push_back(request);
        }

        self.waiting.extend_front(leftover);

        let num_batched_tokens = if seq_lens.is_empty() {
            0
        } else {
            seq_lens.len() * seq_lens.iter().copied().max().unwrap_or(0)
        };

        self.metrics.record_admitted(scheduled.len() as u64);
        self.metrics.record_ignored(ignored.len() as u64);

        Ok(SchedulePlan {
            scheduled,
            is_prompt_phase: true,
            num_batched_tokens,
            ignored,
            ..SchedulePlan::empty(true)
        })
    }
}

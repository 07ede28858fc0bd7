//! Swap-In Controller (§4.6) — admits swapped requests back onto the
//! device when the decode phase preempted nothing this iteration.

use std::collections::{HashSet, VecDeque};
use std::time::Instant;

use crate::error::Result;
use crate::plan::SchedulePlan;
use crate::scheduler::MlfqScheduler;
use crate::types::{Request, SequenceStatus};

impl MlfqScheduler {
    pub(crate) fn run_swap_in_phase(&mut self, _now: Instant, plan: &mut SchedulePlan) -> Result<()> {
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

        let mut leftover: VecDeque<Request> = VecDeque::new();
        let mut swapped_in_count: u64 = 0;

        while let Some(mut request) = self.swapped.pop_front() {
            let adapter_id = request.adapter_int_id();
            if adapters_enabled
                && adapter_id > 0
                && !curr_loras.contains(&adapter_id)
                && curr_loras.len() >= self.config.max_loras
            {
                leftover.push_front(request);
                continue;
            }

            if !self.block_manager.can_swap_in(&request) {
                self.swapped.push_front(request);
                break;
            }

            let num_new_seqs = request.max_num_running_seqs();
            if num_curr_seqs + num_new_seqs > self.config.max_num_seqs {
                self.swapped.push_front(request);
                break;
            }

            if adapter_id > 0 {
                curr_loras.insert(adapter_id);
            }

            let mapping = self.block_manager.swap_in(&request);
            plan.blocks_to_swap_in.extend(mapping);
            for seq in request.seqs_with_status_mut(SequenceStatus::Swapped) {
                seq.status = SequenceStatus::Running;
            }
            for seq in request.seqs_with_status(SequenceStatus::Running) {
                if let Some((src, dst)) = self.block_manager.append_slot(&request.request_id, seq.id) {
                    plan.blocks_to_copy.entry(src).or_default().push(dst);
                }
            }

            num_curr_seqs += num_new_seqs;
            swapped_in_count += 1;
            self.running.push_back(request);
        }

        self.swapped.extend_front(leftover);
        self.metrics.record_swapped_in(swapped_in_count);
        Ok(())
    }
}

//! Preemption Engine (§4.5) — reserves a token slot for every running
//! request, preempting lowest-priority victims from the tail when the
//! block manager runs out of room.

use std::collections::VecDeque;
use std::time::Instant;

use tracing::{debug, warn};

use crate::error::Result;
use crate::plan::SchedulePlan;
use crate::scheduler::MlfqScheduler;
use crate::types::{Request, SequenceStatus};

/// How a preempted request gives up its device blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PreemptionMode {
    /// Free the blocks outright; the request re-enters `waiting` at the
    /// front and will recompute its prompt prefix from scratch.
    Recompute,
    /// Copy the blocks to host memory; the request re-enters `swapped`
    /// at the back and resumes from where it left off once swapped in.
    Swap,
}

impl MlfqScheduler {
    /// Run the decode phase: append a token slot for every running
    /// request, preempting as needed, then (if nothing was preempted)
    /// admit swapped requests back in.
    pub(crate) fn run_decode_phase(&mut self, now: Instant) -> Result<SchedulePlan> {
        self.sort_running_by_priority();

        let mut plan = SchedulePlan::empty(false);
        let mut still_running: VecDeque<Request> = VecDeque::new();
        let mut preempted_any = false;

        while let Some(request) = self.running.pop_front() {
            if self.block_manager.can_append_slot(&request) {
                self.append_slot(&request, &mut plan);
                still_running.push_back(request);
                continue;
            }

            if let Some(victim) = self.running.pop_back() {
                self.preempt(victim, &mut plan)?;
                preempted_any = true;
                // The current request still needs a slot; try again
                // next time round by pushing it back to be retried
                // after the victim's blocks are freed.
                self.running.push_front(request);
            } else {
                self.preempt(request, &mut plan)?;
                preempted_any = true;
            }
        }
        self.running = still_running;

        if !preempted_any {
            self.run_swap_in_phase(now, &mut plan)?;
        }

        // Mirrors the original's `scheduled_seq_groups=self.running`:
        // the executor's batch for this step is whatever is left
        // running once preemption and swap-in have both settled.
        plan.scheduled = self.running.iter().cloned().collect();
        plan.num_batched_tokens = self
            .running
            .iter()
            .map(|r| r.num_seqs(SequenceStatus::Running))
            .sum();

        Ok(plan)
    }

    fn sort_running_by_priority(&mut self) {
        let mut requests: Vec<Request> = self.running.drain(..).collect();
        requests.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.arrival_time.cmp(&b.arrival_time)));
        self.running = requests.into();
    }

    fn append_slot(&mut self, request: &Request, plan: &mut SchedulePlan) {
        for seq in request.seqs_with_status(SequenceStatus::Running) {
            if let Some((src, dst)) = self.block_manager.append_slot(&request.request_id, seq.id) {
                plan.blocks_to_copy.entry(src).or_default().push(dst);
            }
        }
    }

    fn preempt(&mut self, mut request: Request, plan: &mut SchedulePlan) -> Result<()> {
        let mode = if request.max_num_running_seqs() == 1 {
            PreemptionMode::Recompute
        } else {
            PreemptionMode::Swap
        };
        debug!(request_id = %request.request_id, priority = request.priority, ?mode, "preempting");

        match mode {
            PreemptionMode::Recompute => {
                for seq in request.seqs_with_status_mut(SequenceStatus::Running) {
                    seq.status = SequenceStatus::Waiting;
                }
                for seq in request.seqs_with_status(SequenceStatus::Waiting) {
                    self.block_manager.free(&request.request_id, seq.id);
                }
                self.metrics.record_preempted_by_recompute();
                self.waiting.push_front(request);
            }
            PreemptionMode::Swap => {
                if !self.block_manager.can_swap_out(&request) {
                    return Err(self.fail_capacity_exhausted(&request.request_id));
                }
                let mapping = self.block_manager.swap_out(&request);
                plan.blocks_to_swap_out.extend(mapping);
                for seq in request.seqs_with_status_mut(SequenceStatus::Running) {
                    seq.status = SequenceStatus::Swapped;
                }
                self.metrics.record_preempted_by_swap();
                self.swapped.push_back(request);
            }
        }
        Ok(())
    }
}

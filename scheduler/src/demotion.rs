//! Feedback Demotion (§4.8) — sweeps the running deque for requests
//! that have run past their priority's service quantum and demotes
//! them a level, handing them to the swapped ladder.
//!
//! Called by the caller once finished sequences have been marked (the
//! scheduler has no way to observe completion on its own — an executor
//! decides when a stop condition or `max_tokens` has been hit and flips
//! the sequence status before calling this).

use std::collections::VecDeque;
use std::time::Instant;

use tracing::debug;

use crate::scheduler::MlfqScheduler;
use crate::types::Request;

impl MlfqScheduler {
    /// Remove every finished request from `running`. Unfinished
    /// requests that have exceeded their current priority's service
    /// quantum are demoted a level, their arrival time reset to now,
    /// and requeued at the front of the swapped ladder; everyone else
    /// stays in `running`.
    pub fn free_finished(&mut self) {
        let now = Instant::now();
        let mut still_running: VecDeque<Request> = VecDeque::new();
        let mut demoted = 0u64;

        while let Some(mut request) = self.running.pop_front() {
            if request.is_finished() {
                for seq in &request.sequences {
                    if seq.status.is_finished() {
                        self.block_manager.free(&request.request_id, seq.id);
                    }
                }
                continue;
            }

            let quantum = self.config.quantum_for_priority(request.priority);
            if now.duration_since(request.arrival_time) > quantum {
                debug!(
                    request_id = %request.request_id,
                    from_priority = request.priority,
                    "quantum exceeded, demoting"
                );
                request.priority += 1;
                request.arrival_time = now;
                demoted += 1;
                self.swapped.push_front(request);
            } else {
                still_running.push_back(request);
            }
        }

        self.running = still_running;
        if demoted > 0 {
            self.metrics.record_demoted(demoted);
        }
    }
}

//! Fake block manager shared by this crate's integration tests.
//!
//! Tracks device and host block usage by a simple counter: every
//! request needs exactly `max_num_running_seqs()` blocks. Good enough
//! to drive end-to-end scenarios without a real KV-cache allocator.

use std::collections::HashMap;
use std::sync::{Mutex, Once};

use mlfq_scheduler::{AllocStatus, BlockId, BlockManager, Request, SequenceId};

static TRACING_INIT: Once = Once::new();

/// Route the crate's `tracing` spans/events to the test harness's
/// captured output. Safe to call from every test; only the first call
/// installs the subscriber.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

pub struct FakeBlockManager {
    capacity: usize,
    used: Mutex<usize>,
    swap_capacity: usize,
    swap_used: Mutex<usize>,
    append_slot_capacity: Mutex<Option<usize>>,
}

impl FakeBlockManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            used: Mutex::new(0),
            swap_capacity: usize::MAX / 2,
            swap_used: Mutex::new(0),
            append_slot_capacity: Mutex::new(None),
        }
    }

    pub fn with_no_swap_space(mut self) -> Self {
        self.swap_capacity = 0;
        self
    }

    /// After this many `can_append_slot` checks return true, every
    /// subsequent one returns false — simulates a cache that fills up
    /// partway through a decode phase (S4).
    pub fn limit_append_slots(self, count: usize) -> Self {
        *self.append_slot_capacity.lock().unwrap() = Some(count);
        self
    }
}

impl BlockManager for FakeBlockManager {
    fn can_allocate(&self, request: &Request) -> AllocStatus {
        let needed = request.max_num_running_seqs();
        let used = *self.used.lock().unwrap();
        if used + needed <= self.capacity {
            AllocStatus::Ok
        } else {
            AllocStatus::Later
        }
    }

    fn allocate(&mut self, request: &Request) {
        *self.used.lock().unwrap() += request.max_num_running_seqs();
    }

    fn can_append_slot(&self, _request: &Request) -> bool {
        let mut budget = self.append_slot_capacity.lock().unwrap();
        match *budget {
            None => true,
            Some(0) => false,
            Some(remaining) => {
                *budget = Some(remaining - 1);
                true
            }
        }
    }

    fn append_slot(&mut self, _request_id: &str, _seq_id: SequenceId) -> Option<(BlockId, BlockId)> {
        None
    }

    fn can_swap_in(&self, request: &Request) -> bool {
        *self.swap_used.lock().unwrap() >= request.max_num_running_seqs()
    }

    fn swap_in(&mut self, request: &Request) -> HashMap<BlockId, BlockId> {
        *self.swap_used.lock().unwrap() -= request.max_num_running_seqs();
        HashMap::from([(10, 20)])
    }

    fn can_swap_out(&self, request: &Request) -> bool {
        let swap_used = *self.swap_used.lock().unwrap();
        swap_used + request.max_num_running_seqs() <= self.swap_capacity
    }

    fn swap_out(&mut self, request: &Request) -> HashMap<BlockId, BlockId> {
        let n = request.max_num_running_seqs();
        *self.used.lock().unwrap() -= n;
        *self.swap_used.lock().unwrap() += n;
        HashMap::from([(20, 10)])
    }

    fn free(&mut self, _request_id: &str, _seq_id: SequenceId) {
        let mut used = self.used.lock().unwrap();
        *used = used.saturating_sub(1);
    }

    fn fork(&mut self, _request_id: &str, _parent: SequenceId, _child: SequenceId) {}

    fn access_all_blocks_in_seq(&mut self, _request_id: &str, _seq_id: SequenceId, _now: std::time::Instant) {}

    fn get_block_table(&self, _request_id: &str, _seq_id: SequenceId) -> Vec<BlockId> {
        vec![]
    }

    fn get_common_computed_block_ids(&self, _request: &Request) -> Vec<BlockId> {
        vec![]
    }

    fn mark_blocks_as_computed(&mut self, _request: &Request) {}
}

//! Test-only doubles shared by this crate's unit tests.
//!
//! Integration tests under `tests/` cannot see this module (it is not
//! part of the public API) and define their own equivalent fake in
//! `tests/common`.

pub(crate) mod mock {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::block_manager::{AllocStatus, BlockId, BlockManager};
    use crate::types::{Request, SequenceId};

    /// A simple block manager double: every request needs exactly one
    /// block per sequence, there are `capacity` blocks total, and every
    /// capacity/append/swap question is answered from that single
    /// number. Good enough to drive the scheduler's own logic in unit
    /// tests without re-implementing a real allocator.
    pub(crate) struct MockBlockManager {
        capacity: usize,
        used: Mutex<usize>,
        swap_capacity: usize,
        swap_used: Mutex<usize>,
        always_never: bool,
    }

    impl MockBlockManager {
        pub(crate) fn new() -> Self {
            Self {
                capacity: usize::MAX / 2,
                used: Mutex::new(0),
                swap_capacity: usize::MAX / 2,
                swap_used: Mutex::new(0),
                always_never: false,
            }
        }

        pub(crate) fn with_capacity(capacity: usize) -> Self {
            Self {
                capacity,
                used: Mutex::new(0),
                swap_capacity: usize::MAX / 2,
                swap_used: Mutex::new(0),
                always_never: false,
            }
        }

        pub(crate) fn with_no_swap_capacity(mut self) -> Self {
            self.swap_capacity = 0;
            self
        }

        /// Every `can_allocate` call answers `Never`, as if the prompt
        /// could never fit regardless of how much capacity frees up.
        pub(crate) fn with_never_allocatable() -> Self {
            Self {
                always_never: true,
                ..Self::new()
            }
        }

        /// Pretend `count` sequence-slots' worth of blocks are already
        /// resident on the host, as if swapped out in an earlier
        /// iteration — lets swap-in tests start without first driving a
        /// preemption through the mock.
        pub(crate) fn seed_swap_capacity(&mut self, count: usize) {
            *self.swap_used.get_mut().unwrap() = count;
        }
    }

    impl BlockManager for MockBlockManager {
        fn can_allocate(&self, request: &Request) -> AllocStatus {
            if self.always_never {
                return AllocStatus::Never;
            }
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
            let used = *self.used.lock().unwrap();
            used < self.capacity
        }

        fn append_slot(&mut self, _request_id: &str, _seq_id: SequenceId) -> Option<(BlockId, BlockId)> {
            None
        }

        fn can_swap_in(&self, request: &Request) -> bool {
            let swap_used = *self.swap_used.lock().unwrap();
            swap_used >= request.max_num_running_seqs()
        }

        fn swap_in(&mut self, request: &Request) -> HashMap<BlockId, BlockId> {
            let mut swap_used = self.swap_used.lock().unwrap();
            *swap_used -= request.max_num_running_seqs();
            HashMap::from([(1, 2)])
        }

        fn can_swap_out(&self, request: &Request) -> bool {
            let swap_used = *self.swap_used.lock().unwrap();
            swap_used + request.max_num_running_seqs() <= self.swap_capacity
        }

        fn swap_out(&mut self, request: &Request) -> HashMap<BlockId, BlockId> {
            *self.used.lock().unwrap() -= request.max_num_running_seqs();
            *self.swap_used.lock().unwrap() += request.max_num_running_seqs();
            HashMap::from([(2, 1)])
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
}

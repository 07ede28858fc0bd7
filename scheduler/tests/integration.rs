//! End-to-end scheduling scenarios (S1–S6).

mod common;

use std::thread::sleep;
use std::time::Duration;

use common::FakeBlockManager;
use mlfq_scheduler::{
    CacheConfig, MlfqScheduler, Request, RequestLocation, SamplingParams, SchedulerConfig,
    SequenceStatus,
};

fn config(max_num_seqs: usize, max_num_batched_tokens: usize, max_paddings: usize) -> SchedulerConfig {
    let mut cfg = SchedulerConfig::default();
    cfg.max_num_seqs = max_num_seqs;
    cfg.max_num_batched_tokens = max_num_batched_tokens;
    cfg.max_model_len = max_num_batched_tokens;
    cfg.max_paddings = max_paddings;
    cfg
}

fn beam_sampling() -> SamplingParams {
    SamplingParams {
        best_of: 2,
        use_beam_search: true,
        max_tokens: 16,
    }
}

#[test]
fn s1_single_request_fits() {
    common::init_tracing();
    let mut sched = MlfqScheduler::new(
        config(8, 2048, 256),
        CacheConfig::default(),
        Box::new(FakeBlockManager::new(64)),
        None,
    );
    sched.add_request(Request::new("r1", 10, SamplingParams::default(), None));

    let plan = sched.schedule().expect("schedule ok");
    assert_eq!(plan.scheduled.len(), 1);
    assert_eq!(plan.scheduled[0].request_id, "r1");
    assert_eq!(plan.num_batched_tokens, 10);
    assert!(plan.blocks_to_swap_in.is_empty());
    assert!(plan.blocks_to_swap_out.is_empty());
}

#[test]
fn s2_oversize_prompt_is_ignored() {
    common::init_tracing();
    let mut sched = MlfqScheduler::new(
        config(8, 2048, 256),
        CacheConfig::default(),
        Box::new(FakeBlockManager::new(64)),
        None,
    );
    sched.add_request(Request::new("r1", 9999, SamplingParams::default(), None));

    let plan = sched.schedule().expect("schedule ok");
    assert!(plan.scheduled.is_empty());
    assert_eq!(plan.ignored.len(), 1);
    assert_eq!(plan.ignored[0].request_id, "r1");
    assert!(plan.ignored[0]
        .sequences
        .iter()
        .all(|s| s.status == SequenceStatus::FinishedIgnored));
}

#[test]
fn s3_padding_cutoff_defers_second_request() {
    common::init_tracing();
    let mut sched = MlfqScheduler::new(
        config(64, 2048, 4),
        CacheConfig::default(),
        Box::new(FakeBlockManager::new(64)),
        None,
    );
    sched.add_request(Request::new("r1", 10, SamplingParams::default(), None));
    sched.add_request(Request::new("r2", 20, SamplingParams::default(), None));

    let plan = sched.schedule().expect("schedule ok");
    assert_eq!(plan.scheduled.len(), 1);
    assert_eq!(plan.scheduled[0].request_id, "r1");
    assert_eq!(plan.num_batched_tokens, 10);
    assert_eq!(sched.locate(&"r2".to_string()), Some(RequestLocation::Waiting));
}

#[test]
fn s4_preempt_by_swap_under_pressure() {
    common::init_tracing();
    let mut sched = MlfqScheduler::new(
        config(64, 4096, 4096),
        CacheConfig::default(),
        Box::new(FakeBlockManager::new(64).limit_append_slots(3)),
        None,
    );
    for id in ["r1", "r2", "r3", "r4"] {
        sched.add_request(Request::new(id, 10, beam_sampling(), None));
    }

    // First call admits all four into `running` (capacity and batch
    // budgets are generous); the second call hits the decode phase and
    // exhausts the append-slot budget on the fourth.
    sched.schedule().expect("admission schedule ok");
    let plan = sched.schedule().expect("decode schedule ok");

    assert!(!plan.is_prompt_phase);
    assert!(!plan.blocks_to_swap_out.is_empty());
    assert_eq!(sched.locate(&"r4".to_string()), Some(RequestLocation::Swapped));
    assert_eq!(sched.running().len(), 3);
}

#[test]
fn s5_recompute_preemption_for_lone_single_sequence_victim() {
    common::init_tracing();
    let mut sched = MlfqScheduler::new(
        config(64, 4096, 4096),
        CacheConfig::default(),
        Box::new(FakeBlockManager::new(64).limit_append_slots(0)),
        None,
    );
    sched.add_request(Request::new("r1", 10, SamplingParams::default(), None));

    sched.schedule().expect("admission schedule ok");
    let plan = sched.schedule().expect("decode schedule ok");

    assert!(plan.blocks_to_swap_out.is_empty());
    assert_eq!(sched.locate(&"r1".to_string()), Some(RequestLocation::Waiting));
    let waiting_head = sched.waiting().peek_front().expect("r1 requeued at head of waiting");
    assert_eq!(waiting_head.request_id, "r1");
    assert!(waiting_head
        .sequences
        .iter()
        .all(|s| s.status == SequenceStatus::Waiting));
}

#[test]
fn s6_starvation_rescue_promotes_to_priority_zero() {
    common::init_tracing();
    let mut cfg = config(64, 4096, 4096);
    cfg.base_quantum_ms = 1;
    cfg.threshold = 2;
    cfg.starvation_threshold_secs = 0.01;
    cfg.starvation_period = 1;
    let mut sched = MlfqScheduler::new(cfg, CacheConfig::default(), Box::new(FakeBlockManager::new(64)), None);

    sched.add_request(Request::new("r1", 10, SamplingParams::default(), None));
    sched.schedule().expect("admission schedule ok");
    assert_eq!(sched.locate(&"r1".to_string()), Some(RequestLocation::Running));

    // Exceed the priority-0 quantum so the next sweep demotes it into
    // the swapped ladder at priority 1, with arrival_time reset to now.
    sleep(Duration::from_millis(5));
    sched.free_finished();
    assert_eq!(sched.locate(&"r1".to_string()), Some(RequestLocation::Swapped));
    assert_eq!(sched.swapped().peek_front().unwrap().priority, 1);

    // Exceed the starvation threshold relative to that reset arrival
    // time, then let the next iteration's starvation sweep run.
    sleep(Duration::from_millis(20));
    sched.schedule().expect("schedule ok");

    let promoted = sched.swapped().peek_front().expect("r1 still tracked");
    assert_eq!(promoted.request_id, "r1");
    assert_eq!(promoted.priority, 0);
}

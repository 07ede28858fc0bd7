//! # mlfq-scheduler — multi-level feedback queue scheduler for batched
//! LLM inference
//!
//! Decides, every iteration, which waiting requests to admit into a
//! prompt (prefill) batch, which running requests to preempt when the
//! KV cache runs out of room, and which swapped-out requests to bring
//! back. Requests move through three pools — waiting, running, and
//! swapped — organized as priority ladders (except `running`, a plain
//! FIFO deque), with priority assigned at admission and adjusted over
//! time by the starvation guard and feedback demotion policy.
//!
//! KV-cache block bookkeeping is delegated entirely to an external
//! [`BlockManager`](block_manager::BlockManager) implementation; this
//! crate owns scheduling policy only, not memory management.
//!
//! # Architecture
//!
//! ```text
//! add_request() ──► waiting ladder
//!                       │
//!                  admission phase (§4.4) ──► running deque
//!                       │                         │
//!                  (budgets exhausted)       preemption engine (§4.5)
//!                       │                         │
//!                       ▼                         ▼
//!                  swap-in controller (§4.6) ◄── swapped ladder
//!
//! free_finished() sweeps running: finished requests drop out, requests
//! over their service quantum demote a priority level into swapped.
//! A starvation guard runs periodically, promoting long-waiters to
//! priority 0 regardless of pool.
//! ```

pub mod admission;
pub mod block_manager;
pub mod config;
pub mod demotion;
pub mod error;
pub mod ladder;
pub mod metrics;
pub mod plan;
pub mod preemption;
pub mod profile;
pub mod registry;
pub mod scheduler;
pub mod swap_in;
pub mod types;

#[cfg(test)]
mod tests_support;

pub use block_manager::{AllocStatus, BlockId, BlockManager};
pub use config::{CacheConfig, SchedulerConfig};
pub use error::{ConfigError, Result, SchedulerError};
pub use ladder::PriorityLadder;
pub use metrics::{MetricsSnapshot, SchedulerMetrics};
pub use plan::{SchedulePlan, SequenceMetadata};
pub use profile::{estimate_priority, ProfileKey, ProfileTable};
pub use registry::RequestLocation;
pub use scheduler::MlfqScheduler;
pub use types::{Request, RequestId, SamplingParams, Sequence, SequenceId, SequenceStatus};

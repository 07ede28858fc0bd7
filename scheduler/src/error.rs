//! Scheduler error types.

use thiserror::Error;

use crate::types::RequestId;

/// Errors that can occur while loading scheduler configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("failed to parse scheduler config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config file could not be read.
    #[error("failed to read scheduler config file: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while driving the scheduler.
///
/// `CapacityExhausted` and `InvariantViolation` are fatal and meant to
/// propagate to the driver thread. `PromptOversize` never becomes one of
/// these — oversized prompts are folded into a plan's `ignored` list
/// instead. Transient backpressure (block manager `LATER`, budget
/// overflow) never escapes the admission or swap-in loops and so has no
/// variant here.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A request needed to be swapped out but the block manager's host
    /// swap space cannot accept it. The operator must restart with more
    /// swap space; silently dropping the request would corrupt client
    /// expectations.
    #[error(
        "capacity exhausted: cannot swap out request {request_id} — insufficient host swap space"
    )]
    CapacityExhausted {
        /// The request that could not be swapped out.
        request_id: RequestId,
    },

    /// An internal invariant was violated, indicating a caller or
    /// scheduler bug rather than a recoverable condition.
    #[error("scheduler invariant violated: {0}")]
    InvariantViolation(String),
}

/// Convenience result alias for scheduler operations.
pub type Result<T> = std::result::Result<T, SchedulerError>;

//! Scheduler and cache configuration, loadable from TOML.
//!
//! Maps to a `scheduler.toml` document. Every knob named in the
//! external-interfaces configuration surface is represented here, with
//! the defaults called out in the design notes.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Padded-batch token ceiling; admission cutoff.
    pub max_num_batched_tokens: usize,
    /// Cap on concurrent RUNNING sequences; admission and swap-in cutoff.
    pub max_num_seqs: usize,
    /// Tolerated padding waste in a prompt batch.
    pub max_paddings: usize,
    /// Hard per-prompt token cap.
    pub max_model_len: usize,
    /// Used by the skip-join profile lookup.
    pub max_batch_size: usize,
    /// Adapter (LoRA) slot count. Zero disables adapter gating.
    pub max_loras: usize,
    /// Base quantum at priority 0, in milliseconds.
    pub base_quantum_ms: u64,
    /// Geometric growth factor of the quantum per priority level.
    pub threshold: u32,
    /// Starvation threshold, in seconds.
    pub starvation_threshold_secs: f64,
    /// Number of iterations between starvation sweeps.
    pub starvation_period: u64,
    /// Intended window size for `PriorityLadder::top_window_count`-based
    /// congestion heuristics feeding skip-join estimation. Stored for
    /// forward compatibility but not yet consulted by
    /// `estimate_skip_join_priority` — the reference implementation
    /// carries the same field unconsumed, pending the profiling
    /// pipeline `use_skip_join` depends on.
    pub num_queues_for_prediction: usize,
    /// When true, new requests are assigned a priority estimated from
    /// an offline latency profile instead of starting at priority 0.
    pub use_skip_join: bool,
    /// Policy knob forwarded to operational tuning in the block manager.
    pub proactive_offloading: bool,
    /// Policy knob forwarded to operational tuning in the block manager.
    pub num_min_free_blocks_threshold: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_num_batched_tokens: 2048,
            max_num_seqs: 256,
            max_paddings: 256,
            max_model_len: 2048,
            max_batch_size: 256,
            max_loras: 0,
            base_quantum_ms: 10,
            threshold: 2,
            starvation_threshold_secs: 3.0,
            starvation_period: 1000,
            num_queues_for_prediction: 2,
            use_skip_join: false,
            proactive_offloading: true,
            num_min_free_blocks_threshold: 0,
        }
    }
}

impl SchedulerConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Hard per-prompt token cap: `min(max_model_len, max_num_batched_tokens)`.
    #[must_use]
    pub fn prompt_limit(&self) -> usize {
        self.max_model_len.min(self.max_num_batched_tokens)
    }

    /// Base service quantum at priority 0.
    #[must_use]
    pub fn base_quantum(&self) -> Duration {
        Duration::from_millis(self.base_quantum_ms)
    }

    /// Service quantum budget at the given priority level:
    /// `base_quantum * threshold^priority`.
    #[must_use]
    pub fn quantum_for_priority(&self, priority: u32) -> Duration {
        let factor = f64::from(self.threshold).powi(priority as i32);
        let secs = self.base_quantum().as_secs_f64() * factor;
        if secs.is_finite() {
            Duration::from_secs_f64(secs)
        } else {
            Duration::MAX
        }
    }

    /// Starvation threshold as a [`Duration`].
    #[must_use]
    pub fn starvation_threshold(&self) -> Duration {
        Duration::from_secs_f64(self.starvation_threshold_secs.max(0.0))
    }

    /// Whether adapter (LoRA) gating is active.
    #[must_use]
    pub fn adapters_enabled(&self) -> bool {
        self.max_loras > 0
    }
}

/// Block-space manager configuration, forwarded verbatim to whichever
/// [`crate::block_manager::BlockManager`] implementation the caller
/// constructs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Number of tokens per KV-cache block.
    pub block_size: usize,
    /// Number of device (GPU) blocks available.
    pub num_gpu_blocks: usize,
    /// Number of host (CPU) blocks available for swap.
    pub num_cpu_blocks: usize,
    /// Sliding-window attention span, if the model uses one.
    pub sliding_window: Option<usize>,
    /// Whether prefix-cache block sharing is enabled.
    pub enable_caching: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            block_size: 16,
            num_gpu_blocks: 0,
            num_cpu_blocks: 0,
            sliding_window: None,
            enable_caching: false,
        }
    }
}

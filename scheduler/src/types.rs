//! Core data model: requests (sequence groups), sequences, and sampling
//! parameters.

use std::time::Instant;

/// Stable identifier for a request, assigned by the caller.
pub type RequestId = String;

/// Identifier for a single sequence within a request.
pub type SequenceId = u64;

/// Sampling parameters for a request's generation.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingParams {
    /// Number of candidate sequences to consider (parallel sampling or
    /// beam search width).
    pub best_of: usize,
    /// Whether generation uses beam search.
    pub use_beam_search: bool,
    /// Maximum number of tokens to generate.
    pub max_tokens: usize,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            best_of: 1,
            use_beam_search: false,
            max_tokens: 16,
        }
    }
}

/// Lifecycle status of a single token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceStatus {
    /// Queued, not yet admitted into a batch.
    Waiting,
    /// Resident on the accelerator, actively generating or prefilling.
    Running,
    /// Blocks offloaded to host memory; not currently scheduled.
    Swapped,
    /// Finished by reaching a stop condition or EOS.
    FinishedStopped,
    /// Finished because `max_tokens` was reached.
    FinishedLengthCapped,
    /// Finished because the owning request was aborted.
    FinishedAborted,
    /// Finished because the prompt was rejected at admission time.
    FinishedIgnored,
}

impl SequenceStatus {
    /// Whether this status is one of the terminal `FINISHED_*` states.
    #[must_use]
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            Self::FinishedStopped
                | Self::FinishedLengthCapped
                | Self::FinishedAborted
                | Self::FinishedIgnored
        )
    }
}

/// A single token stream belonging to a request.
#[derive(Debug, Clone)]
pub struct Sequence {
    /// Identifier, unique within the owning request.
    pub id: SequenceId,
    /// Current lifecycle status.
    pub status: SequenceStatus,
    /// Number of prompt tokens (fixed once the sequence is created).
    pub num_prompt_tokens: usize,
}

impl Sequence {
    /// Create a new sequence in the `WAITING` state.
    #[must_use]
    pub fn new_prompt(id: SequenceId, num_prompt_tokens: usize) -> Self {
        Self {
            id,
            status: SequenceStatus::Waiting,
            num_prompt_tokens,
        }
    }

    /// Token count used for admission-time padding math.
    #[must_use]
    pub fn get_len(&self) -> usize {
        self.num_prompt_tokens
    }
}

/// A logical inference job — one client request, possibly fanning out
/// into multiple sequences under beam search or parallel sampling.
///
/// Historically called a "sequence group"; this crate calls it
/// `Request` throughout, keeping the original name only in prose.
#[derive(Debug, Clone)]
pub struct Request {
    /// Stable identifier supplied by the caller.
    pub request_id: RequestId,
    /// Monotonic arrival time. Refreshed by demotion (§4.8) — a
    /// demoted request's service quantum, and starvation countdown,
    /// both restart from the demotion instant.
    pub arrival_time: Instant,
    /// Current priority; smaller numbers are served first. Reset to 0
    /// by starvation promotion, otherwise monotonically non-decreasing.
    pub priority: u32,
    /// Sampling configuration for this request.
    pub sampling_params: SamplingParams,
    /// LoRA adapter identifier. `None`/`Some(0)` both mean "no adapter".
    pub adapter_id: Option<u32>,
    /// The request's sequences.
    pub sequences: Vec<Sequence>,
    /// Wall-clock time this request was first included in a plan,
    /// recorded for metadata purposes only — the scheduler never reads
    /// it back to make decisions.
    pub first_scheduled_time: Option<std::time::SystemTime>,
}

impl Request {
    /// Create a new single-sequence prompt request arriving now.
    #[must_use]
    pub fn new(
        request_id: impl Into<RequestId>,
        num_prompt_tokens: usize,
        sampling_params: SamplingParams,
        adapter_id: Option<u32>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            arrival_time: Instant::now(),
            priority: 0,
            sampling_params,
            adapter_id,
            sequences: vec![Sequence::new_prompt(0, num_prompt_tokens)],
            first_scheduled_time: None,
        }
    }

    /// Adapter id normalized so that "no adapter" is always `0`,
    /// matching the reference implementation's `lora_int_id` convention.
    #[must_use]
    pub fn adapter_int_id(&self) -> u32 {
        self.adapter_id.unwrap_or(0)
    }

    /// Upper bound on concurrently RUNNING sequences this request can
    /// occupy: the beam/parallel-sampling width under beam search,
    /// otherwise the number of sequences it currently owns (at least
    /// one).
    #[must_use]
    pub fn max_num_running_seqs(&self) -> usize {
        if self.sampling_params.use_beam_search {
            self.sampling_params.best_of.max(1)
        } else {
            self.sequences.len().max(1)
        }
    }

    /// Number of prompt tokens of this request's sole `WAITING`
    /// sequence. Callers must only invoke this when the request is
    /// known to be in the waiting pool.
    #[must_use]
    pub fn input_len(&self) -> usize {
        self.sequences
            .iter()
            .find(|s| s.status == SequenceStatus::Waiting)
            .map(Sequence::get_len)
            .unwrap_or(0)
    }

    /// Sequences currently in the given status.
    pub fn seqs_with_status(&self, status: SequenceStatus) -> impl Iterator<Item = &Sequence> {
        self.sequences.iter().filter(move |s| s.status == status)
    }

    /// Mutable view of sequences currently in the given status.
    pub fn seqs_with_status_mut(
        &mut self,
        status: SequenceStatus,
    ) -> impl Iterator<Item = &mut Sequence> {
        self.sequences
            .iter_mut()
            .filter(move |s| s.status == status)
    }

    /// Count of sequences in the given status.
    #[must_use]
    pub fn num_seqs(&self, status: SequenceStatus) -> usize {
        self.seqs_with_status(status).count()
    }

    /// Whether every sequence owned by this request has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.sequences.iter().all(|s| s.status.is_finished())
    }

    /// Record the wall-clock time of first scheduling, if not already
    /// set.
    pub fn maybe_set_first_scheduled_time(&mut self, now: std::time::SystemTime) {
        if self.first_scheduled_time.is_none() {
            self.first_scheduled_time = Some(now);
        }
    }
}

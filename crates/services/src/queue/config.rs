use std::time::Duration;

use crate::transition::DEFAULT_TRANSITION;

/// Retry schedule for background prefetches.
///
/// Initial loads are never retried; their failure goes straight to the
/// consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// A single attempt.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::from_millis(500),
        }
    }

    #[must_use]
    pub fn bounded(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Delay before attempt `attempt + 1`, doubling from `backoff`.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.backoff.saturating_mul(1_u32 << shift)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// How many questions to keep buffered behind the current one.
    pub lookahead: usize,
    pub prefetch_retry: RetryPolicy,
    /// Extra fetches allowed when the server hands back a question that is
    /// already on screen or buffered.
    pub duplicate_refetch_limit: u32,
    pub transition_duration: Duration,
}

impl QueueConfig {
    #[must_use]
    pub fn with_lookahead(mut self, lookahead: usize) -> Self {
        self.lookahead = lookahead.max(1);
        self
    }

    #[must_use]
    pub fn with_prefetch_retry(mut self, policy: RetryPolicy) -> Self {
        self.prefetch_retry = policy;
        self
    }

    #[must_use]
    pub fn with_duplicate_refetch_limit(mut self, limit: u32) -> Self {
        self.duplicate_refetch_limit = limit;
        self
    }

    #[must_use]
    pub fn with_transition_duration(mut self, duration: Duration) -> Self {
        self.transition_duration = duration;
        self
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            lookahead: 1,
            prefetch_retry: RetryPolicy::none(),
            duplicate_refetch_limit: 2,
            transition_duration: DEFAULT_TRANSITION,
        }
    }
}

use std::time::{Duration, SystemTime};

use retry_policies::{RetryDecision, RetryPolicy};

/// Backoff used by [`send_retriable`] when the description asks for none.
///
/// [`send_retriable`]: crate::RequestDescription::send_retriable
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(10);

/// Retry up to `max_n_retries` times, waiting the same `backoff` before each retry.
///
/// No jitter and no growth: the n-th retry waits exactly as long as the first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedBackoff {
    pub max_n_retries: u32,
    pub backoff: Duration,
}

impl FixedBackoff {
    pub fn new(max_n_retries: u32, backoff: Duration) -> Self {
        Self {
            max_n_retries,
            backoff,
        }
    }

    /// Same policy with a zero backoff replaced by [`DEFAULT_BACKOFF`].
    pub fn or_default_backoff(self) -> Self {
        if self.backoff.is_zero() {
            Self {
                backoff: DEFAULT_BACKOFF,
                ..self
            }
        } else {
            self
        }
    }
}

impl RetryPolicy for FixedBackoff {
    fn should_retry(&self, _request_start_time: SystemTime, n_past_retries: u32) -> RetryDecision {
        if n_past_retries < self.max_n_retries {
            RetryDecision::Retry {
                execute_after: SystemTime::now() + self.backoff,
            }
        } else {
            RetryDecision::DoNotRetry
        }
    }
}

use std::ops::RangeInclusive;
use std::time::Duration;

use super::FetchError;

/// HTTP status the upstream uses to signal rate limiting.
pub const RATE_LIMIT_STATUS: u16 = 429;

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait this long, then request the same page again.
    Retry(Duration),
    /// Give up on this page and stop paginating.
    Abandon,
}

/// Exponential backoff policy for page requests.
///
/// Transport failures and retryable statuses wait `base_delay * multiplier^attempt`.
/// Rate-limit responses use the longer `rate_limit_base_delay` schedule.
/// Both share the same `max_attempts` budget.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per page, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: u32,
    pub rate_limit_base_delay: Duration,
    /// Optional ceiling on any single wait.
    pub max_delay: Option<Duration>,
    pub retryable_statuses: Vec<RangeInclusive<u16>>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay: Duration::from_secs(1),
            multiplier: 2,
            rate_limit_base_delay: Duration::from_secs(2),
            max_delay: None,
            retryable_statuses: vec![RATE_LIMIT_STATUS..=RATE_LIMIT_STATUS, 500..=599],
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_rate_limit_base_delay(mut self, delay: Duration) -> Self {
        self.rate_limit_base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_statuses.iter().any(|r| r.contains(&status))
    }

    /// Wait before the retry that follows failed attempt `attempt` (0-based).
    pub fn backoff(&self, base: Duration, attempt: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt);
        let delay = base.saturating_mul(factor);
        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }

    /// Decide how to proceed after attempt `attempt` (0-based) failed with `error`.
    pub fn decide(&self, attempt: u32, error: &FetchError) -> RetryDecision {
        let base = if error.is_transport() {
            self.base_delay
        } else {
            match error.status() {
                Some(RATE_LIMIT_STATUS) if self.is_retryable_status(RATE_LIMIT_STATUS) => {
                    self.rate_limit_base_delay
                }
                Some(status) if self.is_retryable_status(status) => self.base_delay,
                _ => return RetryDecision::Abandon,
            }
        };

        if attempt.saturating_add(1) >= self.max_attempts {
            return RetryDecision::Abandon;
        }
        RetryDecision::Retry(self.backoff(base, attempt))
    }
}

//! Bounded retry policy.
//!
//! The delay schedule is a pure function of the attempt number so it can be
//! tested without sleeping. The async loop that applies it lives in the
//! native crate.

use std::time::Duration;

/// Implemented by error types that can be fed to a retry loop.
pub trait RetryClass {
    /// Whether another attempt may succeed.
    fn is_retryable(&self) -> bool;
    /// Whether the upstream service explicitly rate-limited the call.
    fn is_rate_limit(&self) -> bool;
}

/// Exponential backoff with a cap applied to rate-limit responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Retries after the first attempt; total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Upper bound on the delay after a rate-limit response.
    pub rate_limit_cap: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1500),
            rate_limit_cap: Duration::from_secs(10),
        }
    }
}

impl BackoffPolicy {
    /// Policy that retries immediately; used by tests.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            rate_limit_cap: Duration::ZERO,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (1-based): `base * 2^(retry-1)`.
    pub fn delay_for(&self, retry: u32, rate_limited: bool) -> Duration {
        let exp = retry.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1u32 << exp);
        if rate_limited {
            delay.min(self.rate_limit_cap)
        } else {
            delay
        }
    }
}

//! Async bounded-retry combinator.
//!
//! `with_retry` runs an attempt function until it succeeds, returns an error
//! its [`RetryClass`] marks fatal, or the policy's attempt budget is spent.
//! Delays come from [`BackoffPolicy::delay_for`].

use std::fmt::Display;
use std::future::Future;

use hackscope_core::retry::{BackoffPolicy, RetryClass};

/// Terminal failure of a retried operation.
#[derive(Debug)]
pub struct RetryFailure<E> {
    /// Attempts made, including the one that produced `error`.
    pub attempts: u32,
    pub error: E,
}

/// Run `attempt(n)` (1-based) under `policy`.
pub async fn with_retry<T, E, F, Fut>(
    policy: &BackoffPolicy,
    label: &str,
    mut attempt: F,
) -> Result<T, RetryFailure<E>>
where
    E: RetryClass + Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts();
    let mut n = 1;
    loop {
        match attempt(n).await {
            Ok(value) => {
                if n > 1 {
                    tracing::info!(label, attempt = n, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) if !error.is_retryable() || n >= max_attempts => {
                return Err(RetryFailure { attempts: n, error });
            }
            Err(error) => {
                let delay = policy.delay_for(n, error.is_rate_limit());
                tracing::warn!(
                    label,
                    attempt = n,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "attempt failed, retrying"
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                n += 1;
            }
        }
    }
}

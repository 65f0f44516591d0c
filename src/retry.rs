//! Bounded retry with a fixed delay.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// How often, and how patiently, a failing operation is re-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. A value of 3 allows 4 attempts in total.
    pub retries: u32,
    /// Pause before each retry.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Runs `operation` until it succeeds or the retry budget is spent.
///
/// Every error is treated as retryable. When the budget runs out the last
/// error is returned unchanged.
pub async fn retry_operation<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut remaining = policy.retries;
    let mut attempt = 1u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if remaining > 0 => {
                tracing::warn!(
                    attempt,
                    remaining,
                    error = %err,
                    "operation failed, retrying in {:?}",
                    policy.delay
                );
                remaining -= 1;
                attempt += 1;
                sleep(policy.delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

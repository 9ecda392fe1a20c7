//! Retry with bounded exponential backoff
//!
//! **Algorithm:**
//! 1. Attempt operation
//! 2. If successful, return result
//! 3. If the classifier says the error is transient:
//!    a. If attempts remain: log WARN, sleep, retry
//!    b. Otherwise: log ERROR, return the last error
//! 4. Any other error is returned immediately (no retry)
//!
//! **Backoff Strategy:**
//! - delay(n) = initial_delay × multiplier^(n-1), capped at max_delay
//! - a server-provided retry-after hint raises the delay to at least that hint

use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};

/// Bounded exponential backoff parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(4),
            multiplier: 2,
        }
    }
}

impl BackoffPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let factor = self.multiplier.max(1).saturating_pow(exponent);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

/// Classifier verdict for a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Transient failure; `after` carries a server retry-after hint
    Retry { after: Option<Duration> },
    /// Permanent failure
    Fail,
}

/// Run `operation` under `policy`, retrying while `classify` allows it
///
/// `operation` receives the 1-based attempt number.
pub async fn retry_with_backoff<F, Fut, T, E, C>(
    operation_name: &str,
    policy: &BackoffPolicy,
    mut operation: F,
    classify: C,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> RetryDecision,
    E: Display,
{
    let start_time = Instant::now();
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation(attempt).await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) => {
                let hint = match classify(&err) {
                    RetryDecision::Fail => return Err(err),
                    RetryDecision::Retry { after } => after,
                };

                if attempt >= max_attempts {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        error = %err,
                        "Operation failed: retries exhausted"
                    );
                    return Err(err);
                }

                let backoff = policy.delay_for(attempt);
                let delay = match hint {
                    Some(after) => backoff.max(after),
                    None => backoff,
                };

                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient failure, backing off"
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

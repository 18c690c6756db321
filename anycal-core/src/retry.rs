//! Retry with exponential backoff for provider calls.
//!
//! Retries transient failures (rate limits, 5xx, timeouts) and gives up
//! immediately on permanent ones (auth, validation, malformed responses).
//! A provider-supplied backoff hint (Retry-After) takes precedence over the
//! computed delay.

use std::future::Future;
use std::time::Duration;

use crate::error::AnycalResult;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 250;
pub const DEFAULT_MAX_DELAY_MS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum retry attempts after the initial call.
    pub max_retries: u32,
    /// Delay before the first retry; doubles each attempt.
    pub initial_delay: Duration,
    /// Cap on the backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl RetryConfig {
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        let delay_ms = (self.initial_delay.as_millis() as u64).saturating_mul(factor);
        Duration::from_millis(delay_ms.min(self.max_delay.as_millis() as u64))
    }
}

/// Run `operation`, retrying retryable errors up to `config.max_retries`
/// times with exponential backoff.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, operation: F) -> AnycalResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = AnycalResult<T>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::debug!(attempt, "call succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                let delay = match e.retry_after_hint() {
                    Some(seconds) => Duration::from_secs(seconds).min(config.max_delay),
                    None => config.delay_for_attempt(attempt),
                };
                tracing::warn!(
                    attempt = attempt + 1,
                    max = config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying provider call"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/*!
 * Retry with exponential backoff for provider calls.
 */

use std::future::Future;
use std::time::Duration;

use log::warn;

use crate::errors::ProviderError;

/// How often and how patiently a provider call is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles on every further retry
    pub backoff_base_ms: u64,
    /// Optional rate limit in requests per minute
    pub rate_limit: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_ms: 1000,
            rate_limit: None,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_base_ms: u64) -> Self {
        Self {
            max_retries,
            backoff_base_ms,
            rate_limit: None,
        }
    }

    pub fn with_rate_limit(mut self, rate_limit: Option<u32>) -> Self {
        self.rate_limit = rate_limit.filter(|r| *r > 0);
        self
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << (attempt.saturating_sub(1)).min(16);
        let mut delay = self.backoff_base_ms.saturating_mul(factor);
        if let Some(rate_limit) = self.rate_limit {
            delay = delay.max(60_000 / rate_limit as u64);
        }
        Duration::from_millis(delay)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the retries are used up.
    pub async fn execute<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.backoff(attempt);
                    warn!(
                        "{} request failed: {} - retry {}/{} in {}ms",
                        label,
                        e,
                        attempt,
                        self.max_retries,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

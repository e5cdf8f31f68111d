//! Exponential backoff for page fetches.
//!
//! Only transient failures are retried: HTTP 429 and network-level errors.
//! A 404 or any other status is returned on the first attempt.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    /// Additional attempts after the first failure; `0` disables retries.
    pub max_retries: u32,
    pub backoff_base_secs: u64,
}

impl RetryPolicy {
    /// Wait before retry `attempt` (0-based): `base * 2^attempt` seconds.
    fn delay(self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.min(62);
        Duration::from_secs(self.backoff_base_secs.saturating_mul(factor))
    }

    /// Runs `operation` until it succeeds, fails permanently, or the retry
    /// budget is spent. The last error is returned.
    pub(crate) async fn run<T, F, Fut>(self, mut operation: F) -> Result<T, ScraperError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ScraperError>>,
    {
        let mut attempt = 0u32;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if is_transient(&err) && attempt < self.max_retries => {
                    let delay = self.delay(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_secs = delay.as_secs(),
                        error = %err,
                        "transient fetch error; backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn is_transient(err: &ScraperError) -> bool {
    matches!(
        err,
        ScraperError::RateLimited { .. } | ScraperError::Http(_)
    )
}

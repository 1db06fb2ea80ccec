use crate::config::Config;
use crate::error::{FeedError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// Bounded retry with exponential backoff around a single remote call.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryExecutor {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.retry_base_delay_ms),
            Duration::from_millis(config.retry_max_delay_ms),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay slept after the given failed attempt (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    pub async fn execute<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempts = 0;

        loop {
            attempts += 1;

            let err = match call().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !err.is_transient() {
                error!("{} failed with a non-retryable error: {}", operation, err);
                return Err(FeedError::RemoteFetch {
                    operation: operation.to_string(),
                    attempts,
                    source: Box::new(err),
                });
            }

            if attempts >= self.max_attempts {
                error!("{} failed after {} attempts: {}", operation, attempts, err);
                return Err(FeedError::RemoteFetch {
                    operation: operation.to_string(),
                    attempts,
                    source: Box::new(err),
                });
            }

            let delay = self.backoff(attempts);
            warn!(
                "{} failed (attempt {}/{}), retrying in {:?}: {}",
                operation, attempts, self.max_attempts, delay, err
            );
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

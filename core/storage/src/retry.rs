//! Exponential backoff for transient store request failures.
//!
//! Only [`Error::Request`] is considered transient. Not-found, authentication
//! and schema failures are returned on the first attempt.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use vaultbridge_common::{Error, Result};

/// Backoff schedule for a store client.
///
/// The delay doubles on every attempt, starting at `initial_delay` and capped
/// at `max_delay`.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt; `0` disables retrying.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Spread each delay over 75%..125% of its nominal value.
    pub jitter: bool,
}

impl RetryConfig {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter: true,
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Wait before retry number `retry` (zero-based).
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let nominal = self
            .initial_delay
            .checked_mul(2u32.saturating_pow(retry))
            .map_or(self.max_delay, |d| d.min(self.max_delay));

        if self.jitter {
            nominal.mul_f64(0.75 + rand::random::<f64>() * 0.5)
        } else {
            nominal
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Runs a store request until it succeeds, fails permanently or runs out of
/// retries.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `request`, naming it `resource` in log output.
    pub async fn execute<F, Fut, T>(&self, resource: &str, request: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retry = 0;

        loop {
            let err = match request().await {
                Ok(value) => {
                    if retry > 0 {
                        debug!("{} succeeded after {} retries", resource, retry);
                    }
                    return Ok(value);
                }
                Err(err) if !matches!(err, Error::Request(_)) => return Err(err),
                Err(err) => err,
            };

            if retry >= self.config.max_retries {
                warn!("{} failed after {} attempts: {}", resource, retry + 1, err);
                return Err(err);
            }

            let delay = self.config.delay_for_retry(retry);
            warn!("{} failed: {}. Retrying in {:?}", resource, err, delay);
            sleep(delay).await;
            retry += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_retries: u32) -> RetryExecutor {
        RetryExecutor::new(
            RetryConfig::new(max_retries)
                .with_initial_delay(Duration::from_millis(1))
                .with_jitter(false),
        )
    }

    #[test]
    fn test_delay_doubles_up_to_cap() {
        let config = RetryConfig::new(8)
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(5))
            .with_jitter(false);

        let delays: Vec<u64> = (0..5).map(|r| config.delay_for_retry(r).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 5, 5]);
        assert_eq!(config.delay_for_retry(u32::MAX), Duration::from_secs(5));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let config = RetryConfig::new(1).with_initial_delay(Duration::from_millis(1000));
        for _ in 0..50 {
            let delay = config.delay_for_retry(0).as_millis();
            assert!((750..=1250).contains(&delay));
        }
    }

    #[tokio::test]
    async fn test_request_failures_are_retried() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;

        let result = fast(3)
            .execute("items", || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Error::Request("503 Service Unavailable".to_string()))
                } else {
                    Ok("listed")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "listed");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failures_are_returned_at_once() {
        let failures: [fn() -> Error; 3] = [
            || Error::NotFound("items/gone".to_string()),
            || Error::Authentication("401 Unauthorized".to_string()),
            || Error::Schema("missing data".to_string()),
        ];

        for failure in failures {
            let attempts = AtomicU32::new(0);
            let counter = &attempts;

            let result: Result<()> = fast(3)
                .execute("items", || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(failure())
                })
                .await;

            assert!(result.is_err());
            assert_eq!(attempts.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;

        let result: Result<()> = fast(2)
            .execute("folders", || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Error::Request("connection reset".to_string()))
            })
            .await;

        assert!(matches!(result, Err(Error::Request(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}

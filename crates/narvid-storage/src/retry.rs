//! Retry with exponential backoff and full jitter.
//!
//! Applied independently to each network call of the upload envelope.
//! Retries only errors `StorageError::is_retryable` accepts; a 4xx
//! fails immediately since retrying a client error cannot succeed.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error::{StorageError, StorageResult};

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt).
    pub max_retries: u32,
    /// Base delay for exponential backoff (in milliseconds).
    pub base_delay_ms: u64,
    /// Cap on the exponential term (in milliseconds).
    pub max_delay_ms: u64,
    /// Operation name for logging.
    pub operation_name: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 5000,
            operation_name: "storage".to_string(),
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with the given operation name.
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            ..Default::default()
        }
    }

    /// Set the maximum number of retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base delay for exponential backoff.
    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    /// Delay before retry number `attempt` (0-based):
    /// `base * 2^attempt + uniform(0, base * 2^attempt)`, with the
    /// exponential term capped at `max_delay_ms`.
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt))
            .min(self.max_delay_ms);
        let jitter = if exp > 0 {
            rand::rng().random_range(0..=exp)
        } else {
            0
        };
        Duration::from_millis(exp.saturating_add(jitter))
    }
}

/// Execute an async storage operation with retry.
///
/// The operation factory is invoked fresh for every attempt so request
/// bodies (file streams) can be rebuilt.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, op: F) -> StorageResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = StorageResult<T>>,
{
    let mut attempt = 0u32;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                let delay = config.delay_for_attempt(attempt);
                attempt += 1;
                warn!(
                    operation = %config.operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "storage operation failed, retrying: {}",
                    e
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_grows_exponentially_with_bounded_jitter() {
        let config = RetryConfig::new("test").with_base_delay_ms(100);

        for attempt in 0..4 {
            let exp = 100u64 * 2u64.pow(attempt);
            let delay = config.delay_for_attempt(attempt).as_millis() as u64;
            assert!(delay >= exp, "delay {} below exponential floor {}", delay, exp);
            assert!(delay <= 2 * exp, "delay {} above jitter ceiling {}", delay, 2 * exp);
        }
    }

    #[test]
    fn test_delay_exponential_term_capped() {
        let config = RetryConfig {
            max_retries: 10,
            base_delay_ms: 1000,
            max_delay_ms: 2000,
            operation_name: "test".to_string(),
        };
        // exp term capped at 2000, jitter at most doubles it
        let delay = config.delay_for_attempt(10).as_millis() as u64;
        assert!(delay <= 4000);
    }

    #[tokio::test]
    async fn test_retries_on_retryable_then_succeeds() {
        let config = RetryConfig::new("test").with_base_delay_ms(1);
        let calls = AtomicU32::new(0);

        let result = with_retry(&config, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(StorageError::from_status(503, "unavailable"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_no_retry_on_client_error() {
        let config = RetryConfig::new("test").with_base_delay_ms(1);
        let calls = AtomicU32::new(0);

        let result: StorageResult<()> = with_retry(&config, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StorageError::from_status(403, "forbidden")) }
        })
        .await;

        assert!(matches!(
            result.unwrap_err(),
            StorageError::Rejected { status: 403, .. }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_exhausted_returns_last_error() {
        let config = RetryConfig::new("test")
            .with_base_delay_ms(1)
            .with_max_retries(2);
        let calls = AtomicU32::new(0);

        let result: StorageResult<()> = with_retry(&config, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StorageError::Network("connection refused".into())) }
        })
        .await;

        assert!(matches!(result.unwrap_err(), StorageError::Network(_)));
        // initial attempt + 2 retries
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}

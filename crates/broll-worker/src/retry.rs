//! Retry utilities with exponential backoff.
//!
//! Used around calls to external services whose failures are usually
//! transient, such as publishing the finished artifact.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::PipelineError;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt).
    pub max_retries: u32,
    /// Base delay for exponential backoff (doubles each attempt).
    pub base_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Operation name for logging.
    pub operation_name: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            operation_name: "operation".to_string(),
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

    /// Calculate delay for a given attempt number.
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.saturating_mul(2u32.pow(attempt));
        delay.min(self.max_delay)
    }
}

/// Retry an operation returning [`PipelineError`], stopping early on
/// errors that will not go away by themselves.
pub async fn retry_pipeline<F, Fut, T>(config: &RetryConfig, operation: F) -> Result<T, PipelineError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, PipelineError>>,
{
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                attempt += 1;
                let delay = config.delay_for_attempt(attempt);
                debug!(
                    "{} attempt {} failed, retrying in {:?}: {}",
                    config.operation_name, attempt, delay, e
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                warn!(
                    "{} failed after {} attempts: {}",
                    config.operation_name,
                    attempt + 1,
                    e
                );
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_retries: u32) -> RetryConfig {
        RetryConfig {
            base_delay: Duration::from_millis(1),
            ..RetryConfig::new("test").with_max_retries(max_retries)
        }
    }

    #[test]
    fn test_retry_config_delay_calculation() {
        let config = RetryConfig::new("test");

        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(800));
    }

    #[test]
    fn test_retry_config_max_delay() {
        let config = RetryConfig::new("test").with_max_retries(10);

        // Should cap at max_delay (5s by default)
        assert_eq!(config.delay_for_attempt(10), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_retry_pipeline_immediate_success() {
        let call_count = AtomicU32::new(0);

        let result = retry_pipeline(&fast(3), || {
            call_count.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, PipelineError>(42) }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_pipeline_stops_on_permanent_error() {
        let call_count = AtomicU32::new(0);

        let result: Result<(), _> = retry_pipeline(&fast(3), || {
            call_count.fetch_add(1, Ordering::SeqCst);
            async { Err(PipelineError::input_invalid("bad")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_pipeline_retries_transient_error() {
        let call_count = AtomicU32::new(0);

        let result = retry_pipeline(&fast(3), || {
            let count = call_count.fetch_add(1, Ordering::SeqCst);
            async move {
                if count == 0 {
                    Err(PipelineError::Io(std::io::Error::other("disk busy")))
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_pipeline_caps_attempts() {
        let call_count = AtomicU32::new(0);

        let result: Result<(), _> = retry_pipeline(&fast(2), || {
            call_count.fetch_add(1, Ordering::SeqCst);
            async { Err(PipelineError::Io(std::io::Error::other("still down"))) }
        })
        .await;

        assert!(matches!(result, Err(PipelineError::Io(_))));
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }
}

use std::time::Duration;
use trendwatch_core::{BilibiliApiError, CoreError, ErrorExt, Settings};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Request budget for signature rejections, and retry budget for
    /// transport failures (on top of the first attempt).
    pub max_attempts: u32,
    /// Unit of the linear backoff (in milliseconds)
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

impl RetryConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            base_delay_ms: settings.retry_base_delay_ms,
        }
    }
}

/// Retry strategy based on error type
#[derive(Debug, Clone, PartialEq)]
pub enum RetryStrategy {
    /// Back off and try again
    Retry,
    /// Fetch fresh signing keys, then try again immediately
    RefreshKeysAndRetry,
    /// The remote answered with an application error; treat as no results
    Degrade,
    /// Don't retry (for permanent failures)
    NoRetry,
}

/// Determine retry strategy based on error type
pub fn get_retry_strategy(error: &CoreError) -> RetryStrategy {
    match error {
        CoreError::BilibiliApi(api_error) => match api_error {
            BilibiliApiError::SignatureRejected { .. } => RetryStrategy::RefreshKeysAndRetry,
            BilibiliApiError::ApiError { .. } => RetryStrategy::Degrade,
            // A truncated or garbled body is usually transient
            BilibiliApiError::InvalidResponse { .. } => RetryStrategy::Retry,
            other if other.is_retryable() => RetryStrategy::Retry,
            _ => RetryStrategy::NoRetry,
        },
        CoreError::Network(_) if error.is_retryable() => {
            RetryStrategy::Retry
        }
        _ => RetryStrategy::NoRetry,
    }
}

/// Linear backoff: the n-th retry waits n × base delay.
pub fn calculate_delay(retry_number: u32, config: &RetryConfig) -> Duration {
    Duration::from_millis(config.base_delay_ms.saturating_mul(retry_number as u64))
}

/// Retry counters for monitoring
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetryMetrics {
    pub transport_retries: u64,
    pub key_refreshes: u64,
    pub exhausted: u64,
    pub degraded: u64,
}

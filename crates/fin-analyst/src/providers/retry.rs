//! Bounded retry with exponential backoff for transient provider failures

use std::future::Future;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::LlmError;

/// Longest wait honoured from a `Retry-After` header
const MAX_RETRY_AFTER_SECS: u64 = 60;

/// Retry settings for one provider
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry, doubled on each further attempt
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }
    }

    /// Wait before retry number `attempt` (0-based)
    pub fn delay_for(&self, err: &LlmError, attempt: u32) -> Duration {
        if let LlmError::RateLimited {
            retry_after_secs: Some(secs),
            ..
        } = err
        {
            return Duration::from_secs((*secs).min(MAX_RETRY_AFTER_SECS));
        }
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

/// Run `op`, retrying transient failures up to `policy.max_retries` times
pub async fn retry_transient<T, F, Fut>(
    provider: &str,
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut attempt = 0u32;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_retries => {
                let delay = policy.delay_for(&err, attempt);
                tracing::warn!(
                    "{} request failed ({}), retrying in {:?} ({}/{})",
                    provider,
                    err,
                    delay,
                    attempt + 1,
                    policy.max_retries
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

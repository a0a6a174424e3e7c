//! Retry loop with exponential backoff.

use super::{ProviderError, RetryPolicy};
use std::future::Future;

/// Run `op`, retrying retryable failures with exponential backoff.
///
/// Only [`ProviderError::RateLimit`] and [`ProviderError::Transient`] are
/// retried; everything else returns immediately. At most
/// `policy.max_attempts` calls are made.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt + 1 < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                tracing::debug!(
                    attempt,
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

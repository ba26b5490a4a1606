//! Shared retry helper for provider HTTP calls.
//!
//! Retry policy lives in [`RetryConfig`](crate::config::RetryConfig);
//! providers wrap their raw request functions in [`with_retry`] so retry
//! logic stays in a single place. The augmentation chain itself never
//! retries: a failed step degrades instead.

use std::future::Future;

use tracing::warn;

use crate::config::RetryConfig;
use crate::telemetry;
use crate::{MuninnError, Result};

/// Execute an async operation with retry logic.
///
/// Retries on transient errors (as classified by
/// [`MuninnError::is_transient()`]) up to `config.max_attempts`, using
/// exponential backoff and respecting `retry_after` hints from `RateLimited`
/// errors.
///
/// Permanent errors are returned immediately without retry.
pub(crate) async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    provider_name: &str,
    operation: &'static str,
    f: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err = None;
    for attempt in 0..config.max_attempts {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() => {
                metrics::counter!(telemetry::RETRIES_TOTAL,
                    "provider" => provider_name.to_owned(),
                    "operation" => operation,
                )
                .increment(1);
                if attempt + 1 < config.max_attempts {
                    let delay = config.effective_delay(attempt, e.retry_after());
                    warn!(
                        provider = provider_name,
                        operation,
                        attempt = attempt + 1,
                        max_attempts = config.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(e);
            }
            Err(e) => return Err(e), // permanent error, no retry
        }
    }
    Err(last_err.unwrap_or_else(|| {
        MuninnError::Configuration("retry config allows zero attempts".to_string())
    }))
}

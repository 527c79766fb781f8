//! Bridges the synchronous index and store traits into async callers with deadlines
//! and bounded retry.

use crate::config::ExecutionConfig;
use crate::error::{CatalogError, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

const JITTER_PCT: f64 = 0.2;
const MAX_BACKOFF: Duration = Duration::from_secs(2);

/// Run `f` on the blocking pool, failing with `unavailable` if it overruns `deadline`.
///
/// An overrun call keeps running on its blocking thread; only the caller stops waiting.
pub async fn blocking<T, F>(
    deadline: Duration,
    op: &str,
    unavailable: fn(String) -> CatalogError,
    f: F,
) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(deadline, tokio::task::spawn_blocking(f)).await {
        Ok(Ok(result)) => result,
        Ok(Err(join)) => Err(unavailable(format!("{} task failed: {}", op, join))),
        Err(_) => Err(unavailable(format!(
            "{} timed out after {}ms",
            op,
            deadline.as_millis()
        ))),
    }
}

pub fn backoff_for_attempt(base: Duration, attempt: u32) -> Duration {
    let exp = 2u32.saturating_pow(attempt.saturating_sub(1));
    let delay = base.checked_mul(exp).unwrap_or(MAX_BACKOFF).min(MAX_BACKOFF);
    let jitter = rand::thread_rng().gen_range(0.0..=JITTER_PCT);
    delay.mul_f64(1.0 + jitter)
}

/// Retry `f` while it fails with a retryable error, up to `policy.retry_attempts` tries.
pub async fn with_retry<T, F, Fut>(policy: &ExecutionConfig, op: &str, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.retry_attempts => {
                let delay = backoff_for_attempt(policy.retry_base_delay(), attempt);
                tracing::warn!(
                    op = op,
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying after transient failure"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

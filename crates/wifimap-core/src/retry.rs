//! Retry with exponential back-off and jitter.
//!
//! Each caller supplies its own predicate: the database retries timeouts and
//! dropped connections, the reply client only failures LINE cannot have
//! processed, the image proxy upstream 5xx and 429.

use std::future::Future;
use std::time::Duration;

/// Un-jittered delay before the `retry`-th retry (1-based):
/// `backoff_base_ms × 2^(retry-1)`, capped at `max_delay_ms`.
#[must_use]
pub fn nominal_delay_ms(backoff_base_ms: u64, max_delay_ms: u64, retry: u32) -> u64 {
    let exponent = retry.saturating_sub(1).min(10);
    backoff_base_ms
        .saturating_mul(1u64 << exponent)
        .min(max_delay_ms)
}

/// Runs `operation` with up to `max_retries` additional attempts while
/// `is_retriable` holds for the error.
///
/// Each sleep is [`nominal_delay_ms`] ± 25 % jitter.
///
/// # Errors
///
/// The first non-retriable error, or the last error once retries run out.
pub async fn retry_with_backoff<T, E, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    max_delay_ms: u64,
    is_retriable: fn(&E) -> bool,
    mut operation: F,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let capped = nominal_delay_ms(backoff_base_ms, max_delay_ms, attempt);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

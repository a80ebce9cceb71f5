//! Bounded retry with exponential backoff for channel operations.

use crate::models::error::{ChannelError, Result, SimError};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

const BASE_DELAY: Duration = Duration::from_millis(500);

/// Run `op` up to `max_attempts` times, backing off exponentially between
/// retryable failures. Non-retryable errors propagate immediately.
pub async fn with_retry<T, F, Fut>(max_attempts: u32, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error: Option<SimError> = None;

    for attempt in 0..max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() => {
                if attempt < max_attempts - 1 {
                    let backoff = BASE_DELAY * 2u32.pow(attempt);
                    debug!(
                        attempt = attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "retrying after transient channel error"
                    );
                    tokio::time::sleep(backoff).await;
                }
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(ChannelError::RetriesExhausted {
        attempts: max_attempts,
        last_error: last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string()),
    }
    .into())
}

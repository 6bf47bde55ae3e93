use std::time::Duration;
use tokio::time::sleep;

const MAX_DELAY: Duration = Duration::from_secs(5);

/// Runs `operation` until it succeeds or `max_retries` extra attempts have failed,
/// doubling the pause between attempts up to five seconds.
pub async fn retry_with_backoff<F, T, E>(
    operation_name: &str,
    mut operation: F,
    max_retries: usize,
    initial_delay: Duration,
) -> Result<T, E>
where
    F: FnMut() -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<T, E>> + Send>>,
    E: std::fmt::Display,
{
    let mut delay = initial_delay;
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt < max_retries => {
                attempt += 1;
                tracing::warn!(
                    "{} attempt {} failed: {}. Retrying in {:?}...",
                    operation_name,
                    attempt,
                    e,
                    delay
                );
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
            Err(e) => {
                tracing::error!(
                    "{} failed after {} attempts: {}",
                    operation_name,
                    attempt + 1,
                    e
                );
                return Err(e);
            }
        }
    }
}

use std::time::Duration;

use tokio::time::sleep;
use tokio::time::timeout;
use tracing::warn;

use crate::BackoffPolicy;
use crate::Error;
use crate::Result;
use crate::TransportError;

/// Run `task` until it succeeds, retrying with exponential backoff.
///
/// Each attempt is bounded by `policy.timeout_ms`; delays start at
/// `policy.base_delay_ms`, double per attempt and are capped at
/// `policy.max_delay_ms`. The last error is returned once attempts run out.
pub(crate) async fn task_with_timeout_and_exponential_backoff<F, T, P>(
    task: F,
    policy: BackoffPolicy,
) -> Result<P>
where
    F: Fn() -> T,
    T: std::future::Future<Output = Result<P>>,
{
    let max_attempts = policy.max_retries.max(1);
    let timeout_duration = Duration::from_millis(policy.timeout_ms);
    let max_delay = Duration::from_millis(policy.max_delay_ms);
    let mut delay = Duration::from_millis(policy.base_delay_ms);

    let mut attempt = 0;
    loop {
        attempt += 1;
        let error = match timeout(timeout_duration, task()).await {
            Ok(Ok(r)) => return Ok(r),
            Ok(Err(error)) => {
                warn!(attempt, "task failed with error: {:?}", &error);
                error
            }
            Err(_) => {
                warn!(attempt, "task timed out after {:?}", timeout_duration);
                Error::Transport(TransportError::Timeout(timeout_duration))
            }
        };

        if attempt >= max_attempts {
            warn!("Task failed after {} attempts", attempt);
            return Err(error);
        }

        sleep(delay).await;
        delay = (delay * 2).min(max_delay);
    }
}

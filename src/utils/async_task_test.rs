use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use super::async_task::task_with_timeout_and_exponential_backoff;
use crate::BackoffPolicy;
use crate::Error;
use crate::TransportError;

fn policy(max_retries: usize) -> BackoffPolicy {
    BackoffPolicy {
        max_retries,
        timeout_ms: 100,
        base_delay_ms: 10,
        max_delay_ms: 40,
    }
}

#[tokio::test(start_paused = true)]
async fn test_task_succeeds_after_transient_failures() {
    let calls = AtomicUsize::new(0);
    let counter = &calls;

    let result = task_with_timeout_and_exponential_backoff(
        move || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(Error::Transport(TransportError::ConnectionLoss))
            } else {
                Ok(n)
            }
        },
        policy(5),
    )
    .await;

    assert_eq!(result.unwrap(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_task_returns_last_error_when_attempts_exhausted() {
    let calls = AtomicUsize::new(0);
    let counter = &calls;

    let result: crate::Result<()> = task_with_timeout_and_exponential_backoff(
        move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(Error::Transport(TransportError::SessionExpired))
        },
        policy(3),
    )
    .await;

    assert!(matches!(
        result,
        Err(Error::Transport(TransportError::SessionExpired))
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_task_timeout_is_reported_as_transport_timeout() {
    let result: crate::Result<()> = task_with_timeout_and_exponential_backoff(
        || async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        },
        policy(1),
    )
    .await;

    assert!(matches!(
        result,
        Err(Error::Transport(TransportError::Timeout(d))) if d == Duration::from_millis(100)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_zero_retries_still_runs_once() {
    let calls = AtomicUsize::new(0);
    let counter = &calls;

    let result = task_with_timeout_and_exponential_backoff(
        move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        },
        policy(0),
    )
    .await;

    assert!(result.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

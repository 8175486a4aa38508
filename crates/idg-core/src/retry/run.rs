//! Retry loop: run an attempt until success, budget exhaustion, or cancellation.

use std::fmt::Display;
use std::future::Future;

use super::policy::{RetryDecision, RetryPolicy};
use crate::control::CancelToken;

/// Outcome of `run_with_retry`: the final result and how many attempts ran.
#[derive(Debug)]
pub struct RetryReport<T, E> {
    pub attempts: u32,
    pub result: Result<T, E>,
}

enum State<E> {
    Requesting,
    Retrying(E),
    Failed(E),
}

/// Runs `attempt_fn(attempt)` (attempt is 1-based) until it succeeds or the
/// policy says stop. Sleeps the policy's backoff between attempts. A raised
/// cancellation stops further attempts; the in-flight one is never interrupted.
pub async fn run_with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancelToken,
    mut attempt_fn: F,
) -> RetryReport<T, E>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut cancel = cancel.clone();
    let mut attempt = 0u32;
    let mut state = State::Requesting;
    loop {
        state = match state {
            State::Requesting => {
                attempt += 1;
                match attempt_fn(attempt).await {
                    Ok(value) => {
                        return RetryReport {
                            attempts: attempt,
                            result: Ok(value),
                        }
                    }
                    Err(e) => State::Retrying(e),
                }
            }
            State::Retrying(e) => match policy.decide(attempt) {
                RetryDecision::NoRetry => State::Failed(e),
                RetryDecision::RetryAfter(_) if cancel.is_raised() => State::Failed(e),
                RetryDecision::RetryAfter(delay) => {
                    tracing::warn!(
                        attempt,
                        max = policy.max_attempts,
                        "attempt failed: {}; retrying in {:?}",
                        e,
                        delay
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => State::Requesting,
                        _ = cancel.raised() => State::Failed(e),
                    }
                }
            },
            State::Failed(e) => {
                return RetryReport {
                    attempts: attempt,
                    result: Err(e),
                }
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::cancel_pair;
    use std::time::Duration;

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let (_handle, token) = cancel_pair();
        let policy = RetryPolicy::new(5, Duration::from_millis(1));
        let report = run_with_retry(&policy, &token, |attempt| async move {
            if attempt < 3 {
                Err(format!("boom {}", attempt))
            } else {
                Ok(attempt)
            }
        })
        .await;
        assert_eq!(report.attempts, 3);
        assert_eq!(report.result.unwrap(), 3);
    }

    #[tokio::test]
    async fn stops_at_max_attempts() {
        let (_handle, token) = cancel_pair();
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let report: RetryReport<(), String> =
            run_with_retry(&policy, &token, |_| async { Err("always".to_string()) }).await;
        assert_eq!(report.attempts, 3);
        assert_eq!(report.result.unwrap_err(), "always");
    }

    #[tokio::test]
    async fn cancellation_stops_retrying() {
        let (handle, token) = cancel_pair();
        handle.raise();
        let policy = RetryPolicy::new(10, Duration::from_secs(60));
        let report: RetryReport<(), String> =
            run_with_retry(&policy, &token, |_| async { Err("fail".to_string()) }).await;
        assert_eq!(report.attempts, 1);
        assert!(report.result.is_err());
    }

    #[tokio::test]
    async fn cancellation_interrupts_backoff() {
        let (handle, token) = cancel_pair();
        let policy = RetryPolicy::new(10, Duration::from_secs(60));
        let task = tokio::spawn(async move {
            let report: RetryReport<(), String> =
                run_with_retry(&policy, &token, |_| async { Err("fail".to_string()) }).await;
            report.attempts
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.raise();
        let attempts = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("backoff interrupted")
            .unwrap();
        assert_eq!(attempts, 1);
    }
}

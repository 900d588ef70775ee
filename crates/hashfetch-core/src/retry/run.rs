//! Retry loop: run an async attempt until success or the policy says stop.

use std::future::Future;
use std::time::Duration;

use super::classify;
use super::error::AttemptError;
use super::policy::{RetryDecision, RetryPolicy};

/// Last error of a task whose attempts are exhausted (or that hit a fatal error).
#[derive(Debug)]
pub struct Exhausted {
    pub error: AttemptError,
    /// Number of attempts made, including the failing one.
    pub attempts: u32,
}

/// Runs `attempt_fn` until it succeeds or the retry policy says to stop.
///
/// `attempt_fn` receives the 1-based attempt number. Before each retry,
/// `on_retry(attempt, &error, delay)` is called, then the task sleeps for
/// `delay` without blocking the runtime thread.
pub async fn run_with_retry<T, F, Fut, H>(
    policy: &RetryPolicy,
    mut attempt_fn: F,
    mut on_retry: H,
) -> Result<T, Exhausted>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
    H: FnMut(u32, &AttemptError, Duration),
{
    let mut attempt = 1u32;
    loop {
        match attempt_fn(attempt).await {
            Ok(v) => return Ok(v),
            Err(error) => {
                let kind = classify::classify(&error);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => {
                        return Err(Exhausted {
                            error,
                            attempts: attempt,
                        })
                    }
                    RetryDecision::RetryAfter(d) => {
                        on_retry(attempt, &error, d);
                        tokio::time::sleep(d).await;
                        attempt += 1;
                    }
                }
            }
        }
    }
}

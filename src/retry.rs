// SPDX-License-Identifier: GPL-3.0-only

//! Retry with exponential backoff
//!
//! Camera acquisition and endpoint calls share the same policy shape: a fixed
//! attempt budget and a wait of `initial_backoff * 2^attempt_index` between
//! attempts. The final failure is returned rather than waited on.

use crate::constants::retry::{INITIAL_BACKOFF_MS, MAX_ATTEMPTS};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Attempt budget and backoff base
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
        }
    }

    /// Wait after the failed attempt at `attempt_index` (0-based)
    pub fn backoff(&self, attempt_index: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt_index))
    }
}

/// Why a retried operation gave up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// Every attempt failed; carries the last failure
    Exhausted { attempts: u32, last: E },
    /// The token fired during an attempt or a backoff wait
    Cancelled,
}

/// Run `operation` until it succeeds or the policy's budget is spent
///
/// `operation` receives the 0-based attempt index. Both the attempt itself
/// and the backoff wait race against `cancel`.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    label: &str,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        debug!(label, attempt = attempt + 1, max_attempts, "Attempt started");

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
            outcome = operation(attempt) => outcome,
        };

        let error = match outcome {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if attempt + 1 >= max_attempts {
            warn!(label, attempts = max_attempts, error = %error, "Retry budget exhausted");
            return Err(RetryError::Exhausted {
                attempts: max_attempts,
                last: error,
            });
        }

        let delay = policy.backoff(attempt);
        warn!(
            label,
            attempt = attempt + 1,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Attempt failed, backing off"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }

        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_millis(1000));
        assert_eq!(policy.backoff(1), Duration::from_millis(2000));
        assert_eq!(policy.backoff(2), Duration::from_millis(4000));
    }

    #[test]
    fn test_zero_attempts_clamped() {
        let policy = RetryPolicy::new(0, Duration::from_millis(10));
        assert_eq!(policy.max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_waits_one_then_two_seconds() {
        let calls = Arc::new(AtomicU32::new(0));
        let started = Instant::now();
        let seen = calls.clone();

        let result: Result<(), RetryError<String>> = retry_with_backoff(
            &RetryPolicy::default(),
            &CancellationToken::new(),
            "test",
            |_| {
                let seen = seen.clone();
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Err("down".to_string())
                }
            },
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_millis(3000));
        assert_eq!(
            result,
            Err(RetryError::Exhausted {
                attempts: 3,
                last: "down".to_string()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_second_attempt() {
        let started = Instant::now();
        let result: Result<u32, RetryError<String>> = retry_with_backoff(
            &RetryPolicy::default(),
            &CancellationToken::new(),
            "test",
            |attempt| async move {
                if attempt == 0 {
                    Err("flaky".to_string())
                } else {
                    Ok(attempt)
                }
            },
        )
        .await;

        assert_eq!(result, Ok(1));
        assert_eq!(started.elapsed(), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.cancel();
        });

        let result: Result<(), RetryError<String>> = retry_with_backoff(
            &RetryPolicy::default(),
            &cancel,
            "test",
            |_| async { Err("down".to_string()) },
        )
        .await;

        assert_eq!(result, Err(RetryError::Cancelled));
    }
}

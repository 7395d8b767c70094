//! Retry with exponential backoff.
//!
//! [`retry`] runs an operation up to [`RetryPolicy::max_attempts`] times.
//! Only errors whose [`Retryable::is_retryable`] returns true are retried;
//! anything else stops immediately. The result is a tagged
//! [`RetryOutcome`] rather than a bare `Result`, so callers can tell an
//! exhausted budget from a fatal error.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Configuration for retry with exponential backoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds.
    pub base_delay_ms: u64,
    /// Multiplier applied to the delay after each retry.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2000,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy with custom values.
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay_ms: u64, multiplier: f64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            multiplier,
        }
    }

    /// Delay before retry number `retry` (0-indexed):
    /// `base_delay * multiplier^retry`.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap
    )]
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        let delay_ms = self.base_delay_ms as f64 * self.multiplier.powi(retry as i32);
        Duration::from_millis(delay_ms.max(0.0) as u64)
    }
}

/// Errors that know whether another attempt may succeed.
pub trait Retryable {
    /// Whether the failed operation is worth retrying.
    fn is_retryable(&self) -> bool;
}

impl Retryable for ServiceError {
    fn is_retryable(&self) -> bool {
        ServiceError::is_retryable(self)
    }
}

/// Source of backoff delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Wait for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Announced before each backoff delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryNotice {
    /// The attempt about to be made (2 for the first retry).
    pub next_attempt: u32,
    /// Total attempts allowed.
    pub max_attempts: u32,
    /// Delay before the next attempt.
    pub delay: Duration,
}

/// Tagged result of [`retry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T, E> {
    /// An attempt succeeded.
    Success {
        /// Value from the successful attempt.
        value: T,
        /// Attempts made, including the successful one.
        attempts: u32,
    },
    /// Every attempt failed with a retryable error.
    Exhausted {
        /// Error from the final attempt.
        error: E,
        /// Attempts made.
        attempts: u32,
    },
    /// An attempt failed with a non-retryable error.
    Fatal {
        /// The non-retryable error.
        error: E,
        /// Attempts made, including the fatal one.
        attempts: u32,
    },
}

impl<T, E> RetryOutcome<T, E> {
    /// Number of attempts made.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts, .. }
            | Self::Exhausted { attempts, .. }
            | Self::Fatal { attempts, .. } => *attempts,
        }
    }

    /// Collapse into a `Result`, dropping the tag.
    ///
    /// # Errors
    ///
    /// Returns the final error for [`RetryOutcome::Exhausted`] and
    /// [`RetryOutcome::Fatal`].
    pub fn into_result(self) -> Result<T, E> {
        match self {
            Self::Success { value, .. } => Ok(value),
            Self::Exhausted { error, .. } | Self::Fatal { error, .. } => Err(error),
        }
    }
}

/// Run `operation` under `policy`.
///
/// `operation` receives the 1-based attempt number. Before every backoff
/// delay `on_retry` is called with the upcoming attempt and its delay. A
/// policy with `max_attempts == 0` still makes one attempt.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    mut on_retry: impl FnMut(RetryNotice) + Send,
    mut operation: F,
) -> RetryOutcome<T, E>
where
    E: Retryable,
    F: FnMut(u32) -> Fut + Send,
    Fut: Future<Output = Result<T, E>> + Send,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                return RetryOutcome::Success {
                    value,
                    attempts: attempt,
                }
            }
            Err(error) if !error.is_retryable() => {
                return RetryOutcome::Fatal {
                    error,
                    attempts: attempt,
                }
            }
            Err(error) if attempt >= max_attempts => {
                return RetryOutcome::Exhausted {
                    error,
                    attempts: attempt,
                }
            }
            Err(_) => {
                let delay = policy.delay_for_attempt(attempt - 1);
                let notice = RetryNotice {
                    next_attempt: attempt + 1,
                    max_attempts,
                    delay,
                };
                tracing::debug!(
                    attempt = notice.next_attempt,
                    max_attempts,
                    delay_ms = %delay.as_millis(),
                    "Retrying after backoff"
                );
                on_retry(notice);
                sleeper.sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingSleeper(Mutex<Vec<Duration>>);

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.0.lock().unwrap().push(duration);
        }
    }

    impl RecordingSleeper {
        fn millis(&self) -> Vec<u128> {
            self.0.lock().unwrap().iter().map(Duration::as_millis).collect()
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_for_attempt(0).as_millis(), 2000);
        assert_eq!(policy.delay_for_attempt(1).as_millis(), 4000);
        assert_eq!(policy.delay_for_attempt(2).as_millis(), 8000);
    }

    #[test]
    fn test_policy_serde_defaults() {
        let policy: RetryPolicy = serde_json::from_str(r#"{"max_attempts": 5}"#).unwrap();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay_ms, 2000);
    }

    #[tokio::test]
    async fn test_success_after_rate_limits() {
        let sleeper = RecordingSleeper::default();
        let mut notices = Vec::new();

        let outcome = retry(
            &RetryPolicy::default(),
            &sleeper,
            |n| notices.push(n.next_attempt),
            |attempt| async move {
                if attempt < 3 {
                    Err(ServiceError::rate_limited("429"))
                } else {
                    Ok(attempt)
                }
            },
        )
        .await;

        assert_eq!(outcome, RetryOutcome::Success { value: 3, attempts: 3 });
        assert_eq!(sleeper.millis(), vec![2000, 4000]);
        assert_eq!(notices, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_exhausted() {
        let sleeper = RecordingSleeper::default();
        let outcome: RetryOutcome<(), _> = retry(
            &RetryPolicy::default(),
            &sleeper,
            |_| {},
            |_| async { Err(ServiceError::rate_limited("quota")) },
        )
        .await;

        assert!(matches!(outcome, RetryOutcome::Exhausted { attempts: 3, .. }));
        assert_eq!(sleeper.millis(), vec![2000, 4000]);
    }

    #[tokio::test]
    async fn test_fatal_error_stops_immediately() {
        let sleeper = RecordingSleeper::default();
        let outcome: RetryOutcome<(), _> = retry(
            &RetryPolicy::default(),
            &sleeper,
            |_| {},
            |_| async { Err(ServiceError::network("refused")) },
        )
        .await;

        assert!(matches!(outcome, RetryOutcome::Fatal { attempts: 1, .. }));
        assert!(sleeper.millis().is_empty());
        assert!(outcome.into_result().is_err());
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let sleeper = RecordingSleeper::default();
        let outcome = retry(
            &RetryPolicy::new(0, 10, 2.0),
            &sleeper,
            |_| {},
            |_| async { Ok::<_, ServiceError>("done") },
        )
        .await;
        assert_eq!(outcome.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_sleeper_advances_virtual_clock() {
        let start = tokio::time::Instant::now();
        TokioSleeper.sleep(Duration::from_millis(2000)).await;
        assert!(start.elapsed() >= Duration::from_millis(2000));
    }
}

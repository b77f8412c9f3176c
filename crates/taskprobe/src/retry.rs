//! Bounded polling for eventually-consistent UI state.
//!
//! Every lookup and assertion in the harness goes through [`retry`]: the check
//! is re-run against a fresh page snapshot until it passes or the timeout
//! elapses. Stale-element errors count as a failed attempt; any other error
//! aborts the poll immediately.

use crate::result::ProbeResult;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Result of one check attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome<T> {
    /// The check held, producing a value
    Pass(T),
    /// The check did not hold yet
    Fail(String),
}

impl<T> CheckOutcome<T> {
    /// Check if the outcome is a pass
    #[must_use]
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Pass(_))
    }
}

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total timeout duration
    pub timeout: Duration,
    /// Interval between attempts
    pub poll_interval: Duration,
    /// Maximum number of attempts (0 = unlimited within timeout)
    pub max_retries: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(100),
            max_retries: 0,
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with timeout
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            poll_interval: Duration::from_millis(100),
            max_retries: 0,
        }
    }

    /// A single attempt, no waiting
    #[must_use]
    pub const fn once() -> Self {
        Self {
            timeout: Duration::ZERO,
            poll_interval: Duration::ZERO,
            max_retries: 1,
        }
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set maximum attempts
    #[must_use]
    pub const fn with_max_retries(mut self, max: usize) -> Self {
        self.max_retries = max;
        self
    }

    /// Timeout in whole milliseconds
    #[must_use]
    pub const fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

/// A check that eventually passed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryResult<T> {
    /// Value produced by the passing attempt
    pub value: T,
    /// Number of attempts made
    pub attempts: usize,
    /// Time until the pass
    pub duration: Duration,
}

/// A check that never passed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryError {
    /// Failure message of the last attempt
    pub message: String,
    /// Number of attempts made
    pub attempts: usize,
    /// Time spent
    pub duration: Duration,
}

impl RetryError {
    /// Time spent in whole milliseconds
    #[must_use]
    pub const fn elapsed_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }
}

/// Outcome of a full poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Retried<T> {
    /// The check passed within the budget
    Passed(RetryResult<T>),
    /// The budget ran out
    Exhausted(RetryError),
}

impl<T> Retried<T> {
    /// Value of a passed poll
    #[must_use]
    pub fn passed(self) -> Option<T> {
        match self {
            Self::Passed(result) => Some(result.value),
            Self::Exhausted(_) => None,
        }
    }
}

/// Poll `check` until it passes, the timeout elapses or it errors.
///
/// The check always runs at least once, so a zero timeout is a one-shot
/// probe.
pub async fn retry<T, F, Fut>(config: RetryConfig, mut check: F) -> ProbeResult<Retried<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeResult<CheckOutcome<T>>>,
{
    let start = Instant::now();
    let mut attempts = 0;

    loop {
        attempts += 1;

        let message = match check().await {
            Ok(CheckOutcome::Pass(value)) => {
                return Ok(Retried::Passed(RetryResult {
                    value,
                    attempts,
                    duration: start.elapsed(),
                }));
            }
            Ok(CheckOutcome::Fail(message)) => message,
            Err(err) if err.is_stale() => err.to_string(),
            Err(err) => return Err(err),
        };

        let elapsed = start.elapsed();
        let out_of_attempts = config.max_retries > 0 && attempts >= config.max_retries;
        if elapsed >= config.timeout || out_of_attempts {
            tracing::debug!(attempts, elapsed_ms = elapsed.as_millis() as u64, %message, "poll exhausted");
            return Ok(Retried::Exhausted(RetryError {
                message,
                attempts,
                duration: elapsed,
            }));
        }

        let remaining = config.timeout.saturating_sub(elapsed);
        tokio::time::sleep(config.poll_interval.min(remaining)).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::result::ProbeError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    mod config_tests {
        use super::*;

        #[test]
        fn test_defaults_match_expect_timeout() {
            let config = RetryConfig::default();
            assert_eq!(config.timeout_ms(), 10_000);
            assert_eq!(config.poll_interval, Duration::from_millis(100));
            assert_eq!(config.max_retries, 0);
        }

        #[test]
        fn test_builders() {
            let config = RetryConfig::new(Duration::from_secs(2))
                .with_poll_interval(Duration::from_millis(20))
                .with_max_retries(3);
            assert_eq!(config.timeout_ms(), 2000);
            assert_eq!(config.poll_interval, Duration::from_millis(20));
            assert_eq!(config.max_retries, 3);
        }
    }

    mod retry_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_passes_after_some_attempts() {
            let calls = &AtomicUsize::new(0);
            let outcome = retry(RetryConfig::new(Duration::from_secs(1)), move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(if n >= 3 {
                    CheckOutcome::Pass(n)
                } else {
                    CheckOutcome::Fail(format!("attempt {n}"))
                })
            })
            .await
            .unwrap();

            match outcome {
                Retried::Passed(result) => {
                    assert_eq!(result.value, 3);
                    assert_eq!(result.attempts, 3);
                    assert_eq!(result.duration, Duration::from_millis(200));
                }
                Retried::Exhausted(err) => panic!("unexpected {err:?}"),
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_exhausts_at_timeout() {
            let outcome: Retried<()> = retry(
                RetryConfig::new(Duration::from_millis(250)),
                || async { Ok(CheckOutcome::Fail("never".to_string())) },
            )
            .await
            .unwrap();

            match outcome {
                Retried::Exhausted(err) => {
                    assert_eq!(err.message, "never");
                    // t=0,100,200,250
                    assert_eq!(err.attempts, 4);
                    assert_eq!(err.elapsed_ms(), 250);
                }
                Retried::Passed(_) => panic!("should not pass"),
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_once_makes_a_single_attempt() {
            let calls = &AtomicUsize::new(0);
            let outcome: Retried<()> = retry(RetryConfig::once(), move || async move {
                let _ = calls.fetch_add(1, Ordering::SeqCst);
                Ok(CheckOutcome::Fail("no".to_string()))
            })
            .await
            .unwrap();
            assert!(outcome.passed().is_none());
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_stale_errors_are_retried() {
            let calls = &AtomicUsize::new(0);
            let outcome = retry(RetryConfig::new(Duration::from_secs(1)), move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ProbeError::StaleElement {
                        target: "card".to_string(),
                    })
                } else {
                    Ok(CheckOutcome::Pass("fresh"))
                }
            })
            .await
            .unwrap();
            assert_eq!(outcome.passed(), Some("fresh"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_other_errors_abort() {
            let calls = &AtomicUsize::new(0);
            let result: ProbeResult<Retried<()>> =
                retry(RetryConfig::new(Duration::from_secs(1)), move || async move {
                    let _ = calls.fetch_add(1, Ordering::SeqCst);
                    Err(ProbeError::AmbiguousMatch {
                        target: "card".to_string(),
                        count: 2,
                    })
                })
                .await;
            assert!(matches!(result, Err(ProbeError::AmbiguousMatch { .. })));
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }
}

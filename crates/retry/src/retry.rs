use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::ExponentialBackoff;

/// Attempt budget and delay shape for one retry chain
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Jitter added on top of each delay, as a fraction of the exponential term
    pub jitter_ratio: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            jitter_ratio: 0.3,
        }
    }

    pub fn with_jitter(mut self, ratio: f64) -> Self {
        self.jitter_ratio = ratio;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(self.base_delay, self.max_delay).with_jitter(self.jitter_ratio)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(100), Duration::from_secs(5))
    }
}

/// The last thing that went wrong before the budget ran out
#[derive(Debug, Clone, PartialEq)]
pub enum LastFailure<T, E> {
    Error(E),
    /// The operation returned, but the caller judged the value unsuccessful
    Unsuccessful(T),
}

impl<T, E> LastFailure<T, E> {
    pub fn into_error(self) -> Option<E> {
        match self {
            LastFailure::Error(e) => Some(e),
            LastFailure::Unsuccessful(_) => None,
        }
    }
}

impl<T: fmt::Debug, E: fmt::Display> fmt::Display for LastFailure<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LastFailure::Error(e) => write!(f, "{}", e),
            LastFailure::Unsuccessful(value) => write!(f, "unsuccessful result: {:?}", value),
        }
    }
}

#[derive(Debug, Error)]
pub enum RetryError<T: fmt::Debug, E: fmt::Display + fmt::Debug> {
    #[error("retry exhausted after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: LastFailure<T, E> },

    #[error("non-retryable error on attempt {attempt}: {error}")]
    Aborted { attempt: u32, error: E },
}

impl<T: fmt::Debug, E: fmt::Display + fmt::Debug> RetryError<T, E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } => *attempts,
            RetryError::Aborted { attempt, .. } => *attempt,
        }
    }
}

/// Run `op` until `is_success` accepts its value or `policy.max_attempts` is spent.
///
/// Errors and unsuccessful values both count as retryable failures. `op`
/// receives the 1-based attempt number.
pub async fn run_with_retry<T, E, F, Fut, S>(
    operation_name: &str,
    policy: &RetryPolicy,
    op: F,
    is_success: S,
) -> Result<T, RetryError<T, E>>
where
    T: fmt::Debug,
    E: fmt::Display + fmt::Debug,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    S: Fn(&T) -> bool,
{
    run_with_retry_if(operation_name, policy, op, is_success, |_| true).await
}

/// Like [`run_with_retry`], but stops immediately on errors `is_retryable` rejects
pub async fn run_with_retry_if<T, E, F, Fut, S, R>(
    operation_name: &str,
    policy: &RetryPolicy,
    mut op: F,
    is_success: S,
    is_retryable: R,
) -> Result<T, RetryError<T, E>>
where
    T: fmt::Debug,
    E: fmt::Display + fmt::Debug,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    S: Fn(&T) -> bool,
    R: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut backoff = policy.backoff();
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        let last = match op(attempt).await {
            Ok(value) if is_success(&value) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempts = attempt,
                        "operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Ok(value) => LastFailure::Unsuccessful(value),
            Err(error) if !is_retryable(&error) => {
                warn!(
                    operation = operation_name,
                    attempt,
                    error = %error,
                    "non-retryable error, not retrying"
                );
                return Err(RetryError::Aborted { attempt, error });
            }
            Err(error) => LastFailure::Error(error),
        };

        if attempt >= max_attempts {
            warn!(
                operation = operation_name,
                attempts = attempt,
                last = %last,
                "all retry attempts exhausted"
            );
            return Err(RetryError::Exhausted {
                attempts: attempt,
                last,
            });
        }

        let delay = backoff.next_delay();
        debug!(
            operation = operation_name,
            attempt,
            max_attempts,
            backoff_ms = delay.as_millis() as u64,
            last = %last,
            "attempt failed, backing off"
        );
        sleep(delay).await;
    }
}

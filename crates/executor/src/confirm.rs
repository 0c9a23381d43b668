//! Confirmation polling shared by every strategy

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::debug;
use txsettle_ledger::{Confirmation, LedgerClient, LedgerError};
use txsettle_retry::{run_with_retry_if, RetryError, RetryPolicy};
use txsettle_types::SessionLease;

use crate::ExecutorError;

/// Answer of one confirmation query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollVerdict {
    Confirmed {
        /// Inferred from a finalized target height rather than observed
        optimistic: bool,
    },
    Pending,
    Rejected(String),
}

impl PollVerdict {
    pub fn from_confirmation(confirmation: Confirmation) -> Self {
        match confirmation {
            Confirmation {
                error: Some(reason),
                ..
            } => PollVerdict::Rejected(reason),
            Confirmation {
                confirmed: true, ..
            } => PollVerdict::Confirmed { optimistic: false },
            _ => PollVerdict::Pending,
        }
    }
}

/// Error raised by a single poll. Anything but an explicit rejection is retried.
pub fn poll_error(err: LedgerError) -> ExecutorError {
    match err {
        LedgerError::Rejected(reason) => ExecutorError::Rejected(reason),
        other => ExecutorError::LedgerUnavailable(other.to_string()),
    }
}

fn is_retryable(err: &ExecutorError) -> bool {
    matches!(err, ExecutorError::LedgerUnavailable(_))
}

/// Poll `check` with backoff until it confirms, the lease expires, the budget
/// runs out or `timeout` elapses
///
/// The current height is read before every query; once it reaches the lease
/// expiry no further query is issued. `polls` counts the queries actually sent.
/// Returns whether the confirmation was optimistic.
pub async fn poll_confirmation<F, Fut>(
    ledger: &dyn LedgerClient,
    lease: &SessionLease,
    policy: &RetryPolicy,
    timeout: Duration,
    polls: &AtomicU32,
    check: F,
) -> Result<bool, ExecutorError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<PollVerdict, ExecutorError>>,
{
    let check = &check;
    let polling = run_with_retry_if(
        "confirm",
        policy,
        move |attempt| poll_once(ledger, lease, polls, check, attempt),
        |verdict| matches!(verdict, PollVerdict::Confirmed { .. }),
        is_retryable,
    );

    match tokio::time::timeout(timeout, polling).await {
        Err(_) => Err(ExecutorError::Timeout),
        Ok(Ok(PollVerdict::Confirmed { optimistic })) => Ok(optimistic),
        Ok(Ok(verdict)) => Err(ExecutorError::RetryExhausted(format!(
            "unexpected verdict {verdict:?}"
        ))),
        Ok(Err(RetryError::Aborted { error, .. })) => Err(error),
        Ok(Err(RetryError::Exhausted { attempts, last })) => Err(ExecutorError::RetryExhausted(
            format!("not confirmed after {attempts} polls: {last}"),
        )),
    }
}

async fn poll_once<F, Fut>(
    ledger: &dyn LedgerClient,
    lease: &SessionLease,
    polls: &AtomicU32,
    check: &F,
    attempt: u32,
) -> Result<PollVerdict, ExecutorError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<PollVerdict, ExecutorError>>,
{
    let height = ledger
        .get_current_height()
        .await
        .map_err(|e| ExecutorError::LedgerUnavailable(e.to_string()))?;

    if lease.is_expired_at(height) {
        debug!(
            attempt,
            height,
            expiry_height = lease.expiry_height,
            "lease expired, stopping confirmation"
        );
        return Err(ExecutorError::LeaseExpired);
    }

    polls.fetch_add(1, Ordering::SeqCst);
    match check().await? {
        PollVerdict::Rejected(reason) => Err(ExecutorError::Rejected(reason)),
        verdict => Ok(verdict),
    }
}

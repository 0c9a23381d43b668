use thiserror::Error;
use txsettle_ledger::LedgerError;
use txsettle_types::FailureReason;

/// Executor failures, one per [`FailureReason`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("session lease expired")]
    LeaseExpired,

    #[error("retry exhausted: {0}")]
    RetryExhausted(String),

    #[error("confirmation timed out")]
    Timeout,

    #[error("rejected: {0}")]
    Rejected(String),
}

impl ExecutorError {
    pub fn failure_reason(&self) -> FailureReason {
        match self {
            ExecutorError::LedgerUnavailable(msg) => FailureReason::LedgerUnavailable(msg.clone()),
            ExecutorError::LeaseExpired => FailureReason::LeaseExpired,
            ExecutorError::RetryExhausted(msg) => FailureReason::RetryExhausted(msg.clone()),
            ExecutorError::Timeout => FailureReason::Timeout,
            ExecutorError::Rejected(msg) => FailureReason::Rejected(msg.clone()),
        }
    }
}

impl From<ExecutorError> for FailureReason {
    fn from(err: ExecutorError) -> Self {
        err.failure_reason()
    }
}

impl From<LedgerError> for ExecutorError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Rejected(msg) => ExecutorError::Rejected(msg),
            LedgerError::Timeout(_) => ExecutorError::Timeout,
            LedgerError::Unavailable(msg) | LedgerError::InvalidResponse(msg) => {
                ExecutorError::LedgerUnavailable(msg)
            }
        }
    }
}

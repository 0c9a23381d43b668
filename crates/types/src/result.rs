use serde::{Deserialize, Serialize};
use std::fmt;

use crate::StrategyKind;

/// Why a request did not end in confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum FailureReason {
    /// Ledger unreachable after the local retry budget
    LedgerUnavailable(String),
    /// Lease expired mid-chain; the caller must re-issue with a fresh lease
    LeaseExpired,
    /// Attempt budget spent; wraps the last underlying error
    RetryExhausted(String),
    /// Final state unknown, must be treated as indeterminate
    Timeout,
    /// The ledger explicitly refused the transaction
    Rejected(String),
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::LedgerUnavailable(_) => "ledgerUnavailable",
            FailureReason::LeaseExpired => "leaseExpired",
            FailureReason::RetryExhausted(_) => "retryExhausted",
            FailureReason::Timeout => "timeout",
            FailureReason::Rejected(_) => "rejected",
        }
    }

    /// The transaction may still land; upstream must re-query before assuming either way
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, FailureReason::Timeout)
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::LedgerUnavailable(detail)
            | FailureReason::RetryExhausted(detail)
            | FailureReason::Rejected(detail) => write!(f, "{}: {}", self.as_str(), detail),
            _ => f.write_str(self.as_str()),
        }
    }
}

/// Coarse outcome of an execution as seen by position tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Confirmed,
    Failed,
    Indeterminate,
}

/// Terminal outcome of one request. Never mutated after it is returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub request_id: String,
    /// Strategy that actually performed the submission
    pub strategy_name: StrategyKind,
    /// Submission left the process and was accepted by the channel
    pub accepted: bool,
    pub confirmed: bool,
    /// Opaque handle returned by the submission channel
    pub reference_id: Option<String>,
    pub confirmation_latency_ms: Option<u64>,
    pub failure_reason: Option<FailureReason>,
    /// Confirmation polls performed
    pub poll_attempts: u32,
    /// Confirmed from the relay's finalized target height rather than local visibility
    pub optimistic_confirmation: bool,
    /// Originally selected strategy when a pre-submission fallback happened
    pub fallback_from: Option<StrategyKind>,
}

impl ExecutionResult {
    pub fn confirmed(
        request_id: impl Into<String>,
        strategy: StrategyKind,
        reference_id: String,
        latency_ms: u64,
        poll_attempts: u32,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            strategy_name: strategy,
            accepted: true,
            confirmed: true,
            reference_id: Some(reference_id),
            confirmation_latency_ms: Some(latency_ms),
            failure_reason: None,
            poll_attempts,
            optimistic_confirmation: false,
            fallback_from: None,
        }
    }

    pub fn failed(
        request_id: impl Into<String>,
        strategy: StrategyKind,
        reason: FailureReason,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            strategy_name: strategy,
            accepted: false,
            confirmed: false,
            reference_id: None,
            confirmation_latency_ms: None,
            failure_reason: Some(reason),
            poll_attempts: 0,
            optimistic_confirmation: false,
            fallback_from: None,
        }
    }

    /// Failure after the channel accepted the submission
    pub fn unconfirmed(
        request_id: impl Into<String>,
        strategy: StrategyKind,
        reference_id: String,
        reason: FailureReason,
        poll_attempts: u32,
    ) -> Self {
        Self {
            accepted: true,
            reference_id: Some(reference_id),
            poll_attempts,
            ..Self::failed(request_id, strategy, reason)
        }
    }

    pub fn with_fallback_from(mut self, original: StrategyKind) -> Self {
        self.fallback_from = Some(original);
        self
    }

    pub fn with_optimistic(mut self, optimistic: bool) -> Self {
        self.optimistic_confirmation = optimistic;
        self
    }

    pub fn status(&self) -> ExecutionStatus {
        if self.confirmed {
            ExecutionStatus::Confirmed
        } else if self
            .failure_reason
            .as_ref()
            .map(FailureReason::is_indeterminate)
            .unwrap_or(false)
        {
            ExecutionStatus::Indeterminate
        } else {
            ExecutionStatus::Failed
        }
    }

    pub fn is_success(&self) -> bool {
        self.confirmed
    }
}

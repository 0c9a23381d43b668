use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use txsettle_types::SessionLease;

use crate::LedgerError;

/// Opaque handle returned when a submission is accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionHandle {
    pub reference_id: String,
    /// Height the channel expects the transaction to land at, when it reports one
    pub target_height: Option<u64>,
}

impl SubmissionHandle {
    pub fn new(reference_id: impl Into<String>) -> Self {
        Self {
            reference_id: reference_id.into(),
            target_height: None,
        }
    }

    pub fn with_target_height(mut self, height: u64) -> Self {
        self.target_height = Some(height);
        self
    }
}

/// Answer to a single confirmation query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub confirmed: bool,
    /// Set when the ledger reports the transaction failed
    pub error: Option<String>,
}

impl Confirmation {
    pub fn confirmed() -> Self {
        Self {
            confirmed: true,
            error: None,
        }
    }

    pub fn pending() -> Self {
        Self {
            confirmed: false,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            confirmed: false,
            error: Some(error.into()),
        }
    }
}

/// One ledger performance sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThroughputSample {
    pub num_transactions: u64,
    pub num_heights: u64,
    pub period_ms: u64,
}

impl ThroughputSample {
    /// Average time per height over the sample period, the proxy for confirmation time
    pub fn confirmation_ms(&self) -> Option<f64> {
        if self.num_heights == 0 {
            return None;
        }
        Some(self.period_ms as f64 / self.num_heights as f64)
    }
}

/// Primary ledger endpoint
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn send_transaction(&self, payload: &[u8]) -> Result<SubmissionHandle, LedgerError>;

    async fn confirm(
        &self,
        handle: &SubmissionHandle,
        lease: &SessionLease,
    ) -> Result<Confirmation, LedgerError>;

    async fn get_latest_session(&self) -> Result<SessionLease, LedgerError>;

    async fn get_recent_fee_samples(&self) -> Result<Vec<u64>, LedgerError>;

    async fn get_current_height(&self) -> Result<u64, LedgerError>;

    /// Highest height considered final. Defaults to the current height.
    async fn get_finalized_height(&self) -> Result<u64, LedgerError> {
        self.get_current_height().await
    }

    async fn get_recent_throughput_samples(&self) -> Result<Vec<ThroughputSample>, LedgerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throughput_confirmation_ms() {
        let sample = ThroughputSample {
            num_transactions: 2_000,
            num_heights: 150,
            period_ms: 60_000,
        };
        assert_eq!(sample.confirmation_ms(), Some(400.0));

        let empty = ThroughputSample {
            num_transactions: 0,
            num_heights: 0,
            period_ms: 60_000,
        };
        assert_eq!(empty.confirmation_ms(), None);
    }
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{LedgerError, SubmissionHandle};

/// State of a submission as reported by a relay's status endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum RelayStatus {
    Pending,
    Landed { height: u64 },
    Failed { reason: String },
}

/// Alternate submission channel (low-latency relay or bundle endpoint)
#[async_trait]
pub trait RelayClient: Send + Sync {
    /// Human-readable endpoint name for logs
    fn endpoint(&self) -> &str;

    async fn submit(&self, payload: &[u8], fee: u64) -> Result<SubmissionHandle, LedgerError>;

    async fn status(&self, handle: &SubmissionHandle) -> Result<RelayStatus, LedgerError>;
}

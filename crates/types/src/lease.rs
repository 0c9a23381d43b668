use serde::{Deserialize, Serialize};

/// Short-lived ledger snapshot reference required to submit and confirm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLease {
    pub snapshot_id: String,
    /// First height at which the lease is no longer usable
    pub expiry_height: u64,
    /// Unix timestamp (milliseconds) of the fetch
    pub fetched_at: i64,
}

impl SessionLease {
    pub fn new(snapshot_id: impl Into<String>, expiry_height: u64) -> Self {
        Self {
            snapshot_id: snapshot_id.into(),
            expiry_height,
            fetched_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// A lease is usable only while `current_height < expiry_height`
    pub fn is_expired_at(&self, current_height: u64) -> bool {
        current_height >= self.expiry_height
    }

    pub fn remaining_heights(&self, current_height: u64) -> u64 {
        self.expiry_height.saturating_sub(current_height)
    }
}

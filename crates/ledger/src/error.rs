use thiserror::Error;

/// Failures reported by ledger and relay collaborators
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Endpoint unreachable; the request did not leave the process
    #[error("endpoint unavailable: {0}")]
    Unavailable(String),

    /// The ledger explicitly refused the transaction
    #[error("rejected: {0}")]
    Rejected(String),

    /// The request left the process but no answer arrived in time
    #[error("timeout: {0}")]
    Timeout(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl LedgerError {
    /// Worth retrying locally
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Unavailable(_) | LedgerError::Timeout(_))
    }

    /// Error type label used in logs and metrics
    pub fn error_type(&self) -> &'static str {
        match self {
            LedgerError::Unavailable(_) => "ledger_unavailable",
            LedgerError::Rejected(_) => "ledger_rejected",
            LedgerError::Timeout(_) => "ledger_timeout",
            LedgerError::InvalidResponse(_) => "ledger_invalid_response",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(LedgerError::Unavailable("down".into()).is_transient());
        assert!(LedgerError::Timeout("slow".into()).is_transient());
        assert!(!LedgerError::Rejected("no".into()).is_transient());
        assert!(!LedgerError::InvalidResponse("garbled".into()).is_transient());
    }
}

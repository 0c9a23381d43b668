use serde::{Deserialize, Serialize};

use crate::{Priority, StrategyChoice, StrategyKind};

/// A transaction handed to the engine for submission
///
/// The payload is opaque: it is produced by the signing pipeline upstream and
/// never inspected here. Requests are immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    id: String,
    payload: Vec<u8>,
    priority: Priority,
    strategy: Option<StrategyChoice>,
}

impl TransactionRequest {
    pub fn new(payload: Vec<u8>, priority: Priority) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            payload,
            priority,
            strategy: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Soft preference, ignored while the strategy is unhealthy
    pub fn prefer(mut self, kind: StrategyKind) -> Self {
        self.strategy = Some(StrategyChoice::Prefer(kind));
        self
    }

    /// Hard override, bypasses health filtering
    pub fn force(mut self, kind: StrategyKind) -> Self {
        self.strategy = Some(StrategyChoice::Force(kind));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn strategy(&self) -> Option<StrategyChoice> {
        self.strategy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_are_unique() {
        let a = TransactionRequest::new(vec![1, 2, 3], Priority::High);
        let b = TransactionRequest::new(vec![1, 2, 3], Priority::High);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_request_builder() {
        let request = TransactionRequest::new(vec![9], Priority::Urgent)
            .with_id("req-1")
            .prefer(StrategyKind::PriorityRelay);

        assert_eq!(request.id(), "req-1");
        assert_eq!(request.payload(), &[9]);
        assert_eq!(request.priority(), Priority::Urgent);
        assert_eq!(
            request.strategy(),
            Some(StrategyChoice::Prefer(StrategyKind::PriorityRelay))
        );

        let forced = request.force(StrategyKind::Standard);
        assert_eq!(
            forced.strategy(),
            Some(StrategyChoice::Force(StrategyKind::Standard))
        );
    }
}

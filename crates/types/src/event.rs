use serde::{Deserialize, Serialize};

use crate::{CongestionState, ExecutionResult, FeeEstimate};

/// Message published to the inter-agent bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EngineEvent {
    ExecutionResult(ExecutionResult),
    FeeUpdate(FeeEstimate),
    CongestionUpdate(CongestionState),
}

impl EngineEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            EngineEvent::ExecutionResult(_) => "execution-result",
            EngineEvent::FeeUpdate(_) => "fee-update",
            EngineEvent::CongestionUpdate(_) => "congestion-update",
        }
    }
}

/// Fire-and-forget event publisher. Implementations must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Sink that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: EngineEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CongestionLevel, StrategyKind};

    #[test]
    fn test_event_envelope_is_tagged() {
        let result = ExecutionResult::confirmed("req-1", StrategyKind::Standard, "sig".into(), 10, 1);
        let json = serde_json::to_value(EngineEvent::ExecutionResult(result)).unwrap();
        assert_eq!(json["type"], "execution-result");
        assert_eq!(json["requestId"], "req-1");
        assert_eq!(json["strategyName"], "standard");

        let json = serde_json::to_value(EngineEvent::CongestionUpdate(CongestionState::new(
            CongestionLevel::Medium,
            700.0,
        )))
        .unwrap();
        assert_eq!(json["type"], "congestion-update");
        assert_eq!(json["level"], "medium");
    }

    #[test]
    fn test_event_type_names() {
        let fee = FeeEstimate::from_tiers([1, 2, 3, 4], false);
        assert_eq!(EngineEvent::FeeUpdate(fee).event_type(), "fee-update");
    }
}

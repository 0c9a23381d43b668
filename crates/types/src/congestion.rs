use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Priority;

/// Coarse network latency classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CongestionLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl CongestionLevel {
    /// Classify a rolling average confirmation time against fixed thresholds
    pub fn classify(avg_confirmation_ms: f64, low_threshold_ms: f64, medium_threshold_ms: f64) -> Self {
        if avg_confirmation_ms < low_threshold_ms {
            CongestionLevel::Low
        } else if avg_confirmation_ms < medium_threshold_ms {
            CongestionLevel::Medium
        } else {
            CongestionLevel::High
        }
    }

    pub fn recommended_priority(&self) -> Priority {
        match self {
            CongestionLevel::Low => Priority::Low,
            CongestionLevel::Medium => Priority::Medium,
            CongestionLevel::High => Priority::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CongestionLevel::Low => "low",
            CongestionLevel::Medium => "medium",
            CongestionLevel::High => "high",
        }
    }
}

impl fmt::Display for CongestionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot published by the network monitor. Always replaced whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CongestionState {
    pub level: CongestionLevel,
    pub avg_confirmation_ms: f64,
    pub recommended_priority: Priority,
    /// Unix timestamp (milliseconds); zero before the first successful sample
    pub updated_at: i64,
}

impl CongestionState {
    pub fn new(level: CongestionLevel, avg_confirmation_ms: f64) -> Self {
        Self {
            level,
            avg_confirmation_ms,
            recommended_priority: level.recommended_priority(),
            updated_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

impl Default for CongestionState {
    fn default() -> Self {
        Self {
            level: CongestionLevel::Low,
            avg_confirmation_ms: 0.0,
            recommended_priority: Priority::Low,
            updated_at: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_thresholds() {
        assert_eq!(CongestionLevel::classify(120.0, 500.0, 1000.0), CongestionLevel::Low);
        assert_eq!(CongestionLevel::classify(499.9, 500.0, 1000.0), CongestionLevel::Low);
        assert_eq!(CongestionLevel::classify(500.0, 500.0, 1000.0), CongestionLevel::Medium);
        assert_eq!(CongestionLevel::classify(999.0, 500.0, 1000.0), CongestionLevel::Medium);
        assert_eq!(CongestionLevel::classify(1000.0, 500.0, 1000.0), CongestionLevel::High);
    }

    #[test]
    fn test_state_carries_recommendation() {
        let state = CongestionState::new(CongestionLevel::High, 1450.0);
        assert_eq!(state.recommended_priority, Priority::High);
        assert!(state.updated_at > 0);
    }
}

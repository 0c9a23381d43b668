use serde::{Deserialize, Serialize};

use crate::StrategyKind;

/// Running counters for one strategy, as read by the selector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyHealthStats {
    pub strategy: StrategyKind,
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    /// Mean over confirmed executions; zero when none were confirmed
    pub avg_confirmation_ms: f64,
    /// Outcomes currently held in the health window
    pub recent_attempts: u64,
    pub recent_successes: u64,
}

impl StrategyHealthStats {
    pub fn empty(strategy: StrategyKind) -> Self {
        Self {
            strategy,
            attempts: 0,
            successes: 0,
            failures: 0,
            avg_confirmation_ms: 0.0,
            recent_attempts: 0,
            recent_successes: 0,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            return 1.0;
        }
        self.successes as f64 / self.attempts as f64
    }

    pub fn recent_success_rate(&self) -> f64 {
        if self.recent_attempts == 0 {
            return 1.0;
        }
        self.recent_successes as f64 / self.recent_attempts as f64
    }

    /// Unhealthy only once enough recent outcomes exist and their success rate is under the floor
    pub fn is_healthy(&self, floor: f64, min_samples: u64) -> bool {
        self.recent_attempts < min_samples || self.recent_success_rate() >= floor
    }

    pub fn has_latency_data(&self) -> bool {
        self.successes > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stats_are_healthy() {
        let stats = StrategyHealthStats::empty(StrategyKind::Standard);
        assert_eq!(stats.success_rate(), 1.0);
        assert!(stats.is_healthy(0.7, 5));
    }

    #[test]
    fn test_health_floor() {
        let stats = StrategyHealthStats {
            recent_attempts: 10,
            recent_successes: 6,
            ..StrategyHealthStats::empty(StrategyKind::PriorityRelay)
        };
        assert!(!stats.is_healthy(0.7, 5));
        assert!(stats.is_healthy(0.6, 5));

        // Too few samples to judge
        let sparse = StrategyHealthStats {
            recent_attempts: 3,
            recent_successes: 0,
            ..StrategyHealthStats::empty(StrategyKind::PriorityRelay)
        };
        assert!(sparse.is_healthy(0.7, 5));
    }
}

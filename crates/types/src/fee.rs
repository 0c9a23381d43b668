use serde::{Deserialize, Serialize};

use crate::Priority;

/// Recommended priority fee per tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeEstimate {
    pub low: u64,
    pub medium: u64,
    pub high: u64,
    pub urgent: u64,
    /// Unix timestamp (milliseconds)
    pub computed_at: i64,
    /// Set when sampling failed and the fallback table was used
    pub degraded: bool,
}

impl FeeEstimate {
    /// Build an estimate from raw tier values, cheapest first.
    ///
    /// Tiers are raised with a running max so `low <= medium <= high <= urgent`
    /// holds whatever the input.
    pub fn from_tiers(tiers: [u64; 4], degraded: bool) -> Self {
        let mut running = 0u64;
        let mut fixed = [0u64; 4];
        for (slot, value) in fixed.iter_mut().zip(tiers) {
            running = running.max(value);
            *slot = running;
        }

        Self {
            low: fixed[0],
            medium: fixed[1],
            high: fixed[2],
            urgent: fixed[3],
            computed_at: chrono::Utc::now().timestamp_millis(),
            degraded,
        }
    }

    pub fn fee_for(&self, priority: Priority) -> u64 {
        match priority {
            Priority::Low => self.low,
            Priority::Medium => self.medium,
            Priority::High => self.high,
            Priority::Urgent => self.urgent,
        }
    }

    pub fn tiers(&self) -> [u64; 4] {
        [self.low, self.medium, self.high, self.urgent]
    }

    pub fn is_monotonic(&self) -> bool {
        self.low <= self.medium && self.medium <= self.high && self.high <= self.urgent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tiers_enforces_monotonic() {
        let estimate = FeeEstimate::from_tiers([500, 100, 900, 300], false);
        assert_eq!(estimate.tiers(), [500, 500, 900, 900]);
        assert!(estimate.is_monotonic());
    }

    #[test]
    fn test_fee_for_priority() {
        let estimate = FeeEstimate::from_tiers([1, 2, 3, 4], true);
        assert_eq!(estimate.fee_for(Priority::Low), 1);
        assert_eq!(estimate.fee_for(Priority::Urgent), 4);
        assert!(estimate.degraded);
    }
}

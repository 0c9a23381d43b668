use serde::{Deserialize, Serialize};
use std::fmt;

/// Submission channel an executor uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Direct submission to the primary ledger endpoint
    Standard,
    /// Alternate low-latency relay service
    PriorityRelay,
    /// Ordering/inclusion-guaranteed bundle endpoint
    BundleRelay,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::Standard,
        StrategyKind::PriorityRelay,
        StrategyKind::BundleRelay,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Standard => "standard",
            StrategyKind::PriorityRelay => "priority_relay",
            StrategyKind::BundleRelay => "bundle_relay",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn is_relay(&self) -> bool {
        !matches!(self, StrategyKind::Standard)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Caller-supplied strategy override
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "strategy", rename_all = "lowercase")]
pub enum StrategyChoice {
    /// Used only while the strategy is healthy
    Prefer(StrategyKind),
    /// Bypasses health filtering
    Force(StrategyKind),
}

impl StrategyChoice {
    pub fn kind(&self) -> StrategyKind {
        match self {
            StrategyChoice::Prefer(kind) | StrategyChoice::Force(kind) => *kind,
        }
    }

    pub fn is_forced(&self) -> bool {
        matches!(self, StrategyChoice::Force(_))
    }
}

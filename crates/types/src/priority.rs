use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-selected urgency of a transaction
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// All tiers, cheapest first
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    /// Position of the tier in [`Priority::ALL`]
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// One tier up, capped at `High`. Urgent is only ever requested by callers.
    pub fn bumped(&self) -> Priority {
        match self {
            Priority::Low => Priority::Medium,
            Priority::Medium => Priority::High,
            other => *other,
        }
    }

    pub fn is_time_sensitive(&self) -> bool {
        matches!(self, Priority::High | Priority::Urgent)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

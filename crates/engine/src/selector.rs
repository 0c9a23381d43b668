//! Strategy selection
//!
//! Selection is a pure function of the request, the health snapshot and the
//! congestion snapshot. Nothing here mutates state.

use std::cmp::Ordering;
use std::fmt;
use txsettle_types::{
    CongestionLevel, CongestionState, Priority, StrategyChoice, StrategyHealthStats, StrategyKind,
};

/// Health filtering thresholds
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorConfig {
    /// Minimum recent success rate
    pub health_floor: f64,
    /// Recent outcomes needed before the floor applies
    pub min_samples: u64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            health_floor: 0.7,
            min_samples: 5,
        }
    }
}

/// Which relay strategies have an endpoint wired in. Standard always does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Availability {
    pub priority_relay: bool,
    pub bundle_relay: bool,
}

impl Availability {
    pub fn is_configured(&self, kind: StrategyKind) -> bool {
        match kind {
            StrategyKind::Standard => true,
            StrategyKind::PriorityRelay => self.priority_relay,
            StrategyKind::BundleRelay => self.bundle_relay,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionReason {
    /// Hard override, health ignored
    Forced,
    /// Soft preference that passed the health check
    Preferred,
    /// First healthy candidate in the ranking
    Ranked,
    /// Every candidate was unhealthy
    NoHealthyCandidate,
}

impl fmt::Display for SelectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SelectionReason::Forced => "forced",
            SelectionReason::Preferred => "preferred",
            SelectionReason::Ranked => "ranked",
            SelectionReason::NoHealthyCandidate => "no_healthy_candidate",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub kind: StrategyKind,
    /// Confirm with the escalated polling budget
    pub escalated_retries: bool,
    pub reason: SelectionReason,
}

impl Selection {
    fn new(kind: StrategyKind, reason: SelectionReason) -> Self {
        Self {
            kind,
            escalated_retries: false,
            reason,
        }
    }
}

/// Priority after accounting for congestion: one tier up, never to urgent, when congestion is high
pub fn effective_priority(priority: Priority, congestion: &CongestionState) -> Priority {
    if congestion.level == CongestionLevel::High {
        priority.bumped()
    } else {
        priority
    }
}

/// Candidate order for an effective priority
pub fn rank(
    priority: Priority,
    congestion: &CongestionState,
    stats: &[StrategyHealthStats; 3],
) -> [StrategyKind; 3] {
    use StrategyKind::*;

    match priority {
        Priority::Urgent => [PriorityRelay, BundleRelay, Standard],
        Priority::High if congestion.level >= CongestionLevel::Medium => {
            [PriorityRelay, BundleRelay, Standard]
        }
        Priority::High => [Standard, PriorityRelay, BundleRelay],
        Priority::Low | Priority::Medium => {
            let mut relays = [PriorityRelay, BundleRelay];
            relays.sort_by(|a, b| by_observed_latency(&stats[a.index()], &stats[b.index()]));
            [Standard, relays[0], relays[1]]
        }
    }
}

// Faster first; strategies without confirmed executions go last
fn by_observed_latency(a: &StrategyHealthStats, b: &StrategyHealthStats) -> Ordering {
    match (a.has_latency_data(), b.has_latency_data()) {
        (true, true) => a
            .avg_confirmation_ms
            .partial_cmp(&b.avg_confirmation_ms)
            .unwrap_or(Ordering::Equal),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => Ordering::Equal,
    }
}

/// Choose the strategy for one request
///
/// `Force` is honored whenever the strategy is configured. `Prefer` is honored
/// only while the strategy is healthy. Otherwise the first configured, healthy
/// candidate of the ranking wins, with Standard as the last resort. Landing on
/// Standard after skipping relays for a time-sensitive request escalates the
/// polling budget.
pub fn select(
    priority: Priority,
    choice: Option<StrategyChoice>,
    stats: &[StrategyHealthStats; 3],
    congestion: &CongestionState,
    available: &Availability,
    config: &SelectorConfig,
) -> Selection {
    let healthy = |kind: StrategyKind| {
        stats[kind.index()].is_healthy(config.health_floor, config.min_samples)
    };

    match choice {
        Some(StrategyChoice::Force(kind)) if available.is_configured(kind) => {
            return Selection::new(kind, SelectionReason::Forced);
        }
        Some(StrategyChoice::Prefer(kind)) if available.is_configured(kind) && healthy(kind) => {
            return Selection::new(kind, SelectionReason::Preferred);
        }
        _ => {}
    }

    let effective = effective_priority(priority, congestion);
    let ranking = rank(effective, congestion, stats);

    let mut skipped_relay = false;
    for kind in ranking {
        if available.is_configured(kind) && healthy(kind) {
            return Selection {
                kind,
                escalated_retries: kind == StrategyKind::Standard
                    && skipped_relay
                    && effective.is_time_sensitive(),
                reason: SelectionReason::Ranked,
            };
        }
        skipped_relay |= kind.is_relay();
    }

    Selection {
        kind: StrategyKind::Standard,
        escalated_retries: effective.is_time_sensitive(),
        reason: SelectionReason::NoHealthyCandidate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use StrategyKind::*;

    const ALL: Availability = Availability {
        priority_relay: true,
        bundle_relay: true,
    };

    fn fresh_stats() -> [StrategyHealthStats; 3] {
        StrategyKind::ALL.map(StrategyHealthStats::empty)
    }

    fn with_outcomes(stats: &mut [StrategyHealthStats; 3], kind: StrategyKind, ok: u64, failed: u64) {
        let s = &mut stats[kind.index()];
        s.attempts = ok + failed;
        s.successes = ok;
        s.failures = failed;
        s.recent_attempts = ok + failed;
        s.recent_successes = ok;
    }

    fn calm() -> CongestionState {
        CongestionState::new(CongestionLevel::Low, 300.0)
    }

    fn pick(priority: Priority, choice: Option<StrategyChoice>, stats: &[StrategyHealthStats; 3]) -> Selection {
        select(priority, choice, stats, &calm(), &ALL, &SelectorConfig::default())
    }

    #[test]
    fn test_urgent_prefers_priority_relay() {
        let selection = pick(Priority::Urgent, None, &fresh_stats());
        assert_eq!(selection.kind, PriorityRelay);
        assert_eq!(selection.reason, SelectionReason::Ranked);
        assert!(!selection.escalated_retries);
    }

    #[test]
    fn test_low_prefers_standard() {
        assert_eq!(pick(Priority::Low, None, &fresh_stats()).kind, Standard);
        assert_eq!(pick(Priority::Medium, None, &fresh_stats()).kind, Standard);
    }

    #[test]
    fn test_high_depends_on_congestion() {
        let stats = fresh_stats();
        assert_eq!(pick(Priority::High, None, &stats).kind, Standard);

        let busy = CongestionState::new(CongestionLevel::Medium, 800.0);
        let selection = select(Priority::High, None, &stats, &busy, &ALL, &SelectorConfig::default());
        assert_eq!(selection.kind, PriorityRelay);
    }

    #[test]
    fn test_high_congestion_bumps_medium_to_high() {
        let busy = CongestionState::new(CongestionLevel::High, 1500.0);
        assert_eq!(effective_priority(Priority::Medium, &busy), Priority::High);
        assert_eq!(effective_priority(Priority::High, &busy), Priority::High);

        let selection = select(Priority::Medium, None, &fresh_stats(), &busy, &ALL, &SelectorConfig::default());
        assert_eq!(selection.kind, PriorityRelay);
    }

    #[test]
    fn test_unhealthy_preference_is_dropped() {
        let mut stats = fresh_stats();
        with_outcomes(&mut stats, BundleRelay, 2, 8);

        let selection = pick(Priority::Low, Some(StrategyChoice::Prefer(BundleRelay)), &stats);
        assert_eq!(selection.kind, Standard);
        assert_eq!(selection.reason, SelectionReason::Ranked);
    }

    #[test]
    fn test_healthy_preference_is_honored() {
        let selection = pick(Priority::Low, Some(StrategyChoice::Prefer(BundleRelay)), &fresh_stats());
        assert_eq!(selection.kind, BundleRelay);
        assert_eq!(selection.reason, SelectionReason::Preferred);
    }

    #[test]
    fn test_force_bypasses_health() {
        let mut stats = fresh_stats();
        with_outcomes(&mut stats, BundleRelay, 0, 10);

        let selection = pick(Priority::Low, Some(StrategyChoice::Force(BundleRelay)), &stats);
        assert_eq!(selection.kind, BundleRelay);
        assert_eq!(selection.reason, SelectionReason::Forced);
    }

    #[test]
    fn test_force_of_unconfigured_strategy_is_ignored() {
        let standard_only = Availability {
            priority_relay: false,
            bundle_relay: false,
        };
        let selection = select(
            Priority::Urgent,
            Some(StrategyChoice::Force(PriorityRelay)),
            &fresh_stats(),
            &calm(),
            &standard_only,
            &SelectorConfig::default(),
        );
        assert_eq!(selection.kind, Standard);
        assert!(selection.escalated_retries);
    }

    #[test]
    fn test_urgent_with_unhealthy_relays_escalates_standard() {
        let mut stats = fresh_stats();
        with_outcomes(&mut stats, PriorityRelay, 1, 9);
        with_outcomes(&mut stats, BundleRelay, 3, 7);

        let selection = pick(Priority::Urgent, None, &stats);
        assert_eq!(selection.kind, Standard);
        assert!(selection.escalated_retries);
    }

    #[test]
    fn test_nothing_healthy_falls_back_to_standard() {
        let mut stats = fresh_stats();
        for kind in StrategyKind::ALL {
            with_outcomes(&mut stats, kind, 1, 9);
        }

        let selection = pick(Priority::High, None, &stats);
        assert_eq!(selection.kind, Standard);
        assert_eq!(selection.reason, SelectionReason::NoHealthyCandidate);
        assert!(selection.escalated_retries);

        let selection = pick(Priority::Low, None, &stats);
        assert!(!selection.escalated_retries);
    }

    #[test]
    fn test_few_samples_stay_healthy() {
        let mut stats = fresh_stats();
        with_outcomes(&mut stats, PriorityRelay, 0, 4);

        assert_eq!(pick(Priority::Urgent, None, &stats).kind, PriorityRelay);
    }

    #[test]
    fn test_relays_ranked_by_observed_latency() {
        let mut stats = fresh_stats();
        with_outcomes(&mut stats, Standard, 0, 10);
        with_outcomes(&mut stats, PriorityRelay, 10, 0);
        with_outcomes(&mut stats, BundleRelay, 10, 0);
        stats[PriorityRelay.index()].avg_confirmation_ms = 900.0;
        stats[BundleRelay.index()].avg_confirmation_ms = 400.0;

        assert_eq!(
            rank(Priority::Low, &calm(), &stats),
            [Standard, BundleRelay, PriorityRelay]
        );
        assert_eq!(pick(Priority::Low, None, &stats).kind, BundleRelay);
    }

    #[test]
    fn test_selection_is_pure() {
        let stats = fresh_stats();
        let first = pick(Priority::Urgent, None, &stats);
        let second = pick(Priority::Urgent, None, &stats);
        assert_eq!(first, second);
        assert_eq!(stats, fresh_stats());
    }
}

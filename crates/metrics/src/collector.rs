use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use prometheus::{Encoder, TextEncoder};
use txsettle_types::{CongestionLevel, ExecutionResult, ExecutionStatus, StrategyHealthStats, StrategyKind};

use crate::metrics::*;

/// Outcomes kept per strategy when no window is configured
pub const DEFAULT_HEALTH_WINDOW: usize = 20;

/// Lock-free lifetime counters plus a short window of recent outcomes
#[derive(Debug, Default)]
struct StrategyCounters {
    attempts: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    latency_total_ms: AtomicU64,
    recent: Mutex<VecDeque<bool>>,
}

impl StrategyCounters {
    fn reset(&self) {
        self.attempts.store(0, Ordering::SeqCst);
        self.successes.store(0, Ordering::SeqCst);
        self.failures.store(0, Ordering::SeqCst);
        self.latency_total_ms.store(0, Ordering::SeqCst);
        if let Ok(mut recent) = self.recent.lock() {
            recent.clear();
        }
    }
}

/// Per-strategy health accounting for the selector, mirrored into Prometheus
///
/// Runtime counters are per instance so several engines can live in one
/// process; the Prometheus series are process-wide.
#[derive(Debug)]
pub struct MetricsCollector {
    strategies: [StrategyCounters; 3],
    health_window: usize,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::with_health_window(DEFAULT_HEALTH_WINDOW)
    }

    pub fn with_health_window(health_window: usize) -> Self {
        Self {
            strategies: Default::default(),
            health_window: health_window.max(1),
        }
    }

    pub fn health_window(&self) -> usize {
        self.health_window
    }

    fn counters(&self, strategy: StrategyKind) -> &StrategyCounters {
        &self.strategies[strategy.index()]
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // STRATEGY HEALTH
    // ═══════════════════════════════════════════════════════════════════════════

    /// Record one terminal result. Called exactly once per executed request.
    pub fn record(&self, strategy: StrategyKind, result: &ExecutionResult) {
        let counters = self.counters(strategy);
        counters.attempts.fetch_add(1, Ordering::SeqCst);

        let success = result.confirmed;
        if success {
            counters.successes.fetch_add(1, Ordering::SeqCst);
            if let Some(latency) = result.confirmation_latency_ms {
                counters.latency_total_ms.fetch_add(latency, Ordering::SeqCst);
                CONFIRMATION_LATENCY
                    .with_label_values(&[strategy.name()])
                    .observe(latency as f64);
            }
        } else {
            counters.failures.fetch_add(1, Ordering::SeqCst);
            if let Some(reason) = &result.failure_reason {
                EXECUTION_FAILURES
                    .with_label_values(&[strategy.name(), reason.as_str()])
                    .inc();
            }
        }

        self.push_recent(counters, success);

        let outcome = match result.status() {
            ExecutionStatus::Confirmed => "confirmed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Indeterminate => "indeterminate",
        };
        EXECUTIONS.with_label_values(&[strategy.name(), outcome]).inc();
        POLL_ATTEMPTS
            .with_label_values(&[strategy.name()])
            .observe(result.poll_attempts as f64);
    }

    /// Count a strategy that could not be reached before submission as a
    /// recent failure. Lifetime counters are left alone: the request itself is
    /// recorded against the strategy that took it over.
    pub fn record_unreachable(&self, strategy: StrategyKind) {
        self.push_recent(self.counters(strategy), false);
        UNREACHABLE.with_label_values(&[strategy.name()]).inc();
    }

    fn push_recent(&self, counters: &StrategyCounters, success: bool) {
        if let Ok(mut recent) = counters.recent.lock() {
            recent.push_back(success);
            while recent.len() > self.health_window {
                recent.pop_front();
            }
        }
    }

    /// Current counters for one strategy
    pub fn stats(&self, strategy: StrategyKind) -> StrategyHealthStats {
        let counters = self.counters(strategy);
        let successes = counters.successes.load(Ordering::SeqCst);
        let latency_total = counters.latency_total_ms.load(Ordering::SeqCst);

        let (recent_attempts, recent_successes) = counters
            .recent
            .lock()
            .map(|recent| {
                (
                    recent.len() as u64,
                    recent.iter().filter(|ok| **ok).count() as u64,
                )
            })
            .unwrap_or((0, 0));

        StrategyHealthStats {
            strategy,
            attempts: counters.attempts.load(Ordering::SeqCst),
            successes,
            failures: counters.failures.load(Ordering::SeqCst),
            avg_confirmation_ms: if successes == 0 {
                0.0
            } else {
                latency_total as f64 / successes as f64
            },
            recent_attempts,
            recent_successes,
        }
    }

    /// Stats for every strategy, indexed by [`StrategyKind::index`]
    pub fn snapshot(&self) -> [StrategyHealthStats; 3] {
        StrategyKind::ALL.map(|kind| self.stats(kind))
    }

    /// Operator reset of all strategy counters
    pub fn reset(&self) {
        for counters in &self.strategies {
            counters.reset();
        }
        tracing::info!("strategy health counters reset");
    }

    pub fn set_strategy_health(&self, strategy: StrategyKind, healthy: bool) {
        STRATEGY_HEALTH
            .with_label_values(&[strategy.name()])
            .set(if healthy { 1 } else { 0 });
    }

    pub fn record_fallback(&self, from: StrategyKind, to: StrategyKind) {
        FALLBACKS.with_label_values(&[from.name(), to.name()]).inc();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LEASE AND FEE METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn record_lease_fetch(&self, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        LEASE_FETCHES.with_label_values(&[outcome]).inc();
    }

    pub fn record_lease_cache_hit(&self) {
        LEASE_CACHE_HITS.inc();
    }

    pub fn record_fee_estimate(&self, degraded: bool) {
        let source = if degraded { "fallback" } else { "sampled" };
        FEE_ESTIMATES.with_label_values(&[source]).inc();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // NETWORK METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn set_congestion(&self, level: CongestionLevel, avg_confirmation_ms: f64) {
        CONGESTION_LEVEL.set(level as i64);
        AVG_CONFIRMATION_MS.set(avg_confirmation_ms);
    }

    pub fn record_monitor_failure(&self) {
        MONITOR_FAILURES.inc();
    }

    pub fn record_error(&self, error_type: &str) {
        ERRORS.with_label_values(&[error_type]).inc();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EXPORT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Export metrics in Prometheus text format
    pub fn export_metrics(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| MetricsError::EncodingError(e.to_string()))?;

        String::from_utf8(buffer).map_err(|e| MetricsError::EncodingError(e.to_string()))
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Metrics error types
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("encoding error: {0}")]
    EncodingError(String),
}

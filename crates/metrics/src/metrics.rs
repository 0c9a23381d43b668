use lazy_static::lazy_static;
use prometheus::{
    register_gauge, register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge, register_int_gauge_vec, Gauge, HistogramVec, IntCounter, IntCounterVec,
    IntGauge, IntGaugeVec,
};

lazy_static! {
    // ═══════════════════════════════════════════════════════════════════════════
    // EXECUTION METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Terminal execution results by strategy and outcome
    pub static ref EXECUTIONS: IntCounterVec = register_int_counter_vec!(
        "txsettle_executions_total",
        "Total execution results by strategy and outcome",
        &["strategy", "outcome"]
    )
    .unwrap();

    /// Failures by strategy and failure reason
    pub static ref EXECUTION_FAILURES: IntCounterVec = register_int_counter_vec!(
        "txsettle_execution_failures_total",
        "Total failed executions by strategy and reason",
        &["strategy", "reason"]
    )
    .unwrap();

    /// Confirmation latency per strategy (in milliseconds)
    pub static ref CONFIRMATION_LATENCY: HistogramVec = register_histogram_vec!(
        "txsettle_confirmation_latency_ms",
        "Confirmation latency in milliseconds",
        &["strategy"],
        vec![100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0]
    )
    .unwrap();

    /// Confirmation polls performed per execution
    pub static ref POLL_ATTEMPTS: HistogramVec = register_histogram_vec!(
        "txsettle_poll_attempts",
        "Confirmation polls per execution",
        &["strategy"],
        vec![1.0, 2.0, 3.0, 5.0, 8.0, 13.0]
    )
    .unwrap();

    /// Pre-submission fallbacks between strategies
    pub static ref FALLBACKS: IntCounterVec = register_int_counter_vec!(
        "txsettle_fallbacks_total",
        "Total pre-submission strategy fallbacks",
        &["from", "to"]
    )
    .unwrap();

    /// Strategies found unreachable before anything was submitted
    pub static ref UNREACHABLE: IntCounterVec = register_int_counter_vec!(
        "txsettle_strategy_unreachable_total",
        "Total pre-submission strategy outages",
        &["strategy"]
    )
    .unwrap();

    /// Strategy health as seen by the selector (1=healthy, 0=unhealthy)
    pub static ref STRATEGY_HEALTH: IntGaugeVec = register_int_gauge_vec!(
        "txsettle_strategy_health",
        "Strategy health status (1=healthy, 0=unhealthy)",
        &["strategy"]
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // LEASE AND FEE METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Underlying session lease fetches
    pub static ref LEASE_FETCHES: IntCounterVec = register_int_counter_vec!(
        "txsettle_lease_fetches_total",
        "Total session lease fetches by outcome",
        &["outcome"]
    )
    .unwrap();

    /// Lease requests served from the cache
    pub static ref LEASE_CACHE_HITS: IntCounter = register_int_counter!(
        "txsettle_lease_cache_hits_total",
        "Total session lease requests served from cache"
    )
    .unwrap();

    /// Fee estimates computed, by source (sampled or fallback)
    pub static ref FEE_ESTIMATES: IntCounterVec = register_int_counter_vec!(
        "txsettle_fee_estimates_total",
        "Total fee estimates computed by source",
        &["source"]
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // NETWORK METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Current congestion level (0=low, 1=medium, 2=high)
    pub static ref CONGESTION_LEVEL: IntGauge = register_int_gauge!(
        "txsettle_congestion_level",
        "Current congestion level (0=low, 1=medium, 2=high)"
    )
    .unwrap();

    /// Rolling average confirmation time reported by the monitor
    pub static ref AVG_CONFIRMATION_MS: Gauge = register_gauge!(
        "txsettle_rolling_confirmation_ms",
        "Rolling average confirmation time in milliseconds"
    )
    .unwrap();

    /// Monitor ticks whose sample failed
    pub static ref MONITOR_FAILURES: IntCounter = register_int_counter!(
        "txsettle_monitor_failures_total",
        "Total failed network monitor samples"
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // SYSTEM METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Error events by type, fed by the tracing layer
    pub static ref ERRORS: IntCounterVec = register_int_counter_vec!(
        "txsettle_errors_total",
        "Total error events by type",
        &["error_type"]
    )
    .unwrap();
}

//! Configuration structures for the txsettle engine

use serde::{Deserialize, Serialize};

/// Top-level engine configuration
///
/// Every section falls back to its defaults when absent, so a file only has
/// to name the values it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub lease: LeaseConfig,

    #[serde(default)]
    pub fees: FeeConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub selector: SelectorConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,
}

/// Process-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

/// Session lease caching and fetch retry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaseConfig {
    /// How long a fetched lease is served from cache
    #[serde(default = "default_cache_window_ms")]
    pub cache_window_ms: u64,

    #[serde(default = "default_fetch_max_attempts")]
    pub fetch_max_attempts: u32,

    #[serde(default = "default_fetch_base_delay_ms")]
    pub fetch_base_delay_ms: u64,

    #[serde(default = "default_fetch_max_delay_ms")]
    pub fetch_max_delay_ms: u64,

    /// Bound on a single session request, also used for the pre-submit height check
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
}

/// Fee sampling, percentile cut points and fallback table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeConfig {
    #[serde(default = "default_fee_cache_ttl_ms")]
    pub cache_ttl_ms: u64,

    /// A sample request slower than this yields the fallback table
    #[serde(default = "default_fee_sample_timeout_ms")]
    pub sample_timeout_ms: u64,

    /// Percentile of the descending-sorted samples used for each tier
    #[serde(default = "default_urgent_percentile")]
    pub urgent_percentile: u8,

    #[serde(default = "default_high_percentile")]
    pub high_percentile: u8,

    #[serde(default = "default_medium_percentile")]
    pub medium_percentile: u8,

    #[serde(default = "default_low_percentile")]
    pub low_percentile: u8,

    /// Used when sampling fails
    #[serde(default = "default_fallback_low")]
    pub fallback_low: u64,

    #[serde(default = "default_fallback_medium")]
    pub fallback_medium: u64,

    #[serde(default = "default_fallback_high")]
    pub fallback_high: u64,

    #[serde(default = "default_fallback_urgent")]
    pub fallback_urgent: u64,
}

/// Confirmation polling and submission retry budgets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Budget used when the selector had to fall back for a time-sensitive request
    #[serde(default = "default_escalated_max_attempts")]
    pub escalated_max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_jitter_ratio")]
    pub jitter_ratio: f64,

    /// Attempts at sending to the primary endpoint while nothing has left the process
    #[serde(default = "default_submit_max_attempts")]
    pub submit_max_attempts: u32,
}

/// Executor timeouts and strategy switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default = "default_confirmation_timeout_ms")]
    pub confirmation_timeout_ms: u64,

    #[serde(default = "default_submit_timeout_ms")]
    pub submit_timeout_ms: u64,

    /// Treat a relay target height at or below the finalized height as confirmed
    /// when the relay status endpoint is unreachable
    #[serde(default)]
    pub optimistic_relay_confirmation: bool,

    #[serde(default = "default_true")]
    pub priority_relay_enabled: bool,

    #[serde(default = "default_true")]
    pub bundle_relay_enabled: bool,
}

/// Strategy health filtering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Minimum recent success rate for a strategy to stay eligible
    #[serde(default = "default_health_floor")]
    pub health_floor: f64,

    /// Recent outcomes kept per strategy
    #[serde(default = "default_health_window")]
    pub health_window: usize,

    /// Outcomes required before the floor applies
    #[serde(default = "default_min_samples")]
    pub min_samples: u64,
}

/// Network condition sampling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_monitor_interval_secs")]
    pub interval_secs: u64,

    /// Samples in the rolling average
    #[serde(default = "default_sample_window")]
    pub sample_window: usize,

    #[serde(default = "default_low_threshold_ms")]
    pub low_threshold_ms: u64,

    #[serde(default = "default_medium_threshold_ms")]
    pub medium_threshold_ms: u64,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_cache_window_ms() -> u64 {
    2000
}

fn default_fetch_max_attempts() -> u32 {
    3
}

fn default_fetch_base_delay_ms() -> u64 {
    100
}

fn default_fetch_max_delay_ms() -> u64 {
    1000
}

fn default_fetch_timeout_ms() -> u64 {
    5000
}

fn default_fee_cache_ttl_ms() -> u64 {
    5000
}

fn default_fee_sample_timeout_ms() -> u64 {
    3000
}

fn default_urgent_percentile() -> u8 {
    5
}

fn default_high_percentile() -> u8 {
    25
}

fn default_medium_percentile() -> u8 {
    50
}

fn default_low_percentile() -> u8 {
    75
}

fn default_fallback_low() -> u64 {
    1_000
}

fn default_fallback_medium() -> u64 {
    10_000
}

fn default_fallback_high() -> u64 {
    100_000
}

fn default_fallback_urgent() -> u64 {
    1_000_000
}

fn default_max_attempts() -> u32 {
    8
}

fn default_escalated_max_attempts() -> u32 {
    15
}

fn default_base_delay_ms() -> u64 {
    250
}

fn default_max_delay_ms() -> u64 {
    4000
}

fn default_jitter_ratio() -> f64 {
    0.3
}

fn default_submit_max_attempts() -> u32 {
    3
}

fn default_confirmation_timeout_ms() -> u64 {
    30_000
}

fn default_submit_timeout_ms() -> u64 {
    10_000
}

fn default_health_floor() -> f64 {
    0.7
}

fn default_health_window() -> usize {
    20
}

fn default_min_samples() -> u64 {
    5
}

fn default_monitor_interval_secs() -> u64 {
    60
}

fn default_sample_window() -> usize {
    10
}

fn default_low_threshold_ms() -> u64 {
    500
}

fn default_medium_threshold_ms() -> u64 {
    1000
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            metrics_enabled: default_true(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            cache_window_ms: default_cache_window_ms(),
            fetch_max_attempts: default_fetch_max_attempts(),
            fetch_base_delay_ms: default_fetch_base_delay_ms(),
            fetch_max_delay_ms: default_fetch_max_delay_ms(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
        }
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: default_fee_cache_ttl_ms(),
            sample_timeout_ms: default_fee_sample_timeout_ms(),
            urgent_percentile: default_urgent_percentile(),
            high_percentile: default_high_percentile(),
            medium_percentile: default_medium_percentile(),
            low_percentile: default_low_percentile(),
            fallback_low: default_fallback_low(),
            fallback_medium: default_fallback_medium(),
            fallback_high: default_fallback_high(),
            fallback_urgent: default_fallback_urgent(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            escalated_max_attempts: default_escalated_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_ratio: default_jitter_ratio(),
            submit_max_attempts: default_submit_max_attempts(),
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout_ms: default_confirmation_timeout_ms(),
            submit_timeout_ms: default_submit_timeout_ms(),
            optimistic_relay_confirmation: false,
            priority_relay_enabled: default_true(),
            bundle_relay_enabled: default_true(),
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            health_floor: default_health_floor(),
            health_window: default_health_window(),
            min_samples: default_min_samples(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_monitor_interval_secs(),
            sample_window: default_sample_window(),
            low_threshold_ms: default_low_threshold_ms(),
            medium_threshold_ms: default_medium_threshold_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimistic_relay_confirmation_off_by_default() {
        assert!(!EngineConfig::default().executor.optimistic_relay_confirmation);

        let parsed: EngineConfig = toml::from_str("[executor]\nconfirmation_timeout_ms = 100").unwrap();
        assert!(!parsed.executor.optimistic_relay_confirmation);
    }

    #[test]
    fn test_empty_document_is_all_defaults() {
        let parsed: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(parsed, EngineConfig::default());
        assert_eq!(parsed.monitor.low_threshold_ms, 500);
        assert_eq!(parsed.monitor.medium_threshold_ms, 1000);
        assert_eq!(parsed.fees.urgent_percentile, 5);
        assert_eq!(parsed.selector.health_floor, 0.7);
    }
}

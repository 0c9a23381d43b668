//! Conversions from the file-level [`EngineConfig`] into each component's settings

use std::time::Duration;
use txsettle_config::{EngineConfig, FeeConfig, LeaseConfig, MonitorConfig as MonitorSection};
use txsettle_executor::{ExecutionSettings, FeeEstimatorConfig, LeaseCacheConfig};
use txsettle_retry::RetryPolicy;

use crate::{Availability, MonitorConfig, SelectorConfig};

pub fn lease_cache_config(lease: &LeaseConfig) -> LeaseCacheConfig {
    LeaseCacheConfig {
        cache_window: Duration::from_millis(lease.cache_window_ms),
        fetch_policy: RetryPolicy::new(
            lease.fetch_max_attempts,
            Duration::from_millis(lease.fetch_base_delay_ms),
            Duration::from_millis(lease.fetch_max_delay_ms),
        ),
        fetch_timeout: Duration::from_millis(lease.fetch_timeout_ms),
    }
}

pub fn fee_estimator_config(fees: &FeeConfig) -> FeeEstimatorConfig {
    FeeEstimatorConfig {
        cache_ttl: Duration::from_millis(fees.cache_ttl_ms),
        sample_timeout: Duration::from_millis(fees.sample_timeout_ms),
        percentiles: [
            fees.low_percentile,
            fees.medium_percentile,
            fees.high_percentile,
            fees.urgent_percentile,
        ],
        fallback: [
            fees.fallback_low,
            fees.fallback_medium,
            fees.fallback_high,
            fees.fallback_urgent,
        ],
    }
}

pub fn execution_settings(config: &EngineConfig) -> ExecutionSettings {
    let retry = &config.retry;
    let base = Duration::from_millis(retry.base_delay_ms);
    let max = Duration::from_millis(retry.max_delay_ms);
    let poll = RetryPolicy::new(retry.max_attempts, base, max).with_jitter(retry.jitter_ratio);

    ExecutionSettings {
        escalated_poll: poll.clone().with_max_attempts(retry.escalated_max_attempts),
        submit: poll.clone().with_max_attempts(retry.submit_max_attempts),
        poll,
        confirmation_timeout: Duration::from_millis(config.executor.confirmation_timeout_ms),
        submit_timeout: Duration::from_millis(config.executor.submit_timeout_ms),
        optimistic_relay_confirmation: config.executor.optimistic_relay_confirmation,
    }
}

pub fn selector_config(config: &EngineConfig) -> SelectorConfig {
    SelectorConfig {
        health_floor: config.selector.health_floor,
        min_samples: config.selector.min_samples,
    }
}

pub fn monitor_config(monitor: &MonitorSection) -> MonitorConfig {
    MonitorConfig {
        interval: Duration::from_secs(monitor.interval_secs),
        sample_window: monitor.sample_window,
        low_threshold_ms: monitor.low_threshold_ms as f64,
        medium_threshold_ms: monitor.medium_threshold_ms as f64,
    }
}

/// Relays count as available only when enabled in config and wired in
pub fn availability(config: &EngineConfig, has_priority_relay: bool, has_bundle_relay: bool) -> Availability {
    Availability {
        priority_relay: config.executor.priority_relay_enabled && has_priority_relay,
        bundle_relay: config.executor.bundle_relay_enabled && has_bundle_relay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_carry_over() {
        let config = EngineConfig::default();

        let settings = execution_settings(&config);
        assert_eq!(settings.poll.max_attempts, 8);
        assert_eq!(settings.escalated_poll.max_attempts, 15);
        assert_eq!(settings.submit.max_attempts, 3);
        assert_eq!(settings.poll.base_delay, Duration::from_millis(250));
        assert!(!settings.optimistic_relay_confirmation);

        let fees = fee_estimator_config(&config.fees);
        assert_eq!(fees.percentiles, [75, 50, 25, 5]);
        assert_eq!(fees, FeeEstimatorConfig::default());

        assert_eq!(lease_cache_config(&config.lease), LeaseCacheConfig::default());
        assert_eq!(monitor_config(&config.monitor), MonitorConfig::default());
        assert_eq!(selector_config(&config), SelectorConfig::default());
    }

    #[test]
    fn test_disabled_relay_is_unavailable() {
        let mut config = EngineConfig::default();
        config.executor.bundle_relay_enabled = false;

        let available = availability(&config, true, true);
        assert!(available.priority_relay);
        assert!(!available.bundle_relay);

        assert!(!availability(&EngineConfig::default(), false, true).priority_relay);
    }
}

//! Configuration validation

use crate::{ConfigError, EngineConfig, Result};

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate the entire engine configuration, reporting every violation
pub fn validate_config(config: &EngineConfig) -> Result<()> {
    let mut errors = Vec::new();

    // Network
    if let Err(e) = validate_log_level(&config.network.log_level) {
        errors.push(e);
    }

    if config.network.metrics_enabled && config.network.metrics_port == 0 {
        errors.push(ValidationError::new(
            "network.metrics_port",
            "metrics port must be greater than 0",
        ));
    }

    // Lease
    if config.lease.cache_window_ms == 0 {
        errors.push(ValidationError::new(
            "lease.cache_window_ms",
            "must be greater than 0",
        ));
    }

    if config.lease.fetch_max_attempts == 0 {
        errors.push(ValidationError::new(
            "lease.fetch_max_attempts",
            "must be greater than 0",
        ));
    }

    if config.lease.fetch_base_delay_ms > config.lease.fetch_max_delay_ms {
        errors.push(ValidationError::new(
            "lease.fetch_base_delay_ms",
            "must be <= fetch_max_delay_ms",
        ));
    }

    if config.lease.fetch_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "lease.fetch_timeout_ms",
            "must be greater than 0",
        ));
    }

    // Fees
    let fees = &config.fees;
    if fees.sample_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "fees.sample_timeout_ms",
            "must be greater than 0",
        ));
    }

    if fees.low_percentile > 100 {
        errors.push(ValidationError::new(
            "fees.low_percentile",
            "must be <= 100",
        ));
    }

    if !(fees.urgent_percentile < fees.high_percentile
        && fees.high_percentile < fees.medium_percentile
        && fees.medium_percentile < fees.low_percentile)
    {
        errors.push(ValidationError::new(
            "fees.percentiles",
            "cut points must satisfy urgent < high < medium < low",
        ));
    }

    if !(fees.fallback_low <= fees.fallback_medium
        && fees.fallback_medium <= fees.fallback_high
        && fees.fallback_high <= fees.fallback_urgent)
    {
        errors.push(ValidationError::new(
            "fees.fallback",
            "fallback table must be non-decreasing from low to urgent",
        ));
    }

    // Retry
    let retry = &config.retry;
    if retry.max_attempts == 0 {
        errors.push(ValidationError::new(
            "retry.max_attempts",
            "must be greater than 0",
        ));
    }

    if retry.escalated_max_attempts < retry.max_attempts {
        errors.push(ValidationError::new(
            "retry.escalated_max_attempts",
            "must be >= max_attempts",
        ));
    }

    if retry.submit_max_attempts == 0 {
        errors.push(ValidationError::new(
            "retry.submit_max_attempts",
            "must be greater than 0",
        ));
    }

    if retry.base_delay_ms == 0 {
        errors.push(ValidationError::new(
            "retry.base_delay_ms",
            "must be greater than 0",
        ));
    }

    if retry.base_delay_ms > retry.max_delay_ms {
        errors.push(ValidationError::new(
            "retry.base_delay_ms",
            "must be <= max_delay_ms",
        ));
    }

    if let Err(e) = validate_ratio("retry.jitter_ratio", retry.jitter_ratio) {
        errors.push(e);
    }

    // Executor
    if config.executor.confirmation_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "executor.confirmation_timeout_ms",
            "must be greater than 0",
        ));
    }

    if config.executor.submit_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "executor.submit_timeout_ms",
            "must be greater than 0",
        ));
    }

    // Selector
    if let Err(e) = validate_ratio("selector.health_floor", config.selector.health_floor) {
        errors.push(e);
    }

    if config.selector.health_window == 0 {
        errors.push(ValidationError::new(
            "selector.health_window",
            "must be greater than 0",
        ));
    }

    if config.selector.min_samples as usize > config.selector.health_window {
        errors.push(ValidationError::new(
            "selector.min_samples",
            "must be <= health_window",
        ));
    }

    // Monitor
    if config.monitor.interval_secs == 0 {
        errors.push(ValidationError::new(
            "monitor.interval_secs",
            "must be greater than 0",
        ));
    }

    if config.monitor.sample_window == 0 {
        errors.push(ValidationError::new(
            "monitor.sample_window",
            "must be greater than 0",
        ));
    }

    if config.monitor.low_threshold_ms >= config.monitor.medium_threshold_ms {
        errors.push(ValidationError::new(
            "monitor.low_threshold_ms",
            "must be < medium_threshold_ms",
        ));
    }

    if !errors.is_empty() {
        let error_msg = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ConfigError::ValidationError(error_msg));
    }

    Ok(())
}

fn validate_ratio(field: &str, value: f64) -> std::result::Result<(), ValidationError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ValidationError::new(field, "must be within [0, 1]"));
    }
    Ok(())
}

fn validate_log_level(level: &str) -> std::result::Result<(), ValidationError> {
    match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ValidationError::new(
            "network.log_level",
            format!(
                "invalid log level '{level}', must be one of: trace, debug, info, warn, error"
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = EngineConfig::default();
        config.network.log_level = "loud".to_string();

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("network.log_level"));
    }

    #[test]
    fn test_unordered_thresholds() {
        let mut config = EngineConfig::default();
        config.monitor.low_threshold_ms = 1000;
        config.monitor.medium_threshold_ms = 500;

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("monitor.low_threshold_ms"));
    }

    #[test]
    fn test_percentiles_must_be_ordered() {
        let mut config = EngineConfig::default();
        config.fees.urgent_percentile = 60;

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("fees.percentiles"));
    }

    #[test]
    fn test_all_errors_reported_together() {
        let mut config = EngineConfig::default();
        config.retry.jitter_ratio = 1.5;
        config.selector.health_floor = -0.1;
        config.retry.max_attempts = 0;
        config.fees.fallback_high = 1;

        match validate_config(&config) {
            Err(ConfigError::ValidationError(msg)) => {
                assert!(msg.contains("retry.jitter_ratio"));
                assert!(msg.contains("selector.health_floor"));
                assert!(msg.contains("retry.max_attempts"));
                assert!(msg.contains("fees.fallback"));
                assert_eq!(msg.matches("; ").count(), 3);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}

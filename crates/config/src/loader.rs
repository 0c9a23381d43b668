//! Configuration loading from multiple sources

use crate::{ConfigError, EngineConfig, Result};
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use std::path::Path;

/// Prefix for environment overrides, e.g. `TXSETTLE_RETRY__MAX_ATTEMPTS=12`
pub const DEFAULT_ENV_PREFIX: &str = "TXSETTLE";

/// Configuration loader with support for multiple formats and sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file
    ///
    /// Supports TOML, YAML, and JSON formats based on file extension
    pub fn from_file(path: &Path) -> Result<EngineConfig> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ConfigError::LoadError("No file extension found".to_string()))?;

        let content = std::fs::read_to_string(path)?;

        match extension {
            "toml" => Self::from_toml(&content),
            "yaml" | "yml" => Self::from_yaml(&content),
            "json" => Self::from_json(&content),
            _ => Err(ConfigError::LoadError(format!(
                "Unsupported file extension: {}",
                extension
            ))),
        }
    }

    pub fn from_toml(content: &str) -> Result<EngineConfig> {
        toml::from_str(content).map_err(ConfigError::from)
    }

    pub fn from_yaml(content: &str) -> Result<EngineConfig> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    pub fn from_json(content: &str) -> Result<EngineConfig> {
        serde_json::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration from environment variables with the default prefix
    pub fn from_env() -> Result<EngineConfig> {
        Self::from_env_with_prefix(DEFAULT_ENV_PREFIX)
    }

    /// Load configuration from environment variables with a custom prefix
    ///
    /// Variables are named `PREFIX_SECTION__KEY`, for example
    /// `TXSETTLE_LEASE__CACHE_WINDOW_MS=1500`. Unset values keep their defaults.
    pub fn from_env_with_prefix(prefix: &str) -> Result<EngineConfig> {
        let config = Config::builder()
            .add_source(env_source(prefix))
            .build()?;

        config.try_deserialize().map_err(ConfigError::from)
    }

    /// Merge two configurations section by section, with overlay taking precedence
    /// for every section that differs from its default
    pub fn merge(base: EngineConfig, overlay: EngineConfig) -> EngineConfig {
        let defaults = EngineConfig::default();

        fn pick<T: PartialEq>(base: T, overlay: T, default: &T) -> T {
            if overlay != *default {
                overlay
            } else {
                base
            }
        }

        EngineConfig {
            network: pick(base.network, overlay.network, &defaults.network),
            lease: pick(base.lease, overlay.lease, &defaults.lease),
            fees: pick(base.fees, overlay.fees, &defaults.fees),
            retry: pick(base.retry, overlay.retry, &defaults.retry),
            executor: pick(base.executor, overlay.executor, &defaults.executor),
            selector: pick(base.selector, overlay.selector, &defaults.selector),
            monitor: pick(base.monitor, overlay.monitor, &defaults.monitor),
        }
    }

    /// Load configuration from a file, then apply environment variable overrides
    /// key by key
    pub fn from_file_with_env(path: &Path, env_prefix: &str) -> Result<EngineConfig> {
        Self::builder().add_file(path, true).add_env(env_prefix).build()
    }

    /// Build configuration from several layered sources
    pub fn builder() -> ConfigLoaderBuilder {
        ConfigLoaderBuilder {
            builder: Config::builder(),
        }
    }
}

fn env_source(prefix: &str) -> Environment {
    Environment::with_prefix(prefix)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Builder for layered configuration loading; later sources win
pub struct ConfigLoaderBuilder {
    builder: ConfigBuilder<config::builder::DefaultState>,
}

impl ConfigLoaderBuilder {
    pub fn add_file(mut self, path: &Path, required: bool) -> Self {
        let format = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => FileFormat::Yaml,
            Some("json") => FileFormat::Json,
            _ => FileFormat::Toml,
        };

        self.builder = self
            .builder
            .add_source(File::from(path).format(format).required(required));
        self
    }

    pub fn add_env(mut self, prefix: &str) -> Self {
        self.builder = self.builder.add_source(env_source(prefix));
        self
    }

    /// Override a single dotted key, e.g. `("retry.max_attempts", "4")`
    pub fn set_override(mut self, key: &str, value: &str) -> Result<Self> {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    pub fn build(self) -> Result<EngineConfig> {
        let config = self.builder.build()?;
        config.try_deserialize().map_err(ConfigError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_toml() {
        let toml = r#"
            [network]
            log_level = "debug"
            metrics_enabled = true
            metrics_port = 9191

            [retry]
            max_attempts = 5
            base_delay_ms = 100

            [executor]
            optimistic_relay_confirmation = true
            bundle_relay_enabled = false
        "#;

        let config = ConfigLoader::from_toml(toml).unwrap();
        assert_eq!(config.network.log_level, "debug");
        assert_eq!(config.network.metrics_port, 9191);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.max_delay_ms, 4000);
        assert!(config.executor.optimistic_relay_confirmation);
        assert!(!config.executor.bundle_relay_enabled);
        assert!(config.executor.priority_relay_enabled);
    }

    #[test]
    fn test_load_from_yaml() {
        let yaml = r#"
network:
  log_level: warn

selector:
  health_floor: 0.8
  health_window: 30

monitor:
  interval_secs: 15
  sample_window: 4
        "#;

        let config = ConfigLoader::from_yaml(yaml).unwrap();
        assert_eq!(config.network.log_level, "warn");
        assert_eq!(config.selector.health_floor, 0.8);
        assert_eq!(config.selector.min_samples, 5);
        assert_eq!(config.monitor.interval_secs, 15);
        assert_eq!(config.monitor.sample_window, 4);
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"
{
  "lease": {
    "cache_window_ms": 1500,
    "fetch_max_attempts": 5
  },
  "fees": {
    "cache_ttl_ms": 1000,
    "fallback_urgent": 2000000
  }
}
        "#;

        let config = ConfigLoader::from_json(json).unwrap();
        assert_eq!(config.lease.cache_window_ms, 1500);
        assert_eq!(config.lease.fetch_max_attempts, 5);
        assert_eq!(config.fees.fallback_urgent, 2_000_000);
        assert_eq!(config.fees.fallback_low, 1_000);
    }

    #[test]
    fn test_load_from_file() {
        let toml = r#"
[network]
log_level = "debug"

[lease]
cache_window_ms = 750
        "#;

        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(toml.as_bytes()).unwrap();

        let config = ConfigLoader::from_file(file.path()).unwrap();
        assert_eq!(config.network.log_level, "debug");
        assert_eq!(config.lease.cache_window_ms, 750);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let err = ConfigLoader::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::LoadError(_)));
    }

    #[test]
    fn test_merge_configs() {
        let base = EngineConfig {
            network: crate::NetworkConfig {
                log_level: "info".to_string(),
                metrics_enabled: true,
                metrics_port: 9100,
            },
            ..Default::default()
        };

        let overlay = EngineConfig {
            retry: crate::RetryConfig {
                max_attempts: 3,
                ..Default::default()
            },
            ..Default::default()
        };

        let merged = ConfigLoader::merge(base, overlay);
        assert_eq!(merged.network.metrics_port, 9100);
        assert_eq!(merged.retry.max_attempts, 3);
    }

    #[test]
    fn test_builder_override() {
        let config = ConfigLoader::builder()
            .set_override("retry.max_attempts", "4")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.escalated_max_attempts, 15);
    }
}

//! Hot-reload configuration watcher

use crate::{validate_config, ConfigError, ConfigLoader, EngineConfig, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Watches a config file and swaps in each new version that parses and validates
///
/// A file that fails to load or validate leaves the previous config in place.
pub struct ConfigWatcher {
    config: Arc<RwLock<EngineConfig>>,
    updates: watch::Sender<EngineConfig>,
    path: PathBuf,
}

impl ConfigWatcher {
    /// Load and validate the initial configuration
    pub fn new(path: PathBuf) -> Result<Self> {
        let config = ConfigLoader::from_file(&path)?;
        validate_config(&config)?;
        let (updates, _) = watch::channel(config.clone());

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            updates,
            path,
        })
    }

    /// Current configuration
    pub fn get_config(&self) -> EngineConfig {
        match self.config.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Receiver notified after every successful reload
    pub fn subscribe(&self) -> watch::Receiver<EngineConfig> {
        self.updates.subscribe()
    }

    /// Start watching the config file for changes
    ///
    /// The returned task runs until aborted.
    pub fn start_watching(&self) -> Result<JoinHandle<()>> {
        let config = Arc::clone(&self.config);
        let updates = self.updates.clone();
        let path = self.path.clone();

        let (tx, mut rx) = mpsc::channel(100);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if let Err(e) = tx.blocking_send(event) {
                        error!("Failed to send file event: {}", e);
                    }
                }
                Err(e) => error!(error_type = "config_watch", "File watch error: {}", e),
            },
            notify::Config::default().with_poll_interval(Duration::from_secs(2)),
        )
        .map_err(|e| ConfigError::WatchError(e.to_string()))?;

        watcher
            .watch(&path, RecursiveMode::NonRecursive)
            .map_err(|e| ConfigError::WatchError(e.to_string()))?;

        info!(path = ?path, "Started watching config file");

        let handle = tokio::spawn(async move {
            // The watcher stops when dropped
            let _watcher = watcher;

            while let Some(event) = rx.recv().await {
                if !matches!(event.kind, EventKind::Modify(_)) {
                    continue;
                }
                debug!("Config file modified, reloading...");

                let new_config = match ConfigLoader::from_file(&path)
                    .and_then(|c| validate_config(&c).map(|_| c))
                {
                    Ok(new_config) => new_config,
                    Err(e) => {
                        warn!(error_type = "config_reload", "Failed to reload config: {}. Keeping old config.", e);
                        continue;
                    }
                };

                match config.write() {
                    Ok(mut guard) => {
                        *guard = new_config.clone();
                        updates.send_replace(new_config);
                        info!("Config reloaded successfully");
                    }
                    Err(e) => {
                        error!("Failed to acquire write lock for config reload: {}", e);
                    }
                }
            }

            debug!("Config watcher task stopped");
        });

        Ok(handle)
    }

    /// Create a watcher and start watching immediately
    pub fn watch(path: PathBuf) -> Result<(Self, JoinHandle<()>)> {
        let watcher = Self::new(path)?;
        let handle = watcher.start_watching()?;
        Ok((watcher, handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio::time::{sleep, Duration};

    const INITIAL: &str = r#"
[network]
log_level = "info"

[retry]
max_attempts = 6
    "#;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn test_config_watcher_basic() {
        let file = write_temp(INITIAL);

        let watcher = ConfigWatcher::new(file.path().to_path_buf()).unwrap();
        let config = watcher.get_config();

        assert_eq!(config.network.log_level, "info");
        assert_eq!(config.retry.max_attempts, 6);
    }

    #[tokio::test]
    async fn test_config_watcher_rejects_invalid_initial_file() {
        let file = write_temp("[monitor]\nsample_window = 0\n");
        let err = ConfigWatcher::new(file.path().to_path_buf()).err().unwrap();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_config_watcher_reload() {
        let file = write_temp(INITIAL);
        let path = file.path().to_path_buf();
        let (watcher, _handle) = ConfigWatcher::watch(path.clone()).unwrap();
        let mut updates = watcher.subscribe();

        assert_eq!(watcher.get_config().network.log_level, "info");

        sleep(Duration::from_millis(100)).await;

        std::fs::write(&path, "[network]\nlog_level = \"debug\"\n").unwrap();

        sleep(Duration::from_secs(3)).await;

        assert_eq!(watcher.get_config().network.log_level, "debug");
        assert!(updates.has_changed().unwrap());
        assert_eq!(updates.borrow_and_update().network.log_level, "debug");
    }

    #[tokio::test]
    async fn test_config_watcher_invalid_update() {
        let file = write_temp(INITIAL);
        let path = file.path().to_path_buf();
        let (watcher, _handle) = ConfigWatcher::watch(path.clone()).unwrap();

        sleep(Duration::from_millis(100)).await;

        std::fs::write(&path, "invalid toml {{[[]").unwrap();
        sleep(Duration::from_secs(3)).await;
        assert_eq!(watcher.get_config().network.log_level, "info");

        // Parses, but fails validation
        std::fs::write(&path, "[selector]\nhealth_floor = 3.0\n").unwrap();
        sleep(Duration::from_secs(3)).await;
        assert_eq!(watcher.get_config().selector.health_floor, 0.7);
        assert_eq!(watcher.get_config().retry.max_attempts, 6);
    }
}

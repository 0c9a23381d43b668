use arc_swap::ArcSwap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use txsettle_executor::FeeEstimator;
use txsettle_ledger::LedgerClient;
use txsettle_metrics::MetricsCollector;
use txsettle_types::{CongestionLevel, CongestionState, EngineEvent, EventSink};

use crate::MonitorError;

/// Sampling cadence and classification thresholds
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub interval: Duration,
    /// Per-tick averages kept in the rolling window
    pub sample_window: usize,
    pub low_threshold_ms: f64,
    pub medium_threshold_ms: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            sample_window: 10,
            low_threshold_ms: 500.0,
            medium_threshold_ms: 1000.0,
        }
    }
}

/// Background sampler of ledger throughput
///
/// Publishes a whole new [`CongestionState`] per successful tick; readers see
/// either the old or the new snapshot, never a mix. Failed ticks leave the
/// snapshot untouched.
pub struct NetworkConditionMonitor {
    ledger: Arc<dyn LedgerClient>,
    config: ArcSwap<MonitorConfig>,
    state: ArcSwap<CongestionState>,
    window: Mutex<VecDeque<f64>>,
    fees: Option<Arc<FeeEstimator>>,
    events: Option<Arc<dyn EventSink>>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl NetworkConditionMonitor {
    pub fn new(ledger: Arc<dyn LedgerClient>, config: MonitorConfig) -> Self {
        Self {
            ledger,
            config: ArcSwap::from_pointee(config),
            state: ArcSwap::from_pointee(CongestionState::default()),
            window: Mutex::new(VecDeque::new()),
            fees: None,
            events: None,
            metrics: None,
        }
    }

    /// Invalidate this estimator's cache whenever the congestion level changes
    pub fn with_fee_estimator(mut self, fees: Arc<FeeEstimator>) -> Self {
        self.fees = Some(fees);
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Swap in new thresholds and window size, applied from the next tick.
    /// The sampling interval is fixed once the loop is spawned.
    pub fn reconfigure(&self, config: MonitorConfig) {
        debug!(
            low_threshold_ms = config.low_threshold_ms,
            medium_threshold_ms = config.medium_threshold_ms,
            sample_window = config.sample_window,
            "monitor reconfigured"
        );
        self.config.store(Arc::new(config));
    }

    pub fn config(&self) -> MonitorConfig {
        self.config.load().as_ref().clone()
    }

    /// Latest published snapshot
    pub fn state(&self) -> Arc<CongestionState> {
        self.state.load_full()
    }

    /// Take one throughput sample and publish the resulting state
    pub async fn tick(&self) -> Result<CongestionState, MonitorError> {
        let samples = self.ledger.get_recent_throughput_samples().await?;
        let per_sample: Vec<f64> = samples.iter().filter_map(|s| s.confirmation_ms()).collect();
        if per_sample.is_empty() {
            return Err(MonitorError::NoUsableSamples);
        }
        let sample_avg = per_sample.iter().sum::<f64>() / per_sample.len() as f64;
        let config = self.config.load_full();

        let rolling_avg = {
            let mut window = self.lock_window();
            window.push_back(sample_avg);
            while window.len() > config.sample_window.max(1) {
                window.pop_front();
            }
            window.iter().sum::<f64>() / window.len() as f64
        };

        let level = CongestionLevel::classify(
            rolling_avg,
            config.low_threshold_ms,
            config.medium_threshold_ms,
        );
        let next = CongestionState::new(level, rolling_avg);
        let previous = self.state.swap(Arc::new(next.clone()));

        if previous.level != level {
            info!(
                from = %previous.level,
                to = %level,
                avg_confirmation_ms = rolling_avg,
                "congestion level changed"
            );
            if let Some(fees) = &self.fees {
                fees.invalidate();
            }
        } else {
            debug!(level = %level, avg_confirmation_ms = rolling_avg, "congestion sampled");
        }

        if let Some(metrics) = &self.metrics {
            metrics.set_congestion(level, rolling_avg);
        }
        if let Some(events) = &self.events {
            events.emit(EngineEvent::CongestionUpdate(next.clone()));
        }
        Ok(next)
    }

    /// Run [`tick`](Self::tick), logging and counting failures instead of returning them
    pub async fn run_tick(&self) {
        if let Err(e) = self.tick().await {
            warn!(error_type = "monitor_sample", error = %e, "network sampling failed, keeping previous state");
            if let Some(metrics) = &self.metrics {
                metrics.record_monitor_failure();
            }
        }
    }

    /// Tick on a fixed interval until `shutdown` is cancelled
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = self.config.load().interval;
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_ms = period.as_millis() as u64, "network monitor started");

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => self.run_tick().await,
                }
            }

            info!("network monitor stopped");
        })
    }

    fn lock_window(&self) -> MutexGuard<'_, VecDeque<f64>> {
        self.window.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

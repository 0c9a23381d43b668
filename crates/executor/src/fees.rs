use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;
use tracing::{debug, warn};
use txsettle_ledger::LedgerClient;
use txsettle_metrics::MetricsCollector;
use txsettle_types::{EngineEvent, EventSink, FeeEstimate, Priority};

/// Sampling cut points and fallback table for the fee estimator
#[derive(Debug, Clone, PartialEq)]
pub struct FeeEstimatorConfig {
    /// How long a computed estimate is reused
    pub cache_ttl: Duration,
    /// Sample requests slower than this fall back to the table
    pub sample_timeout: Duration,
    /// Percentile of the descending-sorted samples per tier, cheapest first
    pub percentiles: [u8; 4],
    /// Tier values used when sampling fails, cheapest first
    pub fallback: [u64; 4],
}

impl Default for FeeEstimatorConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(5),
            sample_timeout: Duration::from_secs(3),
            percentiles: [75, 50, 25, 5],
            fallback: [1_000, 10_000, 100_000, 1_000_000],
        }
    }
}

/// Pick tier values from raw fee samples
///
/// Samples are sorted descending and the value at `floor(p / 100 * (n - 1))`
/// is taken for each cut point. Returns `None` for an empty sample set.
pub fn compute_from_samples(samples: &[u64], percentiles: [u8; 4]) -> Option<[u64; 4]> {
    if samples.is_empty() {
        return None;
    }

    let mut sorted = samples.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    let last = sorted.len() - 1;

    let mut tiers = [0u64; 4];
    for (tier, p) in tiers.iter_mut().zip(percentiles) {
        let p = u64::from(p.min(100));
        let index = (p * last as u64 / 100) as usize;
        *tier = sorted[index];
    }
    Some(tiers)
}

/// Memoized priority fee estimates
///
/// At most one sample request is outstanding; callers that find the cache
/// stale while it runs wait for its result.
pub struct FeeEstimator {
    ledger: Arc<dyn LedgerClient>,
    config: FeeEstimatorConfig,
    cached: Mutex<Option<(FeeEstimate, Instant)>>,
    sampling: AsyncMutex<()>,
    events: Option<Arc<dyn EventSink>>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl FeeEstimator {
    pub fn new(ledger: Arc<dyn LedgerClient>, config: FeeEstimatorConfig) -> Self {
        Self {
            ledger,
            config,
            cached: Mutex::new(None),
            sampling: AsyncMutex::new(()),
            events: None,
            metrics: None,
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Fee for one priority tier
    pub async fn estimate(&self, priority: Priority) -> u64 {
        self.current_estimate().await.fee_for(priority)
    }

    /// Full tier table, sampled again once the cached one is older than the TTL
    ///
    /// Never fails: a sampling error yields the fallback table marked `degraded`.
    pub async fn current_estimate(&self) -> FeeEstimate {
        if let Some(estimate) = self.fresh_cached() {
            return estimate;
        }

        let _sampling = self.sampling.lock().await;
        if let Some(estimate) = self.fresh_cached() {
            debug!("fee estimate refreshed by a concurrent caller");
            return estimate;
        }

        let estimate = self.sample().await;
        *self.lock_cache() = Some((estimate.clone(), Instant::now()));

        if let Some(metrics) = &self.metrics {
            metrics.record_fee_estimate(estimate.degraded);
        }
        if let Some(events) = &self.events {
            events.emit(EngineEvent::FeeUpdate(estimate.clone()));
        }
        estimate
    }

    /// Drop the memoized estimate; the next call samples again
    pub fn invalidate(&self) {
        *self.lock_cache() = None;
    }

    async fn sample(&self) -> FeeEstimate {
        let sampled = tokio::time::timeout(
            self.config.sample_timeout,
            self.ledger.get_recent_fee_samples(),
        )
        .await;

        let tiers = match sampled {
            Ok(Ok(samples)) => compute_from_samples(&samples, self.config.percentiles),
            Ok(Err(e)) => {
                warn!(error_type = "fee_sampling", error = %e, "fee sampling failed, using fallback table");
                None
            }
            Err(_) => {
                warn!(
                    error_type = "fee_sampling",
                    timeout_ms = self.config.sample_timeout.as_millis() as u64,
                    "fee sampling timed out, using fallback table"
                );
                None
            }
        };

        match tiers {
            Some(tiers) => {
                let estimate = FeeEstimate::from_tiers(tiers, false);
                debug!(
                    low = estimate.low,
                    medium = estimate.medium,
                    high = estimate.high,
                    urgent = estimate.urgent,
                    "fee estimate sampled"
                );
                estimate
            }
            None => FeeEstimate::from_tiers(self.config.fallback, true),
        }
    }

    fn fresh_cached(&self) -> Option<FeeEstimate> {
        match self.lock_cache().as_ref() {
            Some((estimate, computed)) if computed.elapsed() < self.config.cache_ttl => {
                Some(estimate.clone())
            }
            _ => None,
        }
    }

    fn lock_cache(&self) -> MutexGuard<'_, Option<(FeeEstimate, Instant)>> {
        self.cached.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txsettle_ledger::mock::MockLedger;
    use txsettle_ledger::LedgerError;

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<EngineEvent>>);

    impl EventSink for RecordingSink {
        fn emit(&self, event: EngineEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    #[test]
    fn test_percentile_indexing() {
        let samples: Vec<u64> = (1..=100).map(|i| i * 100).collect();
        let tiers = compute_from_samples(&samples, [75, 50, 25, 5]).unwrap();
        // Descending: index 0 is 10_000, index 99 is 100
        assert_eq!(tiers, [2_600, 5_100, 7_600, 9_600]);
    }

    #[test]
    fn test_single_sample_fills_every_tier() {
        assert_eq!(compute_from_samples(&[42], [75, 50, 25, 5]), Some([42; 4]));
        assert_eq!(compute_from_samples(&[], [75, 50, 25, 5]), None);
    }

    #[tokio::test]
    async fn test_sampled_estimate_is_monotonic() {
        let ledger = Arc::new(MockLedger::new());
        ledger.fee_samples.push(Ok(vec![7, 1_000, 3, 3, 90, 0, 5_000, 12]));
        let estimator = FeeEstimator::new(ledger, FeeEstimatorConfig::default());

        let estimate = estimator.current_estimate().await;
        assert!(!estimate.degraded);
        assert!(estimate.is_monotonic());
        assert!(estimator.estimate(Priority::Low).await <= estimator.estimate(Priority::Urgent).await);
    }

    #[tokio::test]
    async fn test_sampling_failure_uses_fallback() {
        let ledger = Arc::new(MockLedger::new());
        ledger
            .fee_samples
            .push(Err(LedgerError::Unavailable("rpc down".into())));
        let estimator = FeeEstimator::new(ledger, FeeEstimatorConfig::default());

        let estimate = estimator.current_estimate().await;
        assert!(estimate.degraded);
        assert_eq!(estimate.tiers(), [1_000, 10_000, 100_000, 1_000_000]);
    }

    #[tokio::test]
    async fn test_empty_samples_are_degraded() {
        let ledger = Arc::new(MockLedger::new());
        ledger.fee_samples.push(Ok(Vec::new()));
        let estimator = FeeEstimator::new(ledger, FeeEstimatorConfig::default());

        assert!(estimator.current_estimate().await.degraded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_memoized_within_ttl() {
        let ledger = Arc::new(MockLedger::new());
        let estimator = FeeEstimator::new(ledger.clone(), FeeEstimatorConfig::default());

        estimator.estimate(Priority::Medium).await;
        estimator.estimate(Priority::High).await;
        assert_eq!(ledger.fee_samples.calls(), 1);

        tokio::time::advance(Duration::from_secs(6)).await;
        estimator.estimate(Priority::High).await;
        assert_eq!(ledger.fee_samples.calls(), 2);

        estimator.invalidate();
        estimator.estimate(Priority::High).await;
        assert_eq!(ledger.fee_samples.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_sampling_falls_back_after_timeout() {
        let ledger = Arc::new(MockLedger::new());
        ledger.set_fee_sample_delay(Duration::from_secs(3600));
        let estimator = FeeEstimator::new(ledger.clone(), FeeEstimatorConfig::default());

        let started = Instant::now();
        let estimate = estimator.current_estimate().await;

        assert!(estimate.degraded);
        assert_eq!(estimate.tiers(), [1_000, 10_000, 100_000, 1_000_000]);
        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(ledger.fee_samples.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_stale_callers_share_one_sample() {
        let ledger = Arc::new(MockLedger::new());
        ledger.set_fee_sample_delay(Duration::from_millis(200));
        let sink = Arc::new(RecordingSink::default());
        let estimator = Arc::new(
            FeeEstimator::new(ledger.clone(), FeeEstimatorConfig::default()).with_events(sink.clone()),
        );

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let estimator = estimator.clone();
                tokio::spawn(async move { estimator.current_estimate().await })
            })
            .collect();

        let mut estimates = Vec::new();
        for handle in handles {
            estimates.push(handle.await.unwrap());
        }

        assert_eq!(ledger.fee_samples.calls(), 1);
        assert!(estimates.iter().all(|estimate| *estimate == estimates[0]));
        assert_eq!(sink.0.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fee_update_emitted_per_sample() {
        let ledger = Arc::new(MockLedger::new());
        let sink = Arc::new(RecordingSink::default());
        let estimator =
            FeeEstimator::new(ledger, FeeEstimatorConfig::default()).with_events(sink.clone());

        estimator.estimate(Priority::Low).await;
        estimator.estimate(Priority::Low).await;

        let events = sink.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "fee-update");
    }
}

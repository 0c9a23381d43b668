use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};
use txsettle_ledger::{LedgerClient, LedgerError};
use txsettle_metrics::MetricsCollector;
use txsettle_retry::{run_with_retry_if, RetryError, RetryPolicy};
use txsettle_types::SessionLease;

use crate::ExecutorError;

type LeaseFetch = Shared<BoxFuture<'static, Result<SessionLease, ExecutorError>>>;

/// Lease caching and fetch retry settings
#[derive(Debug, Clone, PartialEq)]
pub struct LeaseCacheConfig {
    /// Age under which a cached lease is returned without asking the ledger
    pub cache_window: Duration,
    /// Retry budget for one underlying fetch
    pub fetch_policy: RetryPolicy,
    /// Bound on each session request and on the height check
    pub fetch_timeout: Duration,
}

impl Default for LeaseCacheConfig {
    fn default() -> Self {
        Self {
            cache_window: Duration::from_millis(2000),
            fetch_policy: RetryPolicy::new(3, Duration::from_millis(100), Duration::from_secs(1)),
            fetch_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Default)]
struct Slot {
    cached: Option<(SessionLease, Instant)>,
    in_flight: Option<(u64, LeaseFetch)>,
}

struct Inner {
    ledger: Arc<dyn LedgerClient>,
    config: LeaseCacheConfig,
    metrics: Option<Arc<MetricsCollector>>,
    slot: Mutex<Slot>,
    generation: AtomicU64,
}

/// Short-lived cache of the ledger session lease
///
/// A stale cache triggers one fetch; concurrent callers await that same fetch.
/// The slot lock is never held across an await.
#[derive(Clone)]
pub struct SessionLeaseCache {
    inner: Arc<Inner>,
}

impl SessionLeaseCache {
    pub fn new(ledger: Arc<dyn LedgerClient>, config: LeaseCacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                ledger,
                config,
                metrics: None,
                slot: Mutex::new(Slot::default()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn with_metrics(ledger: Arc<dyn LedgerClient>, config: LeaseCacheConfig, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            inner: Arc::new(Inner {
                ledger,
                config,
                metrics: Some(metrics),
                slot: Mutex::new(Slot::default()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Cached lease if still inside the cache window, otherwise a fresh one
    pub async fn get_lease(&self) -> Result<SessionLease, ExecutorError> {
        let fetch = {
            let mut slot = self.inner.lock_slot();
            if let Some((lease, fetched)) = &slot.cached {
                if fetched.elapsed() < self.inner.config.cache_window {
                    if let Some(metrics) = &self.inner.metrics {
                        metrics.record_lease_cache_hit();
                    }
                    return Ok(lease.clone());
                }
            }
            self.join_or_start(&mut slot)
        };
        fetch.await
    }

    /// Lease still valid at the ledger's current height
    ///
    /// A cached lease the chain has already passed is renewed before it is
    /// handed out. If the height cannot be read the lease is returned as is;
    /// the confirmation loop stops on expiry anyway.
    pub async fn get_valid_lease(&self) -> Result<SessionLease, ExecutorError> {
        let lease = self.get_lease().await?;
        let Some(height) = self.current_height().await else {
            return Ok(lease);
        };
        if !lease.is_expired_at(height) {
            return Ok(lease);
        }

        debug!(
            snapshot_id = %lease.snapshot_id,
            expiry_height = lease.expiry_height,
            height,
            "cached lease expired, renewing"
        );
        let renewed = self.renew(&lease).await?;
        if renewed.is_expired_at(height) {
            warn!(
                error_type = "lease_expired",
                snapshot_id = %renewed.snapshot_id,
                expiry_height = renewed.expiry_height,
                height,
                "ledger returned an already expired lease"
            );
            return Err(ExecutorError::LeaseExpired);
        }
        Ok(renewed)
    }

    /// Replace `stale` with a fresh lease, unless another caller already did
    pub async fn renew(&self, stale: &SessionLease) -> Result<SessionLease, ExecutorError> {
        let fetch = {
            let mut slot = self.inner.lock_slot();
            if let Some((cached, _)) = &slot.cached {
                if cached.snapshot_id != stale.snapshot_id {
                    return Ok(cached.clone());
                }
            }
            slot.cached = None;
            self.join_or_start(&mut slot)
        };
        fetch.await
    }

    /// Fetch a new lease regardless of the cache, joining a fetch already in flight
    pub async fn refresh(&self) -> Result<SessionLease, ExecutorError> {
        let fetch = {
            let mut slot = self.inner.lock_slot();
            slot.cached = None;
            self.join_or_start(&mut slot)
        };
        fetch.await
    }

    /// Drop the cached lease; the next `get_lease` fetches
    pub fn invalidate(&self) {
        self.inner.lock_slot().cached = None;
    }

    /// Cached lease, whatever its age, without fetching
    pub fn current(&self) -> Option<SessionLease> {
        self.inner
            .lock_slot()
            .cached
            .as_ref()
            .map(|(lease, _)| lease.clone())
    }

    pub fn is_expired(&self, lease: &SessionLease, current_height: u64) -> bool {
        lease.is_expired_at(current_height)
    }

    async fn current_height(&self) -> Option<u64> {
        let height = tokio::time::timeout(
            self.inner.config.fetch_timeout,
            self.inner.ledger.get_current_height(),
        )
        .await;
        match height {
            Ok(Ok(height)) => Some(height),
            Ok(Err(e)) => {
                debug!(error = %e, "height unavailable, keeping cached lease");
                None
            }
            Err(_) => {
                debug!("height check timed out, keeping cached lease");
                None
            }
        }
    }

    fn join_or_start(&self, slot: &mut Slot) -> LeaseFetch {
        if let Some((_, fetch)) = &slot.in_flight {
            debug!("joining in-flight lease fetch");
            return fetch.clone();
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::clone(&self.inner);
        let fetch = async move {
            let result = inner.fetch().await;

            let mut slot = inner.lock_slot();
            if matches!(&slot.in_flight, Some((g, _)) if *g == generation) {
                slot.in_flight = None;
            }
            if let Ok(lease) = &result {
                slot.cached = Some((lease.clone(), Instant::now()));
            }
            result
        }
        .boxed()
        .shared();

        slot.in_flight = Some((generation, fetch.clone()));
        fetch
    }
}

impl Inner {
    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn fetch(&self) -> Result<SessionLease, ExecutorError> {
        let timeout = self.config.fetch_timeout;
        let ledger = self.ledger.as_ref();
        let result = run_with_retry_if(
            "get_latest_session",
            &self.config.fetch_policy,
            move |_| async move {
                tokio::time::timeout(timeout, ledger.get_latest_session())
                    .await
                    .unwrap_or_else(|_| Err(LedgerError::Timeout("session fetch timed out".into())))
            },
            |_| true,
            LedgerError::is_transient,
        )
        .await;

        if let Some(metrics) = &self.metrics {
            metrics.record_lease_fetch(result.is_ok());
        }

        result.map_err(|e| {
            let detail = match e {
                RetryError::Exhausted { last, .. } => last.to_string(),
                RetryError::Aborted { error, .. } => error.to_string(),
            };
            warn!(error_type = "lease_fetch", error = %detail, "session lease fetch failed");
            ExecutorError::LedgerUnavailable(detail)
        })
    }
}

use arc_swap::ArcSwap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};
use txsettle_config::{validate_config, EngineConfig, NetworkConfig};
use txsettle_executor::{
    AttemptOptions, ExecutionContext, ExecutionStage, Executor, FeeEstimator, NotSubmitted,
    SessionLeaseCache,
};
use txsettle_ledger::{LedgerClient, PassthroughFinalizer, PayloadFinalizer, RelayClient};
use txsettle_metrics::{ExecutionSpan, MetricsCollector, MetricsServer, MetricsServerError};
use txsettle_types::{
    CongestionState, EngineEvent, EventSink, ExecutionResult, FailureReason, FeeEstimate,
    NoopEventSink, Priority, StrategyHealthStats, StrategyKind, TransactionRequest,
};

use crate::selector::{self, Availability, Selection, SelectorConfig};
use crate::{settings, EngineError, NetworkConditionMonitor};

/// Builder for [`SettlementEngine`]
pub struct SettlementEngineBuilder {
    ledger: Option<Arc<dyn LedgerClient>>,
    priority_relay: Option<Arc<dyn RelayClient>>,
    bundle_relay: Option<Arc<dyn RelayClient>>,
    finalizer: Arc<dyn PayloadFinalizer>,
    events: Arc<dyn EventSink>,
    metrics: Option<Arc<MetricsCollector>>,
    config: EngineConfig,
}

impl SettlementEngineBuilder {
    pub fn new() -> Self {
        Self {
            ledger: None,
            priority_relay: None,
            bundle_relay: None,
            finalizer: Arc::new(PassthroughFinalizer),
            events: Arc::new(NoopEventSink),
            metrics: None,
            config: EngineConfig::default(),
        }
    }

    /// Set the primary ledger endpoint (required)
    pub fn with_ledger(mut self, ledger: Arc<dyn LedgerClient>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn with_priority_relay(mut self, relay: Arc<dyn RelayClient>) -> Self {
        self.priority_relay = Some(relay);
        self
    }

    pub fn with_bundle_relay(mut self, relay: Arc<dyn RelayClient>) -> Self {
        self.bundle_relay = Some(relay);
        self
    }

    pub fn with_finalizer(mut self, finalizer: Arc<dyn PayloadFinalizer>) -> Self {
        self.finalizer = finalizer;
        self
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Share an existing collector. By default the engine creates its own.
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the configuration and wire every component
    pub fn build(self) -> Result<SettlementEngine, EngineError> {
        validate_config(&self.config)?;

        let ledger = self.ledger.ok_or_else(|| EngineError::MissingField {
            field: "ledger".to_string(),
        })?;
        let config = self.config;

        let metrics = self.metrics.unwrap_or_else(|| {
            Arc::new(MetricsCollector::with_health_window(
                config.selector.health_window,
            ))
        });

        let fees = Arc::new(
            FeeEstimator::new(ledger.clone(), settings::fee_estimator_config(&config.fees))
                .with_events(self.events.clone())
                .with_metrics(metrics.clone()),
        );

        let leases = SessionLeaseCache::with_metrics(
            ledger.clone(),
            settings::lease_cache_config(&config.lease),
            metrics.clone(),
        );

        let monitor = Arc::new(
            NetworkConditionMonitor::new(ledger.clone(), settings::monitor_config(&config.monitor))
                .with_fee_estimator(fees.clone())
                .with_events(self.events.clone())
                .with_metrics(metrics.clone()),
        );

        let available = settings::availability(
            &config,
            self.priority_relay.is_some(),
            self.bundle_relay.is_some(),
        );
        let priority_relay = self
            .priority_relay
            .filter(|_| available.priority_relay)
            .map(Executor::PriorityRelay);
        let bundle_relay = self
            .bundle_relay
            .filter(|_| available.bundle_relay)
            .map(Executor::BundleRelay);

        info!(
            priority_relay = available.priority_relay,
            bundle_relay = available.bundle_relay,
            optimistic_relay_confirmation = config.executor.optimistic_relay_confirmation,
            "settlement engine configured"
        );

        Ok(SettlementEngine {
            context: ExecutionContext {
                ledger,
                fees: fees.clone(),
                finalizer: self.finalizer,
                settings: settings::execution_settings(&config),
            },
            leases,
            fees,
            monitor,
            metrics,
            events: self.events,
            standard: Executor::Standard,
            priority_relay,
            bundle_relay,
            available,
            selector: ArcSwap::from_pointee(settings::selector_config(&config)),
            network: config.network,
        })
    }
}

impl Default for SettlementEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Entry point: select a strategy, acquire a lease, submit, confirm, record
pub struct SettlementEngine {
    context: ExecutionContext,
    leases: SessionLeaseCache,
    fees: Arc<FeeEstimator>,
    monitor: Arc<NetworkConditionMonitor>,
    metrics: Arc<MetricsCollector>,
    events: Arc<dyn EventSink>,
    standard: Executor,
    priority_relay: Option<Executor>,
    bundle_relay: Option<Executor>,
    available: Availability,
    selector: ArcSwap<SelectorConfig>,
    network: NetworkConfig,
}

impl SettlementEngine {
    pub fn builder() -> SettlementEngineBuilder {
        SettlementEngineBuilder::new()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EXECUTION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Execute one request to a terminal result
    ///
    /// Never fails: every outcome, including ledger outages, comes back as an
    /// [`ExecutionResult`] that has already been recorded and published.
    pub async fn execute(&self, request: &TransactionRequest) -> ExecutionResult {
        match self.run(request, None).await {
            Ok(result) => result,
            // Cancellation needs a token, so this arm only guards the type
            Err(e) => ExecutionResult::failed(
                request.id(),
                StrategyKind::Standard,
                FailureReason::Rejected(e.to_string()),
            ),
        }
    }

    /// Like [`execute`](Self::execute), but gives up with [`EngineError::Cancelled`]
    /// if `cancel` fires before the transaction is submitted
    ///
    /// A cancelled request is neither recorded nor published. Once submitted,
    /// the token is ignored.
    pub async fn execute_cancellable(
        &self,
        request: &TransactionRequest,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult, EngineError> {
        self.run(request, Some(cancel)).await
    }

    /// Strategy the selector would pick for this request right now
    pub fn select(&self, request: &TransactionRequest) -> Selection {
        let stats = self.metrics.snapshot();
        let congestion = self.monitor.state();
        selector::select(
            request.priority(),
            request.strategy(),
            &stats,
            &congestion,
            &self.available,
            &self.selector.load(),
        )
    }

    async fn run(
        &self,
        request: &TransactionRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<ExecutionResult, EngineError> {
        let selection = self.select(request);
        let span = ExecutionSpan::new(request.id(), selection.kind);

        async move {
            info!(
                stage = %ExecutionStage::Created,
                priority = %request.priority(),
                reason = %selection.reason,
                escalated = selection.escalated_retries,
                "strategy selected"
            );

            let lease = match until_cancelled(cancel, self.leases.get_valid_lease()).await {
                None => return Err(self.cancelled(request)),
                Some(Ok(lease)) => lease,
                Some(Err(e)) => {
                    warn!(error_type = "lease", error = %e, "no session lease, failing request");
                    let result =
                        ExecutionResult::failed(request.id(), selection.kind, e.failure_reason());
                    return Ok(self.finish(result));
                }
            };
            debug!(
                stage = %ExecutionStage::LeaseAcquired,
                snapshot_id = %lease.snapshot_id,
                expiry_height = lease.expiry_height,
                "lease acquired"
            );

            let options = AttemptOptions {
                escalated: selection.escalated_retries,
                cancel: cancel.cloned(),
            };
            let executor = self.executor(selection.kind);

            let result = match executor
                .execute(&self.context, request, &lease, &options)
                .await
            {
                Ok(result) => result,
                Err(NotSubmitted::Cancelled) => return Err(self.cancelled(request)),
                Err(NotSubmitted::Unsent(e)) if executor.kind().is_relay() => {
                    let from = executor.kind();
                    warn!(
                        error_type = "relay_unreachable",
                        from = from.name(),
                        error = %e,
                        "relay unreachable before submission, falling back to standard"
                    );
                    self.metrics.record_unreachable(from);
                    self.publish_health(from);
                    self.metrics.record_fallback(from, StrategyKind::Standard);

                    match self
                        .standard
                        .execute(&self.context, request, &lease, &options)
                        .await
                    {
                        Ok(result) => result.with_fallback_from(from),
                        Err(NotSubmitted::Cancelled) => return Err(self.cancelled(request)),
                        Err(NotSubmitted::Unsent(e)) => ExecutionResult::failed(
                            request.id(),
                            StrategyKind::Standard,
                            e.failure_reason(),
                        )
                        .with_fallback_from(from),
                    }
                }
                Err(NotSubmitted::Unsent(e)) => {
                    ExecutionResult::failed(request.id(), executor.kind(), e.failure_reason())
                }
            };

            Ok(self.finish(result))
        }
        .instrument(span.span())
        .await
    }

    fn executor(&self, kind: StrategyKind) -> &Executor {
        let configured = match kind {
            StrategyKind::Standard => None,
            StrategyKind::PriorityRelay => self.priority_relay.as_ref(),
            StrategyKind::BundleRelay => self.bundle_relay.as_ref(),
        };
        configured.unwrap_or(&self.standard)
    }

    fn cancelled(&self, request: &TransactionRequest) -> EngineError {
        info!(request_id = request.id(), "request cancelled before submission");
        EngineError::Cancelled
    }

    /// Record and publish a terminal result, exactly once per request
    fn finish(&self, result: ExecutionResult) -> ExecutionResult {
        let strategy = result.strategy_name;
        self.metrics.record(strategy, &result);
        self.publish_health(strategy);

        if let Some(reason) = &result.failure_reason {
            self.metrics.record_error(reason.as_str());
        }

        self.events.emit(EngineEvent::ExecutionResult(result.clone()));
        info!(
            stage = %ExecutionStage::Recorded,
            strategy = strategy.name(),
            confirmed = result.confirmed,
            status = ?result.status(),
            "execution recorded"
        );
        result
    }

    fn publish_health(&self, strategy: StrategyKind) {
        let selector = self.selector.load();
        let stats = self.metrics.stats(strategy);
        self.metrics.set_strategy_health(
            strategy,
            stats.is_healthy(selector.health_floor, selector.min_samples),
        );
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // RUNTIME CONFIGURATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Apply the settings that can change while running: the selector's health
    /// floor and sample minimum, and the monitor's thresholds and window.
    ///
    /// The rest of `config` (timeouts, retry budgets, endpoints, the monitor
    /// interval and the health window length) only takes effect in a new engine.
    pub fn apply_config(&self, config: &EngineConfig) -> Result<(), EngineError> {
        validate_config(config)?;

        let selector = settings::selector_config(config);
        let mut monitor = settings::monitor_config(&config.monitor);
        monitor.interval = self.monitor.config().interval;

        info!(
            health_floor = selector.health_floor,
            min_samples = selector.min_samples,
            low_threshold_ms = monitor.low_threshold_ms,
            medium_threshold_ms = monitor.medium_threshold_ms,
            "runtime configuration applied"
        );
        self.selector.store(Arc::new(selector));
        self.monitor.reconfigure(monitor);
        Ok(())
    }

    /// Apply every configuration published on `updates`, typically
    /// [`ConfigWatcher::subscribe`](txsettle_config::ConfigWatcher::subscribe),
    /// until `shutdown` is cancelled or the publisher goes away
    pub fn watch_config(
        self: Arc<Self>,
        mut updates: watch::Receiver<EngineConfig>,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    changed = updates.changed() => {
                        if changed.is_err() {
                            debug!("configuration publisher closed");
                            break;
                        }
                        let config = updates.borrow_and_update().clone();
                        if let Err(e) = self.apply_config(&config) {
                            warn!(error_type = "config_reload", error = %e, "configuration update rejected");
                        }
                    }
                }
            }
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ACCESSORS
    // ═══════════════════════════════════════════════════════════════════════════

    pub async fn get_fee_estimate(&self, priority: Priority) -> u64 {
        self.fees.estimate(priority).await
    }

    pub async fn get_fee_estimates(&self) -> FeeEstimate {
        self.fees.current_estimate().await
    }

    pub fn get_congestion_state(&self) -> CongestionState {
        self.monitor.state().as_ref().clone()
    }

    pub fn get_strategy_stats(&self, kind: StrategyKind) -> StrategyHealthStats {
        self.metrics.stats(kind)
    }

    /// Operator reset of every strategy's health counters
    pub fn reset_stats(&self) {
        self.metrics.reset();
    }

    /// Start the network monitor loop; it stops when `shutdown` is cancelled
    pub fn spawn_monitor(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        self.monitor.clone().spawn(shutdown)
    }

    /// Serve `/metrics` and `/health` on the configured port until `shutdown`
    /// is cancelled. `None` when metrics are disabled.
    pub fn spawn_metrics_server(
        &self,
        shutdown: CancellationToken,
    ) -> Option<JoinHandle<Result<(), MetricsServerError>>> {
        if !self.network.metrics_enabled {
            return None;
        }
        let server = MetricsServer::on_port(self.metrics.clone(), self.network.metrics_port);
        Some(tokio::spawn(server.serve_until(async move {
            shutdown.cancelled().await
        })))
    }

    pub fn monitor(&self) -> &Arc<NetworkConditionMonitor> {
        &self.monitor
    }

    pub fn lease_cache(&self) -> &SessionLeaseCache {
        &self.leases
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }
}

/// Await `fut` unless `cancel` fires first
async fn until_cancelled<F: Future>(cancel: Option<&CancellationToken>, fut: F) -> Option<F::Output> {
    match cancel {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => None,
                output = fut => Some(output),
            }
        }
        None => Some(fut.await),
    }
}

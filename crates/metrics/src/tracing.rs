use std::sync::Arc;
use tracing::{field::Visit, Event, Level, Subscriber};
use tracing_subscriber::{
    fmt,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};
use txsettle_types::StrategyKind;

use crate::collector::MetricsCollector;

/// Initialize tracing with metrics integration
pub fn init_tracing_with_metrics(collector: Arc<MetricsCollector>) -> Result<(), TracingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,txsettle=debug"));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_level(true)
        .json();

    let metrics_layer = MetricsLayer::new(collector);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(metrics_layer)
        .try_init()
        .map_err(|e| TracingError::InitError(e.to_string()))?;

    Ok(())
}

/// Tracing layer that counts error events by their `error_type` field
///
/// Every ERROR event is counted. WARN events are counted when they carry an
/// `error_type`, which is how recoverable failures on the settlement path are
/// logged.
pub struct MetricsLayer {
    collector: Arc<MetricsCollector>,
}

impl MetricsLayer {
    pub fn new(collector: Arc<MetricsCollector>) -> Self {
        Self { collector }
    }
}

impl<S> Layer<S> for MetricsLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        if level != Level::ERROR && level != Level::WARN {
            return;
        }

        let mut visitor = ErrorTypeVisitor::default();
        event.record(&mut visitor);
        if let Some(error_type) = visitor.error_type.as_deref() {
            self.collector.record_error(error_type);
        } else if level == Level::ERROR {
            self.collector.record_error("unclassified");
        }
    }
}

#[derive(Default)]
struct ErrorTypeVisitor {
    error_type: Option<String>,
}

impl Visit for ErrorTypeVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "error_type" {
            self.error_type = Some(format!("{value:?}"));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "error_type" {
            self.error_type = Some(value.to_string());
        }
    }
}

/// Correlation ID for tracking one execution across components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(uuid::Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Span context for one `execute` call
#[derive(Debug, Clone)]
pub struct ExecutionSpan {
    pub correlation_id: CorrelationId,
    pub request_id: String,
    pub strategy: StrategyKind,
}

impl ExecutionSpan {
    pub fn new(request_id: impl Into<String>, strategy: StrategyKind) -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            request_id: request_id.into(),
            strategy,
        }
    }

    /// Build the tracing span; attach it to a future with `Instrument`
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "execution",
            correlation_id = %self.correlation_id,
            request_id = %self.request_id,
            strategy = %self.strategy,
        )
    }
}

/// Tracing error types
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("tracing initialization error: {0}")]
    InitError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_id_generation() {
        let id1 = CorrelationId::new();
        let id2 = CorrelationId::new();

        assert_ne!(id1, id2);
        assert_eq!(id1.as_str().len(), 36);
    }

    #[test]
    fn test_execution_span_creation() {
        let span = ExecutionSpan::new("req_123", StrategyKind::BundleRelay);

        assert_eq!(span.request_id, "req_123");
        assert_eq!(span.strategy, StrategyKind::BundleRelay);
    }

    #[test]
    fn test_metrics_layer_counts_errors() {
        let collector = Arc::new(MetricsCollector::new());
        let subscriber = tracing_subscriber::registry().with(MetricsLayer::new(collector.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(error_type = "lease_fetch", "lease fetch failed");
        });

        let metrics = collector.export_metrics().unwrap();
        assert!(metrics.contains("txsettle_errors_total"));
        assert!(metrics.contains("lease_fetch"));
    }

    #[test]
    fn test_metrics_layer_counts_classified_warnings() {
        use crate::metrics::ERRORS;

        let collector = Arc::new(MetricsCollector::new());
        let subscriber = tracing_subscriber::registry().with(MetricsLayer::new(collector));
        let classified = ERRORS.with_label_values(&["fee_sampling_warn_layer"]);
        let before = classified.get();

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(error_type = "fee_sampling_warn_layer", "fee sampling failed");
            tracing::warn!("plain warning without a type");
            tracing::info!(error_type = "fee_sampling_warn_layer", "informational");
        });

        assert_eq!(classified.get(), before + 1);
    }
}

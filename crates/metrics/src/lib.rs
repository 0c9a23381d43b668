//! Metrics and monitoring for the txsettle settlement engine
//!
//! The [`MetricsCollector`] owns per-strategy health counters read by the
//! executor selector, and mirrors every event into process-wide Prometheus
//! series.
//!
//! # Features
//!
//! - Lock-free lifetime counters plus a bounded window of recent outcomes
//! - Prometheus metrics exposition over HTTP
//! - Tracing setup with correlation IDs and error counting
//!
//! # Example
//!
//! ```no_run
//! use txsettle_metrics::{MetricsCollector, MetricsServer};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let collector = Arc::new(MetricsCollector::new());
//!
//!     txsettle_metrics::init_tracing_with_metrics(collector.clone()).unwrap();
//!
//!     let server = MetricsServer::on_port(collector, 9090);
//!     server.serve().await.unwrap();
//! }
//! ```

pub mod collector;
pub mod http;
pub mod metrics;
pub mod tracing;

pub use collector::{MetricsCollector, MetricsError, DEFAULT_HEALTH_WINDOW};
pub use http::{MetricsServer, MetricsServerError};
pub use tracing::{
    init_tracing_with_metrics, CorrelationId, ExecutionSpan, MetricsLayer, TracingError,
};

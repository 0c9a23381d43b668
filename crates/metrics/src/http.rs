use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::fmt::Write as _;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use txsettle_types::StrategyKind;

use crate::collector::MetricsCollector;

/// HTTP exposition of the collector: `/metrics` (Prometheus text) and
/// `/health` (per-strategy counters)
pub struct MetricsServer {
    collector: Arc<MetricsCollector>,
    addr: SocketAddr,
}

impl MetricsServer {
    pub fn new(collector: Arc<MetricsCollector>, addr: SocketAddr) -> Self {
        Self { collector, addr }
    }

    /// Listen on all interfaces at `port`
    pub fn on_port(collector: Arc<MetricsCollector>, port: u16) -> Self {
        Self::new(collector, SocketAddr::from(([0, 0, 0, 0], port)))
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_handler))
            .with_state(self.collector.clone())
    }

    /// Serve until the process exits
    pub async fn serve(self) -> Result<(), MetricsServerError> {
        self.serve_until(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests
    pub async fn serve_until<F>(self, shutdown: F) -> Result<(), MetricsServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();

        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|e| MetricsServerError::BindError(e.to_string()))?;

        tracing::info!(addr = %self.addr, "metrics server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| MetricsServerError::ServerError(e.to_string()))?;

        tracing::info!(addr = %self.addr, "metrics server stopped");
        Ok(())
    }
}

/// Prometheus-formatted metrics
async fn metrics_handler(
    State(collector): State<Arc<MetricsCollector>>,
) -> Result<Response, MetricsHandlerError> {
    let metrics = collector
        .export_metrics()
        .map_err(|e| MetricsHandlerError::ExportError(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4")],
        metrics,
    )
        .into_response())
}

/// One line per strategy: lifetime attempts and the recent success rate
async fn health_handler(State(collector): State<Arc<MetricsCollector>>) -> impl IntoResponse {
    let mut body = String::from("OK\n");
    for kind in StrategyKind::ALL {
        let stats = collector.stats(kind);
        let _ = writeln!(
            body,
            "{} attempts={} recent={}/{} recent_success_rate={:.2}",
            kind.name(),
            stats.attempts,
            stats.recent_successes,
            stats.recent_attempts,
            stats.recent_success_rate(),
        );
    }
    (StatusCode::OK, body)
}

#[derive(Debug, thiserror::Error)]
pub enum MetricsServerError {
    #[error("failed to bind to address: {0}")]
    BindError(String),
    #[error("server error: {0}")]
    ServerError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum MetricsHandlerError {
    #[error("failed to export metrics: {0}")]
    ExportError(String),
}

impl IntoResponse for MetricsHandlerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            MetricsHandlerError::ExportError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txsettle_types::{ExecutionResult, FailureReason};

    #[tokio::test]
    async fn test_metrics_server_serves_endpoints() {
        let collector = Arc::new(MetricsCollector::new());
        collector.record(
            StrategyKind::PriorityRelay,
            &ExecutionResult::failed("req-1", StrategyKind::PriorityRelay, FailureReason::Timeout),
        );
        let server = MetricsServer::new(collector, SocketAddr::from(([127, 0, 0, 1], 0)));
        let app = server.router();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let health = fetch(addr, "/health").await;
        assert!(health.starts_with("HTTP/1.1 200"));
        assert!(health.contains("priority_relay attempts=1 recent=0/1"));

        let metrics = fetch(addr, "/metrics").await;
        assert!(metrics.starts_with("HTTP/1.1 200"));
        assert!(metrics.contains("text/plain"));
    }

    #[tokio::test]
    async fn test_serve_until_stops_on_shutdown() {
        let collector = Arc::new(MetricsCollector::new());
        let server = MetricsServer::new(collector, SocketAddr::from(([127, 0, 0, 1], 0)));
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let handle = tokio::spawn(server.serve_until(async {
            let _ = rx.await;
        }));
        tx.send(()).unwrap();

        assert!(handle.await.unwrap().is_ok());
    }

    async fn fetch(addr: SocketAddr, path: &str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }
}

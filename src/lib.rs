// telemorph server - OTLP/JSON ingestion and query API
//
// Features:
// - Axum HTTP server (HTTP/1.1, HTTP/2)
// - OTLP/JSON ingestion for traces, metrics and logs
// - Paginated query API over the same storage port
// - Pluggable storage (SQLite, in-memory)
// - Structured logging with tracing
// - Graceful shutdown

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use telemorph_core::TimestampPolicy;
use telemorph_storage::{QueryLimits, TelemetryStore};
use tokio::signal;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub mod config;
mod handlers;
mod init;
mod query;

pub use config::RuntimeConfig;
pub use init::{init_store, init_tracing};

/// Payload limits above this are allowed but logged at startup.
const LARGE_PAYLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TelemetryStore>,
    pub max_payload_bytes: usize,
    pub timestamp_policy: TimestampPolicy,
    pub query_limits: QueryLimits,
}

impl AppState {
    pub fn new(store: Arc<dyn TelemetryStore>, config: &RuntimeConfig) -> Self {
        Self {
            store,
            max_payload_bytes: config.request.max_payload_bytes,
            timestamp_policy: config.ingest.timestamp_policy,
            query_limits: config.query.limits(),
        }
    }
}

/// Error type that implements IntoResponse
pub(crate) struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("Request error: {:?}", self.error);
        } else {
            warn!(status = %self.status, "Request rejected: {}", self.error);
        }
        (
            self.status,
            Json(json!({
                "error": self.error.to_string(),
            })),
        )
            .into_response()
    }
}

impl AppError {
    pub fn with_status(status: StatusCode, error: anyhow::Error) -> Self {
        Self { status, error }
    }

    pub fn bad_request<E>(error: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: error.into(),
        }
    }

    pub fn internal<E>(error: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: error.into(),
        }
    }
}

/// Build the HTTP router for the given state.
///
/// Gzip request bodies are decompressed before reaching the handlers; OTel
/// collectors compress by default.
pub fn router(state: AppState) -> Router {
    let body_limit = state.max_payload_bytes;

    Router::new()
        .route("/v1/traces", post(handlers::handle_traces))
        .route("/v1/metrics", post(handlers::handle_metrics))
        .route("/v1/logs", post(handlers::handle_logs))
        .route("/api/v1/traces", get(query::list_traces))
        .route("/api/v1/metrics", get(query::list_metrics))
        .route("/api/v1/logs", get(query::list_logs))
        .route("/api/v1/services", get(query::list_services))
        .route("/api/v1/query", post(query::run_query))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::ready_check))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestDecompressionLayer::new().gzip(true))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}

/// Entry point for server mode with resolved configuration (for CLI usage)
pub async fn run_with_config(config: RuntimeConfig) -> Result<()> {
    init_tracing(&config);

    let addr = config.server.listen_addr.clone();

    let store = init_store(&config).await?;

    info!(
        "Max payload size set to {} bytes",
        config.request.max_payload_bytes
    );
    if config.request.max_payload_bytes > LARGE_PAYLOAD_BYTES {
        warn!(
            max_payload_bytes = config.request.max_payload_bytes,
            "request.max_payload_bytes is very large; may cause issues"
        );
    }
    info!(
        "Timestamp policy: {}",
        config.ingest.timestamp_policy
    );

    let state = AppState::new(Arc::clone(&store), &config);
    let app = router(state);

    // Create TCP listener
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind to {}", addr))?;

    info!("OTLP HTTP endpoint listening on http://{}", addr);
    info!("Routes:");
    info!("  POST http://{}/v1/traces       - OTLP trace ingestion", addr);
    info!("  POST http://{}/v1/metrics      - OTLP metrics ingestion", addr);
    info!("  POST http://{}/v1/logs         - OTLP log ingestion", addr);
    info!("  GET  http://{}/api/v1/traces   - List traces", addr);
    info!("  GET  http://{}/api/v1/metrics  - List metrics", addr);
    info!("  GET  http://{}/api/v1/logs     - List logs", addr);
    info!("  GET  http://{}/api/v1/services - List services", addr);
    info!("  POST http://{}/api/v1/query    - Typed query", addr);
    info!("  GET  http://{}/health          - Health check", addr);
    info!("  GET  http://{}/ready           - Readiness check", addr);
    info!("Press Ctrl+C or send SIGTERM to stop");

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    store.close().await;

    info!("Server shutdown complete");

    Ok(())
}

// HTTP request handlers for server mode
//
// Implements OTLP/JSON ingestion and health check endpoints

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use metrics::{counter, histogram};
use serde::Serialize;
use serde_json::json;
use std::time::Instant;
use telemorph_core::{
    decode_logs, decode_metrics, decode_traces, parse_logs_request, parse_metrics_request,
    parse_traces_request, Decoded, SignalType,
};
use telemorph_storage::StorageError;
use tracing::{debug, warn};

use crate::{AppError, AppState};

/// Per-request outcome returned to the exporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct IngestSummary {
    pub status: &'static str,
    /// Records produced by decoding (attempted inserts).
    pub received: usize,
    pub accepted: usize,
    pub failed: usize,
    /// Records stored with a zero-value timestamp.
    pub degraded: usize,
    /// Wire items that produced no record.
    pub skipped: usize,
}

impl IngestSummary {
    fn new<T>(decoded: &Decoded<T>) -> Self {
        Self {
            status: "success",
            received: decoded.records.len(),
            accepted: 0,
            failed: 0,
            degraded: decoded.degraded,
            skipped: decoded.skipped,
        }
    }

    /// Count one insert. Failures are logged and never abort the request.
    fn record(&mut self, signal: SignalType, service: &str, result: Result<(), StorageError>) {
        match result {
            Ok(()) => self.accepted += 1,
            Err(e) => {
                self.failed += 1;
                warn!(
                    signal = signal.as_str(),
                    service = %service,
                    error = %e,
                    "Failed to store record, continuing"
                );
            }
        }
    }

    fn finish(self, signal: SignalType, start: Instant) -> Response {
        let label = signal.as_str();
        counter!("telemorph.ingest.records", "signal" => label).increment(self.accepted as u64);
        counter!("telemorph.ingest.failed", "signal" => label).increment(self.failed as u64);
        counter!("telemorph.ingest.degraded", "signal" => label).increment(self.degraded as u64);
        histogram!("telemorph.ingest.latency_ms", "signal" => label)
            .record(start.elapsed().as_secs_f64() * 1000.0);

        debug!(
            signal = signal.as_str(),
            received = self.received,
            accepted = self.accepted,
            failed = self.failed,
            degraded = self.degraded,
            skipped = self.skipped,
            elapsed_us = start.elapsed().as_micros() as u64,
            "ingest"
        );

        (StatusCode::OK, Json(self)).into_response()
    }
}

/// POST /v1/traces - OTLP trace ingestion endpoint
pub(crate) async fn handle_traces(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, AppError> {
    let start = Instant::now();
    let signal = SignalType::Traces;
    let body = accept_body(signal, &state, &headers, body)?;

    let request = parse_traces_request(&body).map_err(AppError::bad_request)?;
    let decoded = decode_traces(request, state.timestamp_policy);

    let mut summary = IngestSummary::new(&decoded);
    for trace in &decoded.records {
        let result = state.store.insert_trace(trace).await;
        summary.record(signal, &trace.service_name, result);
    }

    Ok(summary.finish(signal, start))
}

/// POST /v1/metrics - OTLP metrics ingestion endpoint
pub(crate) async fn handle_metrics(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, AppError> {
    let start = Instant::now();
    let signal = SignalType::Metrics;
    let body = accept_body(signal, &state, &headers, body)?;

    let request = parse_metrics_request(&body).map_err(AppError::bad_request)?;
    let decoded = decode_metrics(request, state.timestamp_policy);

    let mut summary = IngestSummary::new(&decoded);
    for metric in &decoded.records {
        let result = state.store.insert_metric(metric).await;
        summary.record(signal, &metric.service_name, result);
    }

    Ok(summary.finish(signal, start))
}

/// POST /v1/logs - OTLP log ingestion endpoint
pub(crate) async fn handle_logs(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, AppError> {
    let start = Instant::now();
    let signal = SignalType::Logs;
    let body = accept_body(signal, &state, &headers, body)?;

    let request = parse_logs_request(&body).map_err(AppError::bad_request)?;
    let decoded = decode_logs(request, state.timestamp_policy);

    let mut summary = IngestSummary::new(&decoded);
    for log in &decoded.records {
        let result = state.store.insert_log(log).await;
        summary.record(signal, &log.service_name, result);
    }

    Ok(summary.finish(signal, start))
}

/// Common request checks: body readable, within the size limit, and not
/// protobuf-encoded.
fn accept_body(
    signal: SignalType,
    state: &AppState,
    headers: &HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Bytes, AppError> {
    counter!("telemorph.ingest.requests", "signal" => signal.as_str()).increment(1);

    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
    if content_type.is_some_and(|ct| ct.contains("protobuf")) {
        counter!("telemorph.ingest.rejected").increment(1);
        return Err(AppError::with_status(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            anyhow::anyhow!("OTLP/protobuf is not supported, send OTLP/JSON (application/json)"),
        ));
    }

    let body = body.map_err(|rejection| {
        counter!("telemorph.ingest.rejected").increment(1);
        AppError::with_status(
            rejection.status(),
            anyhow::anyhow!("Failed to read {} request body: {}", signal, rejection.body_text()),
        )
    })?;

    debug!(
        "Received OTLP {} request ({} bytes, content-type: {:?})",
        signal.as_str(),
        body.len(),
        content_type
    );

    let max_payload = state.max_payload_bytes;
    if body.len() > max_payload {
        counter!("telemorph.ingest.rejected").increment(1);
        return Err(AppError::with_status(
            StatusCode::PAYLOAD_TOO_LARGE,
            anyhow::anyhow!("payload {} exceeds limit {}", body.len(), max_payload),
        ));
    }

    Ok(body)
}

/// GET /health - Basic health check
pub(crate) async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "timestamp": Utc::now().timestamp(),
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

/// GET /ready - Readiness check (includes storage connectivity)
pub(crate) async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "storage": "connected",
                "timestamp": Utc::now().timestamp(),
                "version": env!("CARGO_PKG_VERSION"),
            })),
        ),
        Err(e) => {
            warn!("Storage readiness check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "not ready",
                    "storage": "disconnected",
                    "error": e.to_string(),
                })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemorph_core::Log;

    #[test]
    fn test_summary_counts_failures_without_aborting() {
        let decoded: Decoded<Log> = Decoded {
            records: Vec::new(),
            degraded: 2,
            skipped: 1,
        };
        let mut summary = IngestSummary::new(&decoded);
        summary.record(SignalType::Logs, "api", Ok(()));
        summary.record(
            SignalType::Logs,
            "api",
            Err(StorageError::write(SignalType::Logs, "locked")),
        );
        summary.record(SignalType::Logs, "api", Ok(()));

        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.degraded, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.status, "success");
    }
}

//! Shared helpers for the HTTP integration tests
//!
//! Drives the real router in-process with `tower::ServiceExt::oneshot` and
//! provides a `RecordingStore` that records every storage call and can be
//! told to fail selected operations.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use telemorph::{AppState, RuntimeConfig};
use telemorph_core::{Log, Metric, SignalType, Trace};
use telemorph_storage::{
    MemoryStore, Page, Result, StorageError, StoredRecord, TelemetryStore,
};
use tower::ServiceExt;

/// Read a fixture from the repository's testdata directory.
pub fn fixture(name: &str) -> Vec<u8> {
    let path = format!("{}/testdata/{}", env!("CARGO_MANIFEST_DIR"), name);
    std::fs::read(&path).unwrap_or_else(|e| panic!("failed to read {}: {}", path, e))
}

pub fn app(store: Arc<dyn TelemetryStore>) -> Router {
    app_with(store, RuntimeConfig::default())
}

pub fn app_with(store: Arc<dyn TelemetryStore>, config: RuntimeConfig) -> Router {
    telemorph::router(AppState::new(store, &config))
}

pub fn post_json(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Send one request and decode the JSON response body (`Null` if empty).
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

/// Memory-backed store that records calls and injects failures.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    calls: Mutex<Vec<&'static str>>,
    insert_attempts: AtomicUsize,
    failing_inserts: HashSet<usize>,
    fail_reads: bool,
    fail_ping: bool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the insert attempts with these zero-based positions.
    pub fn failing_inserts(mut self, positions: impl IntoIterator<Item = usize>) -> Self {
        self.failing_inserts = positions.into_iter().collect();
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn failing_ping(mut self) -> Self {
        self.fail_ping = true;
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn note(&self, call: &'static str) {
        self.calls.lock().push(call);
    }

    fn check_insert(&self, signal: SignalType) -> Result<()> {
        let attempt = self.insert_attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing_inserts.contains(&attempt) {
            return Err(StorageError::write(signal, "injected failure"));
        }
        Ok(())
    }

    fn check_read(&self, what: &str) -> Result<()> {
        if self.fail_reads {
            return Err(StorageError::read(what, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl TelemetryStore for RecordingStore {
    async fn insert_trace(&self, trace: &Trace) -> Result<()> {
        self.note("insert_trace");
        self.check_insert(SignalType::Traces)?;
        self.inner.insert_trace(trace).await
    }

    async fn insert_metric(&self, metric: &Metric) -> Result<()> {
        self.note("insert_metric");
        self.check_insert(SignalType::Metrics)?;
        self.inner.insert_metric(metric).await
    }

    async fn insert_log(&self, log: &Log) -> Result<()> {
        self.note("insert_log");
        self.check_insert(SignalType::Logs)?;
        self.inner.insert_log(log).await
    }

    async fn get_traces(&self, page: Page) -> Result<Vec<StoredRecord<Trace>>> {
        self.note("get_traces");
        self.check_read("traces")?;
        self.inner.get_traces(page).await
    }

    async fn get_metrics(&self, page: Page) -> Result<Vec<StoredRecord<Metric>>> {
        self.note("get_metrics");
        self.check_read("metrics")?;
        self.inner.get_metrics(page).await
    }

    async fn get_logs(&self, page: Page) -> Result<Vec<StoredRecord<Log>>> {
        self.note("get_logs");
        self.check_read("logs")?;
        self.inner.get_logs(page).await
    }

    async fn get_services(&self) -> Result<Vec<String>> {
        self.note("get_services");
        self.check_read("services")?;
        self.inner.get_services().await
    }

    async fn ping(&self) -> Result<()> {
        self.note("ping");
        if self.fail_ping {
            return Err(StorageError::connection("injected failure"));
        }
        Ok(())
    }
}

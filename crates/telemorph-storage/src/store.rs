//! The storage port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use telemorph_core::{Log, Metric, Trace};

use crate::error::Result;

/// A window into a signal's records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }
}

/// A record as read back from a store, with its store-assigned id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord<T> {
    pub id: i64,
    #[serde(flatten)]
    pub record: T,
}

/// Persistence contract shared by every backend.
///
/// Inserts persist exactly one record and have no effect on other records.
/// Reads return at most `page.limit` records starting at `page.offset`,
/// newest first; the order is stable while the data is unchanged.
/// Implementations own the concurrency safety of their writes.
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    async fn insert_trace(&self, trace: &Trace) -> Result<()>;

    async fn insert_metric(&self, metric: &Metric) -> Result<()>;

    async fn insert_log(&self, log: &Log) -> Result<()>;

    async fn get_traces(&self, page: Page) -> Result<Vec<StoredRecord<Trace>>>;

    async fn get_metrics(&self, page: Page) -> Result<Vec<StoredRecord<Metric>>>;

    async fn get_logs(&self, page: Page) -> Result<Vec<StoredRecord<Log>>>;

    /// Distinct service names across all stored records, sorted.
    async fn get_services(&self) -> Result<Vec<String>>;

    /// Cheap liveness probe used by the readiness endpoint.
    async fn ping(&self) -> Result<()>;

    /// Release backend resources. Called once at shutdown.
    async fn close(&self) {}
}

//! Query dispatcher.
//!
//! Routes a typed request to the matching `TelemetryStore` read and wraps the
//! result in a uniform page envelope. Routing only: no merging or joins.

use serde::{Deserialize, Serialize};
use telemorph_core::{Log, Metric, SignalType, Trace};
use thiserror::Error;

use crate::error::StorageError;
use crate::store::{Page, StoredRecord, TelemetryStore};

pub const DEFAULT_LIMIT: usize = 100;
pub const MAX_LIMIT: usize = 1000;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("unknown query type '{0}', expected one of: metrics, traces, logs")]
    UnknownSignal(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Body of `POST /api/v1/query`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryRequest {
    #[serde(rename = "type")]
    pub signal: String,
    /// Free-form query text. Accepted for compatibility, not interpreted.
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

/// Page size defaults and bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
        }
    }
}

impl QueryLimits {
    /// Missing or zero limit becomes the default; larger limits are clamped.
    pub fn page(&self, limit: Option<usize>, offset: Option<usize>) -> Page {
        let limit = match limit {
            None | Some(0) => self.default_limit,
            Some(limit) => limit,
        };
        Page::new(limit.min(self.max_limit), offset.unwrap_or(0))
    }
}

/// Records of one signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryData {
    Traces(Vec<StoredRecord<Trace>>),
    Metrics(Vec<StoredRecord<Metric>>),
    Logs(Vec<StoredRecord<Log>>),
}

impl QueryData {
    pub fn len(&self) -> usize {
        match self {
            QueryData::Traces(rows) => rows.len(),
            QueryData::Metrics(rows) => rows.len(),
            QueryData::Logs(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Uniform paginated envelope. `total` is the number of records in this page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPage {
    pub data: QueryData,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Read one page of a signal's records.
pub async fn fetch(
    store: &dyn TelemetryStore,
    signal: SignalType,
    page: Page,
) -> Result<QueryPage, StorageError> {
    let data = match signal {
        SignalType::Traces => QueryData::Traces(store.get_traces(page).await?),
        SignalType::Metrics => QueryData::Metrics(store.get_metrics(page).await?),
        SignalType::Logs => QueryData::Logs(store.get_logs(page).await?),
    };

    Ok(QueryPage {
        total: data.len(),
        data,
        limit: page.limit,
        offset: page.offset,
    })
}

/// Validate and route a typed query. An unknown type is rejected before the
/// store is touched.
pub async fn dispatch(
    store: &dyn TelemetryStore,
    request: &QueryRequest,
    limits: &QueryLimits,
) -> Result<QueryPage, QueryError> {
    let signal: SignalType = request
        .signal
        .parse()
        .map_err(|_| QueryError::UnknownSignal(request.signal.clone()))?;

    let page = limits.page(request.limit, request.offset);
    tracing::debug!(signal = %signal, limit = page.limit, offset = page.offset, "dispatching query");

    Ok(fetch(store, signal, page).await?)
}

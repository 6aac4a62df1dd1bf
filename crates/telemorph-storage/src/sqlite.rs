//! SQLite-backed store.
//!
//! One table per signal. Timestamps are stored as unix nanoseconds so the
//! newest-first ordering is a plain integer sort; attribute blobs are stored
//! verbatim as TEXT.

use async_trait::async_trait;
use chrono::DateTime;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use telemorph_core::timestamp::to_unix_nanos;
use telemorph_core::{AttributeBlob, Log, Metric, MetricKind, SignalType, Trace};
use tracing::{debug, info};

use crate::error::{Result, StorageError};
use crate::store::{Page, StoredRecord, TelemetryStore};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS traces (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        trace_id TEXT NOT NULL,
        span_id TEXT NOT NULL,
        parent_span_id TEXT,
        service_name TEXT NOT NULL,
        operation_name TEXT NOT NULL,
        start_time INTEGER NOT NULL,
        duration_nanos INTEGER NOT NULL,
        status_code TEXT NOT NULL,
        attributes TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_traces_start_time ON traces (start_time)",
    "CREATE INDEX IF NOT EXISTS idx_traces_service_name ON traces (service_name)",
    r#"
    CREATE TABLE IF NOT EXISTS metrics (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        metric_name TEXT NOT NULL,
        kind TEXT NOT NULL,
        value REAL NOT NULL,
        timestamp INTEGER NOT NULL,
        service_name TEXT NOT NULL,
        labels TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_metrics_timestamp ON metrics (timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_metrics_service_name ON metrics (service_name)",
    r#"
    CREATE TABLE IF NOT EXISTS logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp INTEGER NOT NULL,
        service_name TEXT NOT NULL,
        level TEXT NOT NULL,
        message TEXT NOT NULL,
        attributes TEXT NOT NULL,
        trace_id TEXT,
        span_id TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_logs_timestamp ON logs (timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_logs_service_name ON logs (service_name)",
];

/// Connection settings for [`SqliteStore::connect`].
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    pub path: PathBuf,
    pub max_connections: u32,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./telemorph.db"),
            max_connections: 4,
        }
    }
}

pub struct SqliteStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct TraceRow {
    id: i64,
    trace_id: String,
    span_id: String,
    parent_span_id: Option<String>,
    service_name: String,
    operation_name: String,
    start_time: i64,
    duration_nanos: i64,
    status_code: String,
    attributes: String,
}

impl From<TraceRow> for StoredRecord<Trace> {
    fn from(row: TraceRow) -> Self {
        StoredRecord {
            id: row.id,
            record: Trace {
                trace_id: row.trace_id,
                span_id: row.span_id,
                parent_span_id: row.parent_span_id,
                service_name: row.service_name,
                operation_name: row.operation_name,
                start_time: DateTime::from_timestamp_nanos(row.start_time),
                duration_nanos: row.duration_nanos,
                status_code: row.status_code,
                attributes: AttributeBlob::from_encoded(row.attributes),
            },
        }
    }
}

#[derive(sqlx::FromRow)]
struct MetricRow {
    id: i64,
    metric_name: String,
    kind: String,
    value: f64,
    timestamp: i64,
    service_name: String,
    labels: String,
}

impl TryFrom<MetricRow> for StoredRecord<Metric> {
    type Error = StorageError;

    fn try_from(row: MetricRow) -> Result<Self> {
        let kind = MetricKind::from_str(&row.kind)
            .map_err(|e| StorageError::read(format!("metric row {}", row.id), e))?;
        Ok(StoredRecord {
            id: row.id,
            record: Metric {
                metric_name: row.metric_name,
                kind,
                value: row.value,
                timestamp: DateTime::from_timestamp_nanos(row.timestamp),
                service_name: row.service_name,
                labels: AttributeBlob::from_encoded(row.labels),
            },
        })
    }
}

#[derive(sqlx::FromRow)]
struct LogRow {
    id: i64,
    timestamp: i64,
    service_name: String,
    level: String,
    message: String,
    attributes: String,
    trace_id: Option<String>,
    span_id: Option<String>,
}

impl From<LogRow> for StoredRecord<Log> {
    fn from(row: LogRow) -> Self {
        StoredRecord {
            id: row.id,
            record: Log {
                timestamp: DateTime::from_timestamp_nanos(row.timestamp),
                service_name: row.service_name,
                level: row.level,
                message: row.message,
                attributes: AttributeBlob::from_encoded(row.attributes),
                trace_id: row.trace_id,
                span_id: row.span_id,
            },
        }
    }
}

/// SQLite takes signed 64-bit LIMIT/OFFSET values.
fn page_bounds(page: Page) -> (i64, i64) {
    (
        i64::try_from(page.limit).unwrap_or(i64::MAX),
        i64::try_from(page.offset).unwrap_or(i64::MAX),
    )
}

impl SqliteStore {
    /// Open (creating if missing) the database file and ensure the schema.
    pub async fn connect(options: &SqliteOptions) -> Result<Self> {
        info!(
            path = %options.path.display(),
            max_connections = options.max_connections,
            "Opening SQLite store"
        );

        let connect_options = SqliteConnectOptions::new()
            .filename(&options.path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections.max(1))
            .connect_with(connect_options)
            .await
            .map_err(StorageError::connection)?;

        Self::with_pool(pool).await
    }

    /// A private in-memory database. The pool holds a single connection that
    /// is never recycled, since each SQLite memory connection is its own
    /// database.
    pub async fn in_memory() -> Result<Self> {
        let connect_options =
            SqliteConnectOptions::from_str("sqlite::memory:").map_err(StorageError::connection)?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options)
            .await
            .map_err(StorageError::connection)?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(StorageError::schema)?;
        }
        debug!("SQLite schema ready");
        Ok(Self { pool })
    }
}

#[async_trait]
impl TelemetryStore for SqliteStore {
    async fn insert_trace(&self, trace: &Trace) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO traces (
                trace_id, span_id, parent_span_id, service_name, operation_name,
                start_time, duration_nanos, status_code, attributes
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&trace.trace_id)
        .bind(&trace.span_id)
        .bind(trace.parent_span_id.as_deref())
        .bind(&trace.service_name)
        .bind(&trace.operation_name)
        .bind(to_unix_nanos(trace.start_time))
        .bind(trace.duration_nanos)
        .bind(&trace.status_code)
        .bind(trace.attributes.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::write(SignalType::Traces, e))?;
        Ok(())
    }

    async fn insert_metric(&self, metric: &Metric) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO metrics (metric_name, kind, value, timestamp, service_name, labels)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&metric.metric_name)
        .bind(metric.kind.as_str())
        .bind(metric.value)
        .bind(to_unix_nanos(metric.timestamp))
        .bind(&metric.service_name)
        .bind(metric.labels.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::write(SignalType::Metrics, e))?;
        Ok(())
    }

    async fn insert_log(&self, log: &Log) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO logs (
                timestamp, service_name, level, message, attributes, trace_id, span_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(to_unix_nanos(log.timestamp))
        .bind(&log.service_name)
        .bind(&log.level)
        .bind(&log.message)
        .bind(log.attributes.as_str())
        .bind(log.trace_id.as_deref())
        .bind(log.span_id.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::write(SignalType::Logs, e))?;
        Ok(())
    }

    async fn get_traces(&self, page: Page) -> Result<Vec<StoredRecord<Trace>>> {
        let (limit, offset) = page_bounds(page);
        let rows: Vec<TraceRow> = sqlx::query_as(
            r#"
            SELECT id, trace_id, span_id, parent_span_id, service_name, operation_name,
                   start_time, duration_nanos, status_code, attributes
            FROM traces
            ORDER BY start_time DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::read("traces", e))?;

        Ok(rows.into_iter().map(StoredRecord::from).collect())
    }

    async fn get_metrics(&self, page: Page) -> Result<Vec<StoredRecord<Metric>>> {
        let (limit, offset) = page_bounds(page);
        let rows: Vec<MetricRow> = sqlx::query_as(
            r#"
            SELECT id, metric_name, kind, value, timestamp, service_name, labels
            FROM metrics
            ORDER BY timestamp DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::read("metrics", e))?;

        rows.into_iter().map(StoredRecord::try_from).collect()
    }

    async fn get_logs(&self, page: Page) -> Result<Vec<StoredRecord<Log>>> {
        let (limit, offset) = page_bounds(page);
        let rows: Vec<LogRow> = sqlx::query_as(
            r#"
            SELECT id, timestamp, service_name, level, message, attributes, trace_id, span_id
            FROM logs
            ORDER BY timestamp DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::read("logs", e))?;

        Ok(rows.into_iter().map(StoredRecord::from).collect())
    }

    async fn get_services(&self) -> Result<Vec<String>> {
        sqlx::query_scalar(
            r#"
            SELECT service_name FROM traces
            UNION
            SELECT service_name FROM metrics
            UNION
            SELECT service_name FROM logs
            ORDER BY service_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::read("services", e))
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(StorageError::connection)?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("SQLite store closed");
    }
}

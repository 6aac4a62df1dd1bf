//! In-memory store.
//!
//! Used for tests and `backend = "memory"` deployments. Contents are lost on
//! restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use telemorph_core::{Log, Metric, Trace};

use crate::error::Result;
use crate::store::{Page, StoredRecord, TelemetryStore};

#[derive(Default)]
struct Tables {
    next_id: i64,
    traces: Vec<StoredRecord<Trace>>,
    metrics: Vec<StoredRecord<Metric>>,
    logs: Vec<StoredRecord<Log>>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored records across all signals.
    pub fn len(&self) -> usize {
        let tables = self.tables.read();
        tables.traces.len() + tables.metrics.len() + tables.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Newest first, ties broken by id (newest insert first).
fn page_of<T: Clone>(
    rows: &[StoredRecord<T>],
    page: Page,
    timestamp: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<StoredRecord<T>> {
    let mut ordered: Vec<&StoredRecord<T>> = rows.iter().collect();
    ordered.sort_by(|a, b| {
        timestamp(&b.record)
            .cmp(&timestamp(&a.record))
            .then_with(|| b.id.cmp(&a.id))
    });
    ordered
        .into_iter()
        .skip(page.offset)
        .take(page.limit)
        .cloned()
        .collect()
}

#[async_trait]
impl TelemetryStore for MemoryStore {
    async fn insert_trace(&self, trace: &Trace) -> Result<()> {
        let mut tables = self.tables.write();
        let id = tables.next_id();
        tables.traces.push(StoredRecord {
            id,
            record: trace.clone(),
        });
        Ok(())
    }

    async fn insert_metric(&self, metric: &Metric) -> Result<()> {
        let mut tables = self.tables.write();
        let id = tables.next_id();
        tables.metrics.push(StoredRecord {
            id,
            record: metric.clone(),
        });
        Ok(())
    }

    async fn insert_log(&self, log: &Log) -> Result<()> {
        let mut tables = self.tables.write();
        let id = tables.next_id();
        tables.logs.push(StoredRecord {
            id,
            record: log.clone(),
        });
        Ok(())
    }

    async fn get_traces(&self, page: Page) -> Result<Vec<StoredRecord<Trace>>> {
        Ok(page_of(&self.tables.read().traces, page, |t| t.start_time))
    }

    async fn get_metrics(&self, page: Page) -> Result<Vec<StoredRecord<Metric>>> {
        Ok(page_of(&self.tables.read().metrics, page, |m| m.timestamp))
    }

    async fn get_logs(&self, page: Page) -> Result<Vec<StoredRecord<Log>>> {
        Ok(page_of(&self.tables.read().logs, page, |l| l.timestamp))
    }

    async fn get_services(&self) -> Result<Vec<String>> {
        let tables = self.tables.read();
        let services: BTreeSet<&str> = tables
            .traces
            .iter()
            .map(|t| t.record.service_name.as_str())
            .chain(tables.metrics.iter().map(|m| m.record.service_name.as_str()))
            .chain(tables.logs.iter().map(|l| l.record.service_name.as_str()))
            .collect();
        Ok(services.into_iter().map(String::from).collect())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

//! OTLP/JSON envelopes and the per-signal decoders.
//!
//! Each signal has an explicit envelope type (`TracesRequest`,
//! `MetricsRequest`, `LogsRequest`) validated once by `parse_*_request`, and a
//! `decode_*` function that flattens it into normalized records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::timestamp::TimestampPolicy;

pub mod common;
pub mod logs;
pub mod metrics;
pub mod traces;

pub use common::{service_name, Resource, UNKNOWN_SERVICE_NAME};
pub use logs::{decode_logs, parse_logs_request, LogsRequest};
pub use metrics::{decode_metrics, parse_metrics_request, MetricsRequest};
pub use traces::{decode_traces, parse_traces_request, TracesRequest};

/// The three telemetry signal kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalType {
    Traces,
    Metrics,
    Logs,
}

impl SignalType {
    pub const ALL: [SignalType; 3] = [SignalType::Traces, SignalType::Metrics, SignalType::Logs];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::Traces => "traces",
            SignalType::Metrics => "metrics",
            SignalType::Logs => "logs",
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "traces" => Ok(SignalType::Traces),
            "metrics" => Ok(SignalType::Metrics),
            "logs" => Ok(SignalType::Logs),
            other => Err(format!(
                "unknown signal type '{}', expected one of: metrics, traces, logs",
                other
            )),
        }
    }
}

/// Records produced from one envelope plus per-request counters.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub records: Vec<T>,
    /// Records kept with a zero-value timestamp after a parse failure.
    pub degraded: usize,
    /// Wire items that produced no record (rejected timestamps, unsupported
    /// metric shapes).
    pub skipped: usize,
}

impl<T> Default for Decoded<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            degraded: 0,
            skipped: 0,
        }
    }
}

impl<T> Decoded<T> {
    /// Applies the timestamp policy to an item. Returns `false` when the item
    /// must be dropped.
    pub(crate) fn admit(&mut self, timestamp_failed: bool, policy: TimestampPolicy) -> bool {
        if !timestamp_failed {
            return true;
        }
        match policy {
            TimestampPolicy::Zero => {
                self.degraded += 1;
                true
            }
            TimestampPolicy::Reject => {
                self.skipped += 1;
                false
            }
        }
    }
}

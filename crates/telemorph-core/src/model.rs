//! Normalized, storage-ready records.
//!
//! One record is created per wire item at decode time and handed to the
//! store. Records are never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::attributes::AttributeBlob;

/// A single span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub trace_id: String,
    pub span_id: String,
    /// `None` when the wire value was empty or missing.
    pub parent_span_id: Option<String>,
    pub service_name: String,
    pub operation_name: String,
    pub start_time: DateTime<Utc>,
    /// End minus start in nanoseconds. Zero or negative when the source
    /// timestamps were missing or malformed.
    pub duration_nanos: i64,
    pub status_code: String,
    pub attributes: AttributeBlob,
}

/// Data point shape a metric record was produced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Gauge,
    Sum,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Sum => "sum",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gauge" => Ok(MetricKind::Gauge),
            "sum" => Ok(MetricKind::Sum),
            other => Err(format!("unknown metric kind '{}'", other)),
        }
    }
}

/// One metric data point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub metric_name: String,
    pub kind: MetricKind,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub service_name: String,
    pub labels: AttributeBlob,
}

/// One log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Log {
    pub timestamp: DateTime<Utc>,
    pub service_name: String,
    pub level: String,
    pub message: String,
    pub attributes: AttributeBlob,
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
}

/// Maps an empty string to `None`.
pub(crate) fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_kind_round_trips_through_str() {
        for kind in [MetricKind::Gauge, MetricKind::Sum] {
            assert_eq!(kind.as_str().parse::<MetricKind>().unwrap(), kind);
        }
        assert!("histogram".parse::<MetricKind>().is_err());
    }

    #[test]
    fn test_optional_ids_serialize_as_null() {
        let log = Log {
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            service_name: "api".to_string(),
            level: "INFO".to_string(),
            message: "hello".to_string(),
            attributes: AttributeBlob::empty(),
            trace_id: None,
            span_id: Some("s1".to_string()),
        };

        let json = serde_json::to_value(&log).unwrap();
        assert!(json["trace_id"].is_null());
        assert_eq!(json["span_id"], "s1");
        assert_eq!(json["attributes"], "{}");
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(String::new()), None);
        assert_eq!(non_empty("p".to_string()), Some("p".to_string()));
    }
}

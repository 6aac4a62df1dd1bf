//! Log envelope (`resourceLogs`) and log record decoding.

use serde::Deserialize;

use crate::attributes::{normalize_attributes, AnyValue, KeyValue};
use crate::de::{null_default, string_or_number};
use crate::error::DecodeError;
use crate::model::{non_empty, Log};
use crate::otlp::common::{service_name, Resource};
use crate::otlp::{Decoded, SignalType};
use crate::timestamp::{parse_or_zero, TimestampPolicy};

/// `ExportLogsServiceRequest` in OTLP/JSON form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsRequest {
    pub resource_logs: Vec<ResourceLogs>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLogs {
    #[serde(default, deserialize_with = "null_default")]
    pub resource: Resource,
    #[serde(default, deserialize_with = "null_default")]
    pub scope_logs: Vec<ScopeLogs>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeLogs {
    #[serde(default, deserialize_with = "null_default")]
    pub log_records: Vec<LogRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    #[serde(default, deserialize_with = "string_or_number")]
    pub time_unix_nano: String,
    #[serde(default, deserialize_with = "null_default")]
    pub severity_text: String,
    /// Numeric value or enum name (`SEVERITY_NUMBER_WARN`).
    #[serde(default, deserialize_with = "string_or_number")]
    pub severity_number: String,
    #[serde(default, deserialize_with = "null_default")]
    pub body: AnyValue,
    #[serde(default, deserialize_with = "null_default")]
    pub attributes: Vec<KeyValue>,
    #[serde(default, deserialize_with = "null_default")]
    pub trace_id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub span_id: String,
}

impl LogRecord {
    /// `severityText`, falling back to the short name of `severityNumber`.
    fn level(&self) -> String {
        if !self.severity_text.is_empty() {
            return self.severity_text.clone();
        }
        if let Ok(number) = self.severity_number.parse::<i32>() {
            return severity_name(number).map(str::to_string).unwrap_or_default();
        }
        self.severity_number
            .strip_prefix("SEVERITY_NUMBER_")
            .map(|name| name.trim_end_matches(|c: char| c.is_ascii_digit()))
            .filter(|name| *name != "UNSPECIFIED")
            .map(str::to_string)
            .unwrap_or_default()
    }
}

/// Short severity name for an OTLP severity number (1-24).
pub fn severity_name(number: i32) -> Option<&'static str> {
    match number {
        1..=4 => Some("TRACE"),
        5..=8 => Some("DEBUG"),
        9..=12 => Some("INFO"),
        13..=16 => Some("WARN"),
        17..=20 => Some("ERROR"),
        21..=24 => Some("FATAL"),
        _ => None,
    }
}

/// Parse and structurally validate a logs envelope.
pub fn parse_logs_request(bytes: &[u8]) -> Result<LogsRequest, DecodeError> {
    serde_json::from_slice(bytes).map_err(|e| DecodeError::invalid_envelope(SignalType::Logs, e))
}

/// Flatten a logs envelope into one [`Log`] per log record.
pub fn decode_logs(request: LogsRequest, policy: TimestampPolicy) -> Decoded<Log> {
    let mut decoded = Decoded::default();

    for resource_logs in request.resource_logs {
        let service = service_name(&resource_logs.resource);

        for scope in resource_logs.scope_logs {
            for record in scope.log_records {
                let ts = parse_or_zero(&record.time_unix_nano);
                if !decoded.admit(ts.failed, policy) {
                    tracing::debug!(service = %service, "skipping log record with unparseable timestamp");
                    continue;
                }

                let level = record.level();
                decoded.records.push(Log {
                    timestamp: ts.value,
                    service_name: service.clone(),
                    level,
                    message: record.body.render(),
                    attributes: normalize_attributes(&record.attributes),
                    trace_id: non_empty(record.trace_id),
                    span_id: non_empty(record.span_id),
                });
            }
        }
    }

    decoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::to_unix_nanos;

    fn decode(json: &str, policy: TimestampPolicy) -> Decoded<Log> {
        decode_logs(parse_logs_request(json.as_bytes()).unwrap(), policy)
    }

    #[test]
    fn test_log_record_fields() {
        let json = r#"{"resourceLogs":[{
            "resource":{"attributes":[{"key":"service.name","value":{"stringValue":"auth"}}]},
            "scopeLogs":[{"logRecords":[{
                "timeUnixNano":"1700000000000000001",
                "severityText":"ERROR",
                "body":{"stringValue":"login failed"},
                "attributes":[{"key":"user.id","value":{"intValue":"17"}}],
                "traceId":"abc",
                "spanId":"def"
            }]}]
        }]}"#;

        let decoded = decode(json, TimestampPolicy::Zero);
        assert_eq!(decoded.records.len(), 1);

        let log = &decoded.records[0];
        assert_eq!(to_unix_nanos(log.timestamp), 1_700_000_000_000_000_001);
        assert_eq!(log.service_name, "auth");
        assert_eq!(log.level, "ERROR");
        assert_eq!(log.message, "login failed");
        assert_eq!(log.attributes.decode().unwrap()["user.id"], "17");
        assert_eq!(log.trace_id.as_deref(), Some("abc"));
        assert_eq!(log.span_id.as_deref(), Some("def"));
    }

    #[test]
    fn test_empty_correlation_ids_are_absent() {
        let json = r#"{"resourceLogs":[{"scopeLogs":[{"logRecords":[
            {"timeUnixNano":"1","body":{"stringValue":"x"},"traceId":"","spanId":""}
        ]}]}]}"#;

        let log = &decode(json, TimestampPolicy::Zero).records[0];
        assert_eq!(log.trace_id, None);
        assert_eq!(log.span_id, None);
        assert_eq!(log.service_name, "unknown");
        assert_eq!(log.attributes.as_str(), "{}");
    }

    #[test]
    fn test_non_string_body_and_severity_number() {
        let json = r#"{"resourceLogs":[{"scopeLogs":[{"logRecords":[
            {"timeUnixNano":"1","severityNumber":13,"body":{"kvlistValue":{"values":[{"key":"event","value":{"stringValue":"retry"}}]}}},
            {"timeUnixNano":"2"},
            {"timeUnixNano":"3","severityNumber":"SEVERITY_NUMBER_ERROR2"}
        ]}]}]}"#;

        let decoded = decode(json, TimestampPolicy::Zero);
        assert_eq!(decoded.records[0].level, "WARN");
        assert_eq!(decoded.records[0].message, r#"{"event":"retry"}"#);
        assert_eq!(decoded.records[1].level, "");
        assert_eq!(decoded.records[1].message, "");
        assert_eq!(decoded.records[2].level, "ERROR");
    }

    #[test]
    fn test_missing_timestamp_is_degraded() {
        let json = r#"{"resourceLogs":[{"scopeLogs":[{"logRecords":[
            {"body":{"stringValue":"no time"}},
            {"timeUnixNano":"10","body":{"stringValue":"timed"}}
        ]}]}]}"#;

        let zero = decode(json, TimestampPolicy::Zero);
        assert_eq!(zero.records.len(), 2);
        assert_eq!(zero.degraded, 1);

        let reject = decode(json, TimestampPolicy::Reject);
        assert_eq!(reject.records.len(), 1);
        assert_eq!(reject.records[0].message, "timed");
        assert_eq!(reject.skipped, 1);
    }

    #[test]
    fn test_severity_name() {
        assert_eq!(severity_name(9), Some("INFO"));
        assert_eq!(severity_name(24), Some("FATAL"));
        assert_eq!(severity_name(0), None);
    }

    #[test]
    fn test_invalid_envelope_is_error() {
        let err = parse_logs_request(br#"{"resourceLogs":[{"scopeLogs":5}]}"#).unwrap_err();
        assert_eq!(err.signal(), SignalType::Logs);
    }
}

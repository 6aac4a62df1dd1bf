//! Trace envelope (`resourceSpans`) and span decoding.

use serde::Deserialize;

use crate::attributes::{normalize_attributes, KeyValue};
use crate::de::{null_default, string_or_number};
use crate::error::DecodeError;
use crate::model::{non_empty, Trace};
use crate::otlp::common::{service_name, Resource};
use crate::otlp::{Decoded, SignalType};
use crate::timestamp::{duration_nanos, parse_or_zero, TimestampPolicy};

/// `ExportTraceServiceRequest` in OTLP/JSON form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracesRequest {
    pub resource_spans: Vec<ResourceSpans>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpans {
    #[serde(default, deserialize_with = "null_default")]
    pub resource: Resource,
    #[serde(default, deserialize_with = "null_default")]
    pub scope_spans: Vec<ScopeSpans>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeSpans {
    #[serde(default, deserialize_with = "null_default")]
    pub spans: Vec<Span>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    #[serde(default, deserialize_with = "null_default")]
    pub trace_id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub span_id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub parent_span_id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub start_time_unix_nano: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub end_time_unix_nano: String,
    #[serde(default, deserialize_with = "null_default")]
    pub status: Status,
    #[serde(default, deserialize_with = "null_default")]
    pub attributes: Vec<KeyValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Status {
    /// Kept verbatim; exporters send either the enum name or its number.
    #[serde(default, deserialize_with = "string_or_number")]
    pub code: String,
}

/// Parse and structurally validate a trace envelope.
pub fn parse_traces_request(bytes: &[u8]) -> Result<TracesRequest, DecodeError> {
    serde_json::from_slice(bytes).map_err(|e| DecodeError::invalid_envelope(SignalType::Traces, e))
}

/// Flatten a trace envelope into one [`Trace`] per span.
pub fn decode_traces(request: TracesRequest, policy: TimestampPolicy) -> Decoded<Trace> {
    let mut decoded = Decoded::default();

    for resource_spans in request.resource_spans {
        let service = service_name(&resource_spans.resource);

        for scope in resource_spans.scope_spans {
            for span in scope.spans {
                let start = parse_or_zero(&span.start_time_unix_nano);
                let end = parse_or_zero(&span.end_time_unix_nano);
                if !decoded.admit(start.failed || end.failed, policy) {
                    tracing::debug!(
                        service = %service,
                        span_id = %span.span_id,
                        "skipping span with unparseable timestamp"
                    );
                    continue;
                }

                decoded.records.push(Trace {
                    trace_id: span.trace_id,
                    span_id: span.span_id,
                    parent_span_id: non_empty(span.parent_span_id),
                    service_name: service.clone(),
                    operation_name: span.name,
                    start_time: start.value,
                    duration_nanos: duration_nanos(start.value, end.value),
                    status_code: span.status.code,
                    attributes: normalize_attributes(&span.attributes),
                });
            }
        }
    }

    decoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::{to_unix_nanos, zero_time};

    fn decode(json: &str, policy: TimestampPolicy) -> Decoded<Trace> {
        decode_traces(parse_traces_request(json.as_bytes()).unwrap(), policy)
    }

    fn span_json(span_id: &str, start: &str, end: &str) -> String {
        format!(
            r#"{{"traceId":"t1","spanId":"{}","name":"op","startTimeUnixNano":"{}","endTimeUnixNano":"{}"}}"#,
            span_id, start, end
        )
    }

    #[test]
    fn test_single_span_scenario() {
        let json = r#"{
            "resourceSpans": [{
                "resource": {"attributes": [{"key": "service.name", "value": {"stringValue": "checkout"}}]},
                "scopeSpans": [{
                    "spans": [{
                        "traceId": "t1",
                        "spanId": "s1",
                        "parentSpanId": "",
                        "name": "GET /cart",
                        "startTimeUnixNano": "1700000000000000000",
                        "endTimeUnixNano": "1700000000250000000",
                        "status": {"code": "STATUS_CODE_OK"},
                        "attributes": [{"key": "http.method", "value": {"stringValue": "GET"}}]
                    }]
                }]
            }]
        }"#;

        let decoded = decode(json, TimestampPolicy::Zero);
        assert_eq!(decoded.records.len(), 1);
        assert_eq!(decoded.degraded, 0);

        let trace = &decoded.records[0];
        assert_eq!(trace.trace_id, "t1");
        assert_eq!(trace.span_id, "s1");
        assert_eq!(trace.parent_span_id, None);
        assert_eq!(trace.service_name, "checkout");
        assert_eq!(trace.operation_name, "GET /cart");
        assert_eq!(trace.duration_nanos, 250_000_000);
        assert_eq!(to_unix_nanos(trace.start_time), 1_700_000_000_000_000_000);
        assert_eq!(trace.status_code, "STATUS_CODE_OK");
        assert_eq!(trace.attributes.decode().unwrap()["http.method"], "GET");
    }

    #[test]
    fn test_parent_span_present_when_non_empty() {
        let json = r#"{"resourceSpans":[{"scopeSpans":[{"spans":[
            {"traceId":"t","spanId":"child","parentSpanId":"root","startTimeUnixNano":"1","endTimeUnixNano":"2"}
        ]}]}]}"#;

        let decoded = decode(json, TimestampPolicy::Zero);
        assert_eq!(decoded.records[0].parent_span_id.as_deref(), Some("root"));
        assert_eq!(decoded.records[0].service_name, "unknown");
    }

    #[test]
    fn test_malformed_timestamp_is_tolerated() {
        let json = format!(
            r#"{{"resourceSpans":[{{"scopeSpans":[{{"spans":[{},{},{}]}}]}}]}}"#,
            span_json("a", "100", "200"),
            span_json("b", "garbage", "300"),
            span_json("c", "400", "500"),
        );

        let decoded = decode(&json, TimestampPolicy::Zero);
        assert_eq!(decoded.records.len(), 3);
        assert_eq!(decoded.degraded, 1);
        assert_eq!(decoded.skipped, 0);

        let degraded = &decoded.records[1];
        assert_eq!(degraded.start_time, zero_time());
        assert_eq!(degraded.duration_nanos, 300);
    }

    #[test]
    fn test_reject_policy_skips_span() {
        let json = format!(
            r#"{{"resourceSpans":[{{"scopeSpans":[{{"spans":[{},{}]}}]}}]}}"#,
            span_json("a", "100", "200"),
            span_json("b", "100", ""),
        );

        let decoded = decode(&json, TimestampPolicy::Reject);
        assert_eq!(decoded.records.len(), 1);
        assert_eq!(decoded.records[0].span_id, "a");
        assert_eq!(decoded.skipped, 1);
        assert_eq!(decoded.degraded, 0);
    }

    #[test]
    fn test_service_name_applies_per_resource_group() {
        let json = format!(
            r#"{{"resourceSpans":[
                {{"resource":{{"attributes":[{{"key":"service.name","value":{{"stringValue":"a"}}}}]}},
                  "scopeSpans":[{{"spans":[{}]}},{{"spans":[{}]}}]}},
                {{"resource":{{"attributes":[]}},"scopeSpans":[{{"spans":[{}]}}]}}
            ]}}"#,
            span_json("1", "1", "2"),
            span_json("2", "1", "2"),
            span_json("3", "1", "2"),
        );

        let services: Vec<_> = decode(&json, TimestampPolicy::Zero)
            .records
            .into_iter()
            .map(|t| t.service_name)
            .collect();
        assert_eq!(services, vec!["a", "a", "unknown"]);
    }

    #[test]
    fn test_numeric_timestamps_and_status_code() {
        let json = r#"{"resourceSpans":[{"scopeSpans":[{"spans":[
            {"traceId":"t","spanId":"s","startTimeUnixNano":1000,"endTimeUnixNano":4000,"status":{"code":2}}
        ]}]}]}"#;

        let trace = &decode(json, TimestampPolicy::Zero).records[0];
        assert_eq!(trace.duration_nanos, 3000);
        assert_eq!(trace.status_code, "2");
    }

    #[test]
    fn test_invalid_envelope_is_error() {
        assert!(parse_traces_request(b"not json").is_err());
        assert!(parse_traces_request(br#"{"resourceSpans":{}}"#).is_err());

        let err = parse_traces_request(br#"{}"#).unwrap_err();
        assert_eq!(err.signal(), SignalType::Traces);
        assert!(err.to_string().contains("resourceSpans"));
    }

    #[test]
    fn test_empty_envelope_has_no_records() {
        let decoded = decode(r#"{"resourceSpans":[]}"#, TimestampPolicy::Zero);
        assert!(decoded.records.is_empty());
    }
}

//! Metric envelope (`resourceMetrics`) and data point decoding.
//!
//! Gauge and sum points become one [`Metric`] each, tagged with their kind.
//! Points are accepted under a `data` wrapper or directly on the metric
//! definition (canonical OTLP/JSON). Histogram, exponential histogram and
//! summary metrics have no flat representation and are skipped.

use serde::de::IgnoredAny;
use serde::Deserialize;

use crate::attributes::{normalize_attributes, KeyValue};
use crate::de::{lenient_i64, null_default, string_or_number};
use crate::error::DecodeError;
use crate::model::{Metric, MetricKind};
use crate::otlp::common::{service_name, Resource};
use crate::otlp::{Decoded, SignalType};
use crate::timestamp::{parse_or_zero, TimestampPolicy};

/// `ExportMetricsServiceRequest` in OTLP/JSON form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsRequest {
    pub resource_metrics: Vec<ResourceMetrics>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetrics {
    #[serde(default, deserialize_with = "null_default")]
    pub resource: Resource,
    #[serde(default, deserialize_with = "null_default")]
    pub scope_metrics: Vec<ScopeMetrics>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeMetrics {
    #[serde(default, deserialize_with = "null_default")]
    pub metrics: Vec<MetricDefinition>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricDefinition {
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub data: MetricData,
    #[serde(flatten)]
    pub inline: MetricData,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricData {
    #[serde(default)]
    pub gauge: Option<NumberSeries>,
    #[serde(default)]
    pub sum: Option<NumberSeries>,
    #[serde(default)]
    pub histogram: Option<IgnoredAny>,
    #[serde(default)]
    pub exponential_histogram: Option<IgnoredAny>,
    #[serde(default)]
    pub summary: Option<IgnoredAny>,
}

impl MetricData {
    fn has_unsupported(&self) -> bool {
        self.histogram.is_some() || self.exponential_histogram.is_some() || self.summary.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberSeries {
    #[serde(default, deserialize_with = "null_default")]
    pub data_points: Vec<NumberDataPoint>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberDataPoint {
    #[serde(default, deserialize_with = "string_or_number")]
    pub time_unix_nano: String,
    #[serde(default)]
    pub as_double: Option<f64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub as_int: Option<i64>,
    #[serde(default, deserialize_with = "null_default")]
    pub attributes: Vec<KeyValue>,
}

impl NumberDataPoint {
    /// `asDouble` wins over `asInt`; a point with neither reads as zero.
    pub fn value(&self) -> f64 {
        match (self.as_double, self.as_int) {
            (Some(d), _) => d,
            (None, Some(i)) => i as f64,
            (None, None) => 0.0,
        }
    }
}

/// Parse and structurally validate a metrics envelope.
pub fn parse_metrics_request(bytes: &[u8]) -> Result<MetricsRequest, DecodeError> {
    serde_json::from_slice(bytes)
        .map_err(|e| DecodeError::invalid_envelope(SignalType::Metrics, e))
}

/// Flatten a metrics envelope into one [`Metric`] per gauge or sum point.
pub fn decode_metrics(request: MetricsRequest, policy: TimestampPolicy) -> Decoded<Metric> {
    let mut decoded = Decoded::default();

    for resource_metrics in request.resource_metrics {
        let service = service_name(&resource_metrics.resource);

        for scope in resource_metrics.scope_metrics {
            for definition in scope.metrics {
                decode_definition(definition, &service, policy, &mut decoded);
            }
        }
    }

    decoded
}

fn decode_definition(
    definition: MetricDefinition,
    service: &str,
    policy: TimestampPolicy,
    decoded: &mut Decoded<Metric>,
) {
    let MetricDefinition { name, data, inline } = definition;
    let unsupported = data.has_unsupported() || inline.has_unsupported();

    let series = [
        (MetricKind::Gauge, data.gauge),
        (MetricKind::Gauge, inline.gauge),
        (MetricKind::Sum, data.sum),
        (MetricKind::Sum, inline.sum),
    ];

    let before = decoded.records.len();
    for (kind, points) in series {
        let Some(points) = points else { continue };
        for point in points.data_points {
            let ts = parse_or_zero(&point.time_unix_nano);
            if !decoded.admit(ts.failed, policy) {
                tracing::debug!(
                    service = %service,
                    metric = %name,
                    "skipping data point with unparseable timestamp"
                );
                continue;
            }

            decoded.records.push(Metric {
                metric_name: name.clone(),
                kind,
                value: point.value(),
                timestamp: ts.value,
                service_name: service.to_string(),
                labels: normalize_attributes(&point.attributes),
            });
        }
    }

    if unsupported && decoded.records.len() == before {
        decoded.skipped += 1;
        tracing::warn!(
            service = %service,
            metric = %name,
            "skipping metric with unsupported data type (histogram, exponential histogram or summary)"
        );
    }
}

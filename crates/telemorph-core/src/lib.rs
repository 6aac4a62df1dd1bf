// telemorph-core - Signal decoding and normalization
//
// Pure logic for turning OTLP/JSON export requests into flat, storage-ready
// records. No I/O, no async, no runtime dependencies.

pub mod attributes;
mod de;
pub mod error;
pub mod model;
pub mod otlp;
pub mod timestamp;

pub use attributes::{normalize_attributes, AnyValue, AttributeBlob, KeyValue};
pub use error::DecodeError;
pub use model::{Log, Metric, MetricKind, Trace};
pub use otlp::{
    decode_logs, decode_metrics, decode_traces, parse_logs_request, parse_metrics_request,
    parse_traces_request, Decoded, LogsRequest, MetricsRequest, SignalType, TracesRequest,
    UNKNOWN_SERVICE_NAME,
};
pub use timestamp::TimestampPolicy;

//! Wire timestamp parsing and the policy applied when parsing fails.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What to do with a record whose timestamp cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampPolicy {
    /// Keep the record with the zero-value timestamp (Unix epoch) and count
    /// it as degraded.
    #[default]
    Zero,
    /// Drop the record and count it as skipped.
    Reject,
}

impl TimestampPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimestampPolicy::Zero => "zero",
            TimestampPolicy::Reject => "reject",
        }
    }
}

impl fmt::Display for TimestampPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimestampPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero" => Ok(TimestampPolicy::Zero),
            "reject" => Ok(TimestampPolicy::Reject),
            other => Err(format!(
                "unknown timestamp policy '{}', expected 'zero' or 'reject'",
                other
            )),
        }
    }
}

/// The zero-value timestamp substituted for unparseable input.
pub fn zero_time() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

/// Parse a wire timestamp.
///
/// Accepts decimal unix nanoseconds (the canonical OTLP encoding) or an
/// RFC 3339 string. Returns `None` for empty or unparseable input, and for
/// instants that do not fit in signed 64-bit unix nanoseconds (roughly
/// outside 1677 to 2262), since stores keep timestamps in that form.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw.parse::<i64>().ok().map(DateTime::from_timestamp_nanos);
    }

    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .filter(|dt| dt.timestamp_nanos_opt().is_some())
}

/// Outcome of parsing one timestamp field under the tolerant policy.
#[derive(Debug, Clone, Copy)]
pub struct ParsedTime {
    pub value: DateTime<Utc>,
    pub failed: bool,
}

/// Parse a timestamp, substituting the zero value on failure.
pub fn parse_or_zero(raw: &str) -> ParsedTime {
    match parse_timestamp(raw) {
        Some(value) => ParsedTime {
            value,
            failed: false,
        },
        None => ParsedTime {
            value: zero_time(),
            failed: true,
        },
    }
}

/// Nanoseconds between two timestamps, saturating at the `i64` bounds.
pub fn duration_nanos(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let delta = end.signed_duration_since(start);
    match delta.num_nanoseconds() {
        Some(nanos) => nanos,
        None if delta < chrono::TimeDelta::zero() => i64::MIN,
        None => i64::MAX,
    }
}

/// Unix nanoseconds for a timestamp, saturating outside the representable
/// range (roughly years 1677 to 2262).
pub fn to_unix_nanos(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_nanos_opt().unwrap_or(if ts.timestamp() < 0 {
        i64::MIN
    } else {
        i64::MAX
    })
}

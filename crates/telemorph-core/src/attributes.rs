//! Attribute values and the attribute normalizer.
//!
//! OTLP attributes arrive as an ordered list of `{key, value}` pairs where the
//! value is a tagged `AnyValue`. The normalizer flattens that list into a
//! compact JSON object mapping each key to a string. Non-string values are
//! rendered to text rather than dropped.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

use crate::de::{lenient_i64, null_default};

/// Canonical encoding for an attribute set with no entries.
pub const EMPTY_BLOB: &str = "{}";

/// Tagged OTLP attribute value.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(from = "RawAnyValue")]
pub enum AnyValue {
    #[default]
    Empty,
    String(String),
    Bool(bool),
    Int(i64),
    Double(f64),
    /// Base64 text exactly as it appeared on the wire.
    Bytes(String),
    Array(Vec<AnyValue>),
    KvList(Vec<KeyValue>),
}

impl AnyValue {
    /// Returns the inner string for the string variant only.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AnyValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Text form stored in attribute blobs and log messages.
    pub fn render(&self) -> String {
        match self {
            AnyValue::Empty => String::new(),
            AnyValue::String(s) | AnyValue::Bytes(s) => s.clone(),
            AnyValue::Bool(b) => b.to_string(),
            AnyValue::Int(i) => i.to_string(),
            AnyValue::Double(d) => d.to_string(),
            AnyValue::Array(_) | AnyValue::KvList(_) => self.to_json().to_string(),
        }
    }

    /// Native JSON form, used when rendering nested values.
    pub fn to_json(&self) -> JsonValue {
        match self {
            AnyValue::Empty => JsonValue::Null,
            AnyValue::String(s) | AnyValue::Bytes(s) => JsonValue::String(s.clone()),
            AnyValue::Bool(b) => JsonValue::Bool(*b),
            AnyValue::Int(i) => JsonValue::from(*i),
            AnyValue::Double(d) => serde_json::Number::from_f64(*d)
                .map(JsonValue::Number)
                .unwrap_or_else(|| JsonValue::String(d.to_string())),
            AnyValue::Array(values) => {
                JsonValue::Array(values.iter().map(AnyValue::to_json).collect())
            }
            AnyValue::KvList(entries) => JsonValue::Object(
                entries
                    .iter()
                    .map(|kv| (kv.key.clone(), kv.value.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for AnyValue {
    fn from(value: &str) -> Self {
        AnyValue::String(value.to_string())
    }
}

impl From<String> for AnyValue {
    fn from(value: String) -> Self {
        AnyValue::String(value)
    }
}

/// Wire shape of an `AnyValue`: exactly one of the variant fields is set.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnyValue {
    #[serde(default)]
    string_value: Option<String>,
    #[serde(default)]
    bool_value: Option<bool>,
    #[serde(default, deserialize_with = "lenient_i64")]
    int_value: Option<i64>,
    #[serde(default)]
    double_value: Option<f64>,
    #[serde(default)]
    bytes_value: Option<String>,
    #[serde(default)]
    array_value: Option<RawArrayValue>,
    #[serde(default)]
    kvlist_value: Option<RawKvList>,
}

#[derive(Debug, Default, Deserialize)]
struct RawArrayValue {
    #[serde(default, deserialize_with = "null_default")]
    values: Vec<AnyValue>,
}

#[derive(Debug, Default, Deserialize)]
struct RawKvList {
    #[serde(default, deserialize_with = "null_default")]
    values: Vec<KeyValue>,
}

impl From<RawAnyValue> for AnyValue {
    fn from(raw: RawAnyValue) -> Self {
        if let Some(s) = raw.string_value {
            AnyValue::String(s)
        } else if let Some(b) = raw.bool_value {
            AnyValue::Bool(b)
        } else if let Some(i) = raw.int_value {
            AnyValue::Int(i)
        } else if let Some(d) = raw.double_value {
            AnyValue::Double(d)
        } else if let Some(b) = raw.bytes_value {
            AnyValue::Bytes(b)
        } else if let Some(array) = raw.array_value {
            AnyValue::Array(array.values)
        } else if let Some(kvlist) = raw.kvlist_value {
            AnyValue::KvList(kvlist.values)
        } else {
            AnyValue::Empty
        }
    }
}

/// One attribute entry.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct KeyValue {
    #[serde(default, deserialize_with = "null_default")]
    pub key: String,
    #[serde(default, deserialize_with = "null_default")]
    pub value: AnyValue,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<AnyValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Compact JSON object of string-valued attributes, stored as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeBlob(String);

impl AttributeBlob {
    pub fn empty() -> Self {
        Self(EMPTY_BLOB.to_string())
    }

    /// Wraps text previously produced by [`normalize_attributes`], e.g. when
    /// reading rows back from a store.
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes the blob back into a key/value map.
    pub fn decode(&self) -> Result<serde_json::Map<String, JsonValue>, serde_json::Error> {
        serde_json::from_str(&self.0)
    }
}

impl Default for AttributeBlob {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for AttributeBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Flatten an attribute list into a blob. Later duplicates overwrite earlier
/// ones. Never fails: an encoding error degrades to `{}`.
pub fn normalize_attributes(attributes: &[KeyValue]) -> AttributeBlob {
    if attributes.is_empty() {
        return AttributeBlob::empty();
    }

    let mut map = serde_json::Map::with_capacity(attributes.len());
    for kv in attributes {
        map.insert(kv.key.clone(), JsonValue::String(kv.value.render()));
    }

    match serde_json::to_string(&map) {
        Ok(encoded) => AttributeBlob(encoded),
        Err(e) => {
            tracing::debug!(error = %e, "attribute encoding failed, storing empty object");
            AttributeBlob::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_kvs(json: &str) -> Vec<KeyValue> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_empty_input_is_empty_object() {
        assert_eq!(normalize_attributes(&[]).as_str(), "{}");
        assert!(normalize_attributes(&[]).decode().unwrap().is_empty());
    }

    #[test]
    fn test_service_name_round_trip() {
        let blob = normalize_attributes(&[KeyValue::new("service.name", "x")]);
        let decoded = blob.decode().unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded["service.name"], "x");
    }

    #[test]
    fn test_last_key_wins() {
        let blob = normalize_attributes(&[
            KeyValue::new("env", "staging"),
            KeyValue::new("region", "eu"),
            KeyValue::new("env", "prod"),
        ]);
        let decoded = blob.decode().unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded["env"], "prod");
    }

    #[test]
    fn test_blob_is_compact() {
        let blob = normalize_attributes(&[KeyValue::new("a", "1"), KeyValue::new("b", "2")]);
        assert!(!blob.as_str().contains(' '));
        assert!(!blob.as_str().contains('\n'));
    }

    #[test]
    fn test_any_value_variants_parse() {
        let kvs = parse_kvs(
            r#"[
                {"key":"s","value":{"stringValue":"text"}},
                {"key":"b","value":{"boolValue":true}},
                {"key":"i","value":{"intValue":"42"}},
                {"key":"n","value":{"intValue":7}},
                {"key":"d","value":{"doubleValue":1.5}},
                {"key":"y","value":{"bytesValue":"aGk="}},
                {"key":"a","value":{"arrayValue":{"values":[{"stringValue":"x"},{"intValue":"1"}]}}},
                {"key":"k","value":{"kvlistValue":{"values":[{"key":"inner","value":{"boolValue":false}}]}}},
                {"key":"e","value":{}},
                {"key":"z","value":null}
            ]"#,
        );

        assert_eq!(kvs[0].value, AnyValue::String("text".into()));
        assert_eq!(kvs[1].value, AnyValue::Bool(true));
        assert_eq!(kvs[2].value, AnyValue::Int(42));
        assert_eq!(kvs[3].value, AnyValue::Int(7));
        assert_eq!(kvs[4].value, AnyValue::Double(1.5));
        assert_eq!(kvs[5].value, AnyValue::Bytes("aGk=".into()));
        assert_eq!(
            kvs[6].value,
            AnyValue::Array(vec![AnyValue::String("x".into()), AnyValue::Int(1)])
        );
        assert!(matches!(kvs[7].value, AnyValue::KvList(ref v) if v.len() == 1));
        assert_eq!(kvs[8].value, AnyValue::Empty);
        assert_eq!(kvs[9].value, AnyValue::Empty);
    }

    #[test]
    fn test_non_string_values_are_rendered() {
        let kvs = parse_kvs(
            r#"[
                {"key":"http.status_code","value":{"intValue":"200"}},
                {"key":"cache.hit","value":{"boolValue":false}},
                {"key":"ratio","value":{"doubleValue":0.25}},
                {"key":"tags","value":{"arrayValue":{"values":[{"stringValue":"a"},{"intValue":2}]}}},
                {"key":"ctx","value":{"kvlistValue":{"values":[{"key":"k","value":{"stringValue":"v"}}]}}}
            ]"#,
        );

        let decoded = normalize_attributes(&kvs).decode().unwrap();
        assert_eq!(decoded["http.status_code"], "200");
        assert_eq!(decoded["cache.hit"], "false");
        assert_eq!(decoded["ratio"], "0.25");
        assert_eq!(decoded["tags"], r#"["a",2]"#);
        assert_eq!(decoded["ctx"], r#"{"k":"v"}"#);
    }

    #[test]
    fn test_string_value_takes_precedence() {
        let kvs = parse_kvs(r#"[{"key":"k","value":{"stringValue":"s","intValue":"3"}}]"#);
        assert_eq!(kvs[0].value.as_str(), Some("s"));
    }
}

//! Envelope pieces shared by all three signals.

use serde::Deserialize;

use crate::attributes::KeyValue;
use crate::de::null_default;

/// Placeholder used when a resource omits `service.name`.
pub const UNKNOWN_SERVICE_NAME: &str = "unknown";

/// Semantic-convention key carrying the emitting service's name.
pub const SERVICE_NAME_KEY: &str = "service.name";

/// The emitting entity of a resource group.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Resource {
    #[serde(default, deserialize_with = "null_default")]
    pub attributes: Vec<KeyValue>,
}

/// Service name for a resource group: the first `service.name` attribute,
/// or `"unknown"` when it is absent or empty.
pub fn service_name(resource: &Resource) -> String {
    resource
        .attributes
        .iter()
        .find(|attr| attr.key == SERVICE_NAME_KEY)
        .map(|attr| attr.value.render())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| UNKNOWN_SERVICE_NAME.to_string())
}

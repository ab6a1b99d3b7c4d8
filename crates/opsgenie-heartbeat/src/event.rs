//! Stack lifecycle events delivered to the handler.
//!
//! Only the correlation fields are required to parse an event. Resource type,
//! request type and properties are checked later, inside the failure boundary,
//! so a malformed event still leaves enough to send a FAILED callback.

use serde::de::{self, Deserializer};
use serde::Deserialize;

use crate::error::{ProvisionError, Result};
use crate::heartbeat::{HeartbeatSpec, IntervalUnit};

/// Resource type this handler manages.
pub const RESOURCE_TYPE: &str = "Custom::OpsGenieHeartbeat";

/// Lifecycle request kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum RequestType {
    Create,
    Update,
    Delete,
    /// Any request type this handler does not act on
    #[serde(other)]
    Other,
}

/// One lifecycle event, as sent by the stack orchestrator.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleEvent {
    /// Empty when absent.
    #[serde(default)]
    pub resource_type: String,
    /// `None` when absent or not a string.
    #[serde(default, deserialize_with = "lenient_request_type")]
    pub request_type: Option<RequestType>,
    #[serde(default)]
    pub resource_properties: serde_json::Value,
    /// Present only on Update.
    #[serde(default)]
    pub old_resource_properties: Option<serde_json::Value>,
    /// Absent on Create.
    #[serde(default)]
    pub physical_resource_id: Option<String>,
    #[serde(rename = "ResponseURL")]
    pub response_url: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
}

impl LifecycleEvent {
    /// Parse an event from its JSON form.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Desired heartbeat properties.
    pub fn properties(&self) -> Result<HeartbeatProperties> {
        HeartbeatProperties::parse(&self.resource_properties, "ResourceProperties")
    }

    /// Heartbeat name from the current properties. Other properties are not
    /// validated.
    pub fn resource_name(&self) -> Result<String> {
        NamedResource::parse(&self.resource_properties, "ResourceProperties")
    }

    /// Heartbeat name from the previous properties. Only valid on Update.
    pub fn old_resource_name(&self) -> Result<String> {
        let raw = self.old_resource_properties.as_ref().ok_or_else(|| {
            ProvisionError::InvalidEvent("OldResourceProperties missing".to_string())
        })?;
        NamedResource::parse(raw, "OldResourceProperties")
    }

    /// Whether `name` is bound to the entity the orchestrator last provisioned.
    #[must_use]
    pub fn is_physical_resource(&self, name: &str) -> bool {
        self.physical_resource_id.as_deref() == Some(name)
    }
}

/// Heartbeat properties as declared on the stack resource.
///
/// Scalar values often arrive as strings, so `Interval` and `Enabled` accept
/// both `5` and `"5"`, `true` and `"true"`. Unknown properties are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HeartbeatProperties {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub interval: Option<u32>,
    #[serde(default)]
    pub interval_unit: Option<IntervalUnit>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub enabled: Option<bool>,
}

impl HeartbeatProperties {
    fn parse(raw: &serde_json::Value, field: &str) -> Result<Self> {
        Self::deserialize(raw)
            .map_err(|e| ProvisionError::InvalidEvent(format!("{field}: {e}")))
    }

    /// Build the spec to submit. Absent properties stay unset, `enabled`
    /// defaults to `true`.
    #[must_use]
    pub fn to_spec(&self) -> HeartbeatSpec {
        HeartbeatSpec {
            name: self.name.clone(),
            interval: self.interval,
            interval_unit: self.interval_unit,
            description: self.description.clone(),
            enabled: self.enabled.unwrap_or(true),
        }
    }
}

/// The name alone, for paths that never build a [`HeartbeatSpec`].
#[derive(Deserialize)]
struct NamedResource {
    #[serde(rename = "Name")]
    name: String,
}

impl NamedResource {
    fn parse(raw: &serde_json::Value, field: &str) -> Result<String> {
        Self::deserialize(raw)
            .map(|named| named.name)
            .map_err(|e| ProvisionError::InvalidEvent(format!("{field}: {e}")))
    }
}

fn lenient_request_type<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<RequestType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| RequestType::deserialize(value).ok()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar<T> {
    Typed(T),
    Text(String),
}

fn lenient_u32<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Scalar<u32>>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Scalar::Typed(n)) => Ok(Some(n)),
        Some(Scalar::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid Interval: {s:?}"))),
    }
}

fn lenient_bool<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Scalar<bool>>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Scalar::Typed(b)) => Ok(Some(b)),
        Some(Scalar::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            _ => Err(de::Error::custom(format!("invalid Enabled: {s:?}"))),
        },
    }
}

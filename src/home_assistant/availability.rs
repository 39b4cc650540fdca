use serde::{Deserialize, Serialize};

/// Represents an availability configuration for a Home Assistant entity.
///
/// The entity is considered available while the last payload on `topic`
/// equals `payload_available`.
///
/// # Fields
///
/// * `payload_available` *(Option<String>)*:
///   The payload that represents the available state.
///
/// * `payload_not_available` *(Option<String>)*:
///   The payload that represents the unavailable state.
///
/// * `topic` *(String)*:
///   An MQTT topic subscribed to receive availability (online/offline) updates.
///
/// # Example
///
/// ```ignore
/// let availability = Availability::online_offline("olarm/area/house/availability");
/// ```
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Availability {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_available: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_not_available: Option<String>,
    pub topic: String,
}

impl Availability {
    pub fn online_offline(topic: &str) -> Self {
        Self {
            payload_available: Some(AvailabilityState::Online.as_serde_value().to_string()),
            payload_not_available: Some(AvailabilityState::Offline.as_serde_value().to_string()),
            topic: topic.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum AvailabilityMode {
    #[serde(rename = "all")]
    All,
    #[serde(rename = "any")]
    Any,
    #[serde(rename = "latest")]
    Latest,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub enum AvailabilityState {
    #[serde(rename = "online")]
    Online,
    #[serde(rename = "offline")]
    Offline,
}

impl AvailabilityState {
    pub fn as_serde_value(&self) -> &'static str {
        match self {
            AvailabilityState::Online => "online",
            AvailabilityState::Offline => "offline",
        }
    }
}

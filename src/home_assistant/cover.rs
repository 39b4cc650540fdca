use crate::accessory::garage_door::{DoorState, DoorTarget};
use crate::home_assistant::availability::{Availability, AvailabilityMode};
use crate::home_assistant::device::Device;
use serde::{Deserialize, Serialize};

pub const PAYLOAD_OPEN: &str = "OPEN";
pub const PAYLOAD_CLOSE: &str = "CLOSE";

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CoverDiscoveryPayload {
    pub device: Device,
    pub name: String,
    pub unique_id: String,
    pub device_class: String,
    pub command_topic: String,
    pub state_topic: String,
    pub payload_open: String,
    pub payload_close: String,
    /// Serialized as `null` so Home Assistant hides the stop button.
    pub payload_stop: Option<String>,
    pub state_open: String,
    pub state_closed: String,
    pub state_opening: String,
    pub state_closing: String,
    pub state_stopped: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_attributes_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<Vec<Availability>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_mode: Option<AvailabilityMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimistic: Option<bool>,
}

impl CoverDiscoveryPayload {
    pub fn garage(
        device: Device,
        name: String,
        unique_id: String,
        command_topic: String,
        state_topic: String,
        availability: Vec<Availability>,
    ) -> Self {
        Self {
            device,
            name,
            unique_id,
            device_class: "garage".to_string(),
            command_topic,
            state_topic,
            payload_open: PAYLOAD_OPEN.to_string(),
            payload_close: PAYLOAD_CLOSE.to_string(),
            payload_stop: None,
            state_open: DoorState::Open.to_string(),
            state_closed: DoorState::Closed.to_string(),
            state_opening: DoorState::Opening.to_string(),
            state_closing: DoorState::Closing.to_string(),
            state_stopped: DoorState::Stopped.to_string(),
            json_attributes_topic: None,
            availability: Some(availability),
            availability_mode: None, //defaults to "latest"
            optimistic: Some(false),
        }
    }
}

pub fn parse_cover_command(payload: &str) -> Option<DoorTarget> {
    match payload.trim() {
        PAYLOAD_OPEN => Some(DoorTarget::Open),
        PAYLOAD_CLOSE => Some(DoorTarget::Closed),
        _ => None,
    }
}

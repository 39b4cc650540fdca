pub(crate) use crate::home_assistant::device::Device;
use crate::home_assistant::availability::{Availability, AvailabilityMode};
use serde::{Deserialize, Serialize};

pub const PAYLOAD_ON: &str = "ON";
pub const PAYLOAD_OFF: &str = "OFF";

#[derive(Serialize, Deserialize)]
pub struct BinarySensorDiscoveryPayload {
    pub device: Device,
    pub device_class: String,
    pub name: String,
    pub payload_off: String,
    pub payload_on: String,
    pub state_topic: String,
    pub unique_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_attributes_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<Vec<Availability>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_mode: Option<AvailabilityMode>,
}

pub fn occupancy_payload(occupied: bool) -> &'static str {
    if occupied { PAYLOAD_ON } else { PAYLOAD_OFF }
}

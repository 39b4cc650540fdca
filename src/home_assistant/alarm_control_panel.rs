use crate::accessory::security::SecuritySystemCode;
use crate::home_assistant::availability::{Availability, AvailabilityMode};
use crate::home_assistant::device::Device;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct AlarmControlPanelDiscoveryPayload {
    pub device: Device,
    pub name: String,
    pub unique_id: String,
    pub state_topic: String,
    pub command_topic: String,
    pub payload_arm_away: String,
    pub payload_arm_home: String,
    pub payload_arm_night: String,
    pub payload_disarm: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_arm_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_disarm_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_attributes_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<Vec<Availability>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_mode: Option<AvailabilityMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_features: Option<Vec<AlarmFeature>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmState {
    #[serde(rename = "armed_away")]
    ArmedAway,
    #[serde(rename = "armed_home")]
    ArmedHome,
    #[serde(rename = "armed_night")]
    ArmedNight,
    #[serde(rename = "disarmed")]
    Disarmed,
    #[serde(rename = "triggered")]
    Triggered,
}

impl AlarmState {
    pub fn as_serde_value(&self) -> &'static str {
        match self {
            AlarmState::ArmedAway => "armed_away",
            AlarmState::ArmedHome => "armed_home",
            AlarmState::ArmedNight => "armed_night",
            AlarmState::Disarmed => "disarmed",
            AlarmState::Triggered => "triggered",
        }
    }
}

impl From<SecuritySystemCode> for AlarmState {
    fn from(code: SecuritySystemCode) -> Self {
        match code {
            SecuritySystemCode::StayArm => AlarmState::ArmedHome,
            SecuritySystemCode::AwayArm => AlarmState::ArmedAway,
            SecuritySystemCode::NightArm => AlarmState::ArmedNight,
            SecuritySystemCode::Disarmed => AlarmState::Disarmed,
            SecuritySystemCode::AlarmTriggered => AlarmState::Triggered,
        }
    }
}

/// Command payloads Home Assistant publishes on the command topic.
pub const PAYLOAD_ARM_AWAY: &str = "ARM_AWAY";
pub const PAYLOAD_ARM_HOME: &str = "ARM_HOME";
pub const PAYLOAD_ARM_NIGHT: &str = "ARM_NIGHT";
pub const PAYLOAD_DISARM: &str = "DISARM";

pub fn parse_alarm_command(payload: &str) -> Option<SecuritySystemCode> {
    match payload.trim() {
        PAYLOAD_ARM_AWAY => Some(SecuritySystemCode::AwayArm),
        PAYLOAD_ARM_HOME => Some(SecuritySystemCode::StayArm),
        PAYLOAD_ARM_NIGHT => Some(SecuritySystemCode::NightArm),
        PAYLOAD_DISARM => Some(SecuritySystemCode::Disarmed),
        _ => None,
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub enum AlarmFeature {
    #[serde(rename = "arm_away")]
    ArmAway,
    #[serde(rename = "arm_home")]
    ArmHome,
    #[serde(rename = "arm_night")]
    ArmNight,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alarm_state_from_code() {
        assert_eq!(
            AlarmState::from(SecuritySystemCode::NightArm).as_serde_value(),
            "armed_night"
        );
        assert_eq!(
            AlarmState::from(SecuritySystemCode::AlarmTriggered),
            AlarmState::Triggered
        );
        assert_eq!(
            serde_json::to_string(&AlarmState::ArmedHome).unwrap(),
            "\"armed_home\""
        );
    }

    #[test]
    fn test_parse_alarm_command() {
        assert_eq!(parse_alarm_command("ARM_HOME"), Some(SecuritySystemCode::StayArm));
        assert_eq!(parse_alarm_command("ARM_AWAY\n"), Some(SecuritySystemCode::AwayArm));
        assert_eq!(parse_alarm_command("DISARM"), Some(SecuritySystemCode::Disarmed));
        assert_eq!(parse_alarm_command("ARM_VACATION"), None);
    }
}

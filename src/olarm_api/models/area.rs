use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Arm state of an area as reported by the panel.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum AreaState {
    Disarmed,
    Armed,
    ArmedStay,
    NotReady,
    Triggered,
}

impl AreaState {
    /// Parse the raw Olarm area string. Anything the panel reports that we
    /// don't recognise is treated as "not ready" so it never overwrites the
    /// requested target.
    pub fn from_olarm(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "disarm" => AreaState::Disarmed,
            "arm" | "countdown" => AreaState::Armed,
            "stay" | "sleep" => AreaState::ArmedStay,
            "notready" => AreaState::NotReady,
            "alarm" | "fire" | "emergency" => AreaState::Triggered,
            _ => AreaState::NotReady,
        }
    }
}

impl Display for AreaState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AreaState::Disarmed => "disarm",
            AreaState::Armed => "arm",
            AreaState::ArmedStay => "stay",
            AreaState::NotReady => "notready",
            AreaState::Triggered => "alarm",
        };
        write!(f, "{}", s)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum ZoneState {
    Active,
    Closed,
    Bypassed,
    Unknown(String),
}

impl ZoneState {
    pub fn from_olarm(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "a" => ZoneState::Active,
            "c" => ZoneState::Closed,
            "b" => ZoneState::Bypassed,
            _ => ZoneState::Unknown(raw.to_string()),
        }
    }
}

/// One area as seen in a single fetch from the Olarm API.
///
/// Zones are index-aligned with `zones_stamp` and numbered from 1 externally,
/// so zone `n` lives at index `n - 1`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AreaSnapshot {
    pub device_id: String,
    pub area_number: usize,
    pub area_name: String,
    pub area_state: AreaState,
    pub device_timestamp: i64,
    pub zones: Vec<ZoneState>,
    pub zones_stamp: Vec<i64>,
}

/// Enough of an area to address it in an action request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AreaRef {
    pub device_id: String,
    pub area_number: usize,
    pub area_name: String,
}

impl AreaSnapshot {
    pub fn area_ref(&self) -> AreaRef {
        AreaRef {
            device_id: self.device_id.clone(),
            area_number: self.area_number,
            area_name: self.area_name.clone(),
        }
    }

    pub fn zone(&self, zone_number: usize) -> Option<(&ZoneState, i64)> {
        let i = zone_number.checked_sub(1)?;
        Some((self.zones.get(i)?, *self.zones_stamp.get(i)?))
    }
}

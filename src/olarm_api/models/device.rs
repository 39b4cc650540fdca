use crate::olarm_api::models::area::{AreaSnapshot, AreaState, ZoneState};
use crate::olarm_api::models::device_profile::DeviceProfile;
use crate::olarm_api::models::device_state::DeviceState;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Device {
    #[serde(rename = "deviceId")]
    pub device_id: String,
    #[serde(rename = "deviceName")]
    pub device_name: String,
    #[serde(rename = "deviceTimestamp")]
    pub device_timestamp: i64,
    #[serde(rename = "deviceStatus", default)]
    pub device_status: String,
    #[serde(rename = "deviceState", default)]
    pub device_state: DeviceState,
    #[serde(rename = "deviceProfile", default)]
    pub device_profile: DeviceProfile,
}

impl Device {
    /// Split the device into one snapshot per area. Every area shares the
    /// device-wide zone list, since Olarm reports zones per device.
    pub fn area_snapshots(&self) -> Vec<AreaSnapshot> {
        let state = &self.device_state;
        let zones: Vec<ZoneState> = state.zones.iter().map(|z| ZoneState::from_olarm(z)).collect();
        let mut zones_stamp: Vec<i64> = state
            .zones_stamp
            .iter()
            .map(|s| s.unwrap_or(0) as i64)
            .collect();
        zones_stamp.resize(zones.len(), 0);

        let area_count = if self.device_profile.areas_limit > 0 {
            (self.device_profile.areas_limit as usize).min(state.areas.len())
        } else {
            state.areas.len()
        };

        let mut snapshots = Vec::with_capacity(area_count);
        for (i, raw_state) in state.areas.iter().enumerate().take(area_count) {
            let area_name = match self.device_profile.areas_labels.get(i) {
                Some(label) if !label.is_empty() => label.clone(),
                _ => {
                    warn!(
                        "Area {} on device {} has no label in Olarm, generating one",
                        i + 1,
                        self.device_id
                    );
                    format!("Area {}", i + 1)
                }
            };
            snapshots.push(AreaSnapshot {
                device_id: self.device_id.clone(),
                area_number: i + 1,
                area_name,
                area_state: AreaState::from_olarm(raw_state),
                device_timestamp: self.device_timestamp,
                zones: zones.clone(),
                zones_stamp: zones_stamp.clone(),
            });
        }
        snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_snapshots_from_device_json() {
        let body = r#"{
            "deviceId": "abc",
            "deviceName": "Home",
            "deviceTimestamp": 100000,
            "deviceStatus": "online",
            "deviceState": {
                "timestamp": 100000,
                "areas": ["disarm", "stay"],
                "zones": ["c", "a", "b"],
                "zonesStamp": [90000, 99000, null]
            },
            "deviceProfile": {
                "areasLimit": 2,
                "areasLabels": ["House", ""]
            }
        }"#;
        let device: Device = serde_json::from_str(body).unwrap();
        let snapshots = device.area_snapshots();

        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].area_name, "House");
        assert_eq!(snapshots[0].area_state, AreaState::Disarmed);
        assert_eq!(snapshots[1].area_name, "Area 2");
        assert_eq!(snapshots[1].area_number, 2);
        assert_eq!(snapshots[1].area_state, AreaState::ArmedStay);
        assert_eq!(snapshots[0].zones.len(), snapshots[0].zones_stamp.len());
        assert_eq!(snapshots[0].zones_stamp, vec![90000, 99000, 0]);
        assert_eq!(snapshots[0].zones[2], ZoneState::Bypassed);
    }
}

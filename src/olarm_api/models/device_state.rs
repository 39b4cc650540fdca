use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct DeviceState {
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default)]
    pub areas: Vec<String>,
    #[serde(rename = "areasStamp", default)]
    pub areas_stamp: Vec<Option<u64>>,
    #[serde(default)]
    pub zones: Vec<String>,
    #[serde(rename = "zonesStamp", default)]
    pub zones_stamp: Vec<Option<u64>>,
    #[serde(rename = "pgmOb", default)]
    pub pgm_ob: Vec<String>,
}

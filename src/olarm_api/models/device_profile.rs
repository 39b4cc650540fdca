use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct DeviceProfile {
    #[serde(rename = "areasLimit", default)]
    pub areas_limit: i64,
    #[serde(rename = "areasLabels", default)]
    pub areas_labels: Vec<String>,
    #[serde(rename = "zonesLimit", default)]
    pub zones_limit: i64,
    #[serde(rename = "zonesLabels", default)]
    pub zones_labels: Vec<String>,
    #[serde(rename = "pgmLimit", default)]
    pub pgm_limit: i64,
    #[serde(rename = "pgmLabels", default)]
    pub pgm_labels: Vec<String>,
}

use crate::olarm_api::models::device::Device;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DevicesResponse {
    #[serde(default)]
    pub page: i64,
    #[serde(rename = "pageLength", default)]
    pub page_length: i64,
    #[serde(rename = "pageCount", default)]
    pub page_count: i64,
    pub data: Vec<Device>,
}

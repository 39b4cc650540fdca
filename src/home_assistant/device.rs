use crate::olarm_api::models::area::AreaRef;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Device {
    pub identifiers: Vec<String>,
    pub manufacturer: String,
    pub model: String,
    pub name: String,
}

impl Device {
    pub fn for_area(area: &AreaRef) -> Self {
        Self {
            identifiers: vec![format!("{}_area_{}", area.device_id, area.area_number)],
            manufacturer: "Olarm".to_string(),
            model: "Olarm area".to_string(),
            name: format!("Olarm {}", area.area_name),
        }
    }
}

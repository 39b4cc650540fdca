//! Bridges one Olarm alarm area to Home Assistant over MQTT: security state,
//! zone occupancy and a PGM driven garage door.

pub mod accessory;
pub mod config;
pub mod error;
pub mod home_assistant;
pub mod olarm_api;
pub mod processors;

pub use accessory::AreaAccessory;
pub use error::{BridgeError, Result};
pub use processors::HubCommand;

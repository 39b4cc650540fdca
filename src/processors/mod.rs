use crate::accessory::AreaStatus;
use crate::accessory::garage_door::DoorTarget;
use crate::accessory::security::SecuritySystemCode;
use crate::home_assistant::alarm_control_panel::parse_alarm_command;
use crate::home_assistant::cover::parse_cover_command;
use crate::olarm_api::models::area::AreaRef;
use dashmap::DashSet;
use std::sync::Arc;
use tracing::error;

pub mod ha_processor;
pub mod panel_processor;
pub mod zones_processor;

/// Trait for a processor that publishes an area status to Home Assistant
pub trait AreaStatusProcessor: Send + Sync + 'static {
    fn handle(
        &self,
        status: &AreaStatus,
        processor_state: Arc<ProcessorState>,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}

pub struct ProcessorState {
    pub area: AreaRef,
    pub topics: AreaTopics,
    pub discovery_prefix: String,
    pub published_discovery: Arc<DashSet<String>>,
}

/// MQTT topics for one area, all under `olarm/area/{slug}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaTopics {
    pub slug: String,
    base: String,
}

impl AreaTopics {
    pub fn new(area_name: &str) -> Self {
        let slug = slugify(area_name);
        Self {
            base: format!("olarm/area/{}", slug),
            slug,
        }
    }

    pub fn availability(&self) -> String {
        format!("{}/availability", self.base)
    }

    pub fn security_state(&self) -> String {
        format!("{}/state", self.base)
    }

    pub fn security_command(&self) -> String {
        format!("{}/set", self.base)
    }

    pub fn zone_occupancy(&self, zone_number: usize) -> String {
        format!("{}/zone/{}/occupancy", self.base, zone_number)
    }

    pub fn garage_state(&self) -> String {
        format!("{}/garage/state", self.base)
    }

    pub fn garage_command(&self) -> String {
        format!("{}/garage/set", self.base)
    }
}

pub fn slugify(name: &str) -> String {
    let slug: String = name
        .trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if slug.is_empty() { "area".to_string() } else { slug }
}

/// A Home Assistant command, already mapped onto the accessory's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubCommand {
    SetSecurityTarget(SecuritySystemCode),
    SetDoorTarget(DoorTarget),
}

pub fn command_topic_parser(topic: &str, payload: &str, topics: &AreaTopics) -> Option<HubCommand> {
    let mut parts: Vec<&str> = topic.split('/').collect();
    if parts.len() > 5 {
        return None;
    }
    parts.resize(5, "");

    if payload.trim().is_empty() {
        error!("Empty payload for topic: {:?}", topic);
        return None;
    }

    match (parts[0], parts[1], parts[2], parts[3], parts[4]) {
        //olarm/area/house/set
        ("olarm", "area", slug, "set", "") if slug == topics.slug => {
            parse_alarm_command(payload).map(HubCommand::SetSecurityTarget)
        }
        //olarm/area/house/garage/set
        ("olarm", "area", slug, "garage", "set") if slug == topics.slug => {
            parse_cover_command(payload).map(HubCommand::SetDoorTarget)
        }
        _ => None,
    }
}

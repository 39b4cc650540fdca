use crate::accessory::garage_door::ReversalStrategy;
use crate::error::BridgeError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub logging: LoggingConfig,
    pub olarm: OlarmConfig,
    pub area: AreaConfig,
    pub home_assistant: HomeAssistantConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub directory: String,
    pub debug_file: String,
    pub info_file: String,
    pub warn_file: String,
    pub error_file: String,
    pub console_level: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OlarmConfig {
    pub api_token: String,
    /// Upper bound on a single Olarm API request.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AreaConfig {
    /// Area label as configured in Olarm.
    pub name: String,
    pub polling_interval_ms: u64,
    /// A zone counts as occupied while its last change is younger than this,
    /// measured against the device timestamp.
    pub occupancy_delay_ms: u64,
    #[serde(default)]
    pub occupancy_zones: Vec<usize>,
    #[serde(default = "default_min_refresh_ms")]
    pub min_refresh_ms: u64,
    #[serde(default)]
    pub garage_door: Option<GarageDoorConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GarageDoorConfig {
    pub zone: Option<usize>,
    pub pgm_channel: Option<u32>,
    #[serde(default = "default_door_delay_ms")]
    pub delay_ms: u64,
    #[serde(default)]
    pub reversal: ReversalStrategy,
}

/// Garage door settings once both halves of the config are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GarageDoorSettings {
    pub zone: usize,
    pub pgm_channel: u32,
    pub delay: Duration,
    pub reversal: ReversalStrategy,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HomeAssistantConfig {
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_username: String,
    pub mqtt_password: String,
    pub client_id: String,
    #[serde(default = "default_discovery_prefix")]
    pub discovery_prefix: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LimitsConfig {
    pub mqtt_queue_size: usize,
    pub command_channel_size: usize,
}

fn default_min_refresh_ms() -> u64 {
    15_000
}

fn default_door_delay_ms() -> u64 {
    15_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_discovery_prefix() -> String {
    "homeassistant".to_string()
}

impl OlarmConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl AreaConfig {
    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }

    pub fn occupancy_delay(&self) -> Duration {
        Duration::from_millis(self.occupancy_delay_ms)
    }

    pub fn min_refresh(&self) -> Duration {
        Duration::from_millis(self.min_refresh_ms)
    }

    /// `None` when no garage door is configured at all. Half a garage door
    /// config is an error.
    pub fn garage_door_settings(&self) -> Result<Option<GarageDoorSettings>, BridgeError> {
        let Some(door) = &self.garage_door else {
            return Ok(None);
        };
        match (door.zone, door.pgm_channel) {
            (None, None) => Ok(None),
            (Some(zone), Some(pgm_channel)) => {
                if zone == 0 {
                    return Err(BridgeError::config("garage door zone numbers start at 1"));
                }
                Ok(Some(GarageDoorSettings {
                    zone,
                    pgm_channel,
                    delay: Duration::from_millis(door.delay_ms),
                    reversal: door.reversal,
                }))
            }
            (Some(_), None) => Err(BridgeError::config(
                "garage door zone is set but pgm_channel is missing",
            )),
            (None, Some(_)) => Err(BridgeError::config(
                "garage door pgm_channel is set but zone is missing",
            )),
        }
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.name.trim().is_empty() {
            return Err(BridgeError::config("area name must not be empty"));
        }
        if self.polling_interval_ms == 0 {
            return Err(BridgeError::config("polling_interval_ms must be greater than 0"));
        }
        if let Some(zone) = self.occupancy_zones.iter().find(|z| **z == 0) {
            return Err(BridgeError::config(format!(
                "occupancy zone {} is invalid, zone numbers start at 1",
                zone
            )));
        }
        self.garage_door_settings()?;
        Ok(())
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.area.validate()?;
        Ok(config)
    }

    pub fn save_example(path: &str) -> Result<()> {
        let example_config = Config {
            logging: LoggingConfig {
                directory: "./logs".to_string(),
                debug_file: "log_debug.log".to_string(),
                info_file: "log_info.log".to_string(),
                warn_file: "log_warn.log".to_string(),
                error_file: "log_error.log".to_string(),
                console_level: "info".to_string(),
            },
            olarm: OlarmConfig {
                api_token: "REPLACE_WITH_YOUR_API_TOKEN".to_string(),
                request_timeout_ms: default_request_timeout_ms(),
            },
            area: AreaConfig {
                name: "REPLACE_WITH_YOUR_AREA_NAME".to_string(),
                polling_interval_ms: 30_000,
                occupancy_delay_ms: 60_000,
                occupancy_zones: vec![],
                min_refresh_ms: default_min_refresh_ms(),
                garage_door: Some(GarageDoorConfig {
                    zone: None,
                    pgm_channel: None,
                    delay_ms: default_door_delay_ms(),
                    reversal: ReversalStrategy::default(),
                }),
            },
            home_assistant: HomeAssistantConfig {
                mqtt_host: "192.168.1.40".to_string(),
                mqtt_port: 1883,
                mqtt_username: "homeassistant".to_string(),
                mqtt_password: "REPLACE_WITH_YOUR_HOMEASSISTANT_MQTT_PASSWORD".to_string(),
                client_id: "olarm-garage-bridge".to_string(),
                discovery_prefix: default_discovery_prefix(),
            },
            limits: LimitsConfig {
                mqtt_queue_size: 100,
                command_channel_size: 10,
            },
        };

        let toml_content = toml::to_string_pretty(&example_config)?;
        fs::write(path, toml_content)?;
        Ok(())
    }
}

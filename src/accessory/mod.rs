use crate::config::AreaConfig;
use crate::error::{BridgeError, Result};
use crate::olarm_api::cached_olarm_client::CachedOlarmClient;
use crate::olarm_api::models::area::{AreaRef, AreaState};
use crate::olarm_api::olarm_client::OlarmApiTrait;
use chrono::Utc;
use garage_door::{DoorState, DoorTarget, GarageDoor};
use security::{SecurityReconciler, SecurityStatePair, SecuritySystemCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub mod garage_door;
pub mod occupancy;
pub mod security;

/// Everything the hub shows for an area after one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaStatus {
    pub current: SecuritySystemCode,
    pub target: SecuritySystemCode,
    pub occupancy: Vec<(usize, bool)>,
    pub door: Option<(DoorState, DoorTarget)>,
}

/// Per-area handle shared by the polling loop and the command handler. Owns
/// the snapshot cache, the security state pair and the garage door.
pub struct AreaAccessory<T>
where
    T: OlarmApiTrait,
{
    area: AreaRef,
    client: Arc<CachedOlarmClient<T>>,
    security: SecurityReconciler<T>,
    occupancy_zones: Vec<usize>,
    occupancy_delay: Duration,
    min_refresh: Duration,
    garage_door: Option<GarageDoor<T>>,
}

impl<T> AreaAccessory<T>
where
    T: OlarmApiTrait + Send + Sync,
{
    /// Validate the area config and fetch the area once, so a bad area name
    /// or half a garage door config fails here rather than on first use.
    pub async fn connect(client: T, config: &AreaConfig) -> Result<Self> {
        config.validate()?;
        let door_settings = config.garage_door_settings()?;
        let min_refresh = config.min_refresh();
        let client = Arc::new(CachedOlarmClient::new(
            client,
            &config.name,
            min_refresh.max(Duration::from_secs(1)) * 4,
        ));

        let snapshot = client.get_current(min_refresh).await?;
        for zone in config.occupancy_zones.iter().chain(door_settings.iter().map(|d| &d.zone)) {
            if snapshot.zone(*zone).is_none() {
                return Err(BridgeError::config(format!(
                    "zone {} is out of range, area {} reports {} zones",
                    zone,
                    snapshot.area_name,
                    snapshot.zones.len()
                )));
            }
        }
        let area = snapshot.area_ref();
        info!(
            "Connected to area {} (#{} on device {}), state {}",
            area.area_name, area.area_number, area.device_id, snapshot.area_state
        );

        let security =
            SecurityReconciler::new(client.clone(), area.clone(), min_refresh, snapshot.area_state);
        let garage_door = door_settings.map(|settings| {
            debug!(
                "Garage door on zone {} via PGM {}",
                settings.zone, settings.pgm_channel
            );
            GarageDoor::new(client.clone(), area.clone(), settings)
        });

        Ok(Self {
            area,
            client,
            security,
            occupancy_zones: config.occupancy_zones.clone(),
            occupancy_delay: config.occupancy_delay(),
            min_refresh,
            garage_door,
        })
    }

    pub fn area(&self) -> &AreaRef {
        &self.area
    }

    pub fn has_garage_door(&self) -> bool {
        self.garage_door.is_some()
    }

    /// Periodic refresh: security state, then occupancy, then the door.
    pub async fn tick(&self) -> Result<AreaStatus> {
        debug!("Tick for area {}", self.area.area_name);
        let (pair, snapshot) = self.security.refresh().await?;

        let mut zones = Vec::with_capacity(self.occupancy_zones.len());
        for zone in &self.occupancy_zones {
            zones.push((*zone, occupancy::is_occupied(*zone, &snapshot, self.occupancy_delay)?));
        }

        let door = match &self.garage_door {
            Some(door) => Some(door.observe(&snapshot, Utc::now().timestamp_millis()).await?),
            None => None,
        };

        Ok(AreaStatus {
            current: pair.current.into(),
            target: pair.target.into(),
            occupancy: zones,
            door,
        })
    }

    pub async fn get_current_security_state(&self) -> Result<SecuritySystemCode> {
        Ok(self.security.refresh().await?.0.current.into())
    }

    pub async fn get_target_security_state(&self) -> SecuritySystemCode {
        let pair = self.security.state().await;
        info!(
            "GET TargetState ({}) {} (current: {})",
            self.area.area_name, pair.target, pair.current
        );
        pair.target.into()
    }

    /// Current and target as last seen, without going to Olarm.
    pub async fn cached_security_state(&self) -> SecurityStatePair {
        self.security.state().await
    }

    pub async fn set_target_security_state(&self, code: SecuritySystemCode) -> Result<()> {
        self.security.request_target(AreaState::from(code)).await?;
        Ok(())
    }

    pub async fn get_door_current_state(&self) -> Result<DoorState> {
        Ok(self.door()?.current_state().await)
    }

    pub async fn get_door_target_state(&self) -> Result<DoorTarget> {
        Ok(self.door()?.target_state().await)
    }

    pub async fn set_door_target_state(&self, target: DoorTarget) -> Result<()> {
        self.door()?
            .request_target_state(target, Utc::now().timestamp_millis())
            .await?;
        Ok(())
    }

    pub async fn get_zone_occupancy(&self, zone_number: usize) -> Result<bool> {
        let snapshot = self.client.get_current(self.min_refresh).await?;
        occupancy::is_occupied(zone_number, &snapshot, self.occupancy_delay)
    }

    fn door(&self) -> Result<&GarageDoor<T>> {
        self.garage_door
            .as_ref()
            .ok_or_else(|| BridgeError::config("no garage door is configured for this area"))
    }
}

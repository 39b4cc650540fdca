use crate::error::Result;
use crate::olarm_api::cached_olarm_client::CachedOlarmClient;
use crate::olarm_api::models::area::{AreaRef, AreaSnapshot, AreaState};
use crate::olarm_api::models::request::actions_request::AreaAction;
use crate::olarm_api::olarm_client::OlarmApiTrait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;

/// Security system state codes as the hub understands them.
///
/// ```text
/// HUB      OLARM
/// Home     <unused> -> Stay
/// Away     Armed
/// Night    Stay
/// Off      Disarmed, NotReady, Triggered
/// ```
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum SecuritySystemCode {
    StayArm = 0,
    AwayArm = 1,
    NightArm = 2,
    Disarmed = 3,
    AlarmTriggered = 4,
}

impl SecuritySystemCode {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::StayArm),
            1 => Some(Self::AwayArm),
            2 => Some(Self::NightArm),
            3 => Some(Self::Disarmed),
            4 => Some(Self::AlarmTriggered),
            _ => None,
        }
    }
}

impl From<AreaState> for SecuritySystemCode {
    fn from(state: AreaState) -> Self {
        match state {
            AreaState::Armed => SecuritySystemCode::AwayArm,
            AreaState::ArmedStay => SecuritySystemCode::NightArm,
            AreaState::Disarmed => SecuritySystemCode::Disarmed,
            // No dedicated code exists for either of these.
            AreaState::NotReady => SecuritySystemCode::Disarmed,
            AreaState::Triggered => SecuritySystemCode::Disarmed,
        }
    }
}

impl From<SecuritySystemCode> for AreaState {
    fn from(code: SecuritySystemCode) -> Self {
        match code {
            SecuritySystemCode::StayArm | SecuritySystemCode::NightArm => AreaState::ArmedStay,
            SecuritySystemCode::AwayArm => AreaState::Armed,
            SecuritySystemCode::Disarmed => AreaState::Disarmed,
            SecuritySystemCode::AlarmTriggered => AreaState::Triggered,
        }
    }
}

impl AreaState {
    /// Inverse mapping for a raw code written by the hub. Unknown codes
    /// disarm.
    pub fn from_code(raw: u8) -> Self {
        SecuritySystemCode::from_raw(raw)
            .map(AreaState::from)
            .unwrap_or(AreaState::Disarmed)
    }
}

/// Panel action that moves an area towards `requested`.
pub fn action_for(requested: AreaState) -> AreaAction {
    match requested {
        AreaState::Armed => AreaAction::Arm,
        AreaState::ArmedStay => AreaAction::Stay,
        _ => AreaAction::Disarm,
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct SecurityStatePair {
    /// Last state observed on the panel (or optimistically assumed after a
    /// successful write).
    pub current: AreaState,
    /// Last state requested.
    pub target: AreaState,
}

impl SecurityStatePair {
    pub fn new(initial: AreaState) -> Self {
        let mut pair = Self {
            current: AreaState::Disarmed,
            target: AreaState::Disarmed,
        };
        pair.observe(initial);
        pair
    }

    /// Accept an observed panel state. "Not ready" has no target
    /// representation, so the requested target survives it.
    pub fn observe(&mut self, observed: AreaState) {
        self.current = observed;
        if observed != AreaState::NotReady {
            self.target = observed;
        }
    }
}

pub struct SecurityReconciler<T>
where
    T: OlarmApiTrait,
{
    client: Arc<CachedOlarmClient<T>>,
    area: AreaRef,
    min_refresh: Duration,
    state: Mutex<SecurityStatePair>,
}

impl<T> SecurityReconciler<T>
where
    T: OlarmApiTrait + Send + Sync,
{
    pub fn new(
        client: Arc<CachedOlarmClient<T>>,
        area: AreaRef,
        min_refresh: Duration,
        initial: AreaState,
    ) -> Self {
        Self {
            client,
            area,
            min_refresh,
            state: Mutex::new(SecurityStatePair::new(initial)),
        }
    }

    /// Pull the latest snapshot through the cache and fold it in. The
    /// snapshot is handed back so the rest of a tick reads the same data.
    pub async fn refresh(&self) -> Result<(SecurityStatePair, AreaSnapshot)> {
        let snapshot = self.client.get_current(self.min_refresh).await?;
        let pair = self.observe(&snapshot).await;
        Ok((pair, snapshot))
    }

    pub async fn observe(&self, snapshot: &AreaSnapshot) -> SecurityStatePair {
        let mut pair = self.state.lock().await;
        info!(
            "GET CurrentState ({}) from {} to {} (target: {})",
            self.area.area_name, pair.current, snapshot.area_state, pair.target
        );
        pair.observe(snapshot.area_state);
        *pair
    }

    pub async fn state(&self) -> SecurityStatePair {
        *self.state.lock().await
    }

    /// Send the matching area action and, once Olarm accepted it, assume the
    /// panel is already in the requested state.
    pub async fn request_target(&self, requested: AreaState) -> Result<SecurityStatePair> {
        let mut pair = self.state.lock().await;
        let action = action_for(requested);
        info!(
            "SET TargetState ({}) from {} to {} with {:?}",
            self.area.area_name, pair.target, requested, action
        );

        self.client.set_area(&self.area, action).await?;

        pair.target = requested;
        pair.current = requested;
        info!(" - (SET) Updated {} to {}", self.area.area_name, requested);
        Ok(*pair)
    }
}

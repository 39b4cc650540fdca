//! Garage door driven by a single momentary PGM output.
//!
//! The panel can only pulse the relay, so the door position is inferred:
//!
//! ```text
//!            pulse                    delay elapsed
//!  Closed ───────────► Opening ─────────────────────► Open
//!    ▲                  │   ▲                          │
//!    │    delay elapsed │   │ reversal                 │ pulse
//!    └──────────── Closing ◄┴──────────────────────────┘
//! ```
//!
//! The zone contact on the door is authoritative while the door is at rest.
//! While it is moving the completion timer is trusted, unless neither the
//! zone nor the transition itself has changed for [`STALE_ZONE_AFTER`], in
//! which case the door is settled to whatever the zone says.

use crate::config::GarageDoorSettings;
use crate::error::{BridgeError, Result};
use crate::olarm_api::cached_olarm_client::CachedOlarmClient;
use crate::olarm_api::models::area::{AreaRef, AreaSnapshot, ZoneState};
use crate::olarm_api::models::request::actions_request::PgmCommand;
use crate::olarm_api::olarm_client::OlarmApiTrait;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const STALE_ZONE_AFTER: Duration = Duration::from_secs(60);

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum DoorState {
    Open,
    Closed,
    Opening,
    Closing,
    /// Not driven by anything yet, reserved for a stop command.
    Stopped,
}

impl DoorState {
    /// What a zone contact reading says about the door.
    pub fn from_zone(zone: &ZoneState) -> Self {
        match zone {
            ZoneState::Active => DoorState::Open,
            ZoneState::Closed | ZoneState::Bypassed | ZoneState::Unknown(_) => DoorState::Closed,
        }
    }

    pub fn is_moving(&self) -> bool {
        matches!(self, DoorState::Opening | DoorState::Closing)
    }
}

impl Display for DoorState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DoorState::Open => "open",
            DoorState::Closed => "closed",
            DoorState::Opening => "opening",
            DoorState::Closing => "closing",
            DoorState::Stopped => "stopped",
        };
        write!(f, "{}", s)
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum DoorTarget {
    Open,
    Closed,
}

impl DoorTarget {
    fn moving(self) -> DoorState {
        match self {
            DoorTarget::Open => DoorState::Opening,
            DoorTarget::Closed => DoorState::Closing,
        }
    }

    fn settled(self) -> DoorState {
        match self {
            DoorTarget::Open => DoorState::Open,
            DoorTarget::Closed => DoorState::Closed,
        }
    }
}

impl From<DoorState> for DoorTarget {
    fn from(state: DoorState) -> Self {
        match state {
            DoorState::Open | DoorState::Opening => DoorTarget::Open,
            _ => DoorTarget::Closed,
        }
    }
}

/// How to reverse a door that is already moving.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReversalStrategy {
    /// Assume the opener reverses on its own and only flip the model.
    #[default]
    FlipWithoutPulse,
    /// Send another pulse before flipping the model.
    PulseAndFlip,
}

struct PendingTransition {
    id: u64,
    handle: JoinHandle<()>,
}

/// Holds at most one completion timer. Scheduling a new one always aborts
/// the previous one first, and a timer that fires only takes effect if it is
/// still the one in the slot.
#[derive(Default)]
pub struct TransitionSlot {
    pending: Option<PendingTransition>,
    next_id: u64,
}

impl TransitionSlot {
    pub fn schedule<F>(&mut self, spawn: F)
    where
        F: FnOnce(u64) -> JoinHandle<()>,
    {
        self.cancel();
        self.next_id += 1;
        let id = self.next_id;
        self.pending = Some(PendingTransition {
            id,
            handle: spawn(id),
        });
    }

    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                pending.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Called by the timer itself. Returns false if it has been superseded.
    fn complete(&mut self, id: u64) -> bool {
        match &self.pending {
            Some(pending) if pending.id == id => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Drop for TransitionSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct DoorInner {
    current: DoorState,
    target: DoorTarget,
    transition: TransitionSlot,
    /// Epoch ms at which the current movement was started or reversed.
    moving_since_ms: i64,
}

impl DoorInner {
    fn settle(&mut self, observed: DoorState) {
        self.transition.cancel();
        self.current = observed;
        self.target = observed.into();
    }
}

pub struct GarageDoor<T>
where
    T: OlarmApiTrait,
{
    client: Arc<CachedOlarmClient<T>>,
    area: AreaRef,
    settings: GarageDoorSettings,
    inner: Arc<Mutex<DoorInner>>,
}

impl<T> GarageDoor<T>
where
    T: OlarmApiTrait + Send + Sync,
{
    pub fn new(
        client: Arc<CachedOlarmClient<T>>,
        area: AreaRef,
        settings: GarageDoorSettings,
    ) -> Self {
        Self {
            client,
            area,
            settings,
            inner: Arc::new(Mutex::new(DoorInner {
                current: DoorState::Closed,
                target: DoorTarget::Closed,
                transition: TransitionSlot::default(),
                moving_since_ms: 0,
            })),
        }
    }

    pub async fn current_state(&self) -> DoorState {
        self.inner.lock().await.current
    }

    pub async fn target_state(&self) -> DoorTarget {
        self.inner.lock().await.target
    }

    pub async fn has_pending_transition(&self) -> bool {
        self.inner.lock().await.transition.is_pending()
    }

    /// Move the door towards `target`. The pulse is sent before the model
    /// changes, so a failed pulse leaves the door where it was. `now_ms` is
    /// wall clock epoch milliseconds, the same clock `observe` gets.
    pub async fn request_target_state(&self, target: DoorTarget, now_ms: i64) -> Result<DoorState> {
        let mut door = self.inner.lock().await;
        match (door.current, target) {
            (DoorState::Closed, DoorTarget::Open) | (DoorState::Open, DoorTarget::Closed) => {
                self.pulse().await?;
                info!(
                    "Garage door ({}) {} -> {}",
                    self.area.area_name,
                    door.current,
                    target.moving()
                );
                door.target = target;
                door.current = target.moving();
                door.moving_since_ms = now_ms;
                self.schedule_completion(&mut door, target);
            }
            (DoorState::Opening, DoorTarget::Closed) | (DoorState::Closing, DoorTarget::Open) => {
                if self.settings.reversal == ReversalStrategy::PulseAndFlip {
                    self.pulse().await?;
                }
                info!(
                    "Garage door ({}) reversing {} -> {}",
                    self.area.area_name,
                    door.current,
                    target.moving()
                );
                door.transition.cancel();
                door.target = target;
                door.current = target.moving();
                door.moving_since_ms = now_ms;
                self.schedule_completion(&mut door, target);
            }
            (current, _) => {
                debug!(
                    "Garage door ({}) is {}, ignoring request for {:?}",
                    self.area.area_name, current, target
                );
            }
        }
        Ok(door.current)
    }

    /// Fold the door zone from a fresh snapshot into the model. `now_ms` is
    /// wall clock epoch milliseconds, comparable to zone stamps.
    pub async fn observe(&self, snapshot: &AreaSnapshot, now_ms: i64) -> Result<(DoorState, DoorTarget)> {
        let (zone_state, zone_stamp) = snapshot.zone(self.settings.zone).ok_or_else(|| {
            BridgeError::config(format!(
                "garage door zone {} is out of range, area {} reports {} zones",
                self.settings.zone,
                snapshot.area_name,
                snapshot.zones.len()
            ))
        })?;
        let observed = DoorState::from_zone(zone_state);

        let mut door = self.inner.lock().await;
        if door.current.is_moving() {
            // a zone that last fired long before the pulse says nothing
            // about this movement yet
            let quiet_ms = now_ms - zone_stamp.max(door.moving_since_ms);
            if quiet_ms > STALE_ZONE_AFTER.as_millis() as i64 {
                warn!(
                    "Garage door ({}) {} but zone {} has not changed for {}s, settling to {}",
                    self.area.area_name,
                    door.current,
                    self.settings.zone,
                    quiet_ms / 1000,
                    observed
                );
                door.settle(observed);
            } else {
                debug!(
                    "Garage door ({}) still {}, zone reads {}",
                    self.area.area_name, door.current, observed
                );
            }
        } else {
            if door.current != observed {
                info!(
                    "Garage door ({}) sensor moved it from {} to {}",
                    self.area.area_name, door.current, observed
                );
            }
            door.settle(observed);
        }
        Ok((door.current, door.target))
    }

    async fn pulse(&self) -> Result<()> {
        self.client
            .set_pgm(&self.area, self.settings.pgm_channel, PgmCommand::Pulse)
            .await
    }

    fn schedule_completion(&self, door: &mut DoorInner, target: DoorTarget) {
        let inner = self.inner.clone();
        let delay = self.settings.delay;
        let area_name = self.area.area_name.clone();
        door.transition.schedule(move |id| {
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let mut door = inner.lock().await;
                if door.transition.complete(id) {
                    info!(
                        "Garage door ({}) {} -> {}",
                        area_name,
                        door.current,
                        target.settled()
                    );
                    door.current = target.settled();
                }
            })
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::olarm_api::models::area::AreaState;
    use crate::olarm_api::olarm_client::mock::{MockOlarm, snapshot};

    const DOOR_ZONE: usize = 4;
    const DELAY: Duration = Duration::from_secs(10);
    const NOW_MS: i64 = 1_000_000;

    fn door(mock: &Arc<MockOlarm>, strategy: ReversalStrategy) -> GarageDoor<Arc<MockOlarm>> {
        let client = Arc::new(CachedOlarmClient::new(
            mock.clone(),
            "House",
            Duration::from_secs(60),
        ));
        GarageDoor::new(
            client,
            snapshot(AreaState::Disarmed).area_ref(),
            GarageDoorSettings {
                zone: DOOR_ZONE,
                pgm_channel: 2,
                delay: DELAY,
                reversal: strategy,
            },
        )
    }

    fn zone_reading(state: ZoneState, stamp: i64) -> AreaSnapshot {
        let mut s = snapshot(AreaState::Disarmed);
        s.zones[DOOR_ZONE - 1] = state;
        s.zones_stamp[DOOR_ZONE - 1] = stamp;
        s
    }

    async fn sleep(d: Duration) {
        tokio::time::sleep(d).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_pulses_once_and_completes() {
        let mock = Arc::new(MockOlarm::default());
        let door = door(&mock, ReversalStrategy::default());

        let state = door.request_target_state(DoorTarget::Open, NOW_MS).await.unwrap();
        assert_eq!(state, DoorState::Opening);
        assert_eq!(door.target_state().await, DoorTarget::Open);
        assert_eq!(mock.pulse_count(), 1);
        assert_eq!(*mock.pgm_commands.lock().unwrap(), vec![(2, PgmCommand::Pulse)]);

        sleep(DELAY + Duration::from_millis(1)).await;
        assert_eq!(door.current_state().await, DoorState::Open);
        assert!(!door.has_pending_transition().await);
        assert_eq!(mock.pulse_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_from_open() {
        let mock = Arc::new(MockOlarm::default());
        let door = door(&mock, ReversalStrategy::default());
        door.observe(&zone_reading(ZoneState::Active, NOW_MS), NOW_MS)
            .await
            .unwrap();
        assert_eq!(door.current_state().await, DoorState::Open);

        let state = door.request_target_state(DoorTarget::Closed, NOW_MS).await.unwrap();
        assert_eq!(state, DoorState::Closing);
        sleep(DELAY + Duration::from_millis(1)).await;
        assert_eq!(door.current_state().await, DoorState::Closed);
        assert_eq!(mock.pulse_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reversal_cancels_timer_without_pulse() {
        let mock = Arc::new(MockOlarm::default());
        let door = door(&mock, ReversalStrategy::FlipWithoutPulse);

        door.request_target_state(DoorTarget::Open, NOW_MS).await.unwrap();
        sleep(Duration::from_secs(4)).await;

        let state = door.request_target_state(DoorTarget::Closed, NOW_MS).await.unwrap();
        assert_eq!(state, DoorState::Closing);
        assert_eq!(door.target_state().await, DoorTarget::Closed);
        assert_eq!(mock.pulse_count(), 1);

        // The first opening timer would have fired here.
        sleep(Duration::from_secs(7)).await;
        assert_eq!(door.current_state().await, DoorState::Closing);

        sleep(Duration::from_secs(4)).await;
        assert_eq!(door.current_state().await, DoorState::Closed);
        assert_eq!(mock.pulse_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pulse_and_flip_strategy_pulses_on_reversal() {
        let mock = Arc::new(MockOlarm::default());
        let door = door(&mock, ReversalStrategy::PulseAndFlip);

        door.request_target_state(DoorTarget::Open, NOW_MS).await.unwrap();
        door.request_target_state(DoorTarget::Closed, NOW_MS).await.unwrap();
        assert_eq!(door.current_state().await, DoorState::Closing);
        assert_eq!(mock.pulse_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_redundant_requests_are_ignored() {
        let mock = Arc::new(MockOlarm::default());
        let door = door(&mock, ReversalStrategy::default());

        door.request_target_state(DoorTarget::Closed, NOW_MS).await.unwrap();
        assert_eq!(mock.pulse_count(), 0);

        door.request_target_state(DoorTarget::Open, NOW_MS).await.unwrap();
        door.request_target_state(DoorTarget::Open, NOW_MS).await.unwrap();
        assert_eq!(mock.pulse_count(), 1);
        assert_eq!(door.current_state().await, DoorState::Opening);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_pulse_leaves_door_closed() {
        let mock = Arc::new(MockOlarm::default());
        mock.set_failing(true);
        let door = door(&mock, ReversalStrategy::default());

        let err = door.request_target_state(DoorTarget::Open, NOW_MS).await.unwrap_err();
        assert!(matches!(err, BridgeError::Remote(_)));
        assert_eq!(door.current_state().await, DoorState::Closed);
        assert_eq!(door.target_state().await, DoorTarget::Closed);
        assert!(!door.has_pending_transition().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_zone_force_settles_moving_door() {
        let mock = Arc::new(MockOlarm::default());
        let door = door(&mock, ReversalStrategy::default());
        door.request_target_state(DoorTarget::Open, NOW_MS - 61_000)
            .await
            .unwrap();

        let stale = zone_reading(ZoneState::Closed, NOW_MS - 3_600_000);
        let (state, target) = door.observe(&stale, NOW_MS).await.unwrap();
        assert_eq!(state, DoorState::Closed);
        assert_eq!(target, DoorTarget::Closed);
        assert!(!door.has_pending_transition().await);

        // The cancelled completion must not reopen the door.
        sleep(DELAY * 2).await;
        assert_eq!(door.current_state().await, DoorState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_movement_after_long_rest_is_not_stale() {
        let mock = Arc::new(MockOlarm::default());
        let door = door(&mock, ReversalStrategy::default());
        let rested = zone_reading(ZoneState::Closed, NOW_MS - 3_600_000);
        door.observe(&rested, NOW_MS).await.unwrap();

        door.request_target_state(DoorTarget::Open, NOW_MS).await.unwrap();
        let (state, target) = door.observe(&rested, NOW_MS + 2_000).await.unwrap();
        assert_eq!(state, DoorState::Opening);
        assert_eq!(target, DoorTarget::Open);
        assert!(door.has_pending_transition().await);

        // a second press while it opens is a no-op, not another pulse
        door.request_target_state(DoorTarget::Open, NOW_MS + 3_000)
            .await
            .unwrap();
        assert_eq!(mock.pulse_count(), 1);

        // a full minute into the movement with no zone update it is stale
        let (state, _) = door.observe(&rested, NOW_MS + 61_000).await.unwrap();
        assert_eq!(state, DoorState::Closed);
        assert!(!door.has_pending_transition().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reversal_while_closing() {
        let mock = Arc::new(MockOlarm::default());
        let door = door(&mock, ReversalStrategy::FlipWithoutPulse);
        door.observe(&zone_reading(ZoneState::Active, NOW_MS), NOW_MS)
            .await
            .unwrap();

        door.request_target_state(DoorTarget::Closed, NOW_MS).await.unwrap();
        sleep(Duration::from_secs(4)).await;
        let state = door.request_target_state(DoorTarget::Open, NOW_MS + 4_000)
            .await
            .unwrap();
        assert_eq!(state, DoorState::Opening);
        assert_eq!(door.target_state().await, DoorTarget::Open);
        assert_eq!(mock.pulse_count(), 1);
        assert!(door.has_pending_transition().await);

        // the closing timer would have fired at 10s
        sleep(Duration::from_secs(7)).await;
        assert_eq!(door.current_state().await, DoorState::Opening);

        sleep(Duration::from_secs(4)).await;
        assert_eq!(door.current_state().await, DoorState::Open);
        assert_eq!(mock.pulse_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_while_closing_is_ignored() {
        let mock = Arc::new(MockOlarm::default());
        let door = door(&mock, ReversalStrategy::default());
        door.observe(&zone_reading(ZoneState::Active, NOW_MS), NOW_MS)
            .await
            .unwrap();

        door.request_target_state(DoorTarget::Closed, NOW_MS).await.unwrap();
        let state = door.request_target_state(DoorTarget::Closed, NOW_MS + 1_000)
            .await
            .unwrap();
        assert_eq!(state, DoorState::Closing);
        assert_eq!(mock.pulse_count(), 1);
        assert!(door.has_pending_transition().await);

        sleep(DELAY + Duration::from_millis(1)).await;
        assert_eq!(door.current_state().await, DoorState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_door_ignores_requests() {
        let mock = Arc::new(MockOlarm::default());
        let door = door(&mock, ReversalStrategy::default());
        door.inner.lock().await.current = DoorState::Stopped;

        for target in [DoorTarget::Open, DoorTarget::Closed] {
            let state = door.request_target_state(target, NOW_MS).await.unwrap();
            assert_eq!(state, DoorState::Stopped);
        }
        assert_eq!(mock.pulse_count(), 0);
        assert!(!door.has_pending_transition().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_door_is_settled_by_sensor() {
        let mock = Arc::new(MockOlarm::default());
        let door = door(&mock, ReversalStrategy::default());
        door.inner.lock().await.current = DoorState::Stopped;

        let (state, target) = door
            .observe(&zone_reading(ZoneState::Active, NOW_MS), NOW_MS)
            .await
            .unwrap();
        assert_eq!(state, DoorState::Open);
        assert_eq!(target, DoorTarget::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recent_zone_leaves_moving_door_alone() {
        let mock = Arc::new(MockOlarm::default());
        let door = door(&mock, ReversalStrategy::default());
        door.request_target_state(DoorTarget::Open, NOW_MS).await.unwrap();

        let recent = zone_reading(ZoneState::Closed, NOW_MS - 5_000);
        let (state, target) = door.observe(&recent, NOW_MS).await.unwrap();
        assert_eq!(state, DoorState::Opening);
        assert_eq!(target, DoorTarget::Open);
        assert!(door.has_pending_transition().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sensor_is_authoritative_at_rest() {
        let mock = Arc::new(MockOlarm::default());
        let door = door(&mock, ReversalStrategy::default());

        let (state, target) = door
            .observe(&zone_reading(ZoneState::Active, NOW_MS - 600_000), NOW_MS)
            .await
            .unwrap();
        assert_eq!(state, DoorState::Open);
        assert_eq!(target, DoorTarget::Open);

        let (state, target) = door
            .observe(&zone_reading(ZoneState::Bypassed, NOW_MS), NOW_MS)
            .await
            .unwrap();
        assert_eq!(state, DoorState::Closed);
        assert_eq!(target, DoorTarget::Closed);
        assert_eq!(mock.pulse_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_door_zone_is_a_configuration_error() {
        let mock = Arc::new(MockOlarm::default());
        let door = door(&mock, ReversalStrategy::default());
        let mut s = snapshot(AreaState::Disarmed);
        s.zones.truncate(2);
        s.zones_stamp.truncate(2);

        assert!(matches!(
            door.observe(&s, NOW_MS).await,
            Err(BridgeError::Configuration(_))
        ));
    }

    #[test]
    fn test_zone_to_door_state() {
        assert_eq!(DoorState::from_zone(&ZoneState::Active), DoorState::Open);
        assert_eq!(DoorState::from_zone(&ZoneState::Closed), DoorState::Closed);
        assert_eq!(DoorState::from_zone(&ZoneState::Bypassed), DoorState::Closed);
        assert_eq!(
            DoorState::from_zone(&ZoneState::Unknown("z".to_string())),
            DoorState::Closed
        );
    }
}

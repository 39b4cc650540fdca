use crate::error::{BridgeError, Result};
use crate::olarm_api::models::area::AreaSnapshot;
use std::time::Duration;
use tracing::{debug, info};

/// A zone is considered occupied when it last changed within `delay` of the
/// device's own last update. There is no direct occupancy signal from the
/// panel, this only says the zone fired recently.
pub fn is_occupied(zone_number: usize, snapshot: &AreaSnapshot, delay: Duration) -> Result<bool> {
    let (_, zone_stamp) = snapshot.zone(zone_number).ok_or_else(|| {
        BridgeError::config(format!(
            "zone {} is out of range, area {} reports {} zones",
            zone_number,
            snapshot.area_name,
            snapshot.zones.len()
        ))
    })?;

    debug!(
        "Zone Occupancy check for zone: {} ZoneStamp: {} DeviceStamp: {}",
        zone_number, zone_stamp, snapshot.device_timestamp
    );
    let difference_ms = snapshot.device_timestamp - zone_stamp;
    let occupied = difference_ms < delay.as_millis() as i64;
    info!(
        "GET ZoneState for Zone {} Set to {}",
        zone_number,
        if occupied {
            "OCCUPANCY_DETECTED"
        } else {
            "OCCUPANCY_NOT_DETECTED"
        }
    );
    Ok(occupied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::olarm_api::models::area::AreaState;
    use crate::olarm_api::olarm_client::mock::snapshot;

    fn with_stamp(zone: usize, stamp: i64) -> AreaSnapshot {
        let mut s = snapshot(AreaState::Disarmed);
        s.device_timestamp = 100_000;
        s.zones_stamp[zone - 1] = stamp;
        s
    }

    #[test]
    fn test_recent_zone_is_occupied() {
        let s = with_stamp(3, 99_000);
        assert!(is_occupied(3, &s, Duration::from_millis(5_000)).unwrap());
    }

    #[test]
    fn test_zone_outside_window_is_not_occupied() {
        let s = with_stamp(3, 99_000);
        assert!(!is_occupied(3, &s, Duration::from_millis(500)).unwrap());
    }

    #[test]
    fn test_window_is_exclusive() {
        let s = with_stamp(1, 95_000);
        assert!(!is_occupied(1, &s, Duration::from_millis(5_000)).unwrap());
        assert!(is_occupied(1, &s, Duration::from_millis(5_001)).unwrap());
    }

    #[test]
    fn test_out_of_range_zone_is_a_configuration_error() {
        let s = with_stamp(1, 99_000);
        assert!(matches!(
            is_occupied(9, &s, Duration::from_secs(5)),
            Err(BridgeError::Configuration(_))
        ));
        assert!(is_occupied(0, &s, Duration::from_secs(5)).is_err());
    }
}

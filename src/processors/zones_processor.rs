use crate::accessory::AreaStatus;
use crate::accessory::garage_door::DoorState;
use crate::home_assistant::availability::Availability;
use crate::home_assistant::binary_sensor::{BinarySensorDiscoveryPayload, Device, occupancy_payload};
use crate::home_assistant::cover::CoverDiscoveryPayload;
use crate::processors::{AreaStatusProcessor, ProcessorState};
use rumqttc::QoS;
use std::sync::Arc;
use tracing::{error, trace};

/// Publishes per-zone occupancy sensors and the garage door cover.
#[derive(Clone)]
pub struct ZonesProcessor {
    pub ha_client: rumqttc::AsyncClient,
}

impl ZonesProcessor {
    pub async fn handle_occupancy_sensor(
        &self,
        zone_number: usize,
        occupied: bool,
        processor_state: &ProcessorState,
    ) -> anyhow::Result<()> {
        let area = &processor_state.area;
        let unique_id = Self::build_occupancy_unique_id(processor_state, zone_number);
        let state_topic = processor_state.topics.zone_occupancy(zone_number);

        if processor_state.published_discovery.insert(unique_id.clone()) {
            let discovery_object = BinarySensorDiscoveryPayload {
                device: Device::for_area(area),
                device_class: "occupancy".to_string(),
                name: format!("Zone {} Sensor", zone_number),
                payload_off: occupancy_payload(false).to_string(),
                payload_on: occupancy_payload(true).to_string(),
                state_topic: state_topic.clone(),
                unique_id: unique_id.clone(),
                json_attributes_topic: None,
                availability: Some(vec![Availability::online_offline(
                    &processor_state.topics.availability(),
                )]),
                availability_mode: None, //defaults to "latest"
            };
            let discovery_payload = serde_json::to_string(&discovery_object)?;
            trace!("{}", discovery_payload);

            let discovery_topic = format!(
                "{}/binary_sensor/{}/config",
                processor_state.discovery_prefix, unique_id
            );
            self.ha_client
                .publish(&discovery_topic, QoS::AtLeastOnce, true, discovery_payload)
                .await?;
        }

        self.ha_client
            .publish(&state_topic, QoS::AtMostOnce, true, occupancy_payload(occupied))
            .await?;
        Ok(())
    }

    pub async fn handle_garage_door(
        &self,
        door_state: DoorState,
        processor_state: &ProcessorState,
    ) -> anyhow::Result<()> {
        let topics = &processor_state.topics;
        let unique_id = Self::build_garage_unique_id(processor_state);

        if processor_state.published_discovery.insert(unique_id.clone()) {
            let discovery_object = CoverDiscoveryPayload::garage(
                Device::for_area(&processor_state.area),
                format!("{} Garage Door", processor_state.area.area_name),
                unique_id.clone(),
                topics.garage_command(),
                topics.garage_state(),
                vec![Availability::online_offline(&topics.availability())],
            );
            let discovery_payload = serde_json::to_string(&discovery_object)?;
            trace!("{}", discovery_payload);

            let discovery_topic = format!(
                "{}/cover/{}/config",
                processor_state.discovery_prefix, unique_id
            );
            self.ha_client
                .publish(&discovery_topic, QoS::AtLeastOnce, true, discovery_payload)
                .await?;
            self.ha_client
                .subscribe(topics.garage_command(), QoS::AtLeastOnce)
                .await?;
        }

        self.ha_client
            .publish(topics.garage_state(), QoS::AtMostOnce, true, door_state.to_string())
            .await?;
        Ok(())
    }

    fn build_occupancy_unique_id(processor_state: &ProcessorState, zone_number: usize) -> String {
        format!(
            "{}_{}_zone_{}_occupancy",
            processor_state.area.device_id, processor_state.area.area_number, zone_number
        )
    }

    fn build_garage_unique_id(processor_state: &ProcessorState) -> String {
        format!(
            "{}_{}_garage",
            processor_state.area.device_id, processor_state.area.area_number
        )
    }
}

impl AreaStatusProcessor for ZonesProcessor {
    async fn handle(&self, status: &AreaStatus, processor_state: Arc<ProcessorState>) -> anyhow::Result<()> {
        for (zone_number, occupied) in &status.occupancy {
            if let Err(e) = self
                .handle_occupancy_sensor(*zone_number, *occupied, &processor_state)
                .await
            {
                error!("Error processing zone {}: {:?}", zone_number, e);
                return Err(e);
            }
        }

        if let Some((door_state, _)) = status.door {
            self.handle_garage_door(door_state, &processor_state).await?;
        }
        Ok(())
    }
}

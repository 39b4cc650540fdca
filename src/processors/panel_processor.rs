use crate::accessory::AreaStatus;
use crate::accessory::security::SecuritySystemCode;
use crate::home_assistant::alarm_control_panel::{
    AlarmControlPanelDiscoveryPayload, AlarmFeature, AlarmState, PAYLOAD_ARM_AWAY,
    PAYLOAD_ARM_HOME, PAYLOAD_ARM_NIGHT, PAYLOAD_DISARM,
};
use crate::home_assistant::availability::{Availability, AvailabilityState};
use crate::home_assistant::device::Device;
use crate::processors::{AreaStatusProcessor, ProcessorState};
use rumqttc::QoS;
use std::sync::Arc;
use tracing::trace;

#[derive(Clone)]
pub struct PanelProcessor {
    pub ha_client: rumqttc::AsyncClient,
}

impl PanelProcessor {
    fn build_unique_id(processor_state: &ProcessorState) -> String {
        format!(
            "olarm_{}_area_{}",
            processor_state.area.device_id, processor_state.area.area_number
        )
    }

    async fn publish_discovery(&self, processor_state: &ProcessorState) -> anyhow::Result<()> {
        let unique_id = Self::build_unique_id(processor_state);
        // Atomically check-and-insert without holding a lock across .await
        if !processor_state.published_discovery.insert(unique_id.clone()) {
            return Ok(());
        }

        let topics = &processor_state.topics;
        let discovery_topic = format!(
            "{}/alarm_control_panel/{}/config",
            processor_state.discovery_prefix, unique_id
        );
        let discovery_object = AlarmControlPanelDiscoveryPayload {
            device: Device::for_area(&processor_state.area),
            name: format!("Olarm {}", processor_state.area.area_name),
            unique_id,
            state_topic: topics.security_state(),
            command_topic: topics.security_command(),
            payload_arm_away: PAYLOAD_ARM_AWAY.to_string(),
            payload_arm_home: PAYLOAD_ARM_HOME.to_string(),
            payload_arm_night: PAYLOAD_ARM_NIGHT.to_string(),
            payload_disarm: PAYLOAD_DISARM.to_string(),
            code_arm_required: Some(false),
            code_disarm_required: Some(false),
            json_attributes_topic: None,
            availability: Some(vec![Availability::online_offline(&topics.availability())]),
            availability_mode: None, //defaults to "latest"
            supported_features: Some(vec![
                AlarmFeature::ArmAway,
                AlarmFeature::ArmHome,
                AlarmFeature::ArmNight,
            ]),
        };
        let discovery_payload = serde_json::to_string(&discovery_object)?;
        trace!("{}", discovery_payload);

        self.ha_client
            .publish(&discovery_topic, QoS::AtLeastOnce, true, discovery_payload)
            .await?;
        self.ha_client
            .subscribe(topics.security_command(), QoS::AtLeastOnce)
            .await?;
        Ok(())
    }

    pub async fn publish_security_state(
        &self,
        code: SecuritySystemCode,
        processor_state: &ProcessorState,
    ) -> anyhow::Result<()> {
        self.ha_client
            .publish(
                processor_state.topics.security_state(),
                QoS::AtMostOnce,
                true,
                AlarmState::from(code).as_serde_value(),
            )
            .await?;
        Ok(())
    }

    pub async fn publish_availability(
        &self,
        availability: AvailabilityState,
        processor_state: &ProcessorState,
    ) -> anyhow::Result<()> {
        self.ha_client
            .publish(
                processor_state.topics.availability(),
                QoS::AtLeastOnce,
                true,
                availability.as_serde_value(),
            )
            .await?;
        Ok(())
    }
}

impl AreaStatusProcessor for PanelProcessor {
    async fn handle(&self, status: &AreaStatus, processor_state: Arc<ProcessorState>) -> anyhow::Result<()> {
        self.publish_discovery(&processor_state).await?;
        self.publish_security_state(status.current, &processor_state)
            .await?;
        self.publish_availability(AvailabilityState::Online, &processor_state)
            .await
    }
}

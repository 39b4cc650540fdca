use crate::HubCommand;
use crate::accessory::AreaAccessory;
use crate::olarm_api::olarm_client::OlarmApiTrait;
use crate::processors::ProcessorState;
use crate::processors::panel_processor::PanelProcessor;
use crate::processors::zones_processor::ZonesProcessor;
use anyhow::Context;
use std::sync::Arc;
use tracing::info;

/// Applies commands coming from Home Assistant to the area accessory and
/// publishes the state the accessory ends up in.
pub struct HaProcessor<T>
where
    T: OlarmApiTrait + Send + Sync + 'static,
{
    pub accessory: Arc<AreaAccessory<T>>,
    pub panel_processor: PanelProcessor,
    pub zones_processor: ZonesProcessor,
    pub processor_state: Arc<ProcessorState>,
}

impl<T: OlarmApiTrait + Send + Sync + 'static> HaProcessor<T> {
    pub async fn process_ha_command(&self, cmd: HubCommand) -> anyhow::Result<()> {
        info!("Processing {:?}", cmd);
        match cmd {
            HubCommand::SetSecurityTarget(code) => {
                let result = self.accessory.set_target_security_state(code).await;
                // the new state on success, the last known good one otherwise
                let pair = self.accessory.cached_security_state().await;
                self.panel_processor
                    .publish_security_state(pair.current.into(), &self.processor_state)
                    .await?;
                result.with_context(|| format!("setting security state to {:?}", code))?;
            }
            HubCommand::SetDoorTarget(target) => {
                let result = self.accessory.set_door_target_state(target).await;
                if self.accessory.has_garage_door() {
                    let door_state = self.accessory.get_door_current_state().await?;
                    self.zones_processor
                        .handle_garage_door(door_state, &self.processor_state)
                        .await?;
                }
                result.with_context(|| format!("moving garage door to {:?}", target))?;
            }
        }
        Ok(())
    }
}

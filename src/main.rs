use tracing::{debug, error, info, trace, warn};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt};

use dashmap::DashSet;
use olarm_garage_bridge::accessory::AreaAccessory;
use olarm_garage_bridge::config::Config;
use olarm_garage_bridge::home_assistant::availability::AvailabilityState;
use olarm_garage_bridge::olarm_api::olarm_client::OlarmClient;
use olarm_garage_bridge::processors::ha_processor::HaProcessor;
use olarm_garage_bridge::processors::panel_processor::PanelProcessor;
use olarm_garage_bridge::processors::zones_processor::ZonesProcessor;
use olarm_garage_bridge::processors::{
    AreaStatusProcessor, AreaTopics, ProcessorState, command_topic_parser,
};
use olarm_garage_bridge::HubCommand;
use rumqttc::{AsyncClient, Event, LastWill, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::Duration;
use tokio::join;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::util::SubscriberInitExt;

const HA_RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_file("config.toml").or_else(|e| {
        println!("Could not load config.toml ({:#}). Writing example config.toml.example...", e);
        Config::save_example("config.toml.example")?;
        println!("Please copy it to config.toml, edit your settings and restart the application.");
        Err(e)
    })?;

    // Directory for logs
    let log_dir = &config.logging.directory;

    // One file per level
    let debug_file = rolling::daily(log_dir, &config.logging.debug_file);
    let info_file = rolling::daily(log_dir, &config.logging.info_file);
    let warn_file = rolling::daily(log_dir, &config.logging.warn_file);
    let error_file = rolling::daily(log_dir, &config.logging.error_file);

    let debug_layer = fmt::layer()
        .with_writer(debug_file)
        .with_ansi(false)
        .with_filter(EnvFilter::new("debug"));

    let info_layer = fmt::layer()
        .with_writer(info_file)
        .with_ansi(false)
        .with_filter(tracing_subscriber::filter::LevelFilter::INFO);

    let warn_layer = fmt::layer()
        .with_writer(warn_file)
        .with_ansi(false)
        .with_filter(tracing_subscriber::filter::LevelFilter::WARN);

    let error_layer = fmt::layer()
        .with_writer(error_file)
        .with_ansi(false)
        .with_filter(tracing_subscriber::filter::LevelFilter::ERROR);

    let console_layer = fmt::layer()
        .pretty()
        .with_filter(EnvFilter::new(&config.logging.console_level));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(debug_layer)
        .with(info_layer)
        .with(warn_layer)
        .with(error_layer)
        .init();

    // A bad area name or zone fails here, before anything is published.
    let olarm_client = OlarmClient::new(&config.olarm.api_token, config.olarm.request_timeout())?;
    let accessory = Arc::new(AreaAccessory::connect(olarm_client, &config.area).await?);

    let topics = AreaTopics::new(&config.area.name);
    let mut ha_options = MqttOptions::new(
        &config.home_assistant.client_id,
        &config.home_assistant.mqtt_host,
        config.home_assistant.mqtt_port,
    );
    ha_options.set_credentials(
        &config.home_assistant.mqtt_username,
        &config.home_assistant.mqtt_password,
    );
    ha_options.set_keep_alive(Duration::from_secs(30));
    ha_options.set_last_will(LastWill::new(
        topics.availability(),
        AvailabilityState::Offline.as_serde_value(),
        QoS::AtLeastOnce,
        true,
    ));
    let (ha_client, mut ha_eventloop) = AsyncClient::new(ha_options, config.limits.mqtt_queue_size);

    let published_discovery = Arc::new(DashSet::new());
    let processor_state = Arc::new(ProcessorState {
        area: accessory.area().clone(),
        topics: topics.clone(),
        discovery_prefix: config.home_assistant.discovery_prefix.clone(),
        published_discovery: published_discovery.clone(),
    });
    let panel_processor = PanelProcessor {
        ha_client: ha_client.clone(),
    };
    let zones_processor = ZonesProcessor {
        ha_client: ha_client.clone(),
    };

    let (tx, mut rx) = mpsc::channel::<HubCommand>(config.limits.command_channel_size);

    // Run HA event loop in background
    let ha_published_discovery = published_discovery.clone();
    tokio::spawn(async move {
        loop {
            match ha_eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(p))) => {
                    let payload = String::from_utf8_lossy(&p.payload).to_string();
                    match command_topic_parser(&p.topic, &payload, &topics) {
                        None => {
                            warn!("Ignoring {:?} on topic {:?}", payload, p.topic);
                        }
                        Some(command) => {
                            if let Err(e) = tx.send(command).await {
                                error!("Failed to send command: {:?}", e);
                            }
                        }
                    }
                }
                Ok(event) => {
                    trace!("{:?}", event);
                }
                Err(e) => {
                    error!(
                        "HA event loop failed: {:?}. Forcing rediscovery and resubscriptions",
                        e
                    );
                    ha_published_discovery.clear();
                    tokio::time::sleep(HA_RECONNECT_DELAY).await;
                }
            }
        }
    });

    let ha_processor = HaProcessor {
        accessory: accessory.clone(),
        panel_processor: panel_processor.clone(),
        zones_processor: zones_processor.clone(),
        processor_state: processor_state.clone(),
    };
    tokio::spawn(async move {
        while let Some(cmd) = rx.recv().await {
            if let Err(e) = ha_processor.process_ha_command(cmd).await {
                error!("Command processing failed: {:#}", e);
            }
        }
    });

    let mut poll_tick = tokio::time::interval(config.area.polling_interval());
    poll_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(
        "Polling area {} every {:?}",
        accessory.area().area_name,
        config.area.polling_interval()
    );
    loop {
        poll_tick.tick().await;
        let status = match accessory.tick().await {
            Ok(status) => status,
            Err(e) => {
                error!("Refreshing area {} failed: {}", accessory.area().area_name, e);
                if let Err(e) = panel_processor
                    .publish_availability(AvailabilityState::Offline, &processor_state)
                    .await
                {
                    error!("Error occurred while publishing availability: {:?}", e);
                }
                continue;
            }
        };
        debug!("{:?}", status);

        let (panel_result, zones_result) = join!(
            panel_processor.handle(&status, processor_state.clone()),
            zones_processor.handle(&status, processor_state.clone())
        );
        if let Err(e) = panel_result {
            error!("Error occurred while processing panel data: {:?}", e);
        }
        if let Err(e) = zones_result {
            error!("Error occurred while processing zone data: {:?}", e);
        }
    }
}

//! MQTT transport for telemetry and inbound config messages.

use std::time::Duration;

use log::{debug, error, info, warn};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};

use medibox_core::config::{ConfigInbox, NetworkConfig, enqueue_message};
use medibox_core::telemetry::{TelemetrySink, Topic};

/// Brokers drop the older session when two clients share an id
const CLIENT_ID_PREFIX: &str = "medibox-simulator";
const REQUEST_CAPACITY: usize = 10;
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Client id with a random 16-bit hex suffix.
fn client_id() -> String {
    format!("{CLIENT_ID_PREFIX}-{:04x}", rand::random::<u16>())
}

/// Telemetry published through a broker
pub struct MqttTelemetry {
    client: AsyncClient,
    prefix: String,
}

impl MqttTelemetry {
    /// Create the client and spawn the event loop task.
    ///
    /// The config topic is (re)subscribed on every connection and incoming
    /// messages are queued on `inbox`.
    pub fn connect(network: &NetworkConfig, inbox: &'static ConfigInbox) -> Self {
        let client_id = client_id();
        debug!("MQTT client id {}", client_id);
        let mut options = MqttOptions::new(
            client_id,
            network.broker_host.as_str(),
            network.broker_port,
        );
        options.set_keep_alive(Duration::from_secs(5));

        let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
        let prefix = network.topic_prefix.to_string();
        info!(
            "Connecting to MQTT broker {}:{}",
            network.broker_host, network.broker_port
        );

        tokio::spawn(run_eventloop(eventloop, client.clone(), prefix.clone(), inbox));

        Self { client, prefix }
    }
}

impl TelemetrySink for MqttTelemetry {
    async fn publish(&mut self, topic: Topic, payload: &str) -> bool {
        let Some(path) = topic.path(&self.prefix) else {
            error!("Topic path too long for prefix {:?}", self.prefix);
            return false;
        };

        // Never wait on a full request queue while the broker is away
        match self
            .client
            .try_publish(path.as_str(), QoS::AtMostOnce, false, payload.as_bytes())
        {
            Ok(()) => true,
            Err(e) => {
                warn!("Publish to {} failed: {}", path, e);
                false
            }
        }
    }
}

async fn run_eventloop(
    mut eventloop: EventLoop,
    client: AsyncClient,
    prefix: String,
    inbox: &'static ConfigInbox,
) {
    let Some(config_topic) = Topic::Config.path(&prefix) else {
        error!("Config topic path too long for prefix {:?}", prefix);
        return;
    };

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("MQTT connected, subscribing to {}", config_topic);
                if let Err(e) = client.try_subscribe(config_topic.as_str(), QoS::AtMostOnce) {
                    error!("Subscribe to {} failed: {}", config_topic, e);
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                if publish.topic != config_topic.as_str() {
                    debug!("Ignoring message on {}", publish.topic);
                    continue;
                }
                let message = String::from_utf8_lossy(&publish.payload);
                info!("Config message received: {}", message);
                if let Err(e) = enqueue_message(inbox, &message) {
                    warn!("Config message dropped: {}", e);
                }
            }
            Ok(_) => {}
            Err(e) => {
                error!("MQTT error: {}", e);
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

/// Telemetry that is only logged
pub struct OfflineTelemetry {
    prefix: String,
}

impl OfflineTelemetry {
    pub fn new(network: &NetworkConfig) -> Self {
        Self {
            prefix: network.topic_prefix.to_string(),
        }
    }
}

impl TelemetrySink for OfflineTelemetry {
    async fn publish(&mut self, topic: Topic, payload: &str) -> bool {
        info!("[{}/{}] {}", self.prefix, topic.leaf(), payload);
        true
    }
}

/// Either transport, chosen at startup
pub enum Telemetry {
    Mqtt(MqttTelemetry),
    Offline(OfflineTelemetry),
}

impl TelemetrySink for Telemetry {
    async fn publish(&mut self, topic: Topic, payload: &str) -> bool {
        match self {
            Telemetry::Mqtt(sink) => sink.publish(topic, payload).await,
            Telemetry::Offline(sink) => sink.publish(topic, payload).await,
        }
    }
}

//! Transport seam between the bridge and the MQTT client
//!
//! The supervisor, the publish loops and the re-subscribe path only talk to
//! [`Transport`] and [`EventSource`]. The production pair wraps rumqttc: the
//! [`AsyncClient`] carries requests and the [`EventLoop`] drives the socket,
//! including reconnects, whenever it is polled.

use super::config::{MqttConfig, BROKER_PORT, KEEP_ALIVE, WILL_PAYLOAD};
use super::error::MqttError;
use async_trait::async_trait;
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, LastWill, MqttOptions, Packet, QoS};
use tracing::{debug, trace};

/// Capacity of the request channel between client handles and the event loop
const REQUEST_CAPACITY: usize = 10;

/// What the event source reports back to the supervisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Broker accepted the session (first connect or reconnect)
    Connected,
    /// Publish received on one of our subscriptions
    Message { topic: String, payload: Vec<u8> },
    /// Broker closed the session
    Disconnected,
    /// Protocol traffic the bridge does not act on
    Other,
}

/// Write side of the broker connection
///
/// Shared by both publish loops and the re-subscribe path, so every method
/// takes `&self`. Returning from the call is the completion of the request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn publish(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: String,
    ) -> Result<(), MqttError>;

    async fn subscribe(&self, filter: &str, qos: QoS) -> Result<(), MqttError>;

    async fn unsubscribe(&self, filter: &str) -> Result<(), MqttError>;

    async fn disconnect(&self) -> Result<(), MqttError>;
}

/// Read side of the broker connection, owned by the supervisor alone
#[async_trait]
pub trait EventSource: Send {
    async fn next_event(&mut self) -> Result<TransportEvent, MqttError>;
}

pub fn mqtt_options(config: &MqttConfig) -> MqttOptions {
    let mut options = MqttOptions::new(config.id.clone(), config.broker.clone(), BROKER_PORT);
    options
        .set_keep_alive(KEEP_ALIVE)
        .set_clean_session(true)
        .set_last_will(LastWill::new(
            config.online_topic(),
            WILL_PAYLOAD,
            QoS::ExactlyOnce,
            true,
        ));

    if !config.username.is_empty() {
        options.set_credentials(config.username.clone(), config.password.clone());
    }

    options
}

/// Creates the client/event-loop pair; nothing touches the network until
/// the event loop is polled
pub fn connect(config: &MqttConfig) -> (RumqttTransport, RumqttEvents) {
    debug!(
        "Creating mqtt client {} for tcp://{}:{}",
        config.id, config.broker, BROKER_PORT
    );
    let (client, event_loop) = AsyncClient::new(mqtt_options(config), REQUEST_CAPACITY);
    (RumqttTransport { client }, RumqttEvents { event_loop })
}

#[derive(Clone)]
pub struct RumqttTransport {
    client: AsyncClient,
}

#[async_trait]
impl Transport for RumqttTransport {
    async fn publish(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: String,
    ) -> Result<(), MqttError> {
        self.client
            .publish(topic, qos, retain, payload)
            .await
            .map_err(|e| MqttError::Publish {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }

    async fn subscribe(&self, filter: &str, qos: QoS) -> Result<(), MqttError> {
        self.client
            .subscribe(filter, qos)
            .await
            .map_err(|e| MqttError::Subscribe {
                topic: filter.to_string(),
                reason: e.to_string(),
            })
    }

    async fn unsubscribe(&self, filter: &str) -> Result<(), MqttError> {
        self.client
            .unsubscribe(filter)
            .await
            .map_err(|e| MqttError::Unsubscribe {
                topic: filter.to_string(),
                reason: e.to_string(),
            })
    }

    async fn disconnect(&self) -> Result<(), MqttError> {
        self.client
            .disconnect()
            .await
            .map_err(|e| MqttError::Disconnect(e.to_string()))
    }
}

pub struct RumqttEvents {
    event_loop: EventLoop,
}

#[async_trait]
impl EventSource for RumqttEvents {
    async fn next_event(&mut self) -> Result<TransportEvent, MqttError> {
        let event = self.event_loop.poll().await?;
        Ok(classify(event))
    }
}

fn classify(event: Event) -> TransportEvent {
    match event {
        Event::Incoming(Packet::ConnAck(ack)) if ack.code == ConnectReturnCode::Success => {
            TransportEvent::Connected
        }
        Event::Incoming(Packet::Publish(publish)) => TransportEvent::Message {
            topic: publish.topic,
            payload: publish.payload.to_vec(),
        },
        Event::Incoming(Packet::Disconnect) => TransportEvent::Disconnected,
        other => {
            trace!("Ignoring mqtt event: {:?}", other);
            TransportEvent::Other
        }
    }
}

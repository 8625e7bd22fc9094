//! Connection supervisor for the broker session
//!
//! Owns the single transport connection and everything bound to its
//! lifecycle: the initial connect with fixed-interval retry, re-subscription
//! of the command tree on every (re)connect, routing of inbound commands, the
//! two status publish loops and the shutdown path.
//!
//! # State Machine
//!
//! ```text
//! Configured ──connect──► Online ──run_until_shutdown──► Stopping ──shutdown──► Stopped
//!     │                                                     ▲
//!     └────────────────────(cancelled)──────────────────────┘
//! ```
//!
//! # Tasks
//!
//! ```text
//!                       ┌─► PublishLoop <pub>volume (5s)  ─┐
//! Supervisor ─spawns────┤                                  ├─► Transport (shared)
//!     │                 └─► PublishLoop <pub>online (30s) ─┘        ▲
//!     ├─ polls EventSource ──► Dispatcher ──► Actuator              │
//!     └─ on connect ──► resubscribe task ───────────────────────────┘
//! ```

use super::backoff::Backoff;
use super::config::{
    MqttConfig, CONNECT_RETRY_INTERVAL, ONLINE_PUBLISH_PERIOD, VOLUME_PUBLISH_PERIOD,
};
use super::dispatcher::Dispatcher;
use super::message_manager::CommandMessage;
use super::publish_loop::PublishLoop;
use super::transport::{self, EventSource, Transport, TransportEvent};
use crate::device::{Actuator, StatusProvider};
use chrono::{DateTime, Local};
use rumqttc::QoS;
use statum::{machine, state};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Upper bound for flushing the DISCONNECT packet on shutdown
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Stopped,
}

/// Snapshot of the supervisor, broadcast through a watch channel
#[derive(Clone, Debug, Default)]
pub struct MqttStatus {
    pub connection_state: ConnectionState,
    /// Failed attempts of the initial connect
    pub failed_connects: usize,
    /// Successful reconnects after the session was lost
    pub reconnects: usize,
    pub messages_received: usize,
    pub last_activity: Option<DateTime<Local>>,
}

#[state]
#[derive(Debug, Clone)]
pub enum SupervisorState {
    Configured, // Options built, nothing on the wire yet
    Online,     // First connect succeeded, loops may run
    Stopping,   // Cancelled, loops winding down
    Stopped,    // Disconnected, nothing left running
}

/// Supervisor of the one broker session per process
///
/// The transport is shared with the publish loops and the re-subscribe
/// tasks. The event source is polled by the supervisor alone.
#[machine]
pub struct MqttSupervisor<S: SupervisorState> {
    config: MqttConfig,
    transport: Arc<dyn Transport>,
    events: Box<dyn EventSource>,
    dispatcher: Dispatcher,
    publishers: Vec<PublishLoop>,
    publisher_handles: Vec<JoinHandle<()>>,
    subscription_guard: Arc<Mutex<()>>,
    status: watch::Sender<MqttStatus>,
    retry_interval: Duration,
    backoff: Backoff,
    cancel: CancellationToken,
}

/// Outcome of the initial connect
pub enum ConnectOutcome {
    Online(MqttSupervisor<Online>),
    Cancelled(MqttSupervisor<Stopping>),
}

impl<S: SupervisorState> MqttSupervisor<S> {
    pub fn status_receiver(&self) -> watch::Receiver<MqttStatus> {
        self.status.subscribe()
    }

    fn connection_state(&self) -> ConnectionState {
        self.status.borrow().connection_state.clone()
    }

    fn set_state(&self, state: ConnectionState) {
        debug!("Connection state: {:?}", state);
        self.status.send_modify(|status| {
            status.connection_state = state;
            status.last_activity = Some(Local::now());
        });
    }

    fn handle_message(&self, topic: &str, payload: &[u8]) {
        let message = CommandMessage::from_raw(topic, payload);
        self.status.send_modify(|status| {
            status.messages_received += 1;
            status.last_activity = Some(message.timestamp());
        });
        self.dispatcher.dispatch(&message);
    }

    /// Runs on every connect, not only the first one
    ///
    /// The work is spawned so that subscribe requests never wait on the
    /// event loop this supervisor is about to poll again.
    fn on_connect(&self) {
        let transport = self.transport.clone();
        let guard = self.subscription_guard.clone();
        let filter = self.config.command_filter();
        tokio::spawn(async move {
            resubscribe(transport.as_ref(), &filter, &guard).await;
        });
    }
}

/// Replaces the command subscription with exactly one registration
async fn resubscribe(transport: &dyn Transport, filter: &str, guard: &Mutex<()>) {
    let _guard = guard.lock().await;

    if let Err(e) = transport.unsubscribe(filter).await {
        debug!("Unsubscribe before subscribe failed: {}", e);
    }

    match transport.subscribe(filter, QoS::AtLeastOnce).await {
        Ok(()) => {
            info!("subscribed to {:?}", filter);
            info!("connection to mqtt broker is successful");
        }
        Err(e) => error!("{}", e),
    }
}

impl MqttSupervisor<Configured> {
    pub fn create(
        config: MqttConfig,
        transport: Arc<dyn Transport>,
        events: Box<dyn EventSource>,
        actuator: Arc<dyn Actuator>,
        volume: Arc<dyn StatusProvider>,
        online: Arc<dyn StatusProvider>,
        cancel: CancellationToken,
    ) -> Self {
        info!("Creating mqtt supervisor for client {}", config.id);

        let dispatcher = Dispatcher::new(config.sub_topic.clone(), actuator);
        let publishers = vec![
            PublishLoop::new(config.volume_topic(), volume, VOLUME_PUBLISH_PERIOD),
            PublishLoop::new(config.online_topic(), online, ONLINE_PUBLISH_PERIOD),
        ];
        let (status, _) = watch::channel(MqttStatus::default());

        Self::new(
            config,
            transport,
            events,
            dispatcher,
            publishers,
            Vec::new(),
            Arc::new(Mutex::new(())),
            status,
            CONNECT_RETRY_INTERVAL,
            Backoff::default(),
            cancel,
        )
    }

    /// Connects, runs until cancelled and shuts down
    pub async fn run(self) -> MqttSupervisor<Stopped> {
        let stopping = match self.connect().await {
            ConnectOutcome::Online(online) => online.launch_publishers().run_until_shutdown().await,
            ConnectOutcome::Cancelled(stopping) => stopping,
        };
        stopping.shutdown().await
    }

    /// Polls until the broker accepts the session
    ///
    /// Every failed attempt is logged and followed by the fixed retry
    /// interval. There is no attempt limit.
    pub async fn connect(mut self) -> ConnectOutcome {
        info!("Connecting to mqtt broker {}", self.config.broker);
        self.set_state(ConnectionState::Connecting);

        loop {
            let event = tokio::select! {
                _ = self.cancel.cancelled() => None,
                event = self.events.next_event() => Some(event),
            };
            let Some(event) = event else {
                info!("Connect cancelled");
                return ConnectOutcome::Cancelled(self.transition());
            };

            match event {
                Ok(TransportEvent::Connected) => break,
                Ok(TransportEvent::Message { topic, payload }) => {
                    self.handle_message(&topic, &payload)
                }
                Ok(_) => {}
                Err(e) => {
                    error!("mqtt: can't connect to mqtt broker - {}", e);
                    self.status.send_modify(|status| status.failed_connects += 1);

                    let cancelled = tokio::select! {
                        _ = self.cancel.cancelled() => true,
                        _ = tokio::time::sleep(self.retry_interval) => false,
                    };
                    if cancelled {
                        info!("Connect cancelled");
                        return ConnectOutcome::Cancelled(self.transition());
                    }
                }
            }
        }

        info!("Connected to mqtt broker {}", self.config.broker);
        self.set_state(ConnectionState::Connected);
        self.on_connect();
        ConnectOutcome::Online(self.transition())
    }
}

impl MqttSupervisor<Online> {
    pub fn launch_publishers(mut self) -> Self {
        for publisher in self.publishers.drain(..) {
            debug!("Spawning publish loop for {:?}", publisher.topic());
            let handle = tokio::spawn(publisher.run(self.transport.clone(), self.cancel.clone()));
            self.publisher_handles.push(handle);
        }
        self
    }

    /// Drives the event loop until cancelled
    ///
    /// Reconnects are left to the transport; this only paces failed polls
    /// with the backoff and re-subscribes once the broker accepts us again.
    pub async fn run_until_shutdown(mut self) -> MqttSupervisor<Stopping> {
        info!("Supervisor monitoring started");

        loop {
            let event = tokio::select! {
                _ = self.cancel.cancelled() => break,
                event = self.events.next_event() => event,
            };

            match event {
                Ok(TransportEvent::Connected) => {
                    if self.connection_state() == ConnectionState::Reconnecting {
                        info!("Reconnected to mqtt broker {}", self.config.broker);
                        self.status.send_modify(|status| status.reconnects += 1);
                    }
                    self.backoff.reset();
                    self.set_state(ConnectionState::Connected);
                    self.on_connect();
                }
                Ok(TransportEvent::Message { topic, payload }) => {
                    self.handle_message(&topic, &payload)
                }
                Ok(TransportEvent::Disconnected) => {
                    error!("mqtt: connection to mqtt broker is lost - broker closed the connection");
                    self.set_state(ConnectionState::Reconnecting);
                }
                Ok(TransportEvent::Other) => {}
                Err(e) => {
                    if self.connection_state() == ConnectionState::Connected {
                        error!("mqtt: connection to mqtt broker is lost - {}", e);
                    } else {
                        warn!("mqtt: reconnect attempt failed - {}", e);
                    }
                    self.set_state(ConnectionState::Reconnecting);

                    let delay = self.backoff.next_delay();
                    debug!(
                        "Next reconnect attempt {} in {:.1}s",
                        self.backoff.attempt(),
                        delay.as_secs_f64()
                    );
                    tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        info!("Supervisor shutting down due to cancellation");
        self.transition()
    }
}

impl MqttSupervisor<Stopping> {
    /// Waits for the publish loops and disconnects cleanly (best effort)
    pub async fn shutdown(mut self) -> MqttSupervisor<Stopped> {
        self.cancel.cancel();

        for handle in self.publisher_handles.drain(..) {
            if let Err(e) = handle.await {
                error!("Publish loop terminated abnormally: {}", e);
            }
        }

        // no session was ever established, polling now would only open one
        if !matches!(
            self.connection_state(),
            ConnectionState::Connected | ConnectionState::Reconnecting
        ) {
            self.set_state(ConnectionState::Stopped);
            return self.transition();
        }

        let transport = self.transport.clone();
        let events = self.events.as_mut();
        let flushed = tokio::time::timeout(DISCONNECT_GRACE, async move {
            let (disconnected, _) = tokio::join!(transport.disconnect(), drain(events));
            disconnected
        })
        .await;

        match flushed {
            Ok(Ok(())) => info!("Disconnected from mqtt broker"),
            Ok(Err(e)) => warn!("Clean disconnect failed: {}", e),
            Err(_) => debug!("Stopped waiting for the broker to close the session"),
        }

        self.set_state(ConnectionState::Stopped);
        self.transition()
    }
}

impl MqttSupervisor<Stopped> {}

/// Keeps the event loop turning so queued requests reach the socket
async fn drain(events: &mut dyn EventSource) {
    while events.next_event().await.is_ok() {}
}

/// Runs the bridge on a rumqttc connection until `cancel` fires
pub async fn start(
    config: MqttConfig,
    actuator: Arc<dyn Actuator>,
    volume: Arc<dyn StatusProvider>,
    online: Arc<dyn StatusProvider>,
    cancel: CancellationToken,
) {
    let (client, events) = transport::connect(&config);
    MqttSupervisor::create(
        config,
        Arc::new(client),
        Box::new(events),
        actuator,
        volume,
        online,
        cancel,
    )
    .run()
    .await;
}

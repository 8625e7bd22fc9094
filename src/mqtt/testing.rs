//! Test doubles for the transport and device seams

use super::dispatcher::Command;
use super::error::MqttError;
use super::transport::{EventSource, Transport, TransportEvent};
use crate::device::{Actuator, DeviceError, StatusProvider};
use async_trait::async_trait;
use rumqttc::QoS;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub topic: String,
    pub qos: QoS,
    pub retain: bool,
    pub payload: String,
    pub at: Instant,
}

/// Records every request and models broker subscription semantics naively:
/// each subscribe adds a registration, each unsubscribe removes all of them
/// for that filter
#[derive(Default)]
pub struct RecordingTransport {
    published: Mutex<Vec<Published>>,
    registrations: Mutex<Vec<(String, QoS)>>,
    subscribe_calls: AtomicUsize,
    unsubscribe_calls: AtomicUsize,
    disconnects: AtomicUsize,
    fail_publish: bool,
    stall_publish: bool,
}

impl RecordingTransport {
    pub fn failing_publish() -> Self {
        Self {
            fail_publish: true,
            ..Self::default()
        }
    }

    /// Records the publish, then never completes it
    pub fn stalled_publish() -> Self {
        Self {
            stall_publish: true,
            ..Self::default()
        }
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }

    pub fn published_to(&self, topic: &str) -> Vec<Published> {
        self.published()
            .into_iter()
            .filter(|p| p.topic == topic)
            .collect()
    }

    pub fn registrations(&self, filter: &str) -> usize {
        self.registrations
            .lock()
            .unwrap()
            .iter()
            .filter(|(f, _)| f == filter)
            .count()
    }

    pub fn subscribe_qos(&self, filter: &str) -> Option<QoS> {
        self.registrations
            .lock()
            .unwrap()
            .iter()
            .find(|(f, _)| f == filter)
            .map(|(_, qos)| *qos)
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    pub fn unsubscribe_calls(&self) -> usize {
        self.unsubscribe_calls.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn publish(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: String,
    ) -> Result<(), MqttError> {
        self.published.lock().unwrap().push(Published {
            topic: topic.to_string(),
            qos,
            retain,
            payload,
            at: Instant::now(),
        });
        if self.stall_publish {
            std::future::pending::<()>().await;
        }
        if self.fail_publish {
            return Err(MqttError::Publish {
                topic: topic.to_string(),
                reason: "request channel closed".to_string(),
            });
        }
        Ok(())
    }

    async fn subscribe(&self, filter: &str, qos: QoS) -> Result<(), MqttError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        self.registrations
            .lock()
            .unwrap()
            .push((filter.to_string(), qos));
        Ok(())
    }

    async fn unsubscribe(&self, filter: &str) -> Result<(), MqttError> {
        self.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
        self.registrations
            .lock()
            .unwrap()
            .retain(|(f, _)| f != filter);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), MqttError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Replays a fixed script, then stays silent forever
pub struct ScriptedEvents {
    script: VecDeque<Result<TransportEvent, MqttError>>,
    polls: std::sync::Arc<AtomicUsize>,
}

impl ScriptedEvents {
    pub fn new(script: Vec<Result<TransportEvent, MqttError>>) -> Self {
        Self {
            script: script.into(),
            polls: Default::default(),
        }
    }

    pub fn poll_counter(&self) -> std::sync::Arc<AtomicUsize> {
        self.polls.clone()
    }
}

#[async_trait]
impl EventSource for ScriptedEvents {
    async fn next_event(&mut self) -> Result<TransportEvent, MqttError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        match self.script.pop_front() {
            Some(event) => event,
            None => std::future::pending().await,
        }
    }
}

pub fn refused() -> Result<TransportEvent, MqttError> {
    Err(MqttError::Connection("connection refused".to_string()))
}

pub fn message(topic: &str, payload: &str) -> Result<TransportEvent, MqttError> {
    Ok(TransportEvent::Message {
        topic: topic.to_string(),
        payload: payload.as_bytes().to_vec(),
    })
}

#[derive(Default)]
pub struct RecordingActuator {
    calls: Mutex<Vec<Command>>,
}

impl RecordingActuator {
    pub fn calls(&self) -> Vec<Command> {
        self.calls.lock().unwrap().clone()
    }
}

impl Actuator for RecordingActuator {
    fn set_volume(&self, level: i64) {
        self.calls.lock().unwrap().push(Command::SetVolume(level));
    }

    fn set_mute(&self, muted: bool) {
        self.calls.lock().unwrap().push(Command::SetMute(muted));
    }

    fn shutdown(&self) {
        self.calls.lock().unwrap().push(Command::Shutdown);
    }

    fn reboot(&self) {
        self.calls.lock().unwrap().push(Command::Reboot);
    }
}

/// Answers with a fixed value after an optional delay, counting samples
#[derive(Default)]
pub struct FixedProvider {
    value: String,
    latency: Duration,
    samples: AtomicUsize,
}

impl FixedProvider {
    pub fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
            ..Self::default()
        }
    }

    pub fn slow(value: &str, latency: Duration) -> Self {
        Self {
            value: value.to_string(),
            latency,
            ..Self::default()
        }
    }

    pub fn samples(&self) -> usize {
        self.samples.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusProvider for FixedProvider {
    async fn sample(&self) -> Result<String, DeviceError> {
        self.samples.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(self.value.clone())
    }
}

#[derive(Default)]
pub struct FailingProvider {
    samples: AtomicUsize,
}

impl FailingProvider {
    pub fn samples(&self) -> usize {
        self.samples.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusProvider for FailingProvider {
    async fn sample(&self) -> Result<String, DeviceError> {
        self.samples.fetch_add(1, Ordering::SeqCst);
        Err(DeviceError::UnexpectedOutput("mixer unavailable".to_string()))
    }
}

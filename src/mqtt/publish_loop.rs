//! Periodic status publishing
//!
//! A [`PublishLoop`] binds one status topic to one [`StatusProvider`]. Every
//! iteration samples the provider, publishes the snapshot at QoS 0 without
//! retain and then sleeps for the full period. The delay is fixed, not a
//! fixed rate: a slow sample or publish pushes every later tick back.

use super::transport::Transport;
use crate::device::StatusProvider;
use rumqttc::QoS;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct PublishLoop {
    topic: String,
    provider: Arc<dyn StatusProvider>,
    period: Duration,
}

impl PublishLoop {
    pub fn new(topic: impl Into<String>, provider: Arc<dyn StatusProvider>, period: Duration) -> Self {
        Self {
            topic: topic.into(),
            provider,
            period,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Runs until `cancel` fires; each suspension point observes it
    pub async fn run(self, transport: Arc<dyn Transport>, cancel: CancellationToken) {
        info!(
            "Starting publish loop for {:?} every {}s",
            self.topic,
            self.period.as_secs()
        );

        loop {
            let sampled = tokio::select! {
                _ = cancel.cancelled() => break,
                sampled = self.provider.sample() => sampled,
            };

            match sampled {
                Ok(payload) => {
                    let published = tokio::select! {
                        _ = cancel.cancelled() => break,
                        published = transport.publish(&self.topic, QoS::AtMostOnce, false, payload) => published,
                    };
                    match published {
                        Ok(()) => debug!("Published status to {:?}", self.topic),
                        Err(e) => warn!("{}", e),
                    }
                }
                Err(e) => {
                    warn!("skipping one cycle of publishing to {:?}: {}", self.topic, e);
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.period) => {}
            }
        }

        info!("Publish loop for {:?} stopped", self.topic);
    }
}

//! Error definitions for the MQTT bridge

use thiserror::Error;

/// Errors raised while talking to the broker
///
/// None of these are fatal to the process. Connection errors feed the retry
/// loops, everything else is logged by the caller and the cycle moves on.
#[derive(Debug, Error)]
pub enum MqttError {
    /// The transport could not (re)establish or keep the broker session
    #[error("connection to mqtt broker failed: {0}")]
    Connection(String),

    /// A publish request was rejected by the client or never reached the broker
    #[error("failed to publish to {topic:?}: {reason}")]
    Publish { topic: String, reason: String },

    #[error("failed to subscribe to {topic:?}: {reason}")]
    Subscribe { topic: String, reason: String },

    #[error("failed to unsubscribe from {topic:?}: {reason}")]
    Unsubscribe { topic: String, reason: String },

    #[error("failed to disconnect from mqtt broker: {0}")]
    Disconnect(String),
}

impl From<rumqttc::ConnectionError> for MqttError {
    fn from(err: rumqttc::ConnectionError) -> Self {
        MqttError::Connection(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_error_from_rumqttc() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = MqttError::from(rumqttc::ConnectionError::Io(io));

        assert!(matches!(err, MqttError::Connection(_)));
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn publish_error_names_topic() {
        let err = MqttError::Publish {
            topic: "warden/status/volume".to_string(),
            reason: "request channel closed".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "failed to publish to \"warden/status/volume\": request channel closed"
        );
    }
}

use chrono::{DateTime, Local};
use std::fmt;

/// One inbound message from the command topic tree
///
/// Lives only for the duration of a single dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandMessage {
    topic: String,
    payload: String,
    timestamp: DateTime<Local>,
}

impl fmt::Display for CommandMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} received in {:?}", self.payload, self.topic)
    }
}

impl CommandMessage {
    /// Builds a message from a raw publish, decoding the payload lossily and
    /// trimming surrounding whitespace
    pub fn from_raw(topic: impl Into<String>, payload: &[u8]) -> Self {
        CommandMessage {
            topic: topic.into(),
            payload: String::from_utf8_lossy(payload).trim().to_string(),
            timestamp: Local::now(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Local receive time
    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }
}

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Plain MQTT port, the broker address in the config is host only
pub const BROKER_PORT: u16 = 1883;
pub const KEEP_ALIVE: Duration = Duration::from_secs(2 * 60);
/// Delay between failed attempts of the initial connect
pub const CONNECT_RETRY_INTERVAL: Duration = Duration::from_secs(20);
pub const VOLUME_PUBLISH_PERIOD: Duration = Duration::from_secs(5);
pub const ONLINE_PUBLISH_PERIOD: Duration = Duration::from_secs(30);

pub const VOLUME_SUFFIX: &str = "volume";
pub const MUTE_SUFFIX: &str = "mute";
pub const SHUTDOWN_SUFFIX: &str = "shutdown";
pub const REBOOT_SUFFIX: &str = "reboot";
pub const ONLINE_SUFFIX: &str = "online";

/// Payload the broker publishes on our behalf when the session dies uncleanly
pub const WILL_PAYLOAD: &str = "false";

/// Broker identity, credentials and topic prefixes of one bridge instance
///
/// Prefixes are used verbatim, so `sub_topic = "office/pc1/cmd/"` yields the
/// command filter `office/pc1/cmd/#` and the command topic
/// `office/pc1/cmd/volume`.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct MqttConfig {
    /// Client id presented to the broker
    pub id: String,
    /// Broker host name or address
    pub broker: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Prefix of the command topic tree we subscribe to
    pub sub_topic: String,
    /// Prefix of the status topics we publish to
    pub pub_topic: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            id: "warden".to_string(),
            broker: "localhost".to_string(),
            username: String::new(),
            password: String::new(),
            sub_topic: "warden/cmd/".to_string(),
            pub_topic: "warden/status/".to_string(),
        }
    }
}

impl MqttConfig {
    /// Multi-level wildcard covering every command topic
    pub fn command_filter(&self) -> String {
        format!("{}#", self.sub_topic)
    }

    pub fn status_topic(&self, suffix: &str) -> String {
        format!("{}{}", self.pub_topic, suffix)
    }

    pub fn volume_topic(&self) -> String {
        self.status_topic(VOLUME_SUFFIX)
    }

    /// Liveness topic, shared by the periodic status and the last will
    pub fn online_topic(&self) -> String {
        self.status_topic(ONLINE_SUFFIX)
    }
}

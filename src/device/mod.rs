//! # Device Module
//!
//! Local capabilities the bridge drives and samples: the actuators behind the
//! command topics and the status providers behind the telemetry topics.
//!
//! ```text
//! device/
//! ├── status.rs  - Status providers (volume level, liveness)
//! └── system.rs  - Actuator backed by configurable system commands
//! ```
//!
//! Both capabilities are traits so the MQTT side only ever sees
//! `Arc<dyn Actuator>` / `Arc<dyn StatusProvider>`. The system-command
//! implementations read their argv templates from [`DeviceConfig`].

pub mod status;
pub mod system;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder replaced by the requested level in `volume_set`
pub const VOLUME_PLACEHOLDER: &str = "{volume}";

/// Fire-and-forget local actions triggered by inbound commands
///
/// Implementations must return quickly: they are called from the message
/// delivery path and a slow call stalls delivery of the next message.
pub trait Actuator: Send + Sync {
    fn set_volume(&self, level: i64);
    fn set_mute(&self, muted: bool);
    fn shutdown(&self);
    fn reboot(&self);
}

/// Produces a string snapshot for one telemetry channel
#[async_trait]
pub trait StatusProvider: Send + Sync {
    async fn sample(&self) -> Result<String, DeviceError>;
}

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no command configured for {0}")]
    EmptyCommand(&'static str),

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    CommandFailed { program: String, status: String },

    #[error("unexpected output: {0}")]
    UnexpectedOutput(String),
}

/// Argv templates for the system commands behind each capability
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DeviceConfig {
    /// Prints the current level somewhere in its output as `NN%`
    pub volume_get: Vec<String>,
    /// May contain `{volume}`
    pub volume_set: Vec<String>,
    pub mute_on: Vec<String>,
    pub mute_off: Vec<String>,
    pub shutdown: Vec<String>,
    pub reboot: Vec<String>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        fn argv(parts: &[&str]) -> Vec<String> {
            parts.iter().map(|p| p.to_string()).collect()
        }

        Self {
            volume_get: argv(&["amixer", "get", "Master"]),
            volume_set: argv(&["amixer", "-q", "sset", "Master", "{volume}%"]),
            mute_on: argv(&["amixer", "-q", "sset", "Master", "mute"]),
            mute_off: argv(&["amixer", "-q", "sset", "Master", "unmute"]),
            shutdown: argv(&["systemctl", "poweroff"]),
            reboot: argv(&["systemctl", "reboot"]),
        }
    }
}

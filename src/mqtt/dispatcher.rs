//! Routes inbound command messages to the local actuator
//!
//! | topic                 | payload        | action            |
//! |-----------------------|----------------|-------------------|
//! | `<sub_topic>volume`   | integer        | `set_volume(n)`   |
//! | `<sub_topic>mute`     | boolean        | `set_mute(b)`     |
//! | `<sub_topic>shutdown` | ignored        | `shutdown()`      |
//! | `<sub_topic>reboot`   | ignored        | `reboot()`        |
//!
//! Anything else under the command tree is ignored. Volume is passed through
//! unclamped, the actuator gets exactly the parsed integer.

use super::config::{MUTE_SUFFIX, REBOOT_SUFFIX, SHUTDOWN_SUFFIX, VOLUME_SUFFIX};
use super::message_manager::CommandMessage;
use crate::device::Actuator;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetVolume(i64),
    SetMute(bool),
    Shutdown,
    Reboot,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("message in volume topic must be in range of 0-100, skipping command: {0:?}")]
    InvalidVolume(String),

    #[error("message in mute topic must be true or false, skipping command: {0:?}")]
    InvalidMute(String),
}

/// Result of routing one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Executed(Command),
    Rejected(CommandError),
    Ignored,
}

/// Parses a command from its topic suffix and trimmed payload
///
/// `None` means the suffix is not a known command.
pub fn parse_command(suffix: &str, payload: &str) -> Option<Result<Command, CommandError>> {
    let command = match suffix {
        VOLUME_SUFFIX => payload
            .parse::<i64>()
            .map(Command::SetVolume)
            .map_err(|_| CommandError::InvalidVolume(payload.to_string())),
        MUTE_SUFFIX => parse_bool(payload)
            .map(Command::SetMute)
            .ok_or_else(|| CommandError::InvalidMute(payload.to_string())),
        SHUTDOWN_SUFFIX => Ok(Command::Shutdown),
        REBOOT_SUFFIX => Ok(Command::Reboot),
        _ => return None,
    };
    Some(command)
}

/// Accepts the usual spellings sent by home automation tools
fn parse_bool(payload: &str) -> Option<bool> {
    match payload {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

pub struct Dispatcher {
    sub_prefix: String,
    actuator: Arc<dyn Actuator>,
}

impl Dispatcher {
    pub fn new(sub_prefix: impl Into<String>, actuator: Arc<dyn Actuator>) -> Self {
        Self {
            sub_prefix: sub_prefix.into(),
            actuator,
        }
    }

    pub fn dispatch(&self, message: &CommandMessage) -> Dispatch {
        info!("{}", message);

        let Some(suffix) = message.topic().strip_prefix(self.sub_prefix.as_str()) else {
            return Dispatch::Ignored;
        };

        match parse_command(suffix, message.payload()) {
            Some(Ok(command)) => {
                self.execute(command);
                Dispatch::Executed(command)
            }
            Some(Err(e)) => {
                warn!("{}", e);
                Dispatch::Rejected(e)
            }
            None => Dispatch::Ignored,
        }
    }

    fn execute(&self, command: Command) {
        match command {
            Command::SetVolume(level) => self.actuator.set_volume(level),
            Command::SetMute(muted) => self.actuator.set_mute(muted),
            Command::Shutdown => self.actuator.shutdown(),
            Command::Reboot => self.actuator.reboot(),
        }
    }
}

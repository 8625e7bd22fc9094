//! Actuator backed by system commands
//!
//! Each action renders its argv template from [`DeviceConfig`] and spawns it
//! without waiting. A detached task reaps the child and logs how it ended.

use super::{Actuator, DeviceConfig, DeviceError, VOLUME_PLACEHOLDER};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

pub struct SystemActuator {
    commands: DeviceConfig,
}

impl SystemActuator {
    pub fn new(commands: DeviceConfig) -> Self {
        info!("Creating system actuator: {:?}", commands);
        Self { commands }
    }

    fn run_detached(&self, action: &'static str, argv: Vec<String>) {
        let (program, mut child) = match spawn(action, &argv) {
            Ok(spawned) => spawned,
            Err(e) => {
                error!("{} failed: {}", action, e);
                return;
            }
        };

        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => debug!("{} finished: {}", program, status),
                Ok(status) => warn!("{} ({}) exited with {}", action, program, status),
                Err(e) => error!("failed to wait for {} ({}): {}", action, program, e),
            }
        });
    }
}

impl Actuator for SystemActuator {
    fn set_volume(&self, level: i64) {
        info!("Setting volume to {}", level);
        let argv = render(&self.commands.volume_set, VOLUME_PLACEHOLDER, &level.to_string());
        self.run_detached("set volume", argv);
    }

    fn set_mute(&self, muted: bool) {
        info!("Setting mute to {}", muted);
        let argv = if muted {
            self.commands.mute_on.clone()
        } else {
            self.commands.mute_off.clone()
        };
        self.run_detached("set mute", argv);
    }

    fn shutdown(&self) {
        warn!("Shutdown requested");
        self.run_detached("shutdown", self.commands.shutdown.clone());
    }

    fn reboot(&self) {
        warn!("Reboot requested");
        self.run_detached("reboot", self.commands.reboot.clone());
    }
}

/// Replaces every occurrence of `placeholder` in every argument
pub fn render(template: &[String], placeholder: &str, value: &str) -> Vec<String> {
    template
        .iter()
        .map(|arg| arg.replace(placeholder, value))
        .collect()
}

fn spawn(
    action: &'static str,
    argv: &[String],
) -> Result<(String, tokio::process::Child), DeviceError> {
    let (program, args) = argv.split_first().ok_or(DeviceError::EmptyCommand(action))?;
    let child = Command::new(program)
        .args(args)
        .spawn()
        .map_err(|source| DeviceError::Spawn {
            program: program.clone(),
            source,
        })?;
    Ok((program.clone(), child))
}

//! Status providers for the telemetry topics

use super::{DeviceError, StatusProvider};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Reports the current output volume as a bare number, e.g. `"35"`
pub struct VolumeStatus {
    command: Vec<String>,
}

impl VolumeStatus {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

#[async_trait]
impl StatusProvider for VolumeStatus {
    async fn sample(&self) -> Result<String, DeviceError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or(DeviceError::EmptyCommand("volume status"))?;

        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|source| DeviceError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(DeviceError::CommandFailed {
                program: program.clone(),
                status: output.status.to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!("{} reported: {}", program, stdout.trim());
        parse_volume(&stdout)
    }
}

/// Liveness flag, `"true"` whenever the bridge is able to publish at all
pub struct OnlineStatus;

#[async_trait]
impl StatusProvider for OnlineStatus {
    async fn sample(&self) -> Result<String, DeviceError> {
        Ok("true".to_string())
    }
}

/// Extracts the first `NN%` figure from mixer output
pub fn parse_volume(output: &str) -> Result<String, DeviceError> {
    for (idx, _) in output.match_indices('%') {
        let digits: String = output[..idx]
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if digits.is_empty() {
            continue;
        }
        let level: String = digits.chars().rev().collect();
        return level
            .parse::<u32>()
            .map(|level| level.to_string())
            .map_err(|_| DeviceError::UnexpectedOutput(level));
    }

    Err(DeviceError::UnexpectedOutput(output.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_amixer_output() {
        let output = "Simple mixer control 'Master',0\n  \
                      Capabilities: pvolume pswitch\n  \
                      Front Left: Playback 42598 [65%] [on]\n  \
                      Front Right: Playback 42598 [64%] [on]\n";

        assert_eq!(parse_volume(output).unwrap(), "65");
    }

    #[test]
    fn parses_leading_zeroes() {
        assert_eq!(parse_volume("level 007%").unwrap(), "7");
    }

    #[test]
    fn skips_percent_without_digits() {
        assert_eq!(parse_volume("100 % done, volume 30%").unwrap(), "30");
    }

    #[test]
    fn rejects_output_without_level() {
        let err = parse_volume("Mixer not found\n").unwrap_err();

        assert!(matches!(err, DeviceError::UnexpectedOutput(ref s) if s == "Mixer not found"));
    }

    #[tokio::test]
    async fn online_is_always_true() {
        assert_eq!(OnlineStatus.sample().await.unwrap(), "true");
    }

    #[tokio::test]
    async fn empty_volume_command_errors() {
        let err = VolumeStatus::new(Vec::new()).sample().await.unwrap_err();

        assert!(matches!(err, DeviceError::EmptyCommand(_)));
    }
}

//! Application configuration loaded from a TOML file
//!
//! ```toml
//! [mqtt]
//! id = "office-pc1"
//! broker = "10.0.0.2"
//! username = "warden"
//! password = "secret"
//! sub_topic = "office/pc1/cmd/"
//! pub_topic = "office/pc1/"
//!
//! [device]
//! volume_set = ["amixer", "-q", "sset", "Master", "{volume}%"]
//! ```
//!
//! The `[device]` table is optional, every missing entry falls back to the
//! Linux defaults.

use crate::device::DeviceConfig;
use crate::mqtt::config::MqttConfig;
use color_eyre::eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "WARDEN_CONFIG";
const CONFIG_DIR: &str = "warden";
const CONFIG_FILE: &str = "config.toml";

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct Config {
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub device: DeviceConfig,
}

impl Config {
    /// `$WARDEN_CONFIG`, or `warden/config.toml` in the user config directory
    pub fn resolve_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }

        let mut path = dirs::config_dir().ok_or_else(|| eyre!("No config directory available"))?;
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        Ok(path)
    }

    /// Writes the default configuration if nothing exists at `path`
    pub async fn ensure_default(path: &Path) -> Result<()> {
        if tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?
        {
            debug!("Config file found at {}", path.display());
            return Ok(());
        }

        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
        }

        let content = toml::to_string_pretty(&Config::default())
            .map_err(|e| eyre!("Failed to serialize default config: {}", e))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| eyre!("Failed to write default config file: {}", e))?;

        info!("Default config written to {}", path.display());
        Ok(())
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

        let config = Self::parse(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| eyre!("Failed to parse config file: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mqtt = &self.mqtt;
        if mqtt.id.trim().is_empty() {
            return Err(eyre!("mqtt.id must not be empty"));
        }
        if mqtt.broker.trim().is_empty() {
            return Err(eyre!("mqtt.broker must not be empty"));
        }
        for (name, prefix) in [("sub_topic", &mqtt.sub_topic), ("pub_topic", &mqtt.pub_topic)] {
            if prefix.contains(['#', '+']) {
                return Err(eyre!("mqtt.{} must not contain wildcards: {:?}", name, prefix));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [mqtt]
        id = "office-pc1"
        broker = "10.0.0.2"
        sub_topic = "office/pc1/cmd/"
        pub_topic = "office/pc1/"
    "#;

    #[test]
    fn minimal_config_uses_device_defaults() {
        let config = Config::parse(MINIMAL).unwrap();

        assert_eq!(config.mqtt.id, "office-pc1");
        assert_eq!(config.mqtt.command_filter(), "office/pc1/cmd/#");
        assert_eq!(config.device, DeviceConfig::default());
    }

    #[test]
    fn partial_device_table_keeps_other_defaults() {
        let content = format!(
            "{}\n[device]\nshutdown = [\"shutdown\", \"-h\", \"now\"]\n",
            MINIMAL
        );
        let config = Config::parse(&content).unwrap();

        assert_eq!(config.device.shutdown, vec!["shutdown", "-h", "now"]);
        assert_eq!(config.device.reboot, DeviceConfig::default().reboot);
    }

    #[test]
    fn wildcard_prefix_is_rejected() {
        let content = MINIMAL.replace("office/pc1/cmd/", "office/+/cmd/");

        assert!(Config::parse(&content).is_err());
    }

    #[test]
    fn empty_broker_is_rejected() {
        let content = MINIMAL.replace("10.0.0.2", "");

        assert!(Config::parse(&content).is_err());
    }

    #[test]
    fn missing_mqtt_table_is_rejected() {
        assert!(Config::parse("[device]\n").is_err());
    }

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[tokio::test]
    async fn ensure_default_writes_loadable_file() {
        let dir = std::env::temp_dir().join(format!("warden-config-{}", std::process::id()));
        let path = dir.join(CONFIG_FILE);
        let _ = tokio::fs::remove_dir_all(&dir).await;

        Config::ensure_default(&path).await.unwrap();
        let loaded = Config::load(&path).await.unwrap();
        assert_eq!(loaded, Config::default());

        // existing files are left alone
        tokio::fs::write(&path, MINIMAL).await.unwrap();
        Config::ensure_default(&path).await.unwrap();
        assert_eq!(Config::load(&path).await.unwrap().mqtt.id, "office-pc1");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}

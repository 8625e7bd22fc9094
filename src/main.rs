pub mod config;
pub mod device;
pub mod mqtt;

use crate::config::Config;
use crate::device::status::{OnlineStatus, VolumeStatus};
use crate::device::system::SystemActuator;
use color_eyre::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let path = Config::resolve_path()?;
    Config::ensure_default(&path).await?;
    let config = Config::load(&path).await?;

    let cancel = CancellationToken::new();
    let _signal_handle = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Interrupt received, stopping"),
                Err(e) => error!("Unable to listen for interrupt: {}", e),
            }
            cancel.cancel();
        }
    });

    let actuator = Arc::new(SystemActuator::new(config.device.clone()));
    let volume = Arc::new(VolumeStatus::new(config.device.volume_get.clone()));

    info!("Starting mqtt bridge for {}", config.mqtt.id);
    mqtt::mqtt_handler::start(config.mqtt, actuator, volume, Arc::new(OnlineStatus), cancel).await;

    info!("Warden stopped");
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info, warn};
use mijia_ht_exporter_lib::config::{AppConfig, CONFIG_FILE_NAME, ConfigSource};
use mijia_ht_exporter_lib::core::{BluestDevice, SessionController};
use mijia_ht_exporter_lib::logging;
use mijia_ht_exporter_lib::metrics::{self, PrometheusSink};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    let (config, source) = AppConfig::load_config(&config_path).await?;

    if let Err(e) = logging::init(logging::level_filter(&config.log_level)) {
        eprintln!("Failed to initialize logging: {}", e);
    }
    match source {
        ConfigSource::File => info!("Config loaded from {:?}", config_path),
        ConfigSource::Defaults => warn!("Config file not found at {:?}, using default.", config_path),
    }
    info!("Starting with {:?}", config);

    let sink = Arc::new(PrometheusSink::new().context("failed to create sensor gauges")?);
    let _exporter = metrics::start_exporter(config.exporter.socket_addr()?, &sink)?;

    let device = BluestDevice::open().await.context("failed to open device")?;

    let report = SessionController::new(
        Arc::new(device),
        config.sensor.clone(),
        config.session.retry_policy(),
    )
    .run(sink)
    .await?;

    info!(
        "Finished after {} cycles with {} measurements",
        report.cycles, report.measurements
    );
    Ok(())
}

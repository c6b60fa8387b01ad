use std::process::ExitCode;

use anyhow::{anyhow, Result};
use curate_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) -> Result<()> {
    use curate_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    // stdout carries the JSON result document
    let initialised = match config.logging.format {
        Compact => builder.compact().try_init(),
        Pretty => builder.pretty().try_init(),
        Json => builder.json().try_init(),
    };
    initialised.map_err(|error| anyhow!("failed to initialise logging: {error}"))
}

fn main() -> Result<ExitCode> {
    // An invalid config still gets logging; the command reports the error itself.
    let config = AppConfig::load(LoadOptions::default()).unwrap_or_default();
    init_logging(&config)?;

    Ok(curate_cli::run())
}

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sbc-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the SBC Modbus bridge

use anyhow::Result;
use clap::Parser;
use log::{error, info};
use tokio::signal;

use rust_sbc_bridge::cli::Args;
use rust_sbc_bridge::config::{self, Config};
use rust_sbc_bridge::daemon::Daemon;
use rust_sbc_bridge::logging;

#[rocket::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init(args.log_level.to_level_filter(), args.json_logs);

    if args.show_config_schema {
        return config::output_config_schema();
    }

    if let Some(validate_path) = &args.validate_config {
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }
        Config::from_file(validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {}", err))?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(());
    }

    // Without --config the bridge runs from defaults and command line options
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.apply_args(&args);
    config.validate()?;

    let mut daemon = Daemon::from_config(&config)?;
    if let Err(err) = daemon.launch(&config).await {
        error!("Failed to start bridge: {:#}", err);
        daemon.shutdown();
        daemon.join().await?;
        return Err(err);
    }

    if config.web.enabled {
        info!(
            "Web console available at http://{}:{}/",
            config.web.address, config.web.port
        );
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Interrupted by user"),
        Err(err) => error!("Error waiting for shutdown signal: {}", err),
    }
    daemon.shutdown();
    daemon.join().await?;
    Ok(())
}

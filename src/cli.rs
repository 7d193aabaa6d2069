// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sbc-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Command line arguments
//!
//! Every option left out on the command line keeps the value from the
//! configuration file (or its default). Out-of-range values are rejected by
//! the parser, which exits with status 2.

use std::path::PathBuf;

use clap::builder::RangedU64ValueParser;
use clap::{Parser, ValueEnum};

use crate::config::{Parity, MAX_SERIAL_TIMEOUT};
use crate::registers::{MAX_DATA_POINTS, MAX_UNIT_ID, MIN_UNIT_ID};

/// Verbosity of the runtime logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogLevel {
    Critical,
    Error,
    Warning,
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    /// `log` has no level above `error`, so `critical` shares it.
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Critical | LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warning => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
        }
    }
}

/// Modbus RTU slave bridging a Delta DVP controller to a live web register console
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (YAML format)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Path to a configuration to validate and exit
    #[arg(long)]
    pub validate_config: Option<PathBuf>,

    /// Output the configuration schema as JSON and exit
    #[arg(long)]
    pub show_config_schema: bool,

    /// Serial port name
    #[arg(long)]
    pub port: Option<String>,

    /// Serial baudrate
    #[arg(long)]
    pub baudrate: Option<u32>,

    /// Data bits
    #[arg(long, value_parser = clap::value_parser!(u8).range(5..=8))]
    pub bytesize: Option<u8>,

    /// Parity
    #[arg(long, value_enum, ignore_case = true)]
    pub parity: Option<Parity>,

    /// Stop bits
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=2))]
    pub stopbits: Option<u8>,

    /// Serial read timeout in seconds
    #[arg(long, value_parser = parse_timeout)]
    pub timeout: Option<f64>,

    /// Do not serve Modbus RTU on the serial port
    #[arg(long)]
    pub no_serial: bool,

    /// Number of registers/coils exposed by the slave
    #[arg(
        long,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..=MAX_DATA_POINTS as u64)
    )]
    pub data_points: Option<usize>,

    /// Modbus unit identifier of the DVP controller
    #[arg(
        long,
        value_parser = clap::value_parser!(u8).range(MIN_UNIT_ID as i64..=MAX_UNIT_ID as i64)
    )]
    pub unit_id: Option<u8>,

    /// Web server address
    #[arg(long)]
    pub web_address: Option<String>,

    /// Web server port
    #[arg(long)]
    pub web_port: Option<u16>,

    /// Disable the web register console
    #[arg(long)]
    pub no_web: bool,

    /// Also serve the register tables over Modbus TCP
    #[arg(long)]
    pub modbus_tcp: bool,

    /// Modbus TCP listener address
    #[arg(long)]
    pub modbus_tcp_address: Option<String>,

    /// Modbus TCP listener port
    #[arg(long)]
    pub modbus_tcp_port: Option<u16>,

    /// Verbosity of the runtime logger
    #[arg(long, value_enum, ignore_case = true, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Emit logs in JSON format for easier ingestion
    #[arg(long)]
    pub json_logs: bool,
}

fn parse_timeout(value: &str) -> Result<f64, String> {
    let timeout: f64 = value
        .parse()
        .map_err(|_| format!("`{value}` is not a number"))?;
    if timeout > 0.0 && timeout <= MAX_SERIAL_TIMEOUT {
        Ok(timeout)
    } else {
        Err(format!(
            "timeout must be more than 0 and at most {MAX_SERIAL_TIMEOUT} seconds"
        ))
    }
}

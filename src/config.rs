// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sbc-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Configuration Management
//!
//! This module implements configuration handling for the bridge. It supports
//! loading, validating, and saving configuration from YAML files using JSON
//! Schema validation for robust error checking.
//!
//! ## Configuration Structure
//!
//! - `serial`: serial line on which the PLC polls the bridge
//! - `registers`: size of the register tables and the unit id answered
//! - `web`: HTTP register console
//! - `modbus_tcp`: optional Modbus TCP listener serving the same unit
//!
//! Every section can be omitted from the file, in which case its defaults are
//! used.
//!
//! ## Usage
//!
//! ```no_run
//! use rust_sbc_bridge::config::Config;
//!
//! // Load config from file, creates a default if not found
//! let config = Config::from_file("config.yaml").unwrap();
//! println!("Serving unit {} on {}", config.registers.unit_id, config.serial.port);
//! ```

use std::fs::{self, File};
use std::io::Write;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::ValueEnum;
use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::registers::{DEFAULT_DATA_POINTS, MAX_DATA_POINTS, MAX_UNIT_ID, MIN_UNIT_ID};

const CONFIG_SCHEMA: &str = include_str!("../resources/config.schema.json");

/// Longest accepted serial read timeout, in seconds
pub const MAX_SERIAL_TIMEOUT: f64 = 3600.0;

/// Serial parity setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum Parity {
    #[serde(rename = "N")]
    #[value(name = "N")]
    None,
    #[serde(rename = "E")]
    #[value(name = "E")]
    Even,
    #[serde(rename = "O")]
    #[value(name = "O")]
    Odd,
}

/// Serial line settings.
///
/// The defaults match a Delta DVP controller fresh out of the box:
/// 9600 bauds, 8 data bits, no parity, 1 stop bit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// When false, no RTU server is started (web console and Modbus TCP only)
    pub enabled: bool,
    /// Serial device path, e.g. `/dev/ttyUSB0` or `COM3`
    pub port: String,
    pub baudrate: u32,
    /// Data bits, 5 to 8
    pub bytesize: u8,
    pub parity: Parity,
    /// Stop bits, 1 or 2
    pub stopbits: u8,
    /// Read timeout in seconds
    pub timeout: f64,
}

impl SerialConfig {
    pub fn timeout_duration(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.timeout)
            .with_context(|| format!("Invalid serial timeout: {}", self.timeout))
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: "/dev/ttyUSB0".to_string(),
            baudrate: 9600,
            bytesize: 8,
            parity: Parity::None,
            stopbits: 1,
            timeout: 1.0,
        }
    }
}

/// Register table dimensions and unit identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistersConfig {
    /// Number of values in each table
    pub data_points: usize,
    /// Modbus unit id answered by the bridge
    pub unit_id: u8,
}

impl Default for RegistersConfig {
    fn default() -> Self {
        Self {
            data_points: DEFAULT_DATA_POINTS,
            unit_id: MIN_UNIT_ID,
        }
    }
}

/// Web console settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub enabled: bool,
    pub address: String,
    pub port: u16,
    /// Server identity sent in the `Server` header
    pub name: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: "0.0.0.0".to_string(),
            port: 8080,
            name: "SBC Modbus Bridge".to_string(),
        }
    }
}

/// Optional Modbus TCP listener, handy on the bench when no PLC is wired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModbusTcpConfig {
    pub enabled: bool,
    pub address: String,
    pub port: u16,
}

impl Default for ModbusTcpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "127.0.0.1".to_string(),
            port: 5020,
        }
    }
}

/// Root configuration structure.
///
/// The structure is validated against the embedded JSON schema
/// (`resources/config.schema.json`) before deserialization, then against the
/// range rules of [`Config::validate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub serial: SerialConfig,
    pub registers: RegistersConfig,
    pub web: WebConfig,
    pub modbus_tcp: ModbusTcpConfig,
}

impl Config {
    /// Write a `<name>.sample.yaml` with default values next to `path`.
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Creating sample configuration file at {:?}", sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory for sample config at {:?}", parent)
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file.
    ///
    /// A missing file is created with default values. Any parse, schema or
    /// range error leaves a sample file behind and is returned to the caller.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("Configuration file not found at {:?}, creating default", path);
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        let yaml_value: serde_yml::Value = match serde_yml::from_str(&contents) {
            Ok(value) => value,
            Err(err) => {
                Self::create_sample_config(path)?;
                return Err(err)
                    .with_context(|| format!("Failed to parse YAML configuration from {:?}", path));
            }
        };

        // An empty file parses as null; treat it as an empty mapping
        let json_value = match serde_json::to_value(&yaml_value)
            .context("Failed to convert YAML to JSON for validation")?
        {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            value => value,
        };

        let schema: serde_json::Value =
            serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;
        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        debug!("Validating {} configuration against schema", path.display());
        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            Self::create_sample_config(path)?;
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        let config: Config = match serde_json::from_value(json_value) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        if let Err(err) = config.validate() {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a YAML file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Override configuration values with those given on the command line.
    ///
    /// Only options actually present on the command line are applied.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(port) = &args.port {
            debug!("Overriding serial port from command line: {}", port);
            self.serial.port = port.clone();
        }
        if let Some(baudrate) = args.baudrate {
            debug!("Overriding baudrate from command line: {}", baudrate);
            self.serial.baudrate = baudrate;
        }
        if let Some(bytesize) = args.bytesize {
            self.serial.bytesize = bytesize;
        }
        if let Some(parity) = args.parity {
            self.serial.parity = parity;
        }
        if let Some(stopbits) = args.stopbits {
            self.serial.stopbits = stopbits;
        }
        if let Some(timeout) = args.timeout {
            self.serial.timeout = timeout;
        }
        if args.no_serial {
            debug!("Serial RTU server disabled from command line");
            self.serial.enabled = false;
        }

        if let Some(data_points) = args.data_points {
            debug!("Overriding data points from command line: {}", data_points);
            self.registers.data_points = data_points;
        }
        if let Some(unit_id) = args.unit_id {
            debug!("Overriding unit id from command line: {}", unit_id);
            self.registers.unit_id = unit_id;
        }

        if let Some(address) = &args.web_address {
            debug!("Overriding web address from command line: {}", address);
            self.web.address = address.clone();
        }
        if let Some(port) = args.web_port {
            debug!("Overriding web port from command line: {}", port);
            self.web.port = port;
        }
        if args.no_web {
            self.web.enabled = false;
        }

        if args.modbus_tcp {
            self.modbus_tcp.enabled = true;
        }
        if let Some(address) = &args.modbus_tcp_address {
            debug!("Overriding Modbus TCP address from command line: {}", address);
            self.modbus_tcp.address = address.clone();
        }
        if let Some(port) = args.modbus_tcp_port {
            debug!("Overriding Modbus TCP port from command line: {}", port);
            self.modbus_tcp.port = port;
        }
    }

    /// Check the range rules shared by the file and command line paths.
    pub fn validate(&self) -> Result<()> {
        debug!("Performing additional validation checks");

        let serial = &self.serial;
        if serial.port.is_empty() {
            anyhow::bail!("Serial port path must not be empty");
        }
        if serial.baudrate == 0 {
            anyhow::bail!("Invalid baudrate: {}", serial.baudrate);
        }
        if !(5..=8).contains(&serial.bytesize) {
            anyhow::bail!("Invalid bytesize {}, expected 5 to 8", serial.bytesize);
        }
        if !matches!(serial.stopbits, 1 | 2) {
            anyhow::bail!("Invalid stopbits {}, expected 1 or 2", serial.stopbits);
        }
        if !(serial.timeout > 0.0 && serial.timeout <= MAX_SERIAL_TIMEOUT) {
            anyhow::bail!(
                "Invalid serial timeout {}, expected more than 0 and at most {} seconds",
                serial.timeout,
                MAX_SERIAL_TIMEOUT
            );
        }

        let registers = &self.registers;
        if !(1..=MAX_DATA_POINTS).contains(&registers.data_points) {
            anyhow::bail!(
                "data_points must be between 1 and {}, got {}",
                MAX_DATA_POINTS,
                registers.data_points
            );
        }
        if !(MIN_UNIT_ID..=MAX_UNIT_ID).contains(&registers.unit_id) {
            anyhow::bail!(
                "unit_id must be between {} and {}, got {}",
                MIN_UNIT_ID,
                MAX_UNIT_ID,
                registers.unit_id
            );
        }

        if self.web.enabled && self.web.port == 0 {
            anyhow::bail!("Invalid web port number: {}", self.web.port);
        }
        if self.modbus_tcp.enabled && self.modbus_tcp.port == 0 {
            anyhow::bail!("Invalid Modbus TCP port number: {}", self.modbus_tcp.port);
        }
        for (name, address) in [
            ("web", &self.web.address),
            ("Modbus TCP", &self.modbus_tcp.address),
        ] {
            if address.parse::<IpAddr>().is_err() {
                anyhow::bail!("Invalid {} address {:?}, expected an IP address", name, address);
            }
        }
        Ok(())
    }
}

/// Output the embedded JSON schema to the console.
///
/// Called when `--show-config-schema` is given on the command line.
///
/// ```bash
/// ./rust_sbc_bridge --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;
    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;
    println!("{}", formatted_schema);
    Ok(())
}

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sbc-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::fs;
use std::sync::Once;

use anyhow::Result;
use clap::Parser;
use tempfile::tempdir;

use rust_sbc_bridge::cli::Args;
use rust_sbc_bridge::config::{Config, Parity};

static INIT: Once = Once::new();

// Setup logger for tests
fn setup() {
    INIT.call_once(|| {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .init();
    });
}

#[test]
fn test_missing_config_file_is_created_with_defaults() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    let config = Config::from_file(&config_path)?;
    assert_eq!(config, Config::default());
    assert!(config_path.exists(), "Default config file was not written");

    // The written file loads back to the same configuration
    assert_eq!(Config::from_file(&config_path)?, Config::default());
    Ok(())
}

#[test]
fn test_valid_config_file_is_loaded() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(
        &config_path,
        r#"
serial:
  port: /dev/ttyS2
  baudrate: 19200
  parity: E
  stopbits: 2
registers:
  data_points: 256
  unit_id: 12
web:
  port: 9090
"#,
    )?;

    let config = Config::from_file(&config_path)?;
    assert_eq!(config.serial.port, "/dev/ttyS2");
    assert_eq!(config.serial.baudrate, 19200);
    assert_eq!(config.serial.parity, Parity::Even);
    assert_eq!(config.serial.stopbits, 2);
    assert_eq!(config.serial.bytesize, 8);
    assert_eq!(config.registers.data_points, 256);
    assert_eq!(config.registers.unit_id, 12);
    assert_eq!(config.web.port, 9090);
    assert_eq!(config.web.address, "0.0.0.0");
    Ok(())
}

#[test]
fn test_schema_violation_creates_sample_file() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, "registers:\n  data_points: 0\n")?;

    let result = Config::from_file(&config_path);
    assert!(result.is_err(), "Config loading should have failed");

    let sample_path = config_path.with_extension("sample.yaml");
    assert!(sample_path.exists(), "Sample config file was not created");
    assert_eq!(Config::from_file(&sample_path)?, Config::default());
    Ok(())
}

#[test]
fn test_type_mismatch_and_unknown_keys_are_rejected() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;

    let config_path = temp_dir.path().join("types.yaml");
    fs::write(&config_path, "serial:\n  baudrate: fast\n")?;
    assert!(Config::from_file(&config_path).is_err());

    let config_path = temp_dir.path().join("unknown.yaml");
    fs::write(&config_path, "visualization:\n  port: 8080\n")?;
    assert!(Config::from_file(&config_path).is_err());

    let config_path = temp_dir.path().join("parity.yaml");
    fs::write(&config_path, "serial:\n  parity: M\n")?;
    assert!(Config::from_file(&config_path).is_err());

    let config_path = temp_dir.path().join("timeout.yaml");
    fs::write(&config_path, "serial:\n  timeout: 1e20\n")?;
    assert!(Config::from_file(&config_path).is_err());

    let config_path = temp_dir.path().join("address.yaml");
    fs::write(&config_path, "web:\n  address: localhost\n")?;
    assert!(Config::from_file(&config_path).is_err());
    Ok(())
}

#[test]
fn test_invalid_yaml_creates_sample_file() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("broken.yaml");
    fs::write(&config_path, "serial: [unclosed\n")?;

    assert!(Config::from_file(&config_path).is_err());
    assert!(config_path.with_extension("sample.yaml").exists());
    Ok(())
}

#[test]
fn test_empty_file_uses_defaults() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("empty.yaml");
    fs::write(&config_path, "")?;

    assert_eq!(Config::from_file(&config_path)?, Config::default());
    Ok(())
}

#[test]
fn test_command_line_overrides() -> Result<()> {
    let args = Args::try_parse_from([
        "rust_sbc_bridge",
        "--port",
        "/dev/ttyAMA0",
        "--parity",
        "O",
        "--data-points",
        "16",
        "--unit-id",
        "3",
        "--web-port",
        "8081",
        "--modbus-tcp",
        "--modbus-tcp-port",
        "1502",
        "--no-serial",
    ])?;

    let mut config = Config::default();
    config.apply_args(&args);
    config.validate()?;

    assert_eq!(config.serial.port, "/dev/ttyAMA0");
    assert_eq!(config.serial.parity, Parity::Odd);
    assert!(!config.serial.enabled);
    assert_eq!(config.serial.baudrate, 9600);
    assert_eq!(config.registers.data_points, 16);
    assert_eq!(config.registers.unit_id, 3);
    assert_eq!(config.web.port, 8081);
    assert!(config.web.enabled);
    assert!(config.modbus_tcp.enabled);
    assert_eq!(config.modbus_tcp.port, 1502);
    Ok(())
}

#[test]
fn test_no_web_flag() -> Result<()> {
    let args = Args::try_parse_from(["rust_sbc_bridge", "--no-web"])?;
    let mut config = Config::default();
    config.apply_args(&args);
    assert!(!config.web.enabled);
    Ok(())
}

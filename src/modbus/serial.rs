// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sbc-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Serial line setup for the RTU server

use anyhow::{Context, Result};
use log::info;
use tokio_serial::{DataBits, SerialPortBuilder, SerialPortBuilderExt, SerialStream, StopBits};

use crate::config::{Parity, SerialConfig};

impl From<Parity> for tokio_serial::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Even => tokio_serial::Parity::Even,
            Parity::Odd => tokio_serial::Parity::Odd,
        }
    }
}

fn data_bits(bytesize: u8) -> Result<DataBits> {
    Ok(match bytesize {
        5 => DataBits::Five,
        6 => DataBits::Six,
        7 => DataBits::Seven,
        8 => DataBits::Eight,
        other => anyhow::bail!("Unsupported bytesize: {}", other),
    })
}

fn stop_bits(stopbits: u8) -> Result<StopBits> {
    Ok(match stopbits {
        1 => StopBits::One,
        2 => StopBits::Two,
        other => anyhow::bail!("Unsupported stopbits: {}", other),
    })
}

/// Translate the serial settings into a port builder.
pub fn serial_builder(config: &SerialConfig) -> Result<SerialPortBuilder> {
    Ok(tokio_serial::new(&config.port, config.baudrate)
        .data_bits(data_bits(config.bytesize)?)
        .parity(config.parity.into())
        .stop_bits(stop_bits(config.stopbits)?)
        .timeout(config.timeout_duration()?))
}

/// Open the serial port for asynchronous use.
///
/// Must be called from within a Tokio runtime.
pub fn open_serial(config: &SerialConfig) -> Result<SerialStream> {
    let stream = serial_builder(config)?
        .open_native_async()
        .with_context(|| format!("Failed to open serial port {}", config.port))?;
    info!(
        "Opened serial port {} ({} baud, {}{}{})",
        config.port,
        config.baudrate,
        config.bytesize,
        parity_letter(config.parity),
        config.stopbits
    );
    Ok(stream)
}

fn parity_letter(parity: Parity) -> char {
    match parity {
        Parity::None => 'N',
        Parity::Even => 'E',
        Parity::Odd => 'O',
    }
}

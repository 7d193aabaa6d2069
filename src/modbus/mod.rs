// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sbc-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus communication module
//!
//! This module exposes the register store to the PLC. The bridge acts as a
//! Modbus slave: over RTU on the serial line, and optionally over Modbus TCP
//! for bench work.
//!
//! ## Key Components
//!
//! - [`BridgeModbusService`]: maps decoded Modbus requests onto the
//!   [`InstrumentedAccessor`](crate::registers::InstrumentedAccessor)
//! - [`serial`]: serial port setup for the RTU server
//!
//! ## Usage
//!
//! The servers are started as part of the application daemon:
//!
//! ```no_run
//! use rust_sbc_bridge::config::Config;
//! use rust_sbc_bridge::daemon::launch_daemon::Daemon;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::default();
//! let mut daemon = Daemon::from_config(&config)?;
//! daemon.launch(&config).await?;
//! # Ok(())
//! # }
//! ```

pub mod modbus_server;
pub mod serial;

pub use modbus_server::BridgeModbusService;

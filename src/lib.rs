// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sbc-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rust SBC bridge library
//!
//! A single-board computer sits on the serial line of a Delta DVP controller
//! and answers its Modbus RTU requests as a slave. Every access the controller
//! makes is logged, and the same register tables are exposed through a small
//! web console where an operator can watch and override values live.
//!
//! - [`registers`]: the shared register store and its audited accessor
//! - [`modbus`]: Modbus service for the RTU (and optional TCP) servers
//! - [`web`]: Rocket HTTP API and control page
//! - [`daemon`]: lifecycle of the background servers
//! - [`config`], [`cli`], [`logging`]: process plumbing

pub mod cli;
pub mod config;
pub mod daemon;
pub mod logging;
pub mod modbus;
pub mod registers;
pub mod web;

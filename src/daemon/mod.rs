// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sbc-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Daemon Module
//!
//! Starts, supervises and stops the bridge front-ends. See
//! [`launch_daemon::Daemon`].

pub mod launch_daemon;

pub use launch_daemon::Daemon;

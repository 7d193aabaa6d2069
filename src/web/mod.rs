// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sbc-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Web register console
//!
//! A Rocket server exposing the register store over HTTP:
//!
//! | Route | Description |
//! |-------|-------------|
//! | `GET /`, `GET /index.html` | embedded control page |
//! | `GET /api/state` | snapshot of all four tables |
//! | `POST /api/write` | write a contiguous range of one table |
//!
//! Errors, including unknown routes, are answered with
//! `{"error": <message>, "status": <code>}`.

pub mod api;
pub mod request_log;
pub mod server;

pub use api::{ApiError, WriteRequest};
pub use server::build_rocket;

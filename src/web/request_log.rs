// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sbc-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! HTTP request logging
//!
//! One `info` line per request on the `web` log target, in the usual
//! "client - method uri status" layout.

use log::info;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Request, Response};

/// Log target used for HTTP request records.
pub const WEB_LOG_TARGET: &str = "web";

/// Fairing logging every answered request.
pub struct RequestLogger;

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Log HTTP requests",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let client = request
            .client_ip()
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "-".to_string());
        info!(
            target: WEB_LOG_TARGET,
            "{} - \"{} {}\" {}",
            client,
            request.method(),
            request.uri(),
            response.status().code
        );
    }
}

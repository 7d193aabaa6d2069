// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sbc-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rocket server builder, static page and error catchers

use std::sync::Arc;

use include_dir::{include_dir, Dir};
use log::debug;
use rocket::figment::Figment;
use rocket::http::{ContentType, Status};
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{catch, catchers, get, routes, Build, Request, Rocket};

use super::api::{get_state, post_write, ErrorBody};
use super::request_log::RequestLogger;
use crate::registers::InstrumentedAccessor;

/// Static files of the register console, embedded in the binary.
const STATIC_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/static");

/// The embedded control page.
#[derive(Debug)]
pub struct IndexPage(pub &'static [u8]);

impl<'r> rocket::response::Responder<'r, 'static> for IndexPage {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'static> {
        (ContentType::HTML, self.0).respond_to(req)
    }
}

fn index_page() -> Option<IndexPage> {
    STATIC_DIR
        .get_file("index.html")
        .map(|file| IndexPage(file.contents()))
}

/// Serve the control page at the root path.
#[get("/")]
pub fn index() -> Option<IndexPage> {
    index_page()
}

#[get("/index.html")]
pub fn index_html() -> Option<IndexPage> {
    index_page()
}

#[catch(404)]
fn not_found() -> status::Custom<Json<ErrorBody>> {
    ErrorBody::new(Status::NotFound, "Not Found")
}

/// Render any other error status as the same JSON body.
#[catch(default)]
fn default_catcher(status: Status, _req: &Request<'_>) -> status::Custom<Json<ErrorBody>> {
    ErrorBody::new(status, status.reason().unwrap_or("Unknown Error"))
}

/// Build a configured Rocket server instance
///
/// The accessor is managed as Rocket state and shared with the Modbus
/// servers, so writes from either side are visible to the other.
///
/// ### Example
///
/// ```no_run
/// use std::sync::Arc;
/// use rust_sbc_bridge::registers::{InstrumentedAccessor, LogAccessRecorder, RegisterStore};
/// use rust_sbc_bridge::web::build_rocket;
///
/// # async fn run() -> anyhow::Result<()> {
/// let store = Arc::new(RegisterStore::new(128, 1)?);
/// let accessor = Arc::new(InstrumentedAccessor::new(store, Arc::new(LogAccessRecorder)));
/// let figment = rocket::Config::figment().merge(("port", 8080));
/// build_rocket(figment, accessor).launch().await?;
/// # Ok(())
/// # }
/// ```
pub fn build_rocket(figment: Figment, accessor: Arc<InstrumentedAccessor>) -> Rocket<Build> {
    debug!(
        "Building web server for unit {} ({} data points)",
        accessor.unit_id(),
        accessor.data_points()
    );
    rocket::custom(figment)
        .attach(RequestLogger)
        .mount("/", routes![index, index_html, get_state, post_write])
        .register("/", catchers![not_found, default_catcher])
        .manage(accessor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_page_is_embedded() {
        let page = index_page().unwrap();
        let html = String::from_utf8_lossy(page.0);
        assert!(html.contains("/api/state"));
        assert!(html.contains("/api/write"));
    }
}

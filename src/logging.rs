// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sbc-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Logger initialization
//!
//! `env_logger` is set up once from `main`. `RUST_LOG` is read first and the
//! `--log-level` option is applied on top of it. Two record layouts exist:
//!
//! - text: `2025-01-01T12:00:00.000Z [INFO] access: Read coils starting at 0 (len=8)`
//! - JSON: one object per line with `time`, `level`, `name` and `message`

use std::io::Write;

use chrono::{SecondsFormat, Utc};
use log::LevelFilter;

/// Install the global logger.
///
/// Calling it a second time is harmless: the later call is ignored.
pub fn init(level: LevelFilter, json: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(level);

    if json {
        builder.format(|buf, record| {
            let line = json_log_line(
                &timestamp(),
                record.level().as_str(),
                record.target(),
                &record.args().to_string(),
            );
            writeln!(buf, "{line}")
        });
    } else {
        builder.format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}: {}",
                timestamp(),
                record.level(),
                record.target(),
                record.args()
            )
        });
    }

    let _ = builder.try_init();
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Render a single JSON log record.
pub fn json_log_line(time: &str, level: &str, name: &str, message: &str) -> String {
    serde_json::json!({
        "time": time,
        "level": level,
        "name": name,
        "message": message,
    })
    .to_string()
}

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sbc-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Audit trail of register accesses
//!
//! Every successful read or write performed through the
//! [`InstrumentedAccessor`](super::InstrumentedAccessor) produces an
//! [`AccessEvent`] which is handed to an [`AccessRecorder`]. The default
//! recorder, [`LogAccessRecorder`], emits one `info` record per event on the
//! `access` log target.

use log::info;

use super::RegisterTable;

/// Log target used for access records.
pub const ACCESS_LOG_TARGET: &str = "access";

/// What kind of access was performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessKind {
    Read { count: usize },
    Write { values: Vec<u16> },
}

/// A single successful access to the register store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessEvent {
    pub table: RegisterTable,
    pub address: usize,
    pub kind: AccessKind,
}

impl AccessEvent {
    pub fn read(table: RegisterTable, address: usize, count: usize) -> Self {
        Self {
            table,
            address,
            kind: AccessKind::Read { count },
        }
    }

    pub fn write(table: RegisterTable, address: usize, values: &[u16]) -> Self {
        Self {
            table,
            address,
            kind: AccessKind::Write {
                values: values.to_vec(),
            },
        }
    }

    /// Human readable form written to the access log.
    pub fn message(&self) -> String {
        match &self.kind {
            AccessKind::Read { count } => {
                format!("Read {} starting at {} (len={})", self.table, self.address, count)
            }
            AccessKind::Write { values } => {
                format!("Wrote {} starting at {}: {:?}", self.table, self.address, values)
            }
        }
    }
}

/// Observer of register accesses.
///
/// `record` is called while the store lock is held, so implementations must be
/// quick and must not call back into the accessor.
pub trait AccessRecorder: Send + Sync {
    fn record(&self, event: &AccessEvent);
}

/// Recorder writing each event to the `access` log target at `info` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAccessRecorder;

impl AccessRecorder for LogAccessRecorder {
    fn record(&self, event: &AccessEvent) {
        info!(target: ACCESS_LOG_TARGET, "{}", event.message());
    }
}

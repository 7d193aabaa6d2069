// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sbc-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register store shared by the Modbus and web front-ends
//!
//! The store holds the four Modbus tables of the single emulated unit. Nothing
//! outside this module touches table contents directly: both front-ends go
//! through an [`InstrumentedAccessor`], which validates each access against
//! the store and reports it to an [`AccessRecorder`].
//!
//! ## Key Components
//!
//! - [`RegisterStore`]: fixed-size tables behind a single lock
//! - [`AccessRecorder`] / [`LogAccessRecorder`]: audit trail of accesses
//! - [`InstrumentedAccessor`]: the only read/write path used by the front-ends
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use rust_sbc_bridge::registers::{
//!     InstrumentedAccessor, LogAccessRecorder, RegisterStore, RegisterTable,
//! };
//!
//! let store = Arc::new(RegisterStore::new(8, 1).unwrap());
//! let accessor = InstrumentedAccessor::new(store, Arc::new(LogAccessRecorder));
//! accessor.write(RegisterTable::HoldingRegisters, 2, &[42]).unwrap();
//! assert_eq!(accessor.read(RegisterTable::HoldingRegisters, 2, 1).unwrap(), vec![42]);
//! ```

pub mod access_log;
pub mod accessor;
pub mod store;
pub mod table;

pub use access_log::{AccessEvent, AccessKind, AccessRecorder, LogAccessRecorder};
pub use accessor::InstrumentedAccessor;
pub use store::{RegisterStore, StoreSnapshot, TableSnapshot};
pub use table::{RegisterTable, ValueWidth};

/// Default number of values in each table.
pub const DEFAULT_DATA_POINTS: usize = 128;

/// Upper bound on the table length.
pub const MAX_DATA_POINTS: usize = 4096;

/// Lowest valid Modbus unit id.
pub const MIN_UNIT_ID: u8 = 1;

/// Highest valid Modbus unit id.
pub const MAX_UNIT_ID: u8 = 247;

/// Errors raised by the register store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unknown table")]
    UnknownTable(String),

    #[error(
        "Access exceeds configured data size: {table} address {address} with {count} values \
         (data points: {len})"
    )]
    OutOfRange {
        table: RegisterTable,
        address: usize,
        count: usize,
        len: usize,
    },

    #[error("Value {value} is not valid for {table}")]
    InvalidValue { table: RegisterTable, value: u16 },
}

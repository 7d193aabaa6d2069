// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sbc-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Fixed-size register tables
//!
//! All four tables live behind one `Mutex`. Tables are tiny (at most
//! [`MAX_DATA_POINTS`] entries), so a single coarse lock keeps every access and
//! every snapshot consistent across tables at negligible cost.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use super::{RegisterTable, StoreError, ValueWidth, MAX_DATA_POINTS, MAX_UNIT_ID, MIN_UNIT_ID};

/// Storage for one table, typed by its value width.
#[derive(Debug, Clone)]
enum TableValues {
    Bits(Vec<bool>),
    Words(Vec<u16>),
}

impl TableValues {
    fn zeroed(width: ValueWidth, len: usize) -> Self {
        match width {
            ValueWidth::Bit => TableValues::Bits(vec![false; len]),
            ValueWidth::Word => TableValues::Words(vec![0; len]),
        }
    }

    fn len(&self) -> usize {
        match self {
            TableValues::Bits(bits) => bits.len(),
            TableValues::Words(words) => words.len(),
        }
    }

    fn copy_range(&self, start: usize, end: usize) -> Vec<u16> {
        match self {
            TableValues::Bits(bits) => bits[start..end].iter().map(|&b| u16::from(b)).collect(),
            TableValues::Words(words) => words[start..end].to_vec(),
        }
    }

    fn overwrite(&mut self, start: usize, values: &[u16]) {
        match self {
            TableValues::Bits(bits) => {
                for (slot, value) in bits[start..].iter_mut().zip(values) {
                    *slot = *value != 0;
                }
            }
            TableValues::Words(words) => {
                words[start..start + values.len()].copy_from_slice(values);
            }
        }
    }
}

/// The four tables of the emulated unit, as seen while holding the store lock.
#[derive(Debug)]
pub struct RegisterTables {
    banks: [TableValues; 4],
}

impl RegisterTables {
    fn new(data_points: usize) -> Self {
        Self {
            banks: RegisterTable::ALL.map(|table| TableValues::zeroed(table.width(), data_points)),
        }
    }

    fn bank(&self, table: RegisterTable) -> &TableValues {
        &self.banks[table.index()]
    }

    /// Check that `count` entries starting at `address` fit in `table`.
    pub fn check_range(
        &self,
        table: RegisterTable,
        address: usize,
        count: usize,
    ) -> Result<(), StoreError> {
        let len = self.bank(table).len();
        match address.checked_add(count) {
            Some(end) if end <= len => Ok(()),
            _ => Err(StoreError::OutOfRange {
                table,
                address,
                count,
                len,
            }),
        }
    }

    /// Check range and value width of a prospective write without applying it.
    pub fn check_write(
        &self,
        table: RegisterTable,
        address: usize,
        values: &[u16],
    ) -> Result<(), StoreError> {
        self.check_range(table, address, values.len())?;
        let max = table.width().max_value();
        if let Some(&value) = values.iter().find(|&&value| value > max) {
            return Err(StoreError::InvalidValue { table, value });
        }
        Ok(())
    }

    /// Copy `count` values starting at `address`.
    pub fn get(
        &self,
        table: RegisterTable,
        address: usize,
        count: usize,
    ) -> Result<Vec<u16>, StoreError> {
        self.check_range(table, address, count)?;
        Ok(self.bank(table).copy_range(address, address + count))
    }

    /// Overwrite `values.len()` contiguous entries starting at `address`.
    ///
    /// The whole write is validated before the first entry changes.
    pub fn set(
        &mut self,
        table: RegisterTable,
        address: usize,
        values: &[u16],
    ) -> Result<(), StoreError> {
        self.check_write(table, address, values)?;
        self.banks[table.index()].overwrite(address, values);
        Ok(())
    }

    fn copy_all(&self) -> TableSnapshot {
        let copy = |table: RegisterTable| {
            let bank = self.bank(table);
            bank.copy_range(0, bank.len())
        };
        TableSnapshot {
            discrete_inputs: copy(RegisterTable::DiscreteInputs),
            coils: copy(RegisterTable::Coils),
            holding_registers: copy(RegisterTable::HoldingRegisters),
            input_registers: copy(RegisterTable::InputRegisters),
        }
    }
}

/// Copied contents of the four tables. Bit tables are reported as 0/1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSnapshot {
    pub discrete_inputs: Vec<u16>,
    pub coils: Vec<u16>,
    pub holding_registers: Vec<u16>,
    pub input_registers: Vec<u16>,
}

impl TableSnapshot {
    pub fn table(&self, table: RegisterTable) -> &[u16] {
        match table {
            RegisterTable::DiscreteInputs => &self.discrete_inputs,
            RegisterTable::Coils => &self.coils,
            RegisterTable::HoldingRegisters => &self.holding_registers,
            RegisterTable::InputRegisters => &self.input_registers,
        }
    }
}

/// Point-in-time copy of the whole store, as served by `GET /api/state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub tables: TableSnapshot,
    pub data_points: usize,
    pub unit_id: u8,
}

/// Register tables of one Modbus unit.
///
/// The store is created once at startup and lives for the whole process.
/// Reads and writes only go through
/// [`InstrumentedAccessor`](super::InstrumentedAccessor), which holds the lock
/// while it records each access.
#[derive(Debug)]
pub struct RegisterStore {
    data_points: usize,
    unit_id: u8,
    tables: Mutex<RegisterTables>,
}

impl RegisterStore {
    /// Create a store with `data_points` zeroed entries in each table.
    ///
    /// ### Errors
    ///
    /// Returns [`StoreError::InvalidConfiguration`] if `data_points` is not in
    /// `1..=4096` or `unit_id` is not in `1..=247`.
    pub fn new(data_points: usize, unit_id: u8) -> Result<Self, StoreError> {
        if !(1..=MAX_DATA_POINTS).contains(&data_points) {
            return Err(StoreError::InvalidConfiguration(format!(
                "data_points must be between 1 and {MAX_DATA_POINTS}, got {data_points}"
            )));
        }
        if !(MIN_UNIT_ID..=MAX_UNIT_ID).contains(&unit_id) {
            return Err(StoreError::InvalidConfiguration(format!(
                "unit_id must be between {MIN_UNIT_ID} and {MAX_UNIT_ID}, got {unit_id}"
            )));
        }
        Ok(Self {
            data_points,
            unit_id,
            tables: Mutex::new(RegisterTables::new(data_points)),
        })
    }

    pub fn data_points(&self) -> usize {
        self.data_points
    }

    pub fn unit_id(&self) -> u8 {
        self.unit_id
    }

    /// Acquire the store lock.
    ///
    /// Validation precedes every mutation, so a panic while the lock is held
    /// can never leave a half-applied write behind and poisoning is ignored.
    pub(crate) fn lock(&self) -> MutexGuard<'_, RegisterTables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn get(
        &self,
        table: RegisterTable,
        address: usize,
        count: usize,
    ) -> Result<Vec<u16>, StoreError> {
        self.lock().get(table, address, count)
    }

    #[cfg(test)]
    fn set(&self, table: RegisterTable, address: usize, values: &[u16]) -> Result<(), StoreError> {
        self.lock().set(table, address, values)
    }

    /// Copy all four tables under a single lock acquisition.
    pub fn snapshot(&self) -> StoreSnapshot {
        let tables = self.lock().copy_all();
        StoreSnapshot {
            tables,
            data_points: self.data_points,
            unit_id: self.unit_id,
        }
    }
}

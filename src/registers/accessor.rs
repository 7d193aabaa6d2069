// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sbc-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Audited access path to the register store

use std::sync::Arc;

use log::debug;

use super::{
    AccessEvent, AccessRecorder, RegisterStore, RegisterTable, StoreError, StoreSnapshot,
};

/// Composes a [`RegisterStore`] with an [`AccessRecorder`].
///
/// Both the Modbus service and the web API hold an `Arc` to the same accessor.
/// Each operation takes the store lock once, validates, applies, and records
/// the resulting events before releasing the lock, so the order of the access
/// log is the order in which the store was actually touched.
pub struct InstrumentedAccessor {
    store: Arc<RegisterStore>,
    recorder: Arc<dyn AccessRecorder>,
}

impl InstrumentedAccessor {
    pub fn new(store: Arc<RegisterStore>, recorder: Arc<dyn AccessRecorder>) -> Self {
        Self { store, recorder }
    }

    pub fn data_points(&self) -> usize {
        self.store.data_points()
    }

    pub fn unit_id(&self) -> u8 {
        self.store.unit_id()
    }

    /// Read `count` values from `table` and record the access.
    pub fn read(
        &self,
        table: RegisterTable,
        address: usize,
        count: usize,
    ) -> Result<Vec<u16>, StoreError> {
        let tables = self.store.lock();
        let values = tables.get(table, address, count)?;
        self.recorder.record(&AccessEvent::read(table, address, count));
        Ok(values)
    }

    /// Write `values` to `table` and record the access.
    ///
    /// An empty write is still range checked but changes nothing, so it is not
    /// recorded.
    pub fn write(
        &self,
        table: RegisterTable,
        address: usize,
        values: &[u16],
    ) -> Result<(), StoreError> {
        let mut tables = self.store.lock();
        tables.set(table, address, values)?;
        if !values.is_empty() {
            self.recorder.record(&AccessEvent::write(table, address, values));
        }
        Ok(())
    }

    /// Write then read holding registers as one atomic operation (function 0x17).
    ///
    /// Both ranges are validated before anything is written.
    pub fn read_write_registers(
        &self,
        read_address: usize,
        count: usize,
        write_address: usize,
        values: &[u16],
    ) -> Result<Vec<u16>, StoreError> {
        let table = RegisterTable::HoldingRegisters;
        let mut tables = self.store.lock();
        tables.check_range(table, read_address, count)?;
        tables.set(table, write_address, values)?;
        self.recorder.record(&AccessEvent::write(table, write_address, values));
        let read = tables.get(table, read_address, count)?;
        self.recorder.record(&AccessEvent::read(table, read_address, count));
        Ok(read)
    }

    /// Apply `(current & and_mask) | (or_mask & !and_mask)` to one holding
    /// register (function 0x16) and return the stored result.
    pub fn mask_write_register(
        &self,
        address: usize,
        and_mask: u16,
        or_mask: u16,
    ) -> Result<u16, StoreError> {
        let table = RegisterTable::HoldingRegisters;
        let mut tables = self.store.lock();
        let current = tables.get(table, address, 1)?[0];
        let value = (current & and_mask) | (or_mask & !and_mask);
        tables.set(table, address, &[value])?;
        self.recorder.record(&AccessEvent::write(table, address, &[value]));
        Ok(value)
    }

    /// Full copy of the store. Not recorded as an access.
    pub fn snapshot(&self) -> StoreSnapshot {
        debug!("Taking register snapshot");
        self.store.snapshot()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::registers::AccessKind;

    /// Recorder keeping every event in memory.
    #[derive(Default)]
    pub(crate) struct MemoryRecorder {
        pub(crate) events: Mutex<Vec<AccessEvent>>,
    }

    impl AccessRecorder for MemoryRecorder {
        fn record(&self, event: &AccessEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    fn accessor(data_points: usize) -> (InstrumentedAccessor, Arc<MemoryRecorder>) {
        let recorder = Arc::new(MemoryRecorder::default());
        let store = Arc::new(RegisterStore::new(data_points, 1).unwrap());
        (InstrumentedAccessor::new(store, recorder.clone()), recorder)
    }

    #[test]
    fn records_reads_and_writes_in_order() {
        let (accessor, recorder) = accessor(8);
        accessor.write(RegisterTable::Coils, 1, &[1, 1]).unwrap();
        assert_eq!(accessor.read(RegisterTable::Coils, 0, 3).unwrap(), vec![0, 1, 1]);

        let events = recorder.events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                AccessEvent::write(RegisterTable::Coils, 1, &[1, 1]),
                AccessEvent::read(RegisterTable::Coils, 0, 3),
            ]
        );
    }

    #[test]
    fn failed_accesses_are_not_recorded() {
        let (accessor, recorder) = accessor(4);
        assert!(accessor.read(RegisterTable::InputRegisters, 3, 2).is_err());
        assert!(accessor.write(RegisterTable::DiscreteInputs, 0, &[5]).is_err());
        assert!(recorder.events.lock().unwrap().is_empty());
    }

    #[test]
    fn empty_write_is_a_silent_no_op() {
        let (accessor, recorder) = accessor(4);
        accessor.write(RegisterTable::Coils, 4, &[]).unwrap();
        assert!(recorder.events.lock().unwrap().is_empty());
        assert_eq!(accessor.snapshot().tables.coils, vec![0; 4]);

        let err = accessor.write(RegisterTable::Coils, 5, &[]).unwrap_err();
        assert!(matches!(err, StoreError::OutOfRange { .. }));
    }

    #[test]
    fn snapshot_is_not_recorded() {
        let (accessor, recorder) = accessor(4);
        let snapshot = accessor.snapshot();
        assert_eq!(snapshot.data_points, 4);
        assert!(recorder.events.lock().unwrap().is_empty());
    }

    #[test]
    fn mask_write_combines_masks() {
        let (accessor, recorder) = accessor(4);
        accessor.write(RegisterTable::HoldingRegisters, 0, &[0x12]).unwrap();
        let value = accessor.mask_write_register(0, 0xF2, 0x25).unwrap();
        assert_eq!(value, 0x17);
        assert_eq!(accessor.read(RegisterTable::HoldingRegisters, 0, 1).unwrap(), vec![0x17]);

        let events = recorder.events.lock().unwrap();
        assert_eq!(
            events[1].kind,
            AccessKind::Write {
                values: vec![0x17]
            }
        );
    }

    #[test]
    fn read_write_writes_before_reading() {
        let (accessor, recorder) = accessor(8);
        let read = accessor.read_write_registers(0, 4, 2, &[9, 8]).unwrap();
        assert_eq!(read, vec![0, 0, 9, 8]);

        let events = recorder.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0].kind, AccessKind::Write { .. }));
        assert!(matches!(events[1].kind, AccessKind::Read { count: 4 }));
    }

    #[test]
    fn read_write_rejects_bad_read_range_without_writing() {
        let (accessor, recorder) = accessor(4);
        let err = accessor.read_write_registers(2, 4, 0, &[1]).unwrap_err();
        assert!(matches!(err, StoreError::OutOfRange { .. }));
        assert_eq!(accessor.snapshot().tables.holding_registers, vec![0; 4]);
        assert!(recorder.events.lock().unwrap().is_empty());
    }
}

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sbc-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus slave service backed by the register store
//!
//! To avoid the master/slave confusion, the code below calls the PLC the
//! client and this bridge the server. The PLC is the Modbus master that sends
//! requests, the bridge is the Modbus slave that answers them.
//!
//! The same [`BridgeModbusService`] is used by the RTU server on the serial
//! line and by the optional Modbus TCP listener. Framing, CRC and PDU decoding
//! are done by `tokio-modbus`; this module only maps decoded requests onto the
//! [`InstrumentedAccessor`].
//!
//! ## Supported function codes
//!
//! | Code | Request | Table |
//! |------|---------|-------|
//! | 0x01 | Read Coils | coils |
//! | 0x02 | Read Discrete Inputs | discrete_inputs |
//! | 0x03 | Read Holding Registers | holding_registers |
//! | 0x04 | Read Input Registers | input_registers |
//! | 0x05 | Write Single Coil | coils |
//! | 0x06 | Write Single Register | holding_registers |
//! | 0x0F | Write Multiple Coils | coils |
//! | 0x10 | Write Multiple Registers | holding_registers |
//! | 0x16 | Mask Write Register | holding_registers |
//! | 0x17 | Read/Write Multiple Registers | holding_registers |
//!
//! Any other function code is answered with `IllegalFunction`.
//!
//! Quantities outside the limits of the Modbus application protocol are
//! answered with `IllegalDataValue` before the store is touched, so the
//! response PDU always fits in 253 bytes.

use std::{future, sync::Arc};

use log::{debug, error, warn};
use tokio_modbus::prelude::*;

use crate::registers::{InstrumentedAccessor, RegisterTable, StoreError, ValueWidth};

/// Maximum quantity of coils or discrete inputs per read (0x01, 0x02)
pub const MAX_READ_BITS: usize = 2000;
/// Maximum quantity of registers per read (0x03, 0x04)
pub const MAX_READ_WORDS: usize = 125;
/// Maximum quantity of coils per write (0x0F)
pub const MAX_WRITE_BITS: usize = 1968;
/// Maximum quantity of registers per write (0x10)
pub const MAX_WRITE_WORDS: usize = 123;
/// Maximum quantity of registers written by a read/write request (0x17)
pub const MAX_READ_WRITE_WORDS: usize = 121;

/// Modbus service answering for the single configured unit id.
///
/// Requests addressed to any other unit id are dropped without a reply, as a
/// real slave sharing the bus would do.
#[derive(Clone)]
pub struct BridgeModbusService {
    accessor: Arc<InstrumentedAccessor>,
    unit_id: u8,
}

impl BridgeModbusService {
    pub fn new(accessor: Arc<InstrumentedAccessor>) -> Self {
        let unit_id = accessor.unit_id();
        Self { accessor, unit_id }
    }

    pub fn unit_id(&self) -> u8 {
        self.unit_id
    }

    /// Execute a request addressed to this unit.
    pub fn handle(&self, request: Request<'_>) -> Result<Response, ExceptionCode> {
        match request {
            Request::ReadCoils(addr, cnt) => self
                .read(RegisterTable::Coils, addr, cnt)
                .map(|values| Response::ReadCoils(to_coils(&values))),
            Request::ReadDiscreteInputs(addr, cnt) => self
                .read(RegisterTable::DiscreteInputs, addr, cnt)
                .map(|values| Response::ReadDiscreteInputs(to_coils(&values))),
            Request::ReadHoldingRegisters(addr, cnt) => self
                .read(RegisterTable::HoldingRegisters, addr, cnt)
                .map(Response::ReadHoldingRegisters),
            Request::ReadInputRegisters(addr, cnt) => self
                .read(RegisterTable::InputRegisters, addr, cnt)
                .map(Response::ReadInputRegisters),
            Request::WriteSingleCoil(addr, coil) => self
                .write(RegisterTable::Coils, addr, &[u16::from(coil)])
                .map(|()| Response::WriteSingleCoil(addr, coil)),
            Request::WriteSingleRegister(addr, value) => self
                .write(RegisterTable::HoldingRegisters, addr, &[value])
                .map(|()| Response::WriteSingleRegister(addr, value)),
            Request::WriteMultipleCoils(addr, coils) => {
                let values: Vec<u16> = coils.iter().map(|&coil| u16::from(coil)).collect();
                self.write(RegisterTable::Coils, addr, &values)
                    .map(|()| Response::WriteMultipleCoils(addr, values.len() as u16))
            }
            Request::WriteMultipleRegisters(addr, values) => self
                .write(RegisterTable::HoldingRegisters, addr, &values)
                .map(|()| Response::WriteMultipleRegisters(addr, values.len() as u16)),
            Request::MaskWriteRegister(addr, and_mask, or_mask) => self
                .accessor
                .mask_write_register(usize::from(addr), and_mask, or_mask)
                .map(|_| Response::MaskWriteRegister(addr, and_mask, or_mask))
                .map_err(exception_for),
            Request::ReadWriteMultipleRegisters(read_addr, cnt, write_addr, values) => {
                check_quantity(usize::from(cnt), MAX_READ_WORDS)?;
                check_quantity(values.len(), MAX_READ_WRITE_WORDS)?;
                self.accessor
                    .read_write_registers(
                        usize::from(read_addr),
                        usize::from(cnt),
                        usize::from(write_addr),
                        &values,
                    )
                    .map(Response::ReadWriteMultipleRegisters)
                    .map_err(exception_for)
            }
            request => {
                error!(
                    "Exception::IllegalFunction - Unimplemented function code in request: {request:?}"
                );
                Err(ExceptionCode::IllegalFunction)
            }
        }
    }

    fn read(&self, table: RegisterTable, addr: u16, cnt: u16) -> Result<Vec<u16>, ExceptionCode> {
        let limit = match table.width() {
            ValueWidth::Bit => MAX_READ_BITS,
            ValueWidth::Word => MAX_READ_WORDS,
        };
        check_quantity(usize::from(cnt), limit)?;
        self.accessor
            .read(table, usize::from(addr), usize::from(cnt))
            .map_err(exception_for)
    }

    fn write(&self, table: RegisterTable, addr: u16, values: &[u16]) -> Result<(), ExceptionCode> {
        let limit = match table.width() {
            ValueWidth::Bit => MAX_WRITE_BITS,
            ValueWidth::Word => MAX_WRITE_WORDS,
        };
        check_quantity(values.len(), limit)?;
        self.accessor
            .write(table, usize::from(addr), values)
            .map_err(exception_for)
    }
}

impl tokio_modbus::server::Service for BridgeModbusService {
    type Request = SlaveRequest<'static>;
    type Response = Option<Response>;
    type Exception = ExceptionCode;
    type Future = future::Ready<Result<Self::Response, Self::Exception>>;

    fn call(&self, req: Self::Request) -> Self::Future {
        if req.slave != self.unit_id {
            debug!(
                "Ignoring Modbus request for unit {} (serving unit {})",
                req.slave, self.unit_id
            );
            return future::ready(Ok(None));
        }

        debug!("Received Modbus request: {:?}", req.request);
        let res = self.handle(req.request);
        if let Err(e) = &res {
            warn!("Modbus request error: {e:?}");
        }
        future::ready(res.map(Some))
    }
}

/// Map a store error to the Modbus exception returned to the client.
pub fn exception_for(err: StoreError) -> ExceptionCode {
    match err {
        StoreError::OutOfRange { .. } => ExceptionCode::IllegalDataAddress,
        StoreError::InvalidValue { .. }
        | StoreError::UnknownTable(_)
        | StoreError::InvalidConfiguration(_) => ExceptionCode::IllegalDataValue,
    }
}

fn check_quantity(quantity: usize, limit: usize) -> Result<(), ExceptionCode> {
    if (1..=limit).contains(&quantity) {
        Ok(())
    } else {
        Err(ExceptionCode::IllegalDataValue)
    }
}

fn to_coils(values: &[u16]) -> Vec<bool> {
    values.iter().map(|&value| value != 0).collect()
}

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sbc-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! The four Modbus register tables and their value widths.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::StoreError;

/// Width of the values held by a register table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueWidth {
    /// Single-bit flag, stored as `0` or `1`.
    Bit,
    /// 16-bit unsigned word.
    Word,
}

impl ValueWidth {
    /// Largest value a table of this width accepts.
    pub fn max_value(self) -> u16 {
        match self {
            ValueWidth::Bit => 1,
            ValueWidth::Word => u16::MAX,
        }
    }
}

/// One of the four classic Modbus data tables.
///
/// The set is closed: a table name coming from the outside world is turned into
/// a `RegisterTable` with [`str::parse`], which is the only place an unknown
/// table can be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterTable {
    /// Read-only single-bit inputs (function code 0x02)
    DiscreteInputs,
    /// Read/write single-bit outputs (function codes 0x01, 0x05, 0x0F)
    Coils,
    /// Read/write 16-bit registers (function codes 0x03, 0x06, 0x10, 0x16, 0x17)
    HoldingRegisters,
    /// Read-only 16-bit registers (function code 0x04)
    InputRegisters,
}

impl RegisterTable {
    /// All tables, in the order they are reported by the web API.
    pub const ALL: [RegisterTable; 4] = [
        RegisterTable::DiscreteInputs,
        RegisterTable::Coils,
        RegisterTable::HoldingRegisters,
        RegisterTable::InputRegisters,
    ];

    /// Name used on the wire and in the access log.
    pub fn name(self) -> &'static str {
        match self {
            RegisterTable::DiscreteInputs => "discrete_inputs",
            RegisterTable::Coils => "coils",
            RegisterTable::HoldingRegisters => "holding_registers",
            RegisterTable::InputRegisters => "input_registers",
        }
    }

    pub fn width(self) -> ValueWidth {
        match self {
            RegisterTable::DiscreteInputs | RegisterTable::Coils => ValueWidth::Bit,
            RegisterTable::HoldingRegisters | RegisterTable::InputRegisters => ValueWidth::Word,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            RegisterTable::DiscreteInputs => 0,
            RegisterTable::Coils => 1,
            RegisterTable::HoldingRegisters => 2,
            RegisterTable::InputRegisters => 3,
        }
    }
}

impl fmt::Display for RegisterTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RegisterTable {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RegisterTable::ALL
            .into_iter()
            .find(|table| table.name() == s)
            .ok_or_else(|| StoreError::UnknownTable(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_table_name() {
        for table in RegisterTable::ALL {
            assert_eq!(table.name().parse::<RegisterTable>(), Ok(table));
        }
    }

    #[test]
    fn rejects_unknown_table_name() {
        let err = "unknown".parse::<RegisterTable>().unwrap_err();
        assert_eq!(err, StoreError::UnknownTable("unknown".to_string()));
        assert!("Coils".parse::<RegisterTable>().is_err());
    }

    #[test]
    fn bit_tables_and_word_tables() {
        assert_eq!(RegisterTable::Coils.width(), ValueWidth::Bit);
        assert_eq!(RegisterTable::DiscreteInputs.width(), ValueWidth::Bit);
        assert_eq!(RegisterTable::HoldingRegisters.width(), ValueWidth::Word);
        assert_eq!(RegisterTable::InputRegisters.width().max_value(), 65535);
    }

    #[test]
    fn indices_are_distinct() {
        let mut seen = [false; 4];
        for table in RegisterTable::ALL {
            assert!(!seen[table.index()]);
            seen[table.index()] = true;
        }
    }
}

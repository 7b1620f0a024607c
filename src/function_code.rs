//! Function code catalog.
//!
//! Maps raw function codes to their access class (read, single write,
//! multiple write), the unit they operate on and the data-type label shown
//! next to every decoded row. All lookups are pure and total.

use serde::Serialize;

pub const FC_READ_COILS: u8 = 0x01;
pub const FC_READ_DISCRETE_INPUTS: u8 = 0x02;
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;
pub const FC_READ_INPUT_REGISTERS: u8 = 0x04;
pub const FC_WRITE_SINGLE_COIL: u8 = 0x05;
pub const FC_WRITE_SINGLE_REGISTER: u8 = 0x06;
pub const FC_WRITE_MULTIPLE_COILS: u8 = 0x0F;
pub const FC_WRITE_MULTIPLE_REGISTERS: u8 = 0x10;

/// Function codes with the high bit set are exception responses.
pub const EXCEPTION_FLAG: u8 = 0x80;

const LABEL_COIL: &str = "Coil (binary)";
const LABEL_DISCRETE_INPUT: &str = "Discrete Input (binary)";
const LABEL_HOLDING_REGISTER: &str = "Holding Register (16 bit)";
const LABEL_INPUT_REGISTER: &str = "Input Register (16 bit)";
const LABEL_UNKNOWN: &str = "Unknown";

/// Width of one addressable unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum UnitSize {
    Bit,
    Word,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum FunctionCode {
    ReadCoils,
    ReadDiscreteInputs,
    ReadHoldingRegisters,
    ReadInputRegisters,
    WriteSingleCoil,
    WriteSingleRegister,
    WriteMultipleCoils,
    WriteMultipleRegisters,
    /// Any code outside the catalog. Carries no access flags.
    Unknown(u8),
}

impl FunctionCode {
    /// Every function code the catalog knows, in selector order.
    pub const ALL: [Self; 8] = [
        Self::ReadCoils,
        Self::ReadDiscreteInputs,
        Self::ReadHoldingRegisters,
        Self::ReadInputRegisters,
        Self::WriteSingleCoil,
        Self::WriteSingleRegister,
        Self::WriteMultipleCoils,
        Self::WriteMultipleRegisters,
    ];

    #[must_use]
    pub const fn from_u8(code: u8) -> Self {
        match code {
            FC_READ_COILS => Self::ReadCoils,
            FC_READ_DISCRETE_INPUTS => Self::ReadDiscreteInputs,
            FC_READ_HOLDING_REGISTERS => Self::ReadHoldingRegisters,
            FC_READ_INPUT_REGISTERS => Self::ReadInputRegisters,
            FC_WRITE_SINGLE_COIL => Self::WriteSingleCoil,
            FC_WRITE_SINGLE_REGISTER => Self::WriteSingleRegister,
            FC_WRITE_MULTIPLE_COILS => Self::WriteMultipleCoils,
            FC_WRITE_MULTIPLE_REGISTERS => Self::WriteMultipleRegisters,
            other => Self::Unknown(other),
        }
    }

    #[must_use]
    pub const fn value(self) -> u8 {
        match self {
            Self::ReadCoils => FC_READ_COILS,
            Self::ReadDiscreteInputs => FC_READ_DISCRETE_INPUTS,
            Self::ReadHoldingRegisters => FC_READ_HOLDING_REGISTERS,
            Self::ReadInputRegisters => FC_READ_INPUT_REGISTERS,
            Self::WriteSingleCoil => FC_WRITE_SINGLE_COIL,
            Self::WriteSingleRegister => FC_WRITE_SINGLE_REGISTER,
            Self::WriteMultipleCoils => FC_WRITE_MULTIPLE_COILS,
            Self::WriteMultipleRegisters => FC_WRITE_MULTIPLE_REGISTERS,
            Self::Unknown(code) => code,
        }
    }

    #[must_use]
    pub const fn is_read(self) -> bool {
        matches!(
            self,
            Self::ReadCoils
                | Self::ReadDiscreteInputs
                | Self::ReadHoldingRegisters
                | Self::ReadInputRegisters
        )
    }

    #[must_use]
    pub const fn is_write_single(self) -> bool {
        matches!(self, Self::WriteSingleCoil | Self::WriteSingleRegister)
    }

    #[must_use]
    pub const fn is_write_multiple(self) -> bool {
        matches!(self, Self::WriteMultipleCoils | Self::WriteMultipleRegisters)
    }

    #[must_use]
    pub const fn is_write(self) -> bool {
        self.is_write_single() || self.is_write_multiple()
    }

    /// `None` for codes outside the catalog.
    #[must_use]
    pub const fn unit_size(self) -> Option<UnitSize> {
        match self {
            Self::ReadCoils
            | Self::ReadDiscreteInputs
            | Self::WriteSingleCoil
            | Self::WriteMultipleCoils => Some(UnitSize::Bit),
            Self::ReadHoldingRegisters
            | Self::ReadInputRegisters
            | Self::WriteSingleRegister
            | Self::WriteMultipleRegisters => Some(UnitSize::Word),
            Self::Unknown(_) => None,
        }
    }

    /// Data-type label shared by the read and write variants of a register class.
    #[must_use]
    pub const fn data_type_label(self) -> &'static str {
        match self {
            Self::ReadCoils | Self::WriteSingleCoil | Self::WriteMultipleCoils => LABEL_COIL,
            Self::ReadDiscreteInputs => LABEL_DISCRETE_INPUT,
            Self::ReadHoldingRegisters
            | Self::WriteSingleRegister
            | Self::WriteMultipleRegisters => LABEL_HOLDING_REGISTER,
            Self::ReadInputRegisters => LABEL_INPUT_REGISTER,
            Self::Unknown(_) => LABEL_UNKNOWN,
        }
    }

    /// Human readable operation name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ReadCoils => "Read Coils",
            Self::ReadDiscreteInputs => "Read Discrete Inputs",
            Self::ReadHoldingRegisters => "Read Holding Registers",
            Self::ReadInputRegisters => "Read Input Registers",
            Self::WriteSingleCoil => "Write Single Coil",
            Self::WriteSingleRegister => "Write Single Register",
            Self::WriteMultipleCoils => "Write Multiple Coils",
            Self::WriteMultipleRegisters => "Write Multiple Registers",
            Self::Unknown(_) => "Unknown",
        }
    }

    /// Selector text, e.g. `Read Holding Registers (0x03)`.
    #[must_use]
    pub fn label(self) -> String {
        format!("{} (0x{:02x})", self.name(), self.value())
    }

    /// The hex display toggle only applies to register reads.
    #[must_use]
    pub const fn supports_hex_view(self) -> bool {
        matches!(self, Self::ReadHoldingRegisters | Self::ReadInputRegisters)
    }

    /// Number of editable value rows a write table needs for `quantity`.
    #[must_use]
    pub const fn editable_rows(self, quantity: u16) -> usize {
        if self.is_write_single() {
            1
        } else if self.is_write_multiple() {
            quantity as usize
        } else {
            0
        }
    }
}

impl From<u8> for FunctionCode {
    fn from(code: u8) -> Self {
        Self::from_u8(code)
    }
}

impl From<FunctionCode> for u8 {
    fn from(fc: FunctionCode) -> Self {
        fc.value()
    }
}

impl std::fmt::Display for FunctionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// Total lookup of a raw function code.
#[must_use]
pub const fn classify(code: u8) -> FunctionCode {
    FunctionCode::from_u8(code)
}

/// Fixed data-type label for a raw function code; `Unknown` outside the catalog.
#[must_use]
pub const fn describe(code: u8) -> &'static str {
    classify(code).data_type_label()
}

/// Extract the function code from a selector label such as
/// `Write Multiple Coils (0x0f)`. The text between the first `(` and the
/// following `)` is read as hex, with or without a `0x` prefix.
#[must_use]
pub fn parse_selector_label(label: &str) -> Option<FunctionCode> {
    let inner = label.split_once('(')?.1;
    let inner = inner.split(')').next()?.trim();
    let digits = inner
        .strip_prefix("0x")
        .or_else(|| inner.strip_prefix("0X"))
        .unwrap_or(inner);
    u8::from_str_radix(digits, 16).ok().map(classify)
}

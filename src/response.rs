use serde::Serialize;

use crate::config::config as global_config;
use crate::float16;
use crate::function_code::{FunctionCode, UnitSize};

/// Units returned by a read, as delivered by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    /// Raw unit values; bits are stored as 0/1.
    pub values: Vec<u16>,
    pub unit: UnitSize,
}

impl Response {
    #[must_use]
    pub fn from_bits(bits: &[bool]) -> Self {
        Self {
            values: bits.iter().map(|b| u16::from(*b)).collect(),
            unit: UnitSize::Bit,
        }
    }

    #[must_use]
    pub const fn from_words(words: Vec<u16>) -> Self {
        Self {
            values: words,
            unit: UnitSize::Word,
        }
    }

    /// Number of units the transport actually returned.
    #[must_use]
    pub fn matched_count(&self) -> usize {
        self.values.len()
    }

    /// One decoded row per unit, addressed from `start_address`.
    #[must_use]
    pub fn decode(
        &self,
        function: FunctionCode,
        start_address: u16,
        hex_display: bool,
    ) -> Vec<DecodedRegister> {
        let precision = global_config().float_precision;
        let label = function.data_type_label();
        let is_word = self.unit == UnitSize::Word;
        let hex = hex_display && is_word;
        self.values
            .iter()
            .enumerate()
            .map(|(offset, &raw)| {
                // offsets above u16::MAX are impossible for a u16 quantity
                let address = start_address.wrapping_add(offset as u16);
                let display_value = if hex {
                    format!("0x{raw:04x}")
                } else {
                    raw.to_string()
                };
                let float_value = is_word.then(|| float16::decode(raw));
                DecodedRegister {
                    data_type_label: label,
                    address,
                    raw_value: raw,
                    display_value,
                    float_value,
                    float_text: if is_word {
                        float16::decode_to_string(raw, precision)
                    } else {
                        String::new()
                    },
                }
            })
            .collect()
    }
}

/// One row of the register table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DecodedRegister {
    pub data_type_label: &'static str,
    pub address: u16,
    pub raw_value: u16,
    /// Decimal, or `0x%04x` when hex display was requested for a register.
    pub display_value: String,
    /// Half-precision interpretation; only present for 16-bit registers.
    pub float_value: Option<f32>,
    /// `float_value` in fixed-point notation, empty for bits.
    pub float_text: String,
}

/// Placeholder text shown in the float column before anything was read.
pub const FLOAT_PLACEHOLDER: &str = " - ";

/// Blank rows for the register view of `function` at `start_address`: values
/// start at 0 and the float column holds [`FLOAT_PLACEHOLDER`]. Writes get one
/// row per value to enter; reads get none until a response arrives.
#[must_use]
pub fn blank_rows(
    function: FunctionCode,
    start_address: u16,
    quantity: u16,
) -> Vec<DecodedRegister> {
    let rows = function.editable_rows(quantity);
    (0..rows)
        .map(|i| DecodedRegister {
            data_type_label: function.data_type_label(),
            address: start_address.wrapping_add(i as u16),
            raw_value: 0,
            display_value: "0".to_string(),
            float_value: None,
            float_text: FLOAT_PLACEHOLDER.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_rows_with_hex_and_float() {
        let resp = Response::from_words(vec![0x3C00, 0x000A]);
        assert_eq!(resp.matched_count(), 2);
        let rows = resp.decode(FunctionCode::ReadHoldingRegisters, 100, true);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].data_type_label, "Holding Register (16 bit)");
        assert_eq!(rows[0].address, 100);
        assert_eq!(rows[0].display_value, "0x3c00");
        assert_eq!(rows[0].float_value, Some(1.0));
        assert_eq!(rows[1].address, 101);
        assert_eq!(rows[1].display_value, "0x000a");
    }

    #[test]
    fn decimal_when_hex_not_requested() {
        let rows =
            Response::from_words(vec![513]).decode(FunctionCode::ReadInputRegisters, 0, false);
        assert_eq!(rows[0].display_value, "513");
        assert_eq!(rows[0].data_type_label, "Input Register (16 bit)");
    }

    #[test]
    fn bits_ignore_hex_and_float() {
        let rows = Response::from_bits(&[true, false]).decode(FunctionCode::ReadCoils, 7, true);
        assert_eq!(rows[0].display_value, "1");
        assert_eq!(rows[1].display_value, "0");
        assert_eq!(rows[0].float_value, None);
        assert_eq!(rows[0].float_text, "");
        assert_eq!(rows[1].address, 8);
    }

    #[test]
    fn blank_write_rows() {
        let rows = blank_rows(FunctionCode::WriteMultipleRegisters, 10, 3);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].address, 12);
        assert_eq!(rows[0].display_value, "0");
        assert_eq!(rows[0].float_text, FLOAT_PLACEHOLDER);
        assert_eq!(blank_rows(FunctionCode::WriteSingleCoil, 0, 9).len(), 1);
        assert!(blank_rows(FunctionCode::ReadCoils, 0, 9).is_empty());
    }
}

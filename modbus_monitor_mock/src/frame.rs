//! RTU frame builders used by the simulated bus.
//!
//! Every builder returns a complete frame including the CRC trailer.

use modbus_monitor::crc::append_crc;
use modbus_monitor::function_code::{FunctionCode, EXCEPTION_FLAG};

const COIL_ON: u16 = 0xFF00;

/// Pack bits LSB-first into bytes, as coils travel on the wire.
#[must_use]
pub fn pack_bits(bits: &[bool]) -> Vec<u8> {
    let mut out = vec![0u8; bits.len().div_ceil(8)];
    for (i, bit) in bits.iter().enumerate() {
        if *bit {
            out[i / 8] |= 1 << (i % 8);
        }
    }
    out
}

fn finish(mut body: Vec<u8>) -> Vec<u8> {
    append_crc(&mut body);
    body
}

fn header(slave: u8, function: FunctionCode, address: u16) -> Vec<u8> {
    let mut body = Vec::with_capacity(16);
    body.push(slave);
    body.push(function.value());
    body.extend_from_slice(&address.to_be_bytes());
    body
}

/// Read request (fc 1..=4): `slave fc addr qty crc`.
#[must_use]
pub fn read_request(slave: u8, function: FunctionCode, address: u16, quantity: u16) -> Vec<u8> {
    let mut body = header(slave, function, address);
    body.extend_from_slice(&quantity.to_be_bytes());
    finish(body)
}

/// Single coil write; also the echo response.
#[must_use]
pub fn write_single_coil(slave: u8, address: u16, value: bool) -> Vec<u8> {
    let mut body = header(slave, FunctionCode::WriteSingleCoil, address);
    body.extend_from_slice(&(if value { COIL_ON } else { 0 }).to_be_bytes());
    finish(body)
}

/// Single register write; also the echo response.
#[must_use]
pub fn write_single_register(slave: u8, address: u16, value: u16) -> Vec<u8> {
    let mut body = header(slave, FunctionCode::WriteSingleRegister, address);
    body.extend_from_slice(&value.to_be_bytes());
    finish(body)
}

/// Multiple coils request: `slave 0f addr qty bytecount packed-bits crc`.
#[must_use]
pub fn write_multiple_coils(slave: u8, address: u16, values: &[bool]) -> Vec<u8> {
    let mut body = header(slave, FunctionCode::WriteMultipleCoils, address);
    let packed = pack_bits(values);
    body.extend_from_slice(&(values.len() as u16).to_be_bytes());
    body.push(packed.len() as u8);
    body.extend_from_slice(&packed);
    finish(body)
}

/// Multiple registers request: `slave 10 addr qty bytecount words crc`.
#[must_use]
pub fn write_multiple_registers(slave: u8, address: u16, values: &[u16]) -> Vec<u8> {
    let mut body = header(slave, FunctionCode::WriteMultipleRegisters, address);
    body.extend_from_slice(&(values.len() as u16).to_be_bytes());
    body.push((values.len() * 2) as u8);
    for v in values {
        body.extend_from_slice(&v.to_be_bytes());
    }
    finish(body)
}

/// Response to a multiple write: `slave fc addr qty crc`.
#[must_use]
pub fn write_multiple_ack(
    slave: u8,
    function: FunctionCode,
    address: u16,
    quantity: u16,
) -> Vec<u8> {
    read_request(slave, function, address, quantity)
}

/// Response to a bit read: `slave fc bytecount packed-bits crc`.
#[must_use]
pub fn bits_response(slave: u8, function: FunctionCode, bits: &[bool]) -> Vec<u8> {
    let packed = pack_bits(bits);
    let mut body = vec![slave, function.value(), packed.len() as u8];
    body.extend_from_slice(&packed);
    finish(body)
}

/// Response to a register read: `slave fc bytecount words crc`.
#[must_use]
pub fn words_response(slave: u8, function: FunctionCode, words: &[u16]) -> Vec<u8> {
    let mut body = vec![slave, function.value(), (words.len() * 2) as u8];
    for w in words {
        body.extend_from_slice(&w.to_be_bytes());
    }
    finish(body)
}

/// Exception response: `slave fc|0x80 code crc`.
#[must_use]
pub fn exception_response(slave: u8, function: FunctionCode, code: u8) -> Vec<u8> {
    finish(vec![slave, function.value() | EXCEPTION_FLAG, code])
}

#[cfg(test)]
mod tests {
    use super::*;
    use modbus_monitor::crc::split_crc;

    #[test]
    fn bits_are_packed_lsb_first() {
        assert_eq!(pack_bits(&[true, false, true]), vec![0b0000_0101]);
        let nine = [true; 9];
        assert_eq!(pack_bits(&nine), vec![0xFF, 0x01]);
        assert!(pack_bits(&[]).is_empty());
    }

    #[test]
    fn read_request_layout() {
        let f = read_request(1, FunctionCode::ReadHoldingRegisters, 0, 10);
        assert_eq!(f, vec![0x01, 0x03, 0x00, 0x00, 0x00, 0x0A, 0xC5, 0xCD]);
    }

    #[test]
    fn exception_layout() {
        let f = exception_response(0x11, FunctionCode::ReadHoldingRegisters, 0x02);
        assert_eq!(&f[..3], &[0x11, 0x83, 0x02]);
        let (expected, actual) = split_crc(&f).expect("trailer");
        assert_eq!(expected, actual);
    }

    #[test]
    fn multiple_write_layouts() {
        let f = write_multiple_registers(1, 0x10, &[0x000A, 0x0102]);
        assert_eq!(
            &f[..11],
            &[0x01, 0x10, 0x00, 0x10, 0x00, 0x02, 0x04, 0x00, 0x0A, 0x01, 0x02]
        );
        let bits = [true, false, true, true, false, false, true, true, true, false];
        let f = write_multiple_coils(1, 0x13, &bits);
        assert_eq!(&f[..9], &[0x01, 0x0F, 0x00, 0x13, 0x00, 0x0A, 0x02, 0xCD, 0x01]);
        let f = write_single_coil(1, 0xAC, true);
        assert_eq!(&f[..6], &[0x01, 0x05, 0x00, 0xAC, 0xFF, 0x00]);
    }
}

//! CRC-16/Modbus helpers for RTU frames.
//!
//! Transports use these to report the expected (computed) and actual
//! (received) checksum of every observed frame to the bus monitor.

const CRC_INIT: u16 = 0xFFFF;
const CRC_POLY: u16 = 0xA001;

/// CRC-16/Modbus over `data`.
#[must_use]
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc = CRC_INIT;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ CRC_POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Append the CRC trailer (low byte first) to an RTU frame body.
pub fn append_crc(frame: &mut Vec<u8>) {
    let crc = crc16(frame);
    frame.extend_from_slice(&crc.to_le_bytes());
}

/// Split a complete RTU frame into `(expected, actual)` checksums: the CRC
/// computed over the body and the CRC found in the trailer. `None` when the
/// frame is too short to carry a trailer.
#[must_use]
pub fn split_crc(frame: &[u8]) -> Option<(u16, u16)> {
    if frame.len() < 3 {
        return None;
    }
    let body_len = frame.len() - 2;
    let actual = u16::from_le_bytes([frame[body_len], frame[body_len + 1]]);
    Some((crc16(&frame[..body_len]), actual))
}

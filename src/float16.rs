//! IEEE 754 half-precision decode.
//!
//! Layout: 1 sign bit, 5 exponent bits, 10 fraction bits. The branches below
//! are kept explicit so that zero sign, subnormals and NaN behave exactly as
//! the register view expects.

const SIGN_MASK: u16 = 0x8000;
const EXPONENT_MASK: u16 = 0x7C00;
const FRACTION_MASK: u16 = 0x03FF;
const EXPONENT_SHIFT: u32 = 10;
const EXPONENT_SPECIAL: u16 = 0x1F;
const EXPONENT_BIAS: i32 = 15;

/// Convert a half-precision word into an `f32`.
#[must_use]
pub fn decode(bits: u16) -> f32 {
    let negative = bits & SIGN_MASK != 0;
    let exponent = (bits & EXPONENT_MASK) >> EXPONENT_SHIFT;
    let int_fraction = bits & FRACTION_MASK;
    let fraction = f32::from(int_fraction) / 1024.0;

    match exponent {
        EXPONENT_SPECIAL => {
            if int_fraction == 0 {
                if negative {
                    f32::NEG_INFINITY
                } else {
                    f32::INFINITY
                }
            } else {
                f32::NAN
            }
        }
        0 => {
            if int_fraction == 0 {
                if negative {
                    -0.0
                } else {
                    0.0
                }
            } else {
                // subnormal
                let v = fraction * 2f32.powi(-14);
                if negative {
                    -v
                } else {
                    v
                }
            }
        }
        _ => {
            let v = (fraction + 1.0) * 2f32.powi(i32::from(exponent) - EXPONENT_BIAS);
            if negative {
                -v
            } else {
                v
            }
        }
    }
}

/// Decode and render with fixed-point precision, the way the register table shows it.
#[must_use]
pub fn decode_to_string(bits: u16, precision: usize) -> String {
    format!("{:.*}", precision, decode(bits))
}

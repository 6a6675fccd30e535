//! VAX F-floating to IEEE754 single precision conversion.
//!
//! A VAX single is stored as a little-endian 32-bit word with the fields
//! (from bit 0) mantissa-high:7, exponent:8, sign:1, mantissa-low:16. The
//! exponent bias is 0x81 against IEEE's 0x7f. Two reserved patterns map to
//! fixed values instead of going through the exponent arithmetic.

use byteorder::{ByteOrder, LittleEndian};

const VAX_SNG_BIAS: u32 = 0x81;
const IEEE_SNG_BIAS: u32 = 0x7f;

/// Largest VAX pattern: mantissa all ones, exponent 0xff, sign clear.
const VAX_MAX: (u32, u32, u32) = (0x7f, 0xff, 0xffff);

/// Converts a VAX single given as its little-endian word to IEEE bits.
pub fn vax_bits_to_ieee(v: u32) -> u32 {
    let m1 = v & 0x7f;
    let exp = (v >> 7) & 0xff;
    let sign = (v >> 15) & 1;
    let m2 = v >> 16;

    let (ieee_exp, mantissa) = if (m1, exp, m2) == VAX_MAX {
        (0xff, 0)
    } else if (m1, exp, m2) == (0, 0, 0) {
        (0, 0)
    } else {
        (
            exp.wrapping_sub(VAX_SNG_BIAS).wrapping_add(IEEE_SNG_BIAS) & 0xff,
            (m1 << 16) | m2,
        )
    };
    (sign << 31) | (ieee_exp << 23) | mantissa
}

/// Converts IEEE single bits to the VAX little-endian word.
pub fn ieee_bits_to_vax(i: u32) -> u32 {
    let mantissa = i & 0x7f_ffff;
    let exp = (i >> 23) & 0xff;
    let sign = i >> 31;

    let (m1, vax_exp, m2) = match (mantissa, exp) {
        (0, 0xff) => VAX_MAX,
        (0, 0) => (0, 0, 0),
        _ => (
            (mantissa >> 16) & 0x7f,
            exp.wrapping_sub(IEEE_SNG_BIAS).wrapping_add(VAX_SNG_BIAS) & 0xff,
            mantissa & 0xffff,
        ),
    };
    m1 | (vax_exp << 7) | (sign << 15) | (m2 << 16)
}

/// Decodes four on-disk VAX bytes into a native `f32`.
pub fn vax_to_ieee32(bytes: [u8; 4]) -> f32 {
    f32::from_bits(vax_bits_to_ieee(LittleEndian::read_u32(&bytes)))
}

/// Encodes a native `f32` as four on-disk VAX bytes.
pub fn ieee32_to_vax(value: f32) -> [u8; 4] {
    let mut out = [0u8; 4];
    LittleEndian::write_u32(&mut out, ieee_bits_to_vax(value.to_bits()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_and_minus_one() {
        // VAX 1.0 is 0x00004080 in its little-endian word
        assert_eq!(vax_to_ieee32([0x80, 0x40, 0x00, 0x00]), 1.0);
        assert_eq!(vax_to_ieee32([0x80, 0xc0, 0x00, 0x00]), -1.0);
        assert_eq!(ieee32_to_vax(1.0), [0x80, 0x40, 0x00, 0x00]);
    }

    #[test]
    fn reserved_patterns() {
        assert_eq!(vax_to_ieee32([0, 0, 0, 0]), 0.0);
        assert_eq!(vax_to_ieee32([0xff, 0x7f, 0xff, 0xff]), f32::INFINITY);
        assert_eq!(ieee32_to_vax(f32::INFINITY), [0xff, 0x7f, 0xff, 0xff]);
        assert_eq!(ieee32_to_vax(0.0), [0, 0, 0, 0]);
    }

    #[test]
    fn ordinary_values_survive_both_directions() {
        for v in [0.5f32, 3.25, -1234.5, 1.0e-20, 6.5e20] {
            assert_eq!(vax_to_ieee32(ieee32_to_vax(v)), v, "value {}", v);
        }
    }
}

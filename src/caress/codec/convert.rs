//! Conversion of on-disk numeric representations to native ones.
//!
//! All functions are pure. The declared [`TypeCode`] is always supplied by the
//! caller; nothing here infers a type from content.

use byteorder::{BigEndian, ByteOrder, LittleEndian, NativeEndian};
use encoding_rs::WINDOWS_1252;

use super::vax;
use crate::caress::types::error::{CaressError, Result};
use crate::caress::types::models::{TypeCode, Values};

/// Native integer width a converted value is widened or narrowed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    W16,
    W32,
    W64,
}

impl IntWidth {
    /// Width selected by the low bits of an out-of-line count token.
    pub fn of(code: TypeCode) -> Option<Self> {
        match code {
            TypeCode::Int16Le | TypeCode::Int16Be => Some(IntWidth::W16),
            TypeCode::Int32Le | TypeCode::Int32Be => Some(IntWidth::W32),
            TypeCode::Int64Le | TypeCode::Int64Be => Some(IntWidth::W64),
            _ => None,
        }
    }

    pub fn bytes(self) -> usize {
        match self {
            IntWidth::W16 => 2,
            IntWidth::W32 => 4,
            IntWidth::W64 => 8,
        }
    }
}

/// Numeric representation codes of the host, computed once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeRepr {
    pub int16: TypeCode,
    pub int32: TypeCode,
    pub int64: TypeCode,
    pub ieee32: TypeCode,
    pub ieee64: TypeCode,
}

impl NativeRepr {
    /// Representation of the machine this code runs on.
    pub fn host() -> Self {
        Self::with_big_endian(cfg!(target_endian = "big"))
    }

    pub fn with_big_endian(big: bool) -> Self {
        if big {
            Self {
                int16: TypeCode::Int16Be,
                int32: TypeCode::Int32Be,
                int64: TypeCode::Int64Be,
                ieee32: TypeCode::Ieee32Be,
                ieee64: TypeCode::Ieee64Be,
            }
        } else {
            Self {
                int16: TypeCode::Int16Le,
                int32: TypeCode::Int32Le,
                int64: TypeCode::Int64Le,
                ieee32: TypeCode::Ieee32Le,
                ieee64: TypeCode::Ieee64Le,
            }
        }
    }

    pub fn is_big_endian(&self) -> bool {
        self.int32 == TypeCode::Int32Be
    }

    /// Whether items stored as `stored` must be byte-swapped for this host.
    fn needs_swap(&self, stored: TypeCode) -> bool {
        stored.is_big_endian() != self.is_big_endian()
    }
}

fn short(context: &str, need: usize, have: usize) -> CaressError {
    CaressError::MalformedUnit(format!(
        "{} needs {} bytes, only {} available",
        context, need, have
    ))
}

/// Reads one signed integer stored as `from` and fits it into `to`.
///
/// A 32-bit value read into a 64-bit native width is sign-extended. A
/// narrower target keeps the low-order bits.
pub fn convert_int(bytes: &[u8], from: TypeCode, to: IntWidth) -> Result<i64> {
    let width = IntWidth::of(from).ok_or(CaressError::UnsupportedType(from as i8))?;
    if bytes.len() < width.bytes() {
        return Err(short("integer", width.bytes(), bytes.len()));
    }
    let big = from.is_big_endian();
    let value = match (width, big) {
        (IntWidth::W16, false) => LittleEndian::read_i16(bytes) as i64,
        (IntWidth::W16, true) => BigEndian::read_i16(bytes) as i64,
        (IntWidth::W32, false) => LittleEndian::read_i32(bytes) as i64,
        (IntWidth::W32, true) => BigEndian::read_i32(bytes) as i64,
        (IntWidth::W64, false) => LittleEndian::read_i64(bytes),
        (IntWidth::W64, true) => BigEndian::read_i64(bytes),
    };
    Ok(match to {
        IntWidth::W16 => value as i16 as i64,
        IntWidth::W32 => value as i32 as i64,
        IntWidth::W64 => value,
    })
}

pub fn convert_ieee32(bytes: &[u8], from: TypeCode) -> Result<f32> {
    if bytes.len() < 4 {
        return Err(short("float", 4, bytes.len()));
    }
    match from {
        TypeCode::Ieee32Le => Ok(LittleEndian::read_f32(bytes)),
        TypeCode::Ieee32Be => Ok(BigEndian::read_f32(bytes)),
        TypeCode::VaxFloat => Ok(vax::vax_to_ieee32([bytes[0], bytes[1], bytes[2], bytes[3]])),
        other => Err(CaressError::UnsupportedType(other as i8)),
    }
}

pub fn convert_ieee64(bytes: &[u8], from: TypeCode) -> Result<f64> {
    if bytes.len() < 8 {
        return Err(short("double", 8, bytes.len()));
    }
    match from {
        TypeCode::Ieee64Le => Ok(LittleEndian::read_f64(bytes)),
        TypeCode::Ieee64Be => Ok(BigEndian::read_f64(bytes)),
        other => Err(CaressError::UnsupportedType(other as i8)),
    }
}

/// Numeric (not bitwise) conversion of a stored 64-bit integer to a double.
pub fn convert_int64_as_double(bytes: &[u8], from: TypeCode) -> Result<f64> {
    Ok(convert_int(bytes, from, IntWidth::W64)? as f64)
}

/// Converts raw payload bytes into the host's native layout.
///
/// `item` selects the item width and target representation, `stored` is the
/// type the bytes were written with. For a whole unit both are the unit's
/// own type; partition reads may ask for a different item type.
pub fn native_bytes(
    raw: &[u8],
    item: TypeCode,
    stored: TypeCode,
    native: &NativeRepr,
    int64_as_double: bool,
) -> Result<Vec<u8>> {
    match item {
        TypeCode::Empty => Ok(Vec::new()),
        TypeCode::Char | TypeCode::String => Ok(raw.to_vec()),
        TypeCode::Int16Le | TypeCode::Int16Be | TypeCode::Int32Le | TypeCode::Int32Be => {
            Ok(swap_items(raw, item.width(), native.needs_swap(stored)))
        }
        TypeCode::Int64Le | TypeCode::Int64Be => {
            if int64_as_double {
                int64_to_f64_bytes(raw, stored)
            } else {
                Ok(swap_items(raw, 8, native.needs_swap(stored)))
            }
        }
        TypeCode::Ieee64Le | TypeCode::Ieee64Be => {
            if int64_as_double && matches!(stored, TypeCode::Int64Le | TypeCode::Int64Be) {
                int64_to_f64_bytes(raw, stored)
            } else {
                Ok(swap_items(raw, 8, native.needs_swap(stored)))
            }
        }
        TypeCode::Ieee32Le | TypeCode::Ieee32Be | TypeCode::VaxFloat => {
            if stored == native.ieee32 {
                Ok(raw.to_vec())
            } else if stored != TypeCode::VaxFloat && native.ieee32 != TypeCode::VaxFloat {
                Ok(swap_items(raw, 4, true))
            } else {
                Ok(vax_items(raw, stored))
            }
        }
    }
}

fn swap_items(raw: &[u8], width: usize, swap: bool) -> Vec<u8> {
    if !swap || width < 2 {
        return raw.to_vec();
    }
    let mut out = raw.to_vec();
    for item in out.chunks_exact_mut(width) {
        item.reverse();
    }
    out
}

fn int64_to_f64_bytes(raw: &[u8], stored: TypeCode) -> Result<Vec<u8>> {
    let mut out = vec![0u8; raw.len() - raw.len() % 8];
    for (src, dst) in raw.chunks_exact(8).zip(out.chunks_exact_mut(8)) {
        NativeEndian::write_f64(dst, convert_int64_as_double(src, stored)?);
    }
    Ok(out)
}

fn vax_items(raw: &[u8], stored: TypeCode) -> Vec<u8> {
    let mut out = vec![0u8; raw.len() - raw.len() % 4];
    for (src, dst) in raw.chunks_exact(4).zip(out.chunks_exact_mut(4)) {
        let word = [src[0], src[1], src[2], src[3]];
        if stored == TypeCode::VaxFloat {
            NativeEndian::write_f32(dst, vax::vax_to_ieee32(word));
        } else {
            // host keeps VAX floats: encode the IEEE value instead
            let value = if stored.is_big_endian() {
                BigEndian::read_f32(&word)
            } else {
                LittleEndian::read_f32(&word)
            };
            dst.copy_from_slice(&vax::ieee32_to_vax(value));
        }
    }
    out
}

/// Decodes a unit's raw payload into typed values.
pub fn decode_values(raw: &[u8], stored: TypeCode, int64_as_double: bool) -> Result<Values> {
    let values = match stored {
        TypeCode::Empty => Values::Empty,
        TypeCode::Char | TypeCode::String => Values::Text(decode_text(raw)),
        TypeCode::Int16Le | TypeCode::Int16Be => Values::Int16(
            raw.chunks_exact(2)
                .map(|b| convert_int(b, stored, IntWidth::W16).map(|v| v as i16))
                .collect::<Result<_>>()?,
        ),
        TypeCode::Int32Le | TypeCode::Int32Be => Values::Int32(
            raw.chunks_exact(4)
                .map(|b| convert_int(b, stored, IntWidth::W32).map(|v| v as i32))
                .collect::<Result<_>>()?,
        ),
        TypeCode::Int64Le | TypeCode::Int64Be if int64_as_double => Values::Float64(
            raw.chunks_exact(8)
                .map(|b| convert_int64_as_double(b, stored))
                .collect::<Result<_>>()?,
        ),
        TypeCode::Int64Le | TypeCode::Int64Be => Values::Int64(
            raw.chunks_exact(8)
                .map(|b| convert_int(b, stored, IntWidth::W64))
                .collect::<Result<_>>()?,
        ),
        TypeCode::Ieee32Le | TypeCode::Ieee32Be | TypeCode::VaxFloat => Values::Float32(
            raw.chunks_exact(4)
                .map(|b| convert_ieee32(b, stored))
                .collect::<Result<_>>()?,
        ),
        TypeCode::Ieee64Le | TypeCode::Ieee64Be => Values::Float64(
            raw.chunks_exact(8)
                .map(|b| convert_ieee64(b, stored))
                .collect::<Result<_>>()?,
        ),
    };
    Ok(values)
}

/// Decodes single-byte text, stopping at the first NUL.
pub fn decode_text(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let (text, _, _) = WINDOWS_1252.decode(&raw[..end]);
    text.into_owned()
}

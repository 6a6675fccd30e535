//! Core data structures for CARESS raw data files.
//!
//! This module defines the fundamental types used throughout the library:
//! - Type codes and their byte widths
//! - Element and unit kinds produced by the grammar
//! - The per-call [`DataUnit`] and [`ParseStatus`] outputs
//! - Session options and decoded value vectors

use std::fmt;

use super::error::{CaressError, Result};

/// Length of one file block in bytes.
pub const BLOCK_LENGTH: usize = 512;

/// Maximum number of blocks a single payload may be assembled from.
pub const MAX_BLOCKS: u64 = 130;

/// Significant length of element and node names.
pub const MAX_NAME_LENGTH: usize = 32;

/// Maximum number of keys one descriptor may carry, primary name included.
pub const MAX_KEYS: usize = 64;

/// Longest character payload inspected for descriptor definitions and labels.
pub const MAX_STR_LEN: usize = 4096;

/// Format sentinel tokens.
pub mod token {
    pub const NIL: i8 = 0;
    pub const END_OF_FILE: i8 = -64;
    pub const PAREN: i8 = -128;
    pub const THESIS: i8 = -127;
}

/// On-disk representation of a data item.
///
/// The discriminants are the type opcodes used in the token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i8)]
pub enum TypeCode {
    #[default]
    Empty = 0,
    Int16Le = 1,
    Int32Le = 2,
    Ieee32Le = 3,
    Ieee32Be = 4,
    VaxFloat = 5,
    Int16Be = 9,
    Int32Be = 10,
    Ieee64Le = 11,
    Ieee64Be = 12,
    Int64Le = 13,
    Int64Be = 14,
    Char = 16,
    String = 17,
}

impl TypeCode {
    /// Returns the byte width of one item of this type.
    ///
    /// - int16: 2 bytes
    /// - int32, IEEE32, VAX: 4 bytes
    /// - int64, IEEE64: 8 bytes
    /// - char, string: 1 byte
    /// - empty: 0 bytes
    pub fn width(self) -> usize {
        match self {
            TypeCode::Empty => 0,
            TypeCode::Char | TypeCode::String => 1,
            TypeCode::Int16Le | TypeCode::Int16Be => 2,
            TypeCode::Int32Le
            | TypeCode::Int32Be
            | TypeCode::Ieee32Le
            | TypeCode::Ieee32Be
            | TypeCode::VaxFloat => 4,
            TypeCode::Int64Le | TypeCode::Int64Be | TypeCode::Ieee64Le | TypeCode::Ieee64Be => 8,
        }
    }

    /// Whether multi-byte items of this type are stored most significant byte first.
    pub fn is_big_endian(self) -> bool {
        matches!(
            self,
            TypeCode::Int16Be
                | TypeCode::Int32Be
                | TypeCode::Int64Be
                | TypeCode::Ieee32Be
                | TypeCode::Ieee64Be
        )
    }

    /// The caller-facing value class of this on-disk type.
    ///
    /// With `int64_as_double` set, 64-bit integers are reported as doubles.
    pub fn value_class(self, int64_as_double: bool) -> ValueClass {
        match self {
            TypeCode::Int16Le | TypeCode::Int16Be => ValueClass::Int16,
            TypeCode::Int32Le | TypeCode::Int32Be => ValueClass::Int32,
            TypeCode::Int64Le | TypeCode::Int64Be if int64_as_double => ValueClass::Float64,
            TypeCode::Int64Le | TypeCode::Int64Be => ValueClass::Int64,
            TypeCode::Ieee32Le | TypeCode::Ieee32Be | TypeCode::VaxFloat => ValueClass::Float32,
            TypeCode::Ieee64Le | TypeCode::Ieee64Be => ValueClass::Float64,
            TypeCode::Char => ValueClass::Char,
            TypeCode::String => ValueClass::String,
            TypeCode::Empty => ValueClass::Empty,
        }
    }
}

impl TryFrom<i8> for TypeCode {
    type Error = CaressError;
    fn try_from(v: i8) -> Result<Self> {
        match v {
            0 => Ok(Self::Empty),
            1 => Ok(Self::Int16Le),
            2 => Ok(Self::Int32Le),
            3 => Ok(Self::Ieee32Le),
            4 => Ok(Self::Ieee32Be),
            5 => Ok(Self::VaxFloat),
            9 => Ok(Self::Int16Be),
            10 => Ok(Self::Int32Be),
            11 => Ok(Self::Ieee64Le),
            12 => Ok(Self::Ieee64Be),
            13 => Ok(Self::Int64Le),
            14 => Ok(Self::Int64Be),
            16 => Ok(Self::Char),
            17 => Ok(Self::String),
            _ => Err(CaressError::UnsupportedType(v)),
        }
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeCode::Empty => "empty",
            TypeCode::Int16Le => "int16-le",
            TypeCode::Int16Be => "int16-be",
            TypeCode::Int32Le => "int32-le",
            TypeCode::Int32Be => "int32-be",
            TypeCode::Int64Le => "int64-le",
            TypeCode::Int64Be => "int64-be",
            TypeCode::Ieee32Le => "ieee32-le",
            TypeCode::Ieee32Be => "ieee32-be",
            TypeCode::Ieee64Le => "ieee64-le",
            TypeCode::Ieee64Be => "ieee64-be",
            TypeCode::VaxFloat => "vax-float",
            TypeCode::Char => "char",
            TypeCode::String => "string",
        };
        write!(f, "{}", name)
    }
}

/// Native value class a data unit decodes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueClass {
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Char,
    String,
    Empty,
}

impl ValueClass {
    /// The numeric class code used by CARESS consumers.
    pub fn code(self) -> i32 {
        match self {
            ValueClass::Empty => 0,
            ValueClass::Int16 => 1,
            ValueClass::Int32 => 2,
            ValueClass::Float32 => 5,
            ValueClass::Float64 => 11,
            ValueClass::Int64 => 13,
            ValueClass::Char => 16,
            ValueClass::String => 17,
        }
    }
}

/// Kind of element a descriptor defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Command,
    Data,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Command => write!(f, "command"),
            ElementKind::Data => write!(f, "data"),
        }
    }
}

/// Grammar state describing what the last `data` step produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum UnitKind {
    #[default]
    Empty,
    CommandStruct,
    DataStruct,
    DataLabel,
    DataValues,
}

/// One `(type, count)` group of a node's data description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ListEntry {
    /// Raw type token; 0 marks a group carrying only a count.
    pub data_type: i8,
    pub count: u64,
}

/// Location of a unit's payload in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Payload {
    /// Absolute byte offset of the first payload byte.
    pub offset: u64,
    pub len: u64,
}

/// One data unit yielded by the parser.
///
/// The payload itself stays in the file; fetch it through the session that
/// produced the unit before calling `next_unit` again.
#[derive(Debug, Clone, PartialEq)]
pub struct DataUnit {
    /// Running number of the element this unit belongs to.
    pub element_number: i32,
    /// `None` until the first element label has been read.
    pub element_kind: Option<ElementKind>,
    pub element: String,
    pub node: String,
    pub value_type: TypeCode,
    /// Number of items of `value_type`.
    pub count: u64,
    pub(crate) payload: Payload,
    pub(crate) sequence: u64,
}

impl DataUnit {
    /// Payload size in bytes.
    pub fn byte_len(&self) -> u64 {
        self.payload.len
    }
}

/// Outcome of a `next_unit` call.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseStatus {
    Unit(DataUnit),
    /// Proper end of file, or any end of data outside monitoring mode.
    Eof,
    /// The writer has not finished the file yet (monitoring mode only).
    PreliminaryEof,
}

/// Options fixed when a session is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Report 64-bit integers as doubles, converted numerically.
    pub int64_as_double: bool,
    /// Read a file that is still being appended to.
    pub monitoring: bool,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn int64_as_double(mut self, yes: bool) -> Self {
        self.int64_as_double = yes;
        self
    }

    pub fn monitoring(mut self, yes: bool) -> Self {
        self.monitoring = yes;
        self
    }
}

/// Decoded values of one data unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Text(String),
    Empty,
}

impl Values {
    /// Number of decoded items; characters for text.
    pub fn len(&self) -> usize {
        match self {
            Values::Int16(v) => v.len(),
            Values::Int32(v) => v.len(),
            Values::Int64(v) => v.len(),
            Values::Float32(v) => v.len(),
            Values::Float64(v) => v.len(),
            Values::Text(s) => s.chars().count(),
            Values::Empty => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Values::Text(s) => Some(s),
            _ => None,
        }
    }
}

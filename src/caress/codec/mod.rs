//! Codec layer for numeric representation conversion.
//!
//! # Submodules
//!
//! - [`convert`][]: integer and IEEE byte-order conversion, typed decoding
//! - [`vax`][]: VAX F-floating to IEEE single precision and back

pub mod convert;
pub mod vax;

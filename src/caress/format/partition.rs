//! # Partition Reads
//!
//! Fetches a sub-range of a unit's payload straight from the file by byte
//! offset, without touching the token stream. Used for detector frames that
//! are too large to convert in one piece.

use log::debug;

use super::blocks::BlockStore;
use crate::caress::codec::convert::{native_bytes, NativeRepr};
use crate::caress::types::error::{CaressError, Result};
use crate::caress::types::models::{DataUnit, TypeCode};

/// Which part of a node's payload a partition refers to.
///
/// When single and multi detector data share one node, the second section
/// starts right after the bytes of the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Section {
    #[default]
    First,
    Second,
}

/// A request for items `[start, start + count)` of type `item_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionRequest {
    pub section: Section,
    pub start: u64,
    pub count: u64,
    pub item_type: TypeCode,
}

/// Reads and converts one partition of `unit`'s payload.
///
/// The range is only checked against the unit for the first section; the
/// second section lies outside the unit's own payload by construction.
pub fn read_partition(
    store: &mut BlockStore,
    native: &NativeRepr,
    int64_as_double: bool,
    unit: &DataUnit,
    request: PartitionRequest,
) -> Result<Vec<u8>> {
    let width = request.item_type.width() as u64;
    if width == 0 {
        return Ok(Vec::new());
    }

    let out_of_range = || CaressError::PartitionOutOfRange {
        start: request.start,
        count: request.count,
        available: unit.payload.len / width,
    };
    let len = request.count.checked_mul(width).ok_or_else(out_of_range)?;
    let skip = request.start.checked_mul(width).ok_or_else(out_of_range)?;
    if request.section == Section::First && skip.saturating_add(len) > unit.payload.len {
        return Err(out_of_range());
    }

    let mut offset = unit.payload.offset.checked_add(skip).ok_or_else(out_of_range)?;
    if request.section == Section::Second {
        offset = unit
            .count
            .checked_mul(unit.value_type.width() as u64)
            .and_then(|first| offset.checked_add(first))
            .ok_or_else(out_of_range)?;
    }
    debug!(
        "Partition of {} {}: {} items of {} at offset {}",
        unit.element, unit.node, request.count, request.item_type, offset
    );

    let raw = store.read_range(offset, len)?;
    native_bytes(&raw, request.item_type, unit.value_type, native, int64_as_double)
}

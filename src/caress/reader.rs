use std::borrow::Cow;
use std::path::Path;

use log::{debug, info, warn};

use super::codec::convert::{decode_values, native_bytes, NativeRepr};
use super::format::blocks::BlockStore;
use super::format::grammar::UnitParser;
use super::format::partition::{self, PartitionRequest, Section};
use super::iter::UnitIter;
use super::types::error::{CaressError, Result};
use super::types::models::*;
use super::utils::names_equal;

/// An open CARESS raw data file together with all of its parse state.
///
/// Units are read strictly in file order with [`next_unit`](Self::next_unit).
/// A unit's payload stays in the file and can be fetched with
/// [`payload`](Self::payload), [`copy_unit`](Self::copy_unit),
/// [`read_values`](Self::read_values) or
/// [`read_partition`](Self::read_partition) until the next call to
/// `next_unit`.
#[derive(Debug)]
pub struct RawfileSession {
    parser: UnitParser,
    options: ReadOptions,
    native: NativeRepr,
    /// Set once parsing cannot continue; every further call reports `Eof`.
    terminal: bool,
}

impl RawfileSession {
    /// Opens a data file with default options.
    ///
    /// # Errors
    /// Returns [`CaressError::CannotOpen`] if the file does not exist or
    /// cannot be read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, ReadOptions::default())
    }

    /// Opens a data file.
    ///
    /// # Arguments
    /// * `path` - File path of the raw data file
    /// * `options` - 64-bit integer handling and monitoring mode
    ///
    /// # Errors
    /// Returns [`CaressError::CannotOpen`] if the file does not exist or
    /// cannot be read.
    pub fn open_with(path: impl AsRef<Path>, options: ReadOptions) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening CARESS data file: {}", path.display());
        let store = BlockStore::open(path)?;
        if options.monitoring {
            info!("Monitoring mode: reading a file that may still grow");
        }
        Ok(Self {
            parser: UnitParser::new(store),
            options,
            native: NativeRepr::host(),
            terminal: false,
        })
    }

    pub fn options(&self) -> ReadOptions {
        self.options
    }

    /// Reads the next data unit.
    ///
    /// Returns [`ParseStatus::Eof`] at the end of the file. Outside
    /// monitoring mode this also covers truncated files and files whose
    /// writer has not finished; in monitoring mode those report
    /// [`ParseStatus::PreliminaryEof`] and reading may resume after
    /// [`mark_reread`](Self::mark_reread). A unit cut off by a missing block
    /// is read again from its first token on the next call.
    ///
    /// # Errors
    /// - [`CaressError::MalformedUnit`] if the token stream breaks the
    ///   grammar, or if a group of an unknown type carries items that cannot
    ///   be skipped; the session then reports `Eof` from every later call
    /// - [`CaressError::UnsupportedType`] for an unknown type without items,
    ///   or [`CaressError::TooManyKeys`] for a definition over the key
    ///   limit; only this call fails
    pub fn next_unit(&mut self) -> Result<ParseStatus> {
        if self.terminal {
            return Ok(ParseStatus::Eof);
        }
        match self.parser.next_unit() {
            Ok(ParseStatus::PreliminaryEof) if !self.options.monitoring => {
                debug!("Unfinished file treated as end of file");
                self.terminal = true;
                Ok(ParseStatus::Eof)
            }
            Ok(ParseStatus::Eof) => {
                debug!("End of file");
                Ok(ParseStatus::Eof)
            }
            Ok(status) => Ok(status),
            Err(CaressError::Truncated { block }) => {
                if self.options.monitoring {
                    debug!("Block {} is not complete yet", block);
                    Ok(ParseStatus::PreliminaryEof)
                } else {
                    debug!("File ends inside block {}", block);
                    self.terminal = true;
                    Ok(ParseStatus::Eof)
                }
            }
            Err(e) if e.is_fatal() => {
                warn!("Stopped parsing: {}", e);
                self.terminal = true;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Whether the unit last returned was the final one of its element.
    pub fn is_last_of_element(&self) -> bool {
        self.parser.is_last_of_element()
    }

    /// Raw payload bytes of `unit` as stored in the file.
    ///
    /// The bytes are borrowed from the current block when possible.
    ///
    /// # Errors
    /// - [`CaressError::StaleCursor`] if `unit` is not from the latest call
    /// - [`CaressError::PayloadTooLarge`] for payloads over the block limit;
    ///   use [`read_partition`](Self::read_partition) for those
    pub fn payload(&mut self, unit: &DataUnit) -> Result<Cow<'_, [u8]>> {
        self.check_current(unit)?;
        self.parser.tokens_mut().payload_bytes(unit.payload)
    }

    /// Copies `unit`'s payload out in the host's native representation.
    ///
    /// Byte order is swapped as needed, VAX floats become IEEE floats, and
    /// with `int64_as_double` 64-bit integers become doubles.
    pub fn copy_unit(&mut self, unit: &DataUnit) -> Result<Vec<u8>> {
        let native = self.native;
        let int64_as_double = self.options.int64_as_double;
        let raw = self.payload(unit)?;
        native_bytes(&raw, unit.value_type, unit.value_type, &native, int64_as_double)
    }

    /// Decodes `unit`'s payload into typed values.
    pub fn read_values(&mut self, unit: &DataUnit) -> Result<Values> {
        let int64_as_double = self.options.int64_as_double;
        let raw = self.payload(unit)?;
        decode_values(&raw, unit.value_type, int64_as_double)
    }

    /// Value class `unit` decodes to under this session's options.
    pub fn value_class(&self, unit: &DataUnit) -> ValueClass {
        unit.value_type.value_class(self.options.int64_as_double)
    }

    /// Reads items `[start, start + count)` of `unit`, converted to native
    /// representation of `item_type`.
    ///
    /// `start` counts from 0. With [`Section::Second`] the range is taken
    /// from the data following the unit's own payload.
    ///
    /// # Errors
    /// - [`CaressError::StaleCursor`] if `unit` is not from the latest call
    /// - [`CaressError::PartitionOutOfRange`] if a first-section range
    ///   reaches past the unit
    /// - [`CaressError::PayloadTooLarge`] if the range spans too many blocks
    pub fn read_partition(
        &mut self,
        unit: &DataUnit,
        section: Section,
        start: u64,
        count: u64,
        item_type: TypeCode,
    ) -> Result<Vec<u8>> {
        self.check_current(unit)?;
        let native = self.native;
        partition::read_partition(
            self.parser.store_mut(),
            &native,
            self.options.int64_as_double,
            unit,
            PartitionRequest {
                section,
                start,
                count,
                item_type,
            },
        )
    }

    /// Requests that the next [`next_unit`](Self::next_unit) call steps back
    /// over the last preliminary end of file and re-reads the file.
    ///
    /// The caller is responsible for any locking against the writer.
    ///
    /// # Errors
    /// Returns [`CaressError::NotMonitoring`] unless the session was opened
    /// in monitoring mode.
    pub fn mark_reread(&mut self) -> Result<()> {
        if !self.options.monitoring {
            return Err(CaressError::NotMonitoring);
        }
        self.parser.request_reread();
        Ok(())
    }

    /// Returns an iterator over the remaining units and their values.
    pub fn units(&mut self) -> UnitIter<'_> {
        UnitIter::new(self)
    }

    /// Number of distinct element descriptors defined so far.
    pub fn descriptor_count(&self) -> usize {
        self.parser.descriptors().len()
    }

    pub fn close(self) {
        info!("Closing CARESS data file");
    }

    fn check_current(&self, unit: &DataUnit) -> Result<()> {
        if self.terminal || unit.sequence != self.parser.sequence() {
            return Err(CaressError::StaleCursor);
        }
        Ok(())
    }
}

/// Returns the text of the first unit belonging to element `element`.
///
/// Names compare without regard to trailing blanks. Returns `None` if the
/// file has no character unit for that element.
pub fn read_text_element(path: impl AsRef<Path>, element: &str) -> Result<Option<String>> {
    let mut session = RawfileSession::open(path)?;
    loop {
        let unit = match session.next_unit()? {
            ParseStatus::Unit(unit) => unit,
            ParseStatus::Eof | ParseStatus::PreliminaryEof => break,
        };
        if !names_equal(unit.element.as_bytes(), element.as_bytes()) {
            continue;
        }
        if let Values::Text(text) = session.read_values(&unit)? {
            session.close();
            return Ok(Some(text));
        }
    }
    session.close();
    Ok(None)
}

//! # Data Unit Grammar
//!
//! Recursive descent over the token stream. Each call to
//! [`UnitParser::next_unit`] runs the grammar until one data unit carrying
//! node values is available, or the stream ends.
//!
//! ```text
//! data_description    := simple_description | complex_description
//! simple_description  := data_type count
//! complex_description := PAREN ( data_description | NIL )* THESIS count
//! count               := byte 0..=127 | 0x80|int_code <2, 4 or 8 bytes>
//! ```
//!
//! A description fills a list of `(type, count)` groups; `data` then walks
//! the list one group per step. Character groups may define descriptors
//! (`DEFCMD`/`DEFDAT`) or name the element whose node values follow; a NIL
//! token between descriptions moves on to the next node.

use std::cmp::{min, Ordering};

use log::{debug, trace};

use super::blocks::BlockStore;
use super::descriptors::{DescriptorId, DescriptorTable, ElementDescriptor};
use super::tokens::{Mark, Tokenizer};
use crate::caress::codec::convert::{convert_int, IntWidth};
use crate::caress::types::error::{CaressError, Result};
use crate::caress::types::models::{
    token, DataUnit, ElementKind, ListEntry, ParseStatus, Payload, TypeCode, UnitKind,
    MAX_NAME_LENGTH, MAX_STR_LEN,
};
use crate::caress::utils::{compare_names, name_to_string, trim_name};

/// Capacity of one node's group list (32 groups of up to 4 entries).
const MAX_LIST_ENTRIES: usize = 4 * 32;

/// Deepest parenthesis nesting accepted in a complex description.
const MAX_NESTING: usize = 64;

/// Elements whose names are reported cut to eight characters.
const SHORTENED_ELEMENTS: [&[u8]; 5] = [
    b"MASTER1VALUES",
    b"MASTER2VALUES",
    b"SETVALUES",
    b"PROTOCOLVALUES",
    b"POLVALUES",
];

/// Detector nodes whose axis values are skipped when no detector is known.
const DEFAULT_DETECTORS: [&[u8]; 3] = [b"ADET", b"LDET", b"DAU"];

/// Parser state as it was before a `next_unit` call, kept so a call that
/// runs out of readable blocks can be undone and retried.
#[derive(Debug, Clone)]
struct Checkpoint {
    mark: Mark,
    entries: Vec<ListEntry>,
    cursor: usize,
    data_end: bool,
    unit_kind: UnitKind,
    current: Option<DescriptorId>,
    key_index: usize,
    element_number: i32,
    element_kind: Option<ElementKind>,
    command: Vec<u8>,
    key: Vec<u8>,
    detector: Vec<u8>,
    started: bool,
    prelim_seen: bool,
    boundary_seen: bool,
    reread_requested: bool,
}

#[derive(Debug)]
pub struct UnitParser {
    tokens: Tokenizer,
    descriptors: DescriptorTable,

    entries: Vec<ListEntry>,
    cursor: usize,
    data_end: bool,
    unit_kind: UnitKind,

    current: Option<DescriptorId>,
    /// 1-based position of the active node in the current descriptor.
    key_index: usize,
    element_number: i32,
    element_kind: Option<ElementKind>,
    command: Vec<u8>,
    key: Vec<u8>,

    datatype: TypeCode,
    count: u64,
    payload: Payload,

    /// Detector name learned from the EXPTYPE element.
    detector: Vec<u8>,

    started: bool,
    prelim_seen: bool,
    boundary_seen: bool,
    reread_requested: bool,
    last_data: bool,
    sequence: u64,
}

impl UnitParser {
    pub fn new(store: BlockStore) -> Self {
        Self {
            tokens: Tokenizer::new(store),
            descriptors: DescriptorTable::new(),
            entries: Vec::new(),
            cursor: 0,
            data_end: true,
            unit_kind: UnitKind::Empty,
            current: None,
            key_index: 0,
            element_number: 0,
            element_kind: None,
            command: Vec::new(),
            key: Vec::new(),
            datatype: TypeCode::Empty,
            count: 0,
            payload: Payload::default(),
            detector: Vec::new(),
            started: false,
            prelim_seen: false,
            boundary_seen: false,
            reread_requested: false,
            last_data: false,
            sequence: 0,
        }
    }

    /// Stamp of the most recent `next_unit` call.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn is_last_of_element(&self) -> bool {
        self.last_data
    }

    pub fn descriptors(&self) -> &DescriptorTable {
        &self.descriptors
    }

    /// Asks the next `next_unit` call to step back over the preliminary end
    /// of file and re-read the current block.
    pub fn request_reread(&mut self) {
        self.reread_requested = true;
    }

    pub fn tokens_mut(&mut self) -> &mut Tokenizer {
        &mut self.tokens
    }

    pub fn store_mut(&mut self) -> &mut BlockStore {
        self.tokens.store_mut()
    }

    /// Runs the grammar until the next unit of node values.
    ///
    /// Block read failures surface as [`CaressError::Truncated`]; the caller
    /// decides whether that ends the file. The parser is then back where the
    /// call started, so the next call (or a re-read) resumes with the
    /// description that could not be read.
    pub fn next_unit(&mut self) -> Result<ParseStatus> {
        self.sequence += 1;
        let checkpoint = self.checkpoint();
        let result = self.step(false);
        if let Err(CaressError::Truncated { block }) = &result {
            debug!(
                "Block {} not readable, resuming at offset {}",
                block,
                checkpoint.mark.position()
            );
            self.restore(checkpoint);
        }
        result
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            mark: self.tokens.mark(),
            entries: self.entries.clone(),
            cursor: self.cursor,
            data_end: self.data_end,
            unit_kind: self.unit_kind,
            current: self.current,
            key_index: self.key_index,
            element_number: self.element_number,
            element_kind: self.element_kind,
            command: self.command.clone(),
            key: self.key.clone(),
            detector: self.detector.clone(),
            started: self.started,
            prelim_seen: self.prelim_seen,
            boundary_seen: self.boundary_seen,
            reread_requested: self.reread_requested,
        }
    }

    fn restore(&mut self, c: Checkpoint) {
        self.tokens.reset(c.mark);
        self.entries = c.entries;
        self.cursor = c.cursor;
        self.data_end = c.data_end;
        self.unit_kind = c.unit_kind;
        self.current = c.current;
        self.key_index = c.key_index;
        self.element_number = c.element_number;
        self.element_kind = c.element_kind;
        self.command = c.command;
        self.key = c.key;
        self.detector = c.detector;
        self.started = c.started;
        self.prelim_seen = c.prelim_seen;
        self.boundary_seen = c.boundary_seen;
        self.reread_requested = c.reread_requested;
    }

    fn step(&mut self, skip: bool) -> Result<ParseStatus> {
        if !self.started {
            self.tokens.start()?;
            self.started = true;
            self.entries.clear();
            self.prelim_seen = false;
            self.data_end = true;
            self.element_number = 0;
        }

        if self.reread_requested {
            self.reread_requested = false;
            let steps = if self.prelim_seen { 2 } else { 1 };
            self.prelim_seen = false;
            self.tokens.rewind(steps);
            debug!("Re-reading from offset {}", self.tokens.position());
            self.tokens.refresh()?;
        }
        if self.prelim_seen {
            self.prelim_seen = false;
            self.tokens.refresh()?;
        }

        if self.data_end {
            self.command.clear();
            self.key.clear();
            if self.tokens.token() == token::NIL && self.key_index >= self.key_count() {
                self.boundary_seen = true;
            }
        }

        loop {
            if self.data_end {
                self.datatype = TypeCode::Empty;
                self.count = 0;
                self.payload = Payload::default();
                match self.tokens.token() {
                    token::END_OF_FILE => return Ok(ParseStatus::Eof),
                    token::NIL => {
                        self.next_node();
                        self.tokens.advance()?;
                        if self.boundary_seen && self.tokens.token() == token::NIL {
                            debug!("Preliminary end of file at offset {}", self.tokens.position());
                            self.prelim_seen = true;
                            return Ok(ParseStatus::PreliminaryEof);
                        }
                    }
                    _ => {
                        self.data_description(0)?;
                        self.data_end = false;
                        self.cursor = 0;
                        self.data()?;
                    }
                }
            } else {
                self.data()?;
            }
            if self.unit_kind == UnitKind::DataValues {
                break;
            }
        }

        self.learn_detector()?;

        let mut element = trim_name(&self.command).to_vec();
        if SHORTENED_ELEMENTS
            .iter()
            .any(|name| compare_names(&element, name, MAX_NAME_LENGTH) == Ordering::Equal)
        {
            element.truncate(8);
        }

        if !skip && self.is_axis_unit(&element) {
            trace!(
                "Skipping axis values of {} {}",
                name_to_string(&element),
                name_to_string(&self.key)
            );
            return self.step(true);
        }

        self.last_data = self.data_end && self.key_index == self.key_count();
        Ok(ParseStatus::Unit(DataUnit {
            element_number: self.element_number,
            element_kind: self.element_kind,
            element: name_to_string(&element),
            node: name_to_string(&self.key),
            value_type: self.datatype,
            count: self.count,
            payload: self.payload,
            sequence: self.sequence,
        }))
    }

    fn descriptor(&self) -> Option<&ElementDescriptor> {
        self.current.and_then(|id| self.descriptors.get(id))
    }

    fn key_count(&self) -> usize {
        self.descriptor().map_or(0, ElementDescriptor::key_count)
    }

    fn primary(&self) -> Vec<u8> {
        self.descriptor().map(|d| d.primary().to_vec()).unwrap_or_default()
    }

    fn key_at(&self, index: usize) -> Vec<u8> {
        self.descriptor()
            .and_then(|d| d.key(index))
            .map(<[u8]>::to_vec)
            .unwrap_or_default()
    }

    /// A NIL between descriptions: moves on to the next node of the element.
    fn next_node(&mut self) {
        match self.unit_kind {
            UnitKind::DataLabel => {
                self.command = self.primary();
                self.key_index += 1;
                if self.key_index <= self.key_count() {
                    self.key = self.key_at(self.key_index);
                }
                self.unit_kind = UnitKind::DataValues;
            }
            UnitKind::DataValues => {
                self.key_index += 1;
                if self.key_index <= self.key_count() {
                    self.command = self.primary();
                    self.key = self.key_at(self.key_index);
                } else {
                    self.unit_kind = UnitKind::Empty;
                }
            }
            _ => self.unit_kind = UnitKind::Empty,
        }
    }

    fn data_description(&mut self, depth: usize) -> Result<()> {
        if self.tokens.token() == token::PAREN {
            self.complex_description(depth)
        } else {
            self.data_type()?;
            self.count()
        }
    }

    fn complex_description(&mut self, depth: usize) -> Result<()> {
        if depth >= MAX_NESTING {
            return Err(CaressError::MalformedUnit(format!(
                "data description nested deeper than {} levels",
                MAX_NESTING
            )));
        }
        self.tokens.advance()?;
        loop {
            match self.tokens.token() {
                token::THESIS => break,
                token::END_OF_FILE => {
                    return Err(CaressError::MalformedUnit(format!(
                        "end of file inside data description at offset {}",
                        self.tokens.position()
                    )))
                }
                token::NIL => self.tokens.advance()?,
                token::PAREN => self.complex_description(depth + 1)?,
                _ => self.data_type()?,
            }
        }
        self.tokens.advance()?;
        self.count()
    }

    fn data_type(&mut self) -> Result<()> {
        if self.entries.len() >= MAX_LIST_ENTRIES {
            return Err(CaressError::MalformedUnit(format!(
                "more than {} data groups in one node",
                MAX_LIST_ENTRIES
            )));
        }
        self.entries.push(ListEntry {
            data_type: self.tokens.token(),
            count: 0,
        });
        self.tokens.advance()
    }

    /// Reads an inline or out-of-line count and attaches it to the list.
    fn count(&mut self) -> Result<()> {
        let t = self.tokens.token() as u8;
        let value = if t & 0x80 == 0 {
            t as i64
        } else {
            let code = TypeCode::try_from((t & 0x7f) as i8).ok();
            let Some(code) = code.filter(|c| IntWidth::of(*c).is_some()) else {
                return Err(CaressError::MalformedUnit(format!(
                    "invalid count token {:#04x} at offset {}",
                    t,
                    self.tokens.position()
                )));
            };
            let width = code.width();
            let mut bytes = [0u8; 8];
            for b in bytes.iter_mut().take(width) {
                self.tokens.advance()?;
                *b = self.tokens.token() as u8;
            }
            convert_int(&bytes[..width], code, IntWidth::W64)?
        };
        let count = u64::try_from(value).map_err(|_| {
            CaressError::MalformedUnit(format!(
                "negative count {} at offset {}",
                value,
                self.tokens.position()
            ))
        })?;

        match self.entries.last_mut() {
            Some(last) if last.count == 0 => last.count = count,
            _ => {
                if self.entries.len() >= MAX_LIST_ENTRIES {
                    return Err(CaressError::MalformedUnit(format!(
                        "more than {} data groups in one node",
                        MAX_LIST_ENTRIES
                    )));
                }
                self.entries.push(ListEntry {
                    data_type: token::NIL,
                    count,
                })
            }
        }
        self.tokens.advance()
    }

    /// Consumes the next group of the list.
    fn data(&mut self) -> Result<()> {
        let mut result = Ok(());
        if self.cursor < self.entries.len() {
            let entry = self.entries[self.cursor];
            self.cursor += 1;
            if entry.data_type != token::NIL {
                result = self.fetch(entry);
            }
        }
        if self.cursor >= self.entries.len() || self.entries[self.cursor].data_type == token::NIL {
            self.data_end = true;
            self.entries.clear();
        }
        result
    }

    fn fetch(&mut self, entry: ListEntry) -> Result<()> {
        let code = match TypeCode::try_from(entry.data_type) {
            Ok(code) => code,
            Err(e) if entry.count == 0 => return Err(e),
            // item width unknown: the payload cannot be stepped over
            Err(_) => {
                return Err(CaressError::MalformedUnit(format!(
                    "{} items of unknown type {} at offset {}",
                    entry.count,
                    entry.data_type,
                    self.tokens.position()
                )))
            }
        };
        let len = entry
            .count
            .checked_mul(code.width() as u64)
            .ok_or_else(|| CaressError::MalformedUnit(format!("count {} overflows", entry.count)))?;
        self.payload = self.tokens.take_payload(len)?;
        self.datatype = code;
        self.count = entry.count;
        self.evaluate(code)
    }

    /// Classifies the group just fetched.
    fn evaluate(&mut self, code: TypeCode) -> Result<()> {
        if code == TypeCode::Char {
            let head = Payload {
                offset: self.payload.offset,
                len: min(self.payload.len, MAX_STR_LEN as u64 - 1),
            };
            let text = self.tokens.payload_bytes(head)?.into_owned();
            if text.starts_with(b"DEFCMD") {
                self.unit_kind = UnitKind::CommandStruct;
                self.descriptors.define(ElementKind::Command, &text)?;
            } else if text.starts_with(b"DEFDAT") {
                self.unit_kind = UnitKind::DataStruct;
                self.descriptors.define(ElementKind::Data, &text)?;
            } else if self.label_name(&text) {
                self.unit_kind = UnitKind::DataLabel;
            } else {
                self.unit_kind = UnitKind::DataValues;
            }
        } else {
            self.unit_kind = UnitKind::DataValues;
        }

        if self.unit_kind == UnitKind::DataValues {
            self.command = self.primary();
            let keys = self.key_count();
            if keys > 1 && self.key_index < keys {
                if self.cursor == 1 {
                    self.key_index += 1;
                }
                self.key = self.key_at(self.key_index);
            }
        }
        Ok(())
    }

    /// Selects the element a label names; returns whether one was found.
    fn label_name(&mut self, label: &[u8]) -> bool {
        let Some(id) = self.descriptors.find_label(label) else {
            return false;
        };
        self.current = Some(id);
        self.element_kind = self.descriptors.get(id).map(|d| d.kind);
        self.element_number += 1;
        self.key_index = 1;
        true
    }

    /// Remembers the multi detector named by the third EXPTYPE group.
    fn learn_detector(&mut self) -> Result<()> {
        if self.entries.len() <= 3
            || self.datatype != TypeCode::Char
            || compare_names(&self.command, b"EXPTYPE", MAX_NAME_LENGTH) != Ordering::Equal
        {
            return Ok(());
        }
        match self.cursor {
            1 => self.detector.clear(),
            3 if self.count >= 4 => {
                let n = min(self.count, MAX_NAME_LENGTH as u64 - 1);
                let name = self
                    .tokens
                    .payload_bytes(Payload {
                        offset: self.payload.offset,
                        len: n,
                    })?
                    .into_owned();
                if compare_names(&name, b"ADET", 4) == Ordering::Equal
                    || compare_names(&name, b"LDET", 4) == Ordering::Equal
                {
                    debug!("Detector from EXPTYPE: {}", name_to_string(&name));
                    self.detector = name;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Whether the unit just read holds the axis values stored in front of
    /// a detector histogram.
    fn is_axis_unit(&self, element: &[u8]) -> bool {
        let master = compare_names(element, b"MASTER1V", 8) == Ordering::Equal
            || compare_names(element, b"MASTER2V", 8) == Ordering::Equal;
        if !master {
            return false;
        }
        if !self.detector.is_empty() {
            compare_names(&self.key, &self.detector, MAX_NAME_LENGTH) == Ordering::Equal
        } else {
            DEFAULT_DETECTORS
                .iter()
                .any(|name| compare_names(&self.key, name, 8) == Ordering::Equal)
        }
    }
}

//! Iterators for sequential access to the units of a data file.
//!
//! Two layers:
//!
//! 1. [`UnitIter`] - every data unit with its decoded values
//! 2. [`ElementIter`] - units grouped into their elements
//!
//! # Example
//! ```no_run
//! # use caress_raw::RawfileSession;
//! let mut session = RawfileSession::open("run001.dat").unwrap();
//! for element in session.units().elements() {
//!     let element = element.unwrap();
//!     println!("{} ({} nodes)", element.name, element.records.len());
//! }
//! ```

use super::reader::RawfileSession;
use super::types::error::{CaressError, Result};
use super::types::models::{DataUnit, ElementKind, ParseStatus, Values};

/// A data unit together with its decoded values.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub unit: DataUnit,
    pub values: Values,
    /// Whether this unit completed its element.
    pub last_of_element: bool,
}

/// Iterator over data units and their values.
///
/// Stops at end of file or preliminary end of file. A failing unit is
/// yielded as an error; iteration continues after it unless the session
/// cannot go on.
///
/// Created by [`RawfileSession::units()`](crate::RawfileSession::units).
pub struct UnitIter<'a> {
    session: &'a mut RawfileSession,
    done: bool,
}

impl<'a> UnitIter<'a> {
    pub(super) fn new(session: &'a mut RawfileSession) -> Self {
        Self {
            session,
            done: false,
        }
    }

    /// Groups the remaining units by element.
    pub fn elements(self) -> ElementIter<'a> {
        ElementIter {
            units: self,
            pending: None,
        }
    }
}

impl<'a> Iterator for UnitIter<'a> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let unit = match self.session.next_unit() {
            Ok(ParseStatus::Unit(unit)) => unit,
            Ok(ParseStatus::Eof | ParseStatus::PreliminaryEof) => {
                self.done = true;
                return None;
            }
            Err(e) => {
                self.done = e.is_fatal() || matches!(e, CaressError::Io(_));
                return Some(Err(e));
            }
        };
        let last_of_element = self.session.is_last_of_element();
        Some(self.session.read_values(&unit).map(|values| Record {
            unit,
            values,
            last_of_element,
        }))
    }
}

/// All units of one element, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub number: i32,
    pub kind: Option<ElementKind>,
    pub name: String,
    pub records: Vec<Record>,
}

impl Element {
    fn start(record: Record) -> Self {
        Self {
            number: record.unit.element_number,
            kind: record.unit.element_kind,
            name: record.unit.element.clone(),
            records: vec![record],
        }
    }

    /// Values of the node named `node`, if the element has one.
    pub fn node(&self, node: &str) -> Option<&Values> {
        self.records
            .iter()
            .find(|r| r.unit.node == node)
            .map(|r| &r.values)
    }
}

/// Iterator grouping units into elements.
///
/// An element ends with the unit flagged as its last, or when a unit of a
/// different element number arrives.
pub struct ElementIter<'a> {
    units: UnitIter<'a>,
    pending: Option<Element>,
}

impl<'a> Iterator for ElementIter<'a> {
    type Item = Result<Element>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.units.next() {
                Some(Ok(record)) => record,
                Some(Err(e)) => return Some(Err(e)),
                None => return self.pending.take().map(Ok),
            };

            let finished = match self.pending.take() {
                Some(mut element) if element.number == record.unit.element_number => {
                    element.records.push(record);
                    element
                }
                Some(element) => {
                    // element ended without its last node; the new one may
                    // already be complete and waits for the next call
                    self.pending = Some(Element::start(record));
                    return Some(Ok(element));
                }
                None => Element::start(record),
            };

            if finished.records.last().is_some_and(|r| r.last_of_element) {
                return Some(Ok(finished));
            }
            self.pending = Some(finished);
        }
    }
}

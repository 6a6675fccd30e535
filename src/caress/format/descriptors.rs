//! # Element Descriptors
//!
//! Registry of element templates built while a file is parsed. A template is
//! introduced by a character payload of the form
//! `DEFDAT NAME(KEY1 KEY2 ...)` or `DEFCMD NAME(...)`: the first key is the
//! element's primary name, the following keys name its nodes in order.
//!
//! Redefining a primary name replaces the key list of the existing entry, so
//! every primary name has exactly one descriptor.

use std::cmp::min;

use log::{debug, warn};

use crate::caress::types::error::{CaressError, Result};
use crate::caress::types::models::{ElementKind, MAX_KEYS, MAX_NAME_LENGTH};
use crate::caress::utils::{label_matches, name_to_string, names_equal};

pub type DescriptorId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementDescriptor {
    pub kind: ElementKind,
    /// Primary name followed by node names, trailing blanks removed.
    pub keys: Vec<Vec<u8>>,
}

impl ElementDescriptor {
    pub fn primary(&self) -> &[u8] {
        self.keys.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Key at 1-based position `index`.
    pub fn key(&self, index: usize) -> Option<&[u8]> {
        index.checked_sub(1).and_then(|i| self.keys.get(i)).map(Vec::as_slice)
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }
}

#[derive(Debug, Default)]
pub struct DescriptorTable {
    entries: Vec<ElementDescriptor>,
}

impl DescriptorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: DescriptorId) -> Option<&ElementDescriptor> {
        self.entries.get(id)
    }

    /// Registers the definition string `raw` (starting with `DEFCMD` or
    /// `DEFDAT`) under `kind`.
    ///
    /// An existing descriptor with the same primary name keeps its slot and
    /// kind and takes over the new key list. A definition that yields no
    /// key at all is ignored and returns `None`.
    ///
    /// # Errors
    /// Returns [`CaressError::TooManyKeys`] if the definition names more than
    /// [`MAX_KEYS`] keys.
    pub fn define(&mut self, kind: ElementKind, raw: &[u8]) -> Result<Option<DescriptorId>> {
        let keys = split_definition(raw);
        let Some(primary) = keys.first() else {
            warn!("Ignoring {} definition without names: {:?}", kind, name_to_string(raw));
            return Ok(None);
        };
        if keys.len() > MAX_KEYS {
            return Err(CaressError::TooManyKeys {
                element: name_to_string(primary),
                max: MAX_KEYS,
            });
        }

        if let Some(id) = self.entries.iter().position(|d| names_equal(d.primary(), primary)) {
            debug!(
                "Redefining {} {} with {} keys",
                self.entries[id].kind,
                name_to_string(primary),
                keys.len()
            );
            self.entries[id].keys = keys;
            return Ok(Some(id));
        }

        debug!("Defining {} {} with {} keys", kind, name_to_string(primary), keys.len());
        self.entries.push(ElementDescriptor { kind, keys });
        Ok(Some(self.entries.len() - 1))
    }

    /// Finds the descriptor with primary name `name`, most recent first.
    pub fn lookup(&self, name: &[u8]) -> Option<DescriptorId> {
        self.entries.iter().rposition(|d| names_equal(d.primary(), name))
    }

    /// Finds the descriptor an element label refers to, most recent first.
    pub fn find_label(&self, label: &[u8]) -> Option<DescriptorId> {
        self.entries.iter().rposition(|d| label_matches(d.primary(), label))
    }
}

fn is_delimiter(c: u8) -> bool {
    matches!(c, b'(' | b')' | b' ')
}

/// Splits a definition string into key names.
///
/// The leading keyword is skipped. Blanks and parentheses delimit names.
/// Entering a second or deeper parenthesis level drops the name stored just
/// before it, which flattens nested groups to their innermost names. Names
/// are cut to the significant name length.
pub(crate) fn split_definition(raw: &[u8]) -> Vec<Vec<u8>> {
    let num = raw.len();
    let mut keys: Vec<Vec<u8>> = Vec::new();
    let mut level = 0i32;
    let mut p = 0usize;

    loop {
        while p < num && !is_delimiter(raw[p]) {
            p += 1;
        }
        while p < num {
            match raw[p] {
                b'(' => {
                    level += 1;
                    if level >= 2 {
                        keys.pop();
                    }
                    p += 1;
                    continue;
                }
                b')' => {
                    level -= 1;
                    p += 1;
                    continue;
                }
                b' ' => p += 1,
                _ => {}
            }
            break;
        }

        let start = p;
        while p < num && !is_delimiter(raw[p]) {
            p += 1;
        }
        if p > start || p < num {
            let name = &raw[start..p];
            keys.push(name[..min(name.len(), MAX_NAME_LENGTH)].to_vec());
        }
        if p + 1 >= num {
            break;
        }
    }
    keys
}

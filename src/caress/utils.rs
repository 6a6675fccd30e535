//! Name handling helpers
//!
//! Element and node names are blank-padded byte strings of at most
//! [`MAX_NAME_LENGTH`] significant bytes. Comparisons ignore trailing blanks.

use std::cmp::{min, Ordering};

use crate::caress::codec::convert::decode_text;
use crate::caress::types::models::MAX_NAME_LENGTH;

/// Compares two names over at most `max_len` bytes, ignoring trailing blanks.
///
/// The end of a slice and a NUL byte both terminate a name. Once one name
/// has ended, the other compares equal if it only has blanks left within
/// `max_len`; otherwise the longer name orders after the shorter one. Any
/// other difference orders by byte value.
pub fn compare_names(a: &[u8], b: &[u8], max_len: usize) -> Ordering {
    let at = |s: &[u8], i: usize| s.get(i).copied().unwrap_or(0);
    for i in 0..max_len {
        let (x, y) = (at(a, i), at(b, i));
        if x == 0 {
            return if blank_tail(b, i, max_len) { Ordering::Equal } else { Ordering::Less };
        }
        if y == 0 {
            return if blank_tail(a, i, max_len) { Ordering::Equal } else { Ordering::Greater };
        }
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

fn blank_tail(s: &[u8], from: usize, max_len: usize) -> bool {
    for i in from..max_len {
        match s.get(i).copied().unwrap_or(0) {
            0 => return true,
            b' ' => continue,
            _ => return false,
        }
    }
    true
}

pub fn names_equal(a: &[u8], b: &[u8]) -> bool {
    compare_names(a, b, MAX_NAME_LENGTH) == Ordering::Equal
}

/// Cuts a name at its first NUL and drops trailing blanks.
pub fn trim_name(raw: &[u8]) -> &[u8] {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let mut name = &raw[..end];
    while let [rest @ .., b' '] = name {
        name = rest;
    }
    name
}

pub fn name_to_string(raw: &[u8]) -> String {
    decode_text(trim_name(raw))
}

/// Whether a label string selects the descriptor with primary name `key`.
///
/// The label's first `n` bytes (`n` capped at the significant name length)
/// must equal the first `n` bytes of the blank-padded key. An empty label
/// never matches.
pub fn label_matches(key: &[u8], label: &[u8]) -> bool {
    let n = min(label.len(), MAX_NAME_LENGTH);
    if n == 0 {
        return false;
    }
    (0..n).all(|i| key.get(i).copied().unwrap_or(b' ') == label[i])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_blanks_are_insignificant() {
        assert_eq!(compare_names(b"ADET", b"ADET    ", 8), Ordering::Equal);
        assert_eq!(compare_names(b"ADET    ", b"ADET", 8), Ordering::Equal);
        assert_eq!(compare_names(b"ADET\0xyz", b"ADET", 8), Ordering::Equal);
    }

    #[test]
    fn longer_name_orders_after() {
        assert_eq!(compare_names(b"ADET", b"ADET2", 8), Ordering::Less);
        assert_eq!(compare_names(b"ADET2", b"ADET", 8), Ordering::Greater);
        assert_eq!(compare_names(b"ABC", b"ABD", 8), Ordering::Less);
    }

    #[test]
    fn comparison_stops_at_max_len() {
        assert_eq!(compare_names(b"MASTER1VALUES", b"MASTER1V", 8), Ordering::Equal);
        assert_eq!(compare_names(b"MASTER1VALUES", b"MASTER1V", 32), Ordering::Greater);
    }

    #[test]
    fn leading_blanks_compare_as_bytes() {
        assert_eq!(compare_names(b" ADET", b"ADET", 8), Ordering::Less);
    }

    #[test]
    fn label_prefix_matching() {
        assert!(label_matches(b"STEP", b"STEP"));
        assert!(label_matches(b"STEP", b"STEP  "));
        assert!(label_matches(b"STEPX", b"STEP"));
        assert!(!label_matches(b"STEP", b"STEPX"));
        assert!(!label_matches(b"STEP", b""));
    }

    #[test]
    fn trims_padding() {
        assert_eq!(trim_name(b"X       "), b"X");
        assert_eq!(trim_name(b"X\0   "), b"X");
        assert_eq!(name_to_string(b"MASTER1V  "), "MASTER1V");
    }
}

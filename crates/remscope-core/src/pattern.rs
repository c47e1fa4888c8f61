//! Masked byte signatures.
//!
//! A signature is written as whitespace separated tokens: two hex digits for
//! a fixed byte, `?` or `??` for a wildcard. Anything else is skipped, so
//! `"48 8B zz 05"` compiles to the same pattern as `"48 8B 05"`.

use std::fmt;

/// Compiled signature; `None` positions match any byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    bytes: Vec<Option<u8>>,
}

impl Pattern {
    /// Compile a textual signature. Never fails; malformed tokens are dropped.
    pub fn compile(text: &str) -> Self {
        let bytes = text
            .split_whitespace()
            .filter_map(|token| match token {
                "?" | "??" => Some(None),
                _ if token.len() == 2 && token.bytes().all(|c| c.is_ascii_hexdigit()) => {
                    u8::from_str_radix(token, 16).ok().map(Some)
                }
                _ => None,
            })
            .collect();
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Byte and fixed-flag per position.
    pub fn iter(&self) -> impl Iterator<Item = (u8, bool)> + '_ {
        self.bytes
            .iter()
            .map(|b| (b.unwrap_or(0), b.is_some()))
    }

    fn matches_at(&self, window: &[u8]) -> bool {
        self.bytes
            .iter()
            .zip(window)
            .all(|(expected, actual)| expected.is_none_or(|b| b == *actual))
    }

    fn windows<'h>(&'h self, haystack: &'h [u8]) -> impl Iterator<Item = usize> + 'h {
        let usable = !self.is_empty() && self.len() <= haystack.len();
        haystack
            .windows(self.len().max(1))
            .enumerate()
            .filter(move |(_, window)| usable && self.matches_at(window))
            .map(|(offset, _)| offset)
    }

    /// Offset of the first match. Empty patterns never match.
    pub fn scan(&self, haystack: &[u8]) -> Option<usize> {
        self.windows(haystack).next()
    }

    /// Offsets of every match, in ascending order.
    pub fn scan_all(&self, haystack: &[u8]) -> Vec<usize> {
        self.windows(haystack).collect()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .bytes
            .iter()
            .map(|b| match b {
                Some(value) => format!("{:02X}", value),
                None => "??".to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ");
        f.write_str(&text)
    }
}

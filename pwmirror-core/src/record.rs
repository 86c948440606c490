//! Colon-delimited credential records.
//!
//! A record is one line of a credential database file. Its key is the bytes
//! before the first `:`; everything after is opaque payload. Records are
//! compared by key only, and content is raw bytes end to end — no UTF-8 is
//! assumed and payloads are never logged.

use crate::types::Username;

// ---------------------------------------------------------------------------
// Key extraction
// ---------------------------------------------------------------------------

/// Key of a raw record line: the bytes before the first `:`.
///
/// A line with no colon has no key and matches no username.
pub fn line_key(line: &[u8]) -> Option<&[u8]> {
    let colon = line.iter().position(|&b| b == b':')?;
    Some(&line[..colon])
}

/// True when `line` is keyed by `username`.
///
/// Exact match on the full key: `al` does not match `alice:...` and `alice`
/// does not match `alicester:...`.
pub fn line_matches(line: &[u8], username: &Username) -> bool {
    line_key(line) == Some(username.as_bytes())
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One owned record line, terminator excluded.
///
/// Only the authoritative record retained across the merge-copy is held in
/// this form; lines streaming through the copy stay borrowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    line: Vec<u8>,
}

impl Record {
    pub fn new(line: impl Into<Vec<u8>>) -> Self {
        Self { line: line.into() }
    }

    /// The record's key, or `None` for a colon-less line.
    pub fn key(&self) -> Option<&[u8]> {
        line_key(&self.line)
    }

    pub fn matches(&self, username: &Username) -> bool {
        line_matches(&self.line, username)
    }

    /// The full line, terminator excluded.
    pub fn as_bytes(&self) -> &[u8] {
        &self.line
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

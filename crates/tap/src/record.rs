//! Opaque records carried from the source to subscribers
//!
//! A `Record` is one parsed line of the source. The broker and mailboxes only
//! move `Arc<Record>` handles around; the tailer builds records and sessions
//! serialize them for the wire.
//!
//! Key order and number text survive the round trip: a record is sent in the
//! shape it was written, only whitespace between tokens is dropped.

use std::fmt;

use serde_json::Value;

/// One immutable unit of broadcast data
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    value: Value,
}

impl Record {
    /// Parse one line of the source
    pub fn parse(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line).map(|value| Self { value })
    }

    /// Parse one raw line; bytes that are not UTF-8 are a parse error
    pub fn from_slice(line: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(line).map(|value| Self { value })
    }

    /// Wrap an already-decoded value
    pub fn from_value(value: Value) -> Self {
        Self { value }
    }

    /// The decoded value
    #[inline]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Compact JSON text sent to subscribers as one message
    pub fn to_json(&self) -> String {
        self.value.to_string()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

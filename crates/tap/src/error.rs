//! Error types for the tap crate

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while following the source or serving a subscriber
#[derive(Error, Debug)]
pub enum TapError {
    /// The record source could not be opened at startup
    #[error("record source {path} unavailable: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading the source kept failing after every retry
    #[error("reading {path} failed after {attempts} attempts: {source}")]
    SourceRead {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: io::Error,
    },

    /// A line was not valid JSON and the policy is to stop
    ///
    /// `line` counts lines of the current file from where following began:
    /// from the top when starting at the beginning or after a rotation,
    /// otherwise from the end offset found at startup.
    #[error("malformed record on line {line}: {source}")]
    MalformedRecord {
        line: u64,
        #[source]
        source: serde_json::Error,
    },

    /// Sending to a subscriber's transport failed
    #[error("transport error: {0}")]
    Transport(String),
}

impl TapError {
    /// Whether this error ends ingestion for every subscriber
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Transport(_))
    }
}

/// Result type for tap operations
pub type Result<T> = std::result::Result<T, TapError>;

//! Record source configuration
//!
//! Where the append-only JSON-lines log lives and how it is followed.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Where to begin reading when the server starts
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StartAt {
    /// Only lines appended after startup (no backlog)
    #[default]
    End,
    /// Every line already in the file, then follow
    Beginning,
}

/// What to do with a line that is not valid JSON
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Log a warning and continue with the next line
    #[default]
    Skip,
    /// Stop ingestion; the server shuts down
    Fatal,
}

/// Record source configuration
///
/// # Example
///
/// ```toml
/// [source]
/// path = "messages.json"
/// start_at = "end"
/// poll_interval = "250ms"
/// max_read_retries = 3
/// retry_delay = "500ms"
/// on_malformed = "skip"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Path of the JSON-lines file to follow
    /// Default: "messages.json"
    pub path: PathBuf,

    /// Start position in the file
    /// Default: end
    pub start_at: StartAt,

    /// Sleep between checks when no new data is available
    /// Default: 250ms
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Consecutive read failures tolerated before giving up
    /// Default: 3
    pub max_read_retries: u32,

    /// Delay before retrying a failed read
    /// Default: 500ms
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,

    /// Policy for lines that fail to parse
    /// Default: skip
    pub on_malformed: MalformedPolicy,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("messages.json"),
            start_at: StartAt::End,
            poll_interval: Duration::from_millis(250),
            max_read_retries: 3,
            retry_delay: Duration::from_millis(500),
            on_malformed: MalformedPolicy::Skip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SourceConfig::default();
        assert_eq!(config.path, PathBuf::from("messages.json"));
        assert_eq!(config.start_at, StartAt::End);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.max_read_retries, 3);
        assert_eq!(config.on_malformed, MalformedPolicy::Skip);
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
path = "/data/discord/messages.json"
start_at = "beginning"
poll_interval = "1s"
max_read_retries = 10
retry_delay = "2s"
on_malformed = "fatal"
"#;
        let config: SourceConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.path, PathBuf::from("/data/discord/messages.json"));
        assert_eq!(config.start_at, StartAt::Beginning);
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.max_read_retries, 10);
        assert_eq!(config.retry_delay, Duration::from_secs(2));
        assert_eq!(config.on_malformed, MalformedPolicy::Fatal);
    }

    #[test]
    fn test_invalid_policy() {
        let result: Result<SourceConfig, _> = toml::from_str(r#"on_malformed = "ignore""#);
        assert!(result.is_err());
    }
}

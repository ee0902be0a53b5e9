//! Herald Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! An empty file is a valid config: follow `messages.json`, listen on
//! port 8000, buffer 16 records per subscriber.
//!
//! # Parsing
//!
//! ```
//! use herald_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[broker]\nmailbox_capacity = 32").unwrap();
//! assert_eq!(config.broker.mailbox_capacity, 32);
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [log]
//! level = "info"
//!
//! [source]
//! path = "messages.json"
//! on_malformed = "skip"
//!
//! [broker]
//! mailbox_capacity = 16
//!
//! [server]
//! port = 8000
//! subscribe_path = "/subscribe"
//!
//! [invites]
//! EleutherAI = "https://discord.gg/zBGx3azzUn"
//! ```

mod broker;
mod error;
mod logging;
mod server;
mod source;
mod validation;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use broker::{BrokerConfig, DEFAULT_MAILBOX_CAPACITY};
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use server::ServerConfig;
pub use source::{MalformedPolicy, SourceConfig, StartAt};

use serde::Deserialize;

/// Name → invite URL table served by `GET /invites`
pub type Invites = BTreeMap<String, String>;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// The followed JSON-lines log
    pub source: SourceConfig,

    /// Fan-out settings
    pub broker: BrokerConfig,

    /// HTTP/WebSocket listener
    pub server: ServerConfig,

    /// Invite links served by the lookup endpoint
    pub invites: Invites,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log: LogConfig::default(),
            source: SourceConfig::default(),
            broker: BrokerConfig::default(),
            server: ServerConfig::default(),
            invites: default_invites(),
        }
    }
}

/// Invite links served when `[invites]` is absent
fn default_invites() -> Invites {
    [
        ("EleutherAI", "https://discord.gg/zBGx3azzUn"),
        ("Mathematics", "https://discord.com/invite/math"),
        ("PenSquid", "https://discord.gg/A2uE8rksqy"),
    ]
    .into_iter()
    .map(|(name, url)| (name.to_string(), url.to_string()))
    .collect()
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, contains invalid TOML,
    /// or fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.broker.mailbox_capacity, DEFAULT_MAILBOX_CAPACITY);
        assert_eq!(config.source.path, PathBuf::from("messages.json"));
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.invites.len(), 3);
        assert_eq!(
            config.invites.get("Mathematics").map(String::as_str),
            Some("https://discord.com/invite/math")
        );
    }

    #[test]
    fn test_invites_table_replaces_defaults() {
        let toml = r#"
[invites]
Rust = "https://discord.gg/rust-lang"
"#;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.invites.len(), 1);
        assert!(config.invites.contains_key("Rust"));
    }

    #[test]
    fn test_full_config_parse() {
        let toml = r#"
[log]
level = "debug"
format = "json"

[source]
path = "/srv/messages.json"
start_at = "beginning"
poll_interval = "100ms"
on_malformed = "fatal"

[broker]
mailbox_capacity = 64

[server]
host = "127.0.0.1"
port = 9000
subscribe_path = "/live"
shutdown_timeout = "10s"
"#;
        let config = Config::from_str(toml).unwrap();

        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.source.start_at, StartAt::Beginning);
        assert_eq!(config.source.poll_interval, Duration::from_millis(100));
        assert_eq!(config.source.on_malformed, MalformedPolicy::Fatal);
        assert_eq!(config.broker.mailbox_capacity, 64);
        assert_eq!(config.server.bind_addr(), "127.0.0.1:9000");
        assert_eq!(config.server.subscribe_path, "/live");
        assert_eq!(config.server.shutdown_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_str("invalid { toml");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[broker]\nmailbox_capacity = 8").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.broker.mailbox_capacity, 8);
    }

    #[test]
    fn test_from_missing_file() {
        let result = Config::from_file("/definitely/not/here/herald.toml");
        assert!(matches!(result, Err(ConfigError::IoError { .. })));
    }
}

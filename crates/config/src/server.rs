//! HTTP/WebSocket server configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Server configuration
///
/// # Example
///
/// ```toml
/// [server]
/// host = "0.0.0.0"                # default
/// port = 8000                     # default
/// subscribe_path = "/subscribe"   # default
/// static_dir = "public"           # default, optional
/// shutdown_timeout = "5s"         # default
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Path of the WebSocket subscribe endpoint
    pub subscribe_path: String,

    /// Directory served at `/`; `None` disables static files
    pub static_dir: Option<PathBuf>,

    /// How long shutdown waits for the tailer and open sessions
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            subscribe_path: "/subscribe".to_string(),
            static_dir: Some(PathBuf::from("public")),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    /// Socket address string, `host:port`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
        assert_eq!(config.subscribe_path, "/subscribe");
        assert_eq!(config.static_dir, Some(PathBuf::from("public")));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_deserialize_partial() {
        let toml = r#"
port = 9100
shutdown_timeout = "30s"
"#;
        let config: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:9100");
        assert_eq!(config.shutdown_timeout, Duration::from_secs(30));
        assert_eq!(config.subscribe_path, "/subscribe");
    }
}

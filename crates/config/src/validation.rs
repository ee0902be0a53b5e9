//! Configuration validation
//!
//! Rejects values the server cannot run with:
//! - empty source path or zero poll interval
//! - zero mailbox capacity
//! - subscribe paths that are relative or shadow a built-in route
//! - invite URLs that are not http(s)

use crate::Config;
use crate::error::{ConfigError, Result};

/// Routes owned by the server itself
const RESERVED_PATHS: &[&str] = &["/", "/invites", "/health"];

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_source(config)?;
    validate_broker(config)?;
    validate_server(config)?;
    validate_invites(config)?;
    Ok(())
}

fn validate_source(config: &Config) -> Result<()> {
    if config.source.path.as_os_str().is_empty() {
        return Err(ConfigError::invalid_value("source", "path", "must not be empty"));
    }

    if config.source.poll_interval.is_zero() {
        return Err(ConfigError::invalid_value(
            "source",
            "poll_interval",
            "must be greater than zero",
        ));
    }

    Ok(())
}

fn validate_broker(config: &Config) -> Result<()> {
    if config.broker.mailbox_capacity == 0 {
        return Err(ConfigError::invalid_value(
            "broker",
            "mailbox_capacity",
            "must be at least 1",
        ));
    }
    Ok(())
}

fn validate_server(config: &Config) -> Result<()> {
    let path = config.server.subscribe_path.as_str();

    if !path.starts_with('/') {
        return Err(ConfigError::invalid_value(
            "server",
            "subscribe_path",
            format!("'{path}' must start with '/'"),
        ));
    }

    if RESERVED_PATHS.contains(&path) {
        return Err(ConfigError::invalid_value(
            "server",
            "subscribe_path",
            format!("'{path}' is reserved"),
        ));
    }

    Ok(())
}

fn validate_invites(config: &Config) -> Result<()> {
    for (name, url) in &config.invites {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConfigError::invalid_value(
                "invites",
                "url",
                format!("invite '{name}' has non-http url '{url}'"),
            ));
        }
    }
    Ok(())
}

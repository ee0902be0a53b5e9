//! Broker configuration

use serde::Deserialize;

/// Default per-subscriber mailbox capacity
pub const DEFAULT_MAILBOX_CAPACITY: usize = 16;

/// Broker configuration
///
/// ```toml
/// [broker]
/// mailbox_capacity = 16
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Records buffered per subscriber before new ones are dropped
    /// Default: 16
    pub mailbox_capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        }
    }
}

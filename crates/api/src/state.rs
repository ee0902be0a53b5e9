//! Application state
//!
//! Shared state for handlers: the broker sessions join, the invite table,
//! and the shutdown token sessions watch.

use std::sync::Arc;
use std::time::Instant;

use herald_config::Invites;
use herald_tap::Broker;
use tokio_util::sync::CancellationToken;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Fan-out broker fed by the tailer
    pub broker: Arc<Broker>,
    /// Invite links for `GET /invites`
    pub invites: Arc<Invites>,
    /// Cancelled when the server shuts down
    pub shutdown: CancellationToken,
    /// Server start time for uptime calculation
    pub start_time: Instant,
}

impl AppState {
    pub fn new(broker: Arc<Broker>, invites: Invites, shutdown: CancellationToken) -> Self {
        Self {
            broker,
            invites: Arc::new(invites),
            shutdown,
            start_time: Instant::now(),
        }
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

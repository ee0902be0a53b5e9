//! Operations routes
//!
//! Health check for monitoring. Reports uptime and the broker's fan-out
//! counters.

use axum::{Json, Router, extract::State, routing::get};
use herald_tap::BrokerStats;
use serde::Serialize;

use crate::state::AppState;

// =============================================================================
// Response Types
// =============================================================================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Server status
    pub status: &'static str,
    /// Uptime in seconds
    pub uptime_secs: u64,
    /// Fan-out counters
    pub broker: BrokerStats,
}

// =============================================================================
// Routes
// =============================================================================

/// Operations routes (health)
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}

/// Health check endpoint
///
/// GET /health
///
/// Always returns 200 OK while the server is running.
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.uptime_secs(),
        broker: state.broker.stats(),
    })
}

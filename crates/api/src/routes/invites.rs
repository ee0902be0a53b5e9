//! Invite lookup
//!
//! Serves the configured name → invite URL table. Read-only; the table is
//! fixed for the life of the process.

use axum::{Json, Router, extract::State, routing::get};
use herald_config::Invites;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/invites", get(invites_handler))
}

/// GET /invites
async fn invites_handler(State(state): State<AppState>) -> Json<Invites> {
    Json(state.invites.as_ref().clone())
}

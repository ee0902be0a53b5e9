//! Herald API
//!
//! HTTP and WebSocket surface for the broadcaster, built on Axum.
//!
//! # Usage
//!
//! ```ignore
//! use herald_api::{AppState, RouterOptions, build_router_with_options};
//!
//! let state = AppState::new(broker, config.invites.clone(), shutdown.clone());
//! let app = build_router_with_options(state, RouterOptions::from(&config.server));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//! axum::serve(listener, app).await?;
//! ```
//!
//! # Endpoints
//!
//! - `GET /subscribe` - WebSocket; one text message per record, compact JSON
//! - `GET /invites` - name → invite URL mapping
//! - `GET /health` - status, uptime and broker counters
//! - `GET /*` - static files (when a static directory is configured)

pub mod routes;
pub mod state;

pub use routes::subscribe::WsSink;
pub use routes::{RouterOptions, build_router, build_router_with_options};
pub use state::AppState;

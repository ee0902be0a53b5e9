//! API routes

pub mod invites;
pub mod ops;
pub mod subscribe;

use std::path::PathBuf;

use axum::Router;
use axum::routing::get;
use herald_config::ServerConfig;
use tower_http::services::ServeDir;
use tracing::warn;

use crate::state::AppState;

/// Options for building the router
#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// Path of the WebSocket subscribe endpoint
    pub subscribe_path: String,
    /// Directory served at `/`, if any
    pub static_dir: Option<PathBuf>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            subscribe_path: "/subscribe".to_string(),
            static_dir: None,
        }
    }
}

impl From<&ServerConfig> for RouterOptions {
    fn from(config: &ServerConfig) -> Self {
        Self {
            subscribe_path: config.subscribe_path.clone(),
            static_dir: config.static_dir.clone(),
        }
    }
}

/// Build the router with default options (no static files)
pub fn build_router(state: AppState) -> Router {
    build_router_with_options(state, RouterOptions::default())
}

/// Build the complete router with options
pub fn build_router_with_options(state: AppState, options: RouterOptions) -> Router {
    let router = Router::new()
        // Operations routes (health)
        .merge(ops::routes())
        // Invite lookup
        .merge(invites::routes())
        // Live record stream
        .route(&options.subscribe_path, get(subscribe::subscribe_handler));

    // Static files take whatever no route matched
    let router = match options.static_dir {
        Some(dir) if dir.is_dir() => {
            router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true))
        }
        Some(dir) => {
            warn!(dir = %dir.display(), "static directory not found, serving API only");
            router
        }
        None => router,
    };

    router.with_state(state)
}

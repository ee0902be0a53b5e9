//! HTTP/WebSocket server startup
//!
//! Binds the listener and serves the router until the shutdown token fires.
//! Configurable via `[server]` in config.toml.

use std::sync::Arc;

use anyhow::{Context, Result};
use herald_api::{AppState, RouterOptions, build_router_with_options};
use herald_config::Config;
use herald_tap::Broker;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Start the server on `[server] host:port`
///
/// Sessions watch `cancel` too, so graceful shutdown finishes once they
/// have drained.
pub async fn start_server(
    config: &Config,
    broker: Arc<Broker>,
    cancel: CancellationToken,
) -> Result<JoinHandle<()>> {
    let state = AppState::new(broker, config.invites.clone(), cancel.clone());

    let mut app = build_router_with_options(state, RouterOptions::from(&config.server));

    // Add middleware
    app = app.layer(TraceLayer::new_for_http()).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    );

    // Bind
    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(
        addr = %addr,
        subscribe_path = %config.server.subscribe_path,
        invites = config.invites.len(),
        "server listening"
    );

    // Spawn server task
    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
            })
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "server error");
            });
    });

    Ok(handle)
}

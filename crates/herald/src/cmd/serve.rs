//! Serve command - Run the Herald server
//!
//! Follows the record source and fans every record out to WebSocket
//! subscribers until a shutdown signal arrives or the source fails.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use herald_config::Config;
use herald_tap::{Broker, Tailer, TailerConfig, TailerReport};

use crate::cmd::server::start_server;

/// Config files tried, in order, when `--config` is not given
const DEFAULT_CONFIG_PATHS: &[&str] = &["configs/config.toml", "config.toml"];

/// Serve command arguments
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to configuration file (defaults to configs/config.toml if not specified)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Run the serve command
pub async fn run(args: ServeArgs) -> Result<()> {
    let config_path = args
        .config
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(default)".to_string());

    info!(
        version = env!("CARGO_PKG_VERSION"),
        platform = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        config = %config_path,
        "Herald starting"
    );

    let config = load_config(args.config.as_deref())?;

    if let Err(e) = run_server(config).await {
        error!(error = %e, "server error");
        return Err(e);
    }

    info!("Herald shutdown complete");
    Ok(())
}

/// Config file serve would load: the explicit path, else the first default
/// path that exists
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => DEFAULT_CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists()),
    }
}

/// Load configuration
///
/// An explicit path must exist. Otherwise default paths are tried and
/// built-in defaults are used when none exists.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit
        && !path.exists()
    {
        return Err(anyhow::anyhow!(
            "config file not found: {}",
            path.display()
        ));
    }

    match find_config(explicit) {
        Some(path) => {
            info!(config = %path.display(), "using config file");
            Config::from_file(&path).context("failed to load configuration")
        }
        None => {
            info!("no config file found, using defaults (messages.json → port 8000)");
            Ok(Config::default())
        }
    }
}

/// Main server run loop
async fn run_server(config: Config) -> Result<()> {
    // Create cancellation token for coordinated shutdown
    let cancel = CancellationToken::new();

    let broker = Arc::new(Broker::from_config(&config.broker));

    // Opening the source is all-or-nothing: no source, no server
    let tailer = Tailer::open(&config.source.path, TailerConfig::from(&config.source))
        .await
        .context("failed to open record source")?;
    let source = tailer.path().display().to_string();
    let mut tailer_task = tokio::spawn(tailer.run(Arc::clone(&broker), cancel.clone()));

    let shutdown_timeout = config.server.shutdown_timeout;

    let mut server_task =
        match start_server(&config, Arc::clone(&broker), cancel.clone()).await {
            Ok(task) => task,
            Err(e) => {
                cancel.cancel();
                stop_tailer(&mut tailer_task, shutdown_timeout).await;
                return Err(e.context("failed to start server"));
            }
        };

    info!(
        source = %source,
        mailbox_capacity = broker.mailbox_capacity(),
        addr = %config.server.bind_addr(),
        subscribe_path = %config.server.subscribe_path,
        "Herald server running"
    );

    // Wait for a shutdown signal, or for the tailer to stop on its own
    let early_exit = tokio::select! {
        _ = wait_for_shutdown() => {
            info!("shutdown signal received, stopping server...");
            None
        }
        result = &mut tailer_task => Some(result),
    };

    // Signal all components to stop via cancellation token
    cancel.cancel();

    let tailer_result = match early_exit {
        Some(result) => result,
        None => match tokio::time::timeout(shutdown_timeout, &mut tailer_task).await {
            Ok(result) => result,
            Err(_) => {
                warn!("tailer did not finish within timeout, continuing shutdown");
                tailer_task.abort();
                finish_server(&mut server_task, shutdown_timeout).await;
                return Ok(());
            }
        },
    };

    let outcome = match tailer_result {
        Ok(Ok(report)) => {
            info!(
                lines = report.lines,
                published = report.published,
                skipped = report.skipped,
                "tailer finished"
            );
            Ok(())
        }
        Ok(Err(e)) => {
            error!(error = %e, "record source failed, closing all subscribers");
            Err(anyhow::Error::new(e).context("record source failed"))
        }
        Err(e) => Err(anyhow::anyhow!("tailer task panicked: {e}")),
    };

    let stats = broker.stats();
    info!(
        published = stats.published,
        delivered = stats.delivered,
        dropped = stats.dropped,
        joined = stats.joined,
        "broker totals"
    );

    finish_server(&mut server_task, shutdown_timeout).await;
    outcome
}

/// Wait for a cancelled tailer to stop, aborting it after `shutdown_timeout`
async fn stop_tailer(
    tailer_task: &mut JoinHandle<herald_tap::Result<TailerReport>>,
    shutdown_timeout: Duration,
) {
    match tokio::time::timeout(shutdown_timeout, &mut *tailer_task).await {
        Ok(Ok(Ok(report))) => {
            info!(lines = report.lines, published = report.published, "tailer stopped");
        }
        Ok(Ok(Err(e))) => warn!(error = %e, "tailer failed while stopping"),
        Ok(Err(e)) => warn!(error = %e, "tailer task panicked while stopping"),
        Err(_) => {
            warn!("tailer did not finish within timeout, aborting");
            tailer_task.abort();
        }
    }
}

/// Wait for the HTTP server to drain its connections
async fn finish_server(
    server_task: &mut JoinHandle<()>,
    shutdown_timeout: Duration,
) {
    info!("waiting for open sessions to close...");
    match tokio::time::timeout(shutdown_timeout, &mut *server_task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "server task panicked during shutdown"),
        Err(_) => {
            warn!("server did not shut down within timeout, aborting");
            server_task.abort();
        }
    }
}

/// Wait for SIGINT or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

//! Tail command - live stream CLI for Herald
//!
//! Connect to a running Herald server as an ordinary subscriber and print
//! records as they arrive.

mod client;
mod filter;
mod output;

use std::io::IsTerminal;

use anyhow::Result;
use clap::Args;
use tracing_subscriber::EnvFilter;

use filter::ContentFilter;

/// Tail command arguments
#[derive(Args, Debug)]
pub struct TailArgs {
    /// WebSocket URL of the subscribe endpoint
    #[arg(short, long, default_value = "ws://127.0.0.1:8000/subscribe")]
    url: String,

    /// Filter by guild name (glob pattern, can be repeated)
    #[arg(short, long = "guild", value_name = "PATTERN")]
    guilds: Vec<String>,

    /// Filter by channel name (glob pattern, can be repeated)
    #[arg(short = 'C', long = "channel", value_name = "PATTERN")]
    channels: Vec<String>,

    /// Filter by author name (glob pattern, can be repeated)
    #[arg(short, long = "author", value_name = "PATTERN")]
    authors: Vec<String>,

    /// Only records containing this text in any string field
    #[arg(short = 'm', long = "match", value_name = "TEXT")]
    pattern: Option<String>,

    /// Hide messages from bots
    #[arg(long)]
    no_bots: bool,

    /// Output format: text (default), json, compact
    #[arg(short = 'o', long = "output", default_value = "text")]
    format: String,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Verbose output (show debug info)
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (suppress connection messages)
    #[arg(short, long)]
    quiet: bool,
}

/// Run the tail command
pub async fn run(args: TailArgs) -> Result<()> {
    // Set up logging for tail command
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else if args.quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    // Enable color only if: stdout is TTY AND --no-color not set
    let use_color = std::io::stdout().is_terminal() && !args.no_color;
    let formatter = output::Formatter::new(&args.format).with_color(use_color);

    let content_filter = build_content_filter(&args);
    if content_filter.is_active() {
        tracing::debug!("client-side filters active");
    }

    tracing::info!(url = %args.url, "connecting to server");

    let mut client = client::SubscribeClient::connect(&args.url).await?;

    tracing::info!("streaming records (Ctrl+C to stop)");

    let mut shown = 0u64;
    let mut hidden = 0u64;

    // Main loop with signal handling
    loop {
        tokio::select! {
            result = client.recv() => {
                match result {
                    Ok(Some(record)) => {
                        if content_filter.matches(&record) {
                            formatter.print(&record);
                            shown += 1;
                        } else {
                            hidden += 1;
                        }
                    }
                    Ok(None) => {
                        tracing::info!("connection closed by server");
                        break;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "receive error");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, shutting down");
                client.close().await;
                break;
            }
        }
    }

    tracing::debug!(shown, hidden, "tail finished");
    Ok(())
}

/// Build content filter from CLI arguments
fn build_content_filter(args: &TailArgs) -> ContentFilter {
    fn patterns(values: &[String]) -> Vec<&str> {
        values.iter().map(String::as_str).collect()
    }

    let mut filter = ContentFilter::new()
        .with_guilds(patterns(&args.guilds))
        .with_channels(patterns(&args.channels))
        .with_authors(patterns(&args.authors))
        .without_bots(args.no_bots);

    if let Some(ref text) = args.pattern {
        filter = filter.with_substring(text);
    }

    filter
}

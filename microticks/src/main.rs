//! microticks - event tracking client for the Microticks analytics API
//!
//! This tool provides commands for:
//! - Checking tracker configuration and readiness
//! - Tracking a single event from the command line
//! - Streaming JSON-line events from stdin into the tracker
//!
//! Uses XDG Base Directory specification for file locations:
//! - Config: $XDG_CONFIG_HOME/microticks/config.toml (~/.config/microticks/config.toml)
//! - Logs: $XDG_STATE_HOME/microticks/ (~/.local/state/microticks/)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use microticks_core::{Client, Config, TrackerConfig};
use serde::Deserialize;
use tokio::io::AsyncBufReadExt;

#[derive(Parser)]
#[command(name = "microticks")]
#[command(about = "Track events against a Microticks server")]
#[command(version)]
struct Args {
    /// Server base URL, or "dummy" for offline mode (overrides config)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Consumer key identifying this deployment (overrides config)
    #[arg(long, global = true)]
    consumer_key: Option<String>,

    /// Log every dispatched request at debug level
    #[arg(long, global = true)]
    debug: bool,

    /// Verbose output (enables file logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show tracker configuration and readiness
    Status,

    /// Track a single event, then stop the session
    Send {
        /// Event action name, e.g. "click"
        action: String,

        /// Event data as a JSON document
        #[arg(short, long, default_value = "{}")]
        data: String,
    },

    /// Read JSON-line events from stdin and track each one
    ///
    /// Each line is an object: {"action": "click", "data": {...}}
    Pipe {
        /// Reason recorded when the session is stopped at end of input
        #[arg(long, default_value = "eof")]
        stop_reason: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    let tracker = effective_tracker(&args, &config);

    // Initialize logging if verbose; the guard must outlive the
    // command. The debug flag implies file logging at debug level so
    // the per-request lines are captured without RUST_LOG.
    let mut logging = config.logging;
    if tracker.debug {
        logging.level = "debug".to_string();
    }
    let _log_guard = if args.verbose || tracker.debug {
        Some(
            microticks_core::logging::init(&logging)
                .context("failed to initialize logging")?,
        )
    } else {
        None
    };

    match args.command {
        Command::Status => cmd_status(&tracker),
        Command::Send { ref action, ref data } => cmd_send(&tracker, action, data).await,
        Command::Pipe { ref stop_reason } => cmd_pipe(&tracker, stop_reason).await,
    }
}

/// Apply CLI overrides on top of the configured tracker settings.
fn effective_tracker(args: &Args, config: &Config) -> TrackerConfig {
    let mut tracker = config.tracker.clone();
    if let Some(host) = &args.host {
        tracker.host = host.clone();
    }
    if let Some(consumer_key) = &args.consumer_key {
        tracker.consumer_key = consumer_key.clone();
    }
    if args.debug {
        tracker.debug = true;
    }
    tracker
}

fn cmd_status(tracker: &TrackerConfig) -> Result<()> {
    println!("Microticks Tracker Configuration");
    println!("================================");
    println!();
    println!("Config file:   {}", Config::config_path().display());
    println!(
        "Host:          {}",
        if tracker.host.is_empty() {
            "<not set>"
        } else {
            &tracker.host
        }
    );
    println!(
        "Consumer key:  {}",
        if tracker.consumer_key.is_empty() {
            "<not set>"
        } else {
            "<set>"
        }
    );
    println!("Debug:         {}", tracker.debug);

    println!();
    if tracker.is_ready() {
        if tracker.is_dummy() {
            println!("Status: Ready (offline dummy mode, no requests will be sent)");
        } else {
            println!("Status: Ready");
        }
    } else {
        println!("Status: Not ready (missing required configuration)");
        println!();
        println!("Configure the tracker in config.toml:");
        println!();
        println!("  [tracker]");
        println!("  host = \"http://localhost:5000\"");
        println!("  consumer_key = \"your-consumer-key\"");
    }

    Ok(())
}

async fn cmd_send(tracker: &TrackerConfig, action: &str, data: &str) -> Result<()> {
    let data: serde_json::Value =
        serde_json::from_str(data).context("--data must be a JSON document")?;

    let client = Client::new(tracker.clone()).context("failed to create client")?;

    let body = client
        .track_event(action, &data)
        .await
        .with_context(|| format!("failed to track '{}'", action))?;

    match body.get("event_id") {
        Some(event_id) => println!("Tracked '{}' (event_id: {})", action, event_id),
        None => println!("Tracked '{}'", action),
    }

    if let Some(stop) = client.stop_session("exit") {
        if stop.await.is_err() {
            eprintln!("Warning: session stop was not acknowledged");
        }
    }

    Ok(())
}

/// One stdin line in pipe mode.
#[derive(Deserialize)]
struct PipedEvent {
    action: String,
    #[serde(default)]
    data: serde_json::Value,
}

async fn cmd_pipe(tracker: &TrackerConfig, stop_reason: &str) -> Result<()> {
    let client = Client::new(tracker.clone()).context("failed to create client")?;

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut tracked = 0usize;
    let mut skipped = 0usize;

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<PipedEvent>(line) {
            Ok(event) => {
                // Fire-and-forget; the queue preserves order and the
                // stop below flushes it
                let _ = client.track_event(&event.action, &event.data);
                tracked += 1;
            }
            Err(err) => {
                tracing::warn!(error = %err, "Skipping malformed event line");
                eprintln!("Skipping malformed event line: {}", err);
                skipped += 1;
            }
        }
    }

    // The stop request is queued last, so awaiting it drains every
    // event ahead of it
    if let Some(stop) = client.stop_session(stop_reason) {
        if stop.await.is_err() {
            eprintln!("Warning: session stop was not acknowledged");
        }
    }

    println!("Tracked {} event(s), skipped {}", tracked, skipped);

    Ok(())
}

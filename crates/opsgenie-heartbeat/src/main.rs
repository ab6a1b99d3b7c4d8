//! Opsgenie heartbeat custom resource handler.
//!
//! Reads one lifecycle event, reconciles it and answers the orchestrator's
//! callback. Exits non-zero when the event failed, after the FAILED callback
//! has been sent.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use opsgenie_heartbeat::{handler, Config, LifecycleEvent};

/// Provision an Opsgenie heartbeat for one stack lifecycle event.
#[derive(Parser)]
#[command(name = "opsgenie-heartbeat")]
#[command(about = "Provision an Opsgenie heartbeat for one stack lifecycle event")]
#[command(version)]
struct Cli {
    /// Lifecycle event JSON file, or `-` for stdin
    #[arg(long, env = "HEARTBEAT_EVENT_FILE", default_value = "-")]
    event: PathBuf,

    /// Log stream named in callback reasons (overrides AWS_LAMBDA_LOG_STREAM_NAME)
    #[arg(long)]
    log_stream: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let raw = read_event(&cli.event)?;
    let event = LifecycleEvent::from_json(&raw).context("Failed to parse lifecycle event")?;
    debug!(?event, "Received event");

    let mut config = Config::from_env();
    if let Some(log_stream) = cli.log_stream {
        config = config.with_log_stream_name(log_stream);
    }

    let outcome = handler::run(&config, &event).await?;
    info!(
        name = %outcome.name,
        physical_resource_id = %outcome.physical_resource_id,
        "Lifecycle event handled"
    );

    Ok(())
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("opsgenie_heartbeat=debug,info")
        } else {
            EnvFilter::new("opsgenie_heartbeat=info,warn")
        }
    });

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

fn read_event(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("Failed to read lifecycle event from stdin")?;
        Ok(raw)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read lifecycle event from {}", path.display()))
    }
}

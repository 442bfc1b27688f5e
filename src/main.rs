mod banner;
mod cli;
mod config;
mod select;

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use ktail_k8s::KubeClient;
use ktail_logs::{LogStreamer, cancel_on_signal};

use crate::cli::Args;
use crate::config::{FileConfig, Settings};

/// Filter used when `RUST_LOG` is unset
const DEFAULT_LOG_FILTER: &str = "warn,ktail=info,ktail_k8s=info,ktail_logs=info";

#[tokio::main]
async fn main() {
    let args = Args::from_env();
    init_tracing(args.quiet);

    if let Err(e) = run(args).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Diagnostics go to stderr so stdout carries only log lines
fn init_tracing(quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            EnvFilter::new("warn")
        } else {
            EnvFilter::new(DEFAULT_LOG_FILTER)
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

async fn run(args: Args) -> Result<()> {
    let file = FileConfig::load(args.config.as_deref())?;
    let settings = Settings::resolve(args, file)?;

    let client = KubeClient::new(settings.context.as_deref()).await?;
    let namespace = settings
        .namespace
        .clone()
        .unwrap_or_else(|| client.default_namespace().to_string());

    let pods = select::resolve_targets(
        &client,
        &namespace,
        &settings.pods,
        settings.container.as_deref(),
    )
    .await?;

    let mut stdout = std::io::stdout();
    stdout
        .write_all(banner::render(&namespace, &pods, settings.color, settings.watch).as_bytes())
        .and_then(|_| stdout.flush())
        .context("Failed to write banner")?;

    let streamer = LogStreamer::new(Arc::new(client), settings.stream);
    let _signals = cancel_on_signal(streamer.cancellation());

    let namespaces = if settings.watch {
        vec![namespace]
    } else {
        Vec::new()
    };

    streamer.run(pods, &namespaces, stdout).await?;
    Ok(())
}

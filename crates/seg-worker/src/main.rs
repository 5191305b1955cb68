//! Segment Worker Entrypoint
//!
//! Usage: seg-worker [--config worker.toml] [--listen ADDR] [--log FILTER]
//!
//! Serves `POST /segment` until interrupted.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use seg_worker::{server, Node, WorkerConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "seg-worker")]
#[command(about = "Segment transcoding worker", version)]
struct Args {
    /// Path to the worker config file (TOML)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Override the listen address
    #[arg(long)]
    listen: Option<String>,

    /// Override the tracing filter (e.g. "seg_worker=debug")
    #[arg(long)]
    log: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match WorkerConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => WorkerConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    if let Some(log) = args.log {
        config.log = log;
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log))
        .init();

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("seg-worker error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: WorkerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let node = Node::from_config(&config)?;
    let router = server::router(Arc::new(node), config.max_segment_bytes);

    let listener = tokio::net::TcpListener::bind(&config.listen).await?;
    tracing::info!(addr = %listener.local_addr()?, "serving segments");

    server::serve(listener, router, async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutting down");
    })
    .await?;
    Ok(())
}

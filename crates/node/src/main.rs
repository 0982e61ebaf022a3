use std::env::var;

use calimero_bitswap::CoordinatorConfig;
use calimero_node::{LocalNode, ResourceUpdateKind};
use clap::{Parser, Subcommand};
use eyre::Result as EyreResult;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{registry, EnvFilter};

/// Exercises a block-tree coordinator against in-memory adapters: splits
/// `payload` via `Add`, then reports the upcall it produced.
#[derive(Debug, Parser)]
#[command(author, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    action: Action,
}

#[derive(Debug, Subcommand)]
enum Action {
    /// Splits the given payload into a block tree and publishes it.
    Add {
        payload: String,
    },
    /// Splits and publishes, then walks the result back down with a
    /// second, independent coordinator sharing the same simulated network.
    Roundtrip {
        payload: String,
    },
}

#[tokio::main]
async fn main() -> EyreResult<()> {
    setup()?;

    let args = Args::parse();
    match args.action {
        Action::Add { payload } => run_add(payload).await,
        Action::Roundtrip { payload } => run_roundtrip(payload).await,
    }
}

async fn run_add(payload: String) -> EyreResult<()> {
    let node = LocalNode::spawn(CoordinatorConfig::default());
    node.handle.add(payload.into_bytes()).await?;

    let mut upcalls = node.upcalls;
    if let Some(event) = upcalls.recv().await {
        tracing::info!(kind = ?event.kind, roots = ?event.roots, "add complete");
    }

    node.cancel.cancel();
    Ok(())
}

async fn run_roundtrip(payload: String) -> EyreResult<()> {
    let publisher = LocalNode::spawn(CoordinatorConfig::default());
    publisher.handle.add(payload.into_bytes()).await?;
    let mut publisher_upcalls = publisher.upcalls;
    let added = publisher_upcalls
        .recv()
        .await
        .ok_or_else(|| eyre::eyre!("publisher shut down before emitting Added"))?;
    let root = added.roots[0];
    tracing::info!(%root, "published");
    publisher.cancel.cancel();

    let downloader = LocalNode::spawn_on(publisher.engine, CoordinatorConfig::default());
    downloader.handle.download(vec![root]).await?;
    let mut downloader_upcalls = downloader.upcalls;
    if let Some(event) = downloader_upcalls.recv().await {
        match event.kind {
            ResourceUpdateKind::Added => tracing::info!(%root, "roundtrip succeeded"),
            other => tracing::warn!(?other, %root, "roundtrip did not complete cleanly"),
        }
    }

    downloader.cancel.cancel();
    Ok(())
}

fn setup() -> EyreResult<()> {
    let directives = match var("RUST_LOG") {
        Ok(value) if !value.trim().is_empty() => value,
        _ => "calimero_node=info,calimero_bitswap=info".to_owned(),
    };

    registry()
        .with(EnvFilter::builder().parse(directives)?)
        .with(layer())
        .init();

    Ok(())
}

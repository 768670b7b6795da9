// Copyright (c) 2026 CryptoChain Contributors. MIT License.
// See LICENSE for details.

//! # CryptoChain Node
//!
//! Entry point for the `cryptochain-node` binary. Parses CLI arguments,
//! initializes logging and metrics, wires node state to the HTTP API and
//! peer transport, and, on a non-root node, catches up from the root.
//!
//! Subcommands:
//!
//! - `run`     start a node
//! - `keygen`  generate a wallet key
//! - `status`  query a running node
//! - `version` print build version information

mod api;
mod cli;
mod logging;
mod metrics;
mod peers;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rand::Rng;
use tokio::signal;

use cryptochain_protocol::config::{is_root_port, DEFAULT_PORT, PEER_PORT_RANGE};
use cryptochain_protocol::network::{
    NodeState, PeerSynchronizer, PubSub, SharedState, SyncOutcome, TransactionMiner,
};
use cryptochain_protocol::vault::Wallet;

use cli::{Commands, CryptoChainCli};
use logging::LogFormat;
use metrics::{NodeMetrics, SharedMetrics};
use peers::{HttpRootSource, PeerBroadcaster};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CryptoChainCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Keygen => {
            keygen();
            Ok(())
        }
        Commands::Status(args) => query_status(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Picks the listening port: a random one above the default when asked,
/// otherwise the configured one.
fn resolve_port(args: &cli::RunArgs) -> u16 {
    if args.generate_peer_port {
        DEFAULT_PORT + rand::thread_rng().gen_range(1..=PEER_PORT_RANGE)
    } else {
        args.port
    }
}

async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        logging::DEFAULT_FILTER,
        LogFormat::from_str_lossy(&args.log_format),
    );

    let port = resolve_port(&args);
    let is_root = is_root_port(port);
    tracing::info!(port, root = is_root, peers = args.peers.len(), "starting cryptochain-node");

    // --- Wallet & state ---
    let wallet = match &args.wallet_key {
        Some(key) => Wallet::from_secret_hex(key).context("invalid WALLET_KEY")?,
        None => Wallet::new(),
    };
    let node = NodeState::shared(wallet);

    // --- Metrics ---
    let node_metrics: SharedMetrics =
        Arc::new(NodeMetrics::new().context("failed to register metrics")?);
    node_metrics.observe(&node);

    // --- Pubsub & miner ---
    let node_id = uuid::Uuid::new_v4().to_string();
    let pubsub = Arc::new(PubSub::new(node_id.clone(), node.clone()));
    let miner = Arc::new(TransactionMiner::new(node.clone(), pubsub.clone()));

    let broadcaster = PeerBroadcaster::new(args.peers.clone(), Arc::clone(&node_metrics))
        .context("failed to build peer http client")?;
    let broadcast_task = tokio::spawn(broadcaster.run(pubsub.subscribe()));

    // --- API server ---
    let app_state = api::AppState {
        version: env!("CARGO_PKG_VERSION").to_string(),
        node: node.clone(),
        pubsub,
        miner,
        metrics: Arc::clone(&node_metrics),
    };
    let router = api::create_router(app_state);

    let addr = format!("{}:{}", args.bind, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", addr))?;
    tracing::info!(%node_id, "listening at {}", addr);

    // --- Root sync ---
    let sync_task = if is_root {
        None
    } else {
        Some(spawn_root_sync(&args.root_url, node, Arc::clone(&node_metrics)))
    };

    // --- Serve ---
    tokio::select! {
        res = axum::serve(listener, router) => {
            if let Err(e) = res {
                tracing::error!(error = %e, "API server error");
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    broadcast_task.abort();
    if let Some(task) = sync_task {
        task.abort();
    }
    tracing::info!("cryptochain-node stopped");
    Ok(())
}

/// Starts the one-shot sync against the root and logs each outcome as it
/// arrives.
fn spawn_root_sync(
    root_url: &str,
    node: SharedState,
    metrics: SharedMetrics,
) -> tokio::task::JoinHandle<()> {
    tracing::info!(root = %root_url, "synchronizing with root node");
    let source = Arc::new(HttpRootSource::new(root_url));
    let (mut outcomes, _) = PeerSynchronizer::new(source, node.clone()).spawn();

    tokio::spawn(async move {
        while let Some(outcome) = outcomes.recv().await {
            match &outcome {
                SyncOutcome::ChainReplaced { .. } => metrics.chain_replacements_total.inc(),
                SyncOutcome::Failed { resource, error } => {
                    tracing::warn!(%resource, %error, "root sync failed; continuing with local state");
                    metrics.sync_failures_total.inc();
                }
                SyncOutcome::ChainKept { .. } | SyncOutcome::PoolReplaced { .. } => {}
            }
            metrics.observe(&node);
        }
    })
}

/// Prints a fresh wallet's address and secret key.
fn keygen() {
    let wallet = Wallet::new();
    println!("Wallet generated.");
    println!("  Address    : {}", wallet.address());
    println!("  Secret key : {}", wallet.keypair().secret_key_hex());
    println!();
    println!("Start a node with it: WALLET_KEY=<secret key> cryptochain-node run");
}

/// Prints a running node's wallet info and chain length.
async fn query_status(args: cli::StatusArgs) -> Result<()> {
    let base = args.url.trim_end_matches('/');
    let client = reqwest::Client::new();

    let wallet: serde_json::Value = client
        .get(format!("{}/api/wallet-info", base))
        .send()
        .await
        .with_context(|| format!("failed to reach {}", base))?
        .error_for_status()?
        .json()
        .await
        .context("malformed wallet info")?;

    let blocks: Vec<serde_json::Value> = client
        .get(format!("{}/api/blocks", base))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
        .context("malformed chain")?;

    println!("Node {}", base);
    println!("  Address      : {}", wallet["address"].as_str().unwrap_or("?"));
    println!("  Balance      : {}", wallet["balance"]);
    println!("  Chain length : {}", blocks.len());
    Ok(())
}

fn print_version() {
    println!("cryptochain-node {}", env!("CARGO_PKG_VERSION"));
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// If a handler cannot be installed, that signal is simply never observed.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

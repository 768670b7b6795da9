//! # CLI Interface
//!
//! Command-line arguments for `cryptochain-node`, via `clap` derive. Every
//! `run` flag can also come from the environment, which is how multi-node
//! setups are usually scripted (`GENERATE_PEER_PORT=true cryptochain-node run`).

use clap::{Parser, Subcommand};

use cryptochain_protocol::config::{DEFAULT_PORT, DEFAULT_ROOT_NODE_URL};

/// CryptoChain node.
///
/// Keeps a chain, a wallet, and a pool of pending transactions, serves them
/// over HTTP, and exchanges chains and transactions with its peers.
#[derive(Parser, Debug)]
#[command(
    name = "cryptochain-node",
    about = "CryptoChain ledger node",
    version,
    propagate_version = true
)]
pub struct CryptoChainCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a node.
    Run(RunArgs),
    /// Generate a wallet key and print its address.
    Keygen,
    /// Query a running node's wallet and chain.
    Status(StatusArgs),
    /// Print version information and exit.
    Version,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Port for the HTTP API. The node on the default port is the root.
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Listen on a random port above the default instead of `--port`.
    #[arg(long, env = "GENERATE_PEER_PORT")]
    pub generate_peer_port: bool,

    /// Interface to bind.
    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind: String,

    /// Root node to synchronize from on startup.
    #[arg(long, env = "ROOT_NODE_URL", default_value = DEFAULT_ROOT_NODE_URL)]
    pub root_url: String,

    /// Comma-separated base URLs of peers that receive this node's
    /// broadcasts.
    #[arg(long, env = "PEERS", value_delimiter = ',')]
    pub peers: Vec<String>,

    /// Hex-encoded Ed25519 wallet secret key. A fresh wallet is generated
    /// when omitted.
    #[arg(long, env = "WALLET_KEY")]
    pub wallet_key: Option<String>,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Base URL of the running node.
    #[arg(long, default_value = DEFAULT_ROOT_NODE_URL)]
    pub url: String,
}

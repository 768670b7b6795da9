//! # Root Synchronization
//!
//! A node that is not the root catches up once at startup by copying the
//! root node's chain and pending pool.
//!
//! ```text
//! Peer                                Root
//! ────                                ────
//!   │  GET /api/blocks                  │
//!   │─────────────────────────────────> │
//!   │  [Block, ...]                     │
//!   │<───────────────────────────────── │
//!   │  GET /api/transaction-pool-map    │
//!   │─────────────────────────────────> │
//!   │  { id: Transaction, ... }         │
//!   │<───────────────────────────────── │
//! ```
//!
//! The two fetches run as independent tasks. A failure in one does not stop
//! the other, nothing is retried, and a failed fetch leaves the
//! corresponding local state as it was. The fetched chain still has to pass
//! the replacement rules of [`Blockchain::replace_chain`](crate::ledger::Blockchain::replace_chain)
//! (without the transaction check); the fetched pool is adopted as is.
//!
//! Transport lives behind [`SyncSource`], so the node binary plugs in HTTP
//! and tests plug in a mock.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::node::SharedState;
use super::pool::TransactionMap;
use crate::ledger::{Block, ChainError};

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("root node unreachable: {0}")]
    Unreachable(String),

    #[error("root node answered with status {0}")]
    Status(u16),

    #[error("malformed response from root node: {0}")]
    Decode(String),
}

/// Where a peer fetches the root's state from.
#[async_trait]
pub trait SyncSource: Send + Sync {
    async fn fetch_chain(&self) -> Result<Vec<Block>, SyncError>;

    async fn fetch_transaction_map(&self) -> Result<TransactionMap, SyncError>;
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncResource {
    Chain,
    TransactionPool,
}

impl fmt::Display for SyncResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chain => write!(f, "chain"),
            Self::TransactionPool => write!(f, "transaction pool"),
        }
    }
}

/// Result of one sync task, reported to the caller.
#[derive(Debug)]
pub enum SyncOutcome {
    ChainReplaced { length: usize },
    /// Fetched fine, but the local chain was kept.
    ChainKept { reason: ChainError },
    PoolReplaced { count: usize },
    Failed { resource: SyncResource, error: SyncError },
}

impl SyncOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

// ---------------------------------------------------------------------------
// Synchronizer
// ---------------------------------------------------------------------------

pub struct PeerSynchronizer<S> {
    source: Arc<S>,
    state: SharedState,
}

impl<S: SyncSource + 'static> PeerSynchronizer<S> {
    pub fn new(source: Arc<S>, state: SharedState) -> Self {
        Self { source, state }
    }

    /// Fetches the root chain and adopts it if the replacement rules allow.
    pub async fn sync_chain(&self) -> SyncOutcome {
        sync_chain(self.source.as_ref(), &self.state).await
    }

    /// Fetches the root pool and adopts it wholesale.
    pub async fn sync_pool(&self) -> SyncOutcome {
        sync_pool(self.source.as_ref(), &self.state).await
    }

    /// Runs both syncs as independent tasks. Each reports one outcome on the
    /// returned channel; the handles resolve when both are done.
    pub fn spawn(self) -> (mpsc::UnboundedReceiver<SyncOutcome>, [JoinHandle<()>; 2]) {
        let (tx, rx) = mpsc::unbounded_channel();

        let chain_task = {
            let (source, state, tx) = (self.source.clone(), self.state.clone(), tx.clone());
            tokio::spawn(async move {
                let _ = tx.send(sync_chain(source.as_ref(), &state).await);
            })
        };

        let pool_task = {
            let (source, state) = (self.source, self.state);
            tokio::spawn(async move {
                let _ = tx.send(sync_pool(source.as_ref(), &state).await);
            })
        };

        (rx, [chain_task, pool_task])
    }
}

async fn sync_chain<S: SyncSource + ?Sized>(source: &S, state: &SharedState) -> SyncOutcome {
    let blocks = match source.fetch_chain().await {
        Ok(blocks) => blocks,
        Err(error) => {
            warn!(%error, "sync: failed to fetch root chain");
            return SyncOutcome::Failed {
                resource: SyncResource::Chain,
                error,
            };
        }
    };

    let mut chain = state.chain.write();
    match chain.replace_chain(blocks, false) {
        Ok(()) => {
            info!(length = chain.len(), "sync: adopted root chain");
            SyncOutcome::ChainReplaced { length: chain.len() }
        }
        Err(reason) => {
            info!(%reason, "sync: kept local chain");
            SyncOutcome::ChainKept { reason }
        }
    }
}

async fn sync_pool<S: SyncSource + ?Sized>(source: &S, state: &SharedState) -> SyncOutcome {
    match source.fetch_transaction_map().await {
        Ok(map) => {
            let count = map.len();
            state.pool.set_map(map);
            info!(count, "sync: adopted root transaction pool");
            SyncOutcome::PoolReplaced { count }
        }
        Err(error) => {
            warn!(%error, "sync: failed to fetch root transaction pool");
            SyncOutcome::Failed {
                resource: SyncResource::TransactionPool,
                error,
            }
        }
    }
}

//! # Network Module
//!
//! Everything a node shares with its peers, and the state it shares it
//! from.
//!
//! ## Architecture
//!
//! ```text
//! node.rs    NodeState: chain, pool, and wallet behind their locks
//! pool.rs    Pending transaction pool
//! miner.rs   Pool → block → broadcast
//! pubsub.rs  CHAIN / TRANSACTION channels and their handlers
//! sync.rs    One-shot catch-up from the root node
//! ```
//!
//! ## Design Decisions
//!
//! - The pool uses `parking_lot::RwLock` rather than `tokio::sync` locks:
//!   every critical section is short and synchronous.
//! - Pubsub publishes to an in-process broadcast bus. Transport (HTTP to
//!   peers, websockets) happens in the node binary; this crate stays
//!   transport-agnostic.
//! - Sync fetches through the [`SyncSource`] trait for the same reason.

pub mod miner;
pub mod node;
pub mod pool;
pub mod pubsub;
pub mod sync;

pub use miner::TransactionMiner;
pub use node::{NodeState, SharedState, WalletInfo};
pub use pool::{TransactionMap, TransactionPool};
pub use pubsub::{Channel, HandleOutcome, PubSub, PubSubError, PubSubMessage};
pub use sync::{PeerSynchronizer, SyncError, SyncOutcome, SyncResource, SyncSource};

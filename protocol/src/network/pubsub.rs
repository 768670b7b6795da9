//! # Publish/Subscribe
//!
//! Two named channels connect the nodes of a CryptoChain network:
//!
//! | Channel       | Payload            | On receipt                                   |
//! |---------------|--------------------|----------------------------------------------|
//! | `CHAIN`       | full block list    | `replace_chain(.., true)`, then purge pool   |
//! | `TRANSACTION` | one transaction    | `validate`, then `set_transaction`           |
//!
//! Outgoing messages are stamped with this node's id and published on an
//! in-process `tokio::sync::broadcast` bus. The binary subscribes to that
//! bus and forwards messages to peers (HTTP) and to websocket clients. This
//! crate never opens a socket.
//!
//! Delivery is at most once. Messages carrying our own id are ignored, so a
//! node never reprocesses what it published.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

use super::node::SharedState;
use crate::config::PUBSUB_CHANNEL_CAPACITY;
use crate::ledger::{Block, ChainError};
use crate::transaction::{Transaction, TransactionError};

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// A channel name together with its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "message", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    Chain(Vec<Block>),
    Transaction(Transaction),
}

impl Channel {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Chain(_) => "CHAIN",
            Self::Transaction(_) => "TRANSACTION",
        }
    }
}

/// What goes over the wire between nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PubSubMessage {
    /// Id of the node that published the message.
    pub origin: String,
    #[serde(flatten)]
    pub channel: Channel,
}

/// What [`PubSub::handle_message`] did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleOutcome {
    ChainReplaced,
    TransactionStored,
    /// Published by this node.
    Ignored,
}

/// Why a peer message was refused.
#[derive(Debug, Error)]
pub enum PubSubError {
    #[error("chain rejected: {0}")]
    Chain(#[from] ChainError),

    #[error("transaction rejected: {0}")]
    Transaction(#[from] TransactionError),
}

// ---------------------------------------------------------------------------
// PubSub
// ---------------------------------------------------------------------------

pub struct PubSub {
    node_id: String,
    state: SharedState,
    bus: broadcast::Sender<PubSubMessage>,
}

impl PubSub {
    pub fn new(node_id: impl Into<String>, state: SharedState) -> Self {
        let (bus, _) = broadcast::channel(PUBSUB_CHANNEL_CAPACITY);
        Self {
            node_id: node_id.into(),
            state,
            bus,
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// A receiver for every message this node publishes from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<PubSubMessage> {
        self.bus.subscribe()
    }

    /// Publishes the current local chain on `CHAIN`.
    pub fn broadcast_chain(&self) {
        let blocks = self.state.chain.read().blocks().to_vec();
        self.publish(Channel::Chain(blocks));
    }

    /// Publishes `blocks` on `CHAIN`. For callers already holding the
    /// chain lock.
    pub fn broadcast_chain_from(&self, blocks: &[Block]) {
        self.publish(Channel::Chain(blocks.to_vec()));
    }

    /// Publishes `transaction` on `TRANSACTION`.
    pub fn broadcast_transaction(&self, transaction: &Transaction) {
        self.publish(Channel::Transaction(transaction.clone()));
    }

    fn publish(&self, channel: Channel) {
        let name = channel.name();
        let message = PubSubMessage {
            origin: self.node_id.clone(),
            channel,
        };
        match self.bus.send(message) {
            Ok(receivers) => debug!(channel = name, receivers, "published"),
            // No subscribers is not an error: a node with no peers still works.
            Err(_) => trace!(channel = name, "published with no subscribers"),
        }
    }

    /// Applies a message received from a peer.
    ///
    /// A rejected chain or an invalid transaction is returned as an error
    /// and leaves the local chain and pool untouched.
    pub fn handle_message(&self, message: PubSubMessage) -> Result<HandleOutcome, PubSubError> {
        if message.origin == self.node_id {
            return Ok(HandleOutcome::Ignored);
        }

        info!(channel = message.channel.name(), origin = %message.origin, "message received");

        match message.channel {
            Channel::Chain(blocks) => {
                let mut chain = self.state.chain.write();
                chain.replace_chain(blocks, true)?;
                self.state.pool.clear_blockchain_transactions(chain.blocks());
                Ok(HandleOutcome::ChainReplaced)
            }
            Channel::Transaction(transaction) => {
                if let Err(e) = transaction.validate() {
                    warn!(origin = %message.origin, id = %transaction.id(), error = %e, "invalid transaction from peer");
                    return Err(e.into());
                }
                self.state.pool.set_transaction(transaction);
                Ok(HandleOutcome::TransactionStored)
            }
        }
    }
}

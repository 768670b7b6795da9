//! # Transaction Miner
//!
//! Turns the pending pool into a block.
//!
//! ```text
//! 1. SELECT   valid transactions whose input matches the sender's balance
//! 2. REWARD   append one reward transaction for this node's wallet
//! 3. BUILD    add a block carrying them to the local chain
//! 4. PUBLISH  broadcast the new chain on CHAIN
//! 5. CLEAR    empty the local pool
//! ```
//!
//! Invalid pool entries are skipped, not included. So are entries signed
//! against a balance the local chain no longer shows, as happens after a
//! chain replacement; including them would make the block fail
//! transaction-data validation on every peer. There is no
//! proof-of-work: a block is appended as soon as mining is requested.
//! The chain write lock is held from selection through clearing so no
//! concurrent chain replacement can interleave.

use std::sync::Arc;

use tracing::{info, warn};

use super::node::SharedState;
use super::pubsub::PubSub;
use crate::ledger::{Block, BlockData, ChainError};
use crate::transaction::Transaction;
use crate::vault::calculate_balance;

pub struct TransactionMiner {
    state: SharedState,
    pubsub: Arc<PubSub>,
}

impl TransactionMiner {
    pub fn new(state: SharedState, pubsub: Arc<PubSub>) -> Self {
        Self { state, pubsub }
    }

    /// Mines the pool into a new block and returns it.
    pub fn mine_transactions(&self) -> Result<Block, ChainError> {
        let reward = {
            let wallet = self.state.wallet.lock();
            Transaction::reward(&wallet)
        };

        let block = {
            let mut chain = self.state.chain.write();

            let mut transactions: Vec<Transaction> = self
                .state
                .pool
                .valid_transactions()
                .into_iter()
                .filter(|tx| {
                    let balance = calculate_balance(chain.blocks(), tx.sender());
                    let current = tx.input().amount == balance;
                    if !current {
                        warn!(id = %tx.id(), input = tx.input().amount, balance, "skipping transaction with stale input");
                    }
                    current
                })
                .collect();
            let included = transactions.len();
            transactions.push(reward);

            let block = chain
                .add_block(BlockData::from_transactions(transactions))?
                .clone();
            self.pubsub.broadcast_chain_from(chain.blocks());
            self.state.pool.clear();

            info!(hash = %block.hash, height = chain.len() - 1, transactions = included, "block mined");
            block
        };

        Ok(block)
    }
}

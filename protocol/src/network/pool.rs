//! Pending transaction pool.
//!
//! Holds transactions that have been created or received but not yet mined,
//! keyed by transaction id. A sender has at most one pending transaction at
//! a time on this node: new transfers from the same wallet amend it instead
//! of adding another.
//!
//! ## Design
//!
//! - A single `parking_lot::RwLock<HashMap>`. Reads (API snapshots, the
//!   miner's validity scan) outnumber writes, and no lock is held across an
//!   `.await`.
//! - Snapshots are clones. Callers never hold a guard into the pool.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::ledger::Block;
use crate::transaction::Transaction;

/// Pool contents as exchanged with peers: id → transaction.
pub type TransactionMap = HashMap<String, Transaction>;

#[derive(Debug, Default)]
pub struct TransactionPool {
    transactions: RwLock<TransactionMap>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `transaction`, replacing any entry with the same id.
    pub fn set_transaction(&self, transaction: Transaction) {
        debug!(id = %transaction.id(), sender = %transaction.sender(), "pool: set transaction");
        self.transactions
            .write()
            .insert(transaction.id().to_string(), transaction);
    }

    /// Replaces the whole pool, as when adopting the root node's pool.
    pub fn set_map(&self, map: TransactionMap) {
        *self.transactions.write() = map;
    }

    /// The pending transaction whose input address is `address`, if any.
    pub fn existing_transaction(&self, address: &str) -> Option<Transaction> {
        self.transactions
            .read()
            .values()
            .find(|tx| tx.input().address == address)
            .cloned()
    }

    /// Removes and returns the entry with `id`.
    pub fn remove(&self, id: &str) -> Option<Transaction> {
        self.transactions.write().remove(id)
    }

    pub fn get(&self, id: &str) -> Option<Transaction> {
        self.transactions.read().get(id).cloned()
    }

    /// Snapshot of the pool.
    pub fn transaction_map(&self) -> TransactionMap {
        self.transactions.read().clone()
    }

    /// Pending transactions that pass [`Transaction::validate`]. Invalid
    /// entries are logged and left in place.
    pub fn valid_transactions(&self) -> Vec<Transaction> {
        self.transactions
            .read()
            .values()
            .filter(|tx| match tx.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!(id = %tx.id(), error = %e, "pool: skipping invalid transaction");
                    false
                }
            })
            .cloned()
            .collect()
    }

    /// Drops every pooled transaction whose id appears in `chain`. Returns
    /// how many were removed.
    pub fn clear_blockchain_transactions(&self, chain: &[Block]) -> usize {
        let mut transactions = self.transactions.write();
        let before = transactions.len();
        for block in chain.iter().skip(1) {
            for tx in block.transactions() {
                transactions.remove(tx.id());
            }
        }
        let removed = before - transactions.len();
        if removed > 0 {
            debug!(removed, "pool: cleared mined transactions");
        }
        removed
    }

    pub fn clear(&self) {
        self.transactions.write().clear();
    }

    pub fn len(&self) -> usize {
        self.transactions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.read().is_empty()
    }
}

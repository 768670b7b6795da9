//! # Node State
//!
//! Everything one CryptoChain node owns: its chain, its pending pool, and
//! its wallet. A single [`NodeState`] is created at startup and shared as
//! [`SharedState`] with the API handlers, the pubsub handler, the miner,
//! and the sync tasks.
//!
//! ## Locking
//!
//! Locks are always taken in the order wallet → chain → pool, and never
//! held across an `.await`. Operations that must be atomic with respect to
//! each other (amending a pending transaction, mining, adopting a peer's
//! chain) each hold the locks they need for their whole read-modify-write.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::pool::TransactionPool;
use crate::ledger::Blockchain;
use crate::transaction::Transaction;
use crate::vault::{calculate_balance, Wallet, WalletError};

/// Shared handle to the node state.
pub type SharedState = Arc<NodeState>;

/// Address and live balance of a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletInfo {
    pub address: String,
    pub balance: u64,
}

pub struct NodeState {
    pub chain: RwLock<Blockchain>,
    pub pool: TransactionPool,
    pub wallet: Mutex<Wallet>,
}

impl NodeState {
    pub fn new(wallet: Wallet) -> Self {
        info!(address = %wallet.address(), "node wallet ready");
        Self {
            chain: RwLock::new(Blockchain::new()),
            pool: TransactionPool::new(),
            wallet: Mutex::new(wallet),
        }
    }

    pub fn shared(wallet: Wallet) -> SharedState {
        Arc::new(Self::new(wallet))
    }

    /// Sends `amount` from the node wallet to `recipient`.
    ///
    /// If the wallet already has a valid pending transaction in the pool it
    /// is amended; otherwise a new one is created against the current chain.
    /// A pending entry in our name that fails validation was not written by
    /// this wallet: it is dropped, never re-signed. The result is stored in
    /// the pool and returned for broadcasting. On error the pool is
    /// unchanged apart from that drop.
    pub fn transact(&self, amount: u64, recipient: &str) -> Result<Transaction, WalletError> {
        let mut wallet = self.wallet.lock();
        let chain = self.chain.read();

        let pending = match self.pool.existing_transaction(wallet.address()) {
            Some(pending) => match pending.validate() {
                Ok(()) => Some(pending),
                Err(e) => {
                    warn!(id = %pending.id(), error = %e, "dropping invalid pending transaction in our name");
                    self.pool.remove(pending.id());
                    None
                }
            },
            None => None,
        };

        let transaction = match pending {
            Some(mut pending) => {
                pending.update(&wallet, recipient, amount)?;
                pending
            }
            None => wallet.create_transaction(amount, recipient, Some(chain.blocks()))?,
        };

        self.pool.set_transaction(transaction.clone());
        Ok(transaction)
    }

    /// The node wallet's address and live balance.
    pub fn wallet_info(&self) -> WalletInfo {
        let address = self.wallet.lock().address().to_string();
        let balance = calculate_balance(self.chain.read().blocks(), &address);
        WalletInfo { address, balance }
    }

    pub fn address(&self) -> String {
        self.wallet.lock().address().to_string()
    }

    pub fn chain_length(&self) -> usize {
        self.chain.read().len()
    }
}

//! # Wallet
//!
//! A [`Wallet`] owns a keypair and a cached balance. The address is the
//! hex-encoded public key. The cached balance is only a snapshot; the
//! authoritative figure is always [`calculate_balance`] over the chain,
//! and [`Wallet::create_transaction`] refreshes the cache before it builds
//! anything.

use serde::Serialize;
use thiserror::Error;

use super::balance::calculate_balance;
use crate::config::STARTING_BALANCE;
use crate::crypto::keys::{KeyError, Keypair, Signature};
use crate::crypto::signatures::{self, SignatureError};
use crate::ledger::Block;
use crate::transaction::{Transaction, TransactionError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum WalletError {
    /// The requested amount is larger than the wallet's balance.
    #[error("amount {amount} exceeds balance {balance}")]
    InsufficientFunds { balance: u64, amount: u64 },

    /// Building or amending the transaction failed.
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// The secret key could not be loaded.
    #[error(transparent)]
    Key(#[from] KeyError),
}

// ---------------------------------------------------------------------------
// Wallet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Wallet {
    keypair: Keypair,
    address: String,
    balance: u64,
}

impl Wallet {
    /// A fresh wallet with a random keypair and [`STARTING_BALANCE`].
    pub fn new() -> Self {
        Self::from_keypair(Keypair::generate())
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        let address = keypair.address();
        Self {
            keypair,
            address,
            balance: STARTING_BALANCE,
        }
    }

    /// Restores a wallet from a hex-encoded secret key.
    pub fn from_secret_hex(secret: &str) -> Result<Self, WalletError> {
        Ok(Self::from_keypair(Keypair::from_hex(secret)?))
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Cached balance as of the last refresh.
    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    /// Signs `crypto_hash(data)` with this wallet's key.
    pub fn sign<T: Serialize + ?Sized>(&self, data: &T) -> Result<Signature, SignatureError> {
        signatures::sign(&self.keypair, data)
    }

    /// Recomputes the cached balance from `chain` and returns it.
    pub fn refresh_balance(&mut self, chain: &[Block]) -> u64 {
        self.balance = calculate_balance(chain, &self.address);
        self.balance
    }

    /// Builds and signs a new transfer.
    ///
    /// With a chain, the cached balance is refreshed from it first. Without
    /// one, the cached balance is used as is.
    pub fn create_transaction(
        &mut self,
        amount: u64,
        recipient: &str,
        chain: Option<&[Block]>,
    ) -> Result<Transaction, WalletError> {
        if let Some(chain) = chain {
            self.refresh_balance(chain);
        }

        if amount > self.balance {
            return Err(WalletError::InsufficientFunds {
                balance: self.balance,
                amount,
            });
        }

        Ok(Transaction::new(self, recipient, amount)?)
    }

    /// Balance of any address on `chain`.
    pub fn calculate_balance(chain: &[Block], address: &str) -> u64 {
        calculate_balance(chain, address)
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

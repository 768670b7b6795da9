//! # Vault Module
//!
//! Wallets and balances.
//!
//! ```text
//! wallet.rs   Keypair-backed wallet with a cached balance
//! balance.rs  The chain scan that computes any address's balance
//! ```
//!
//! Every address implicitly owns [`STARTING_BALANCE`](crate::config::STARTING_BALANCE)
//! until it first sends. Nothing here is persisted: a balance is whatever
//! the chain says it is.

pub mod balance;
pub mod wallet;

pub use balance::calculate_balance;
pub use wallet::{Wallet, WalletError};

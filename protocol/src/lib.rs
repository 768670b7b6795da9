// Copyright (c) 2026 CryptoChain Contributors. MIT License.
// See LICENSE for details.

//! # CryptoChain Protocol: Core Library
//!
//! A small cryptocurrency ledger: signed transfers between wallet
//! addresses, a pool of pending transfers, blocks mined from that pool, and
//! a longest-valid-chain rule for agreeing with peers.
//!
//! ## Architecture
//!
//! - **config**: ledger constants (starting balance, mining reward, genesis).
//! - **crypto**: Ed25519 keys and signatures, SHA-256 over canonical JSON.
//! - **transaction**: creating, amending, and validating transfers.
//! - **vault**: wallets and the chain scan that computes balances.
//! - **ledger**: blocks and the chain, with its replacement rules.
//! - **network**: node state, the pool, mining, pubsub, and root sync.
//!
//! The node binary (`cryptochain-node`) puts an HTTP API and peer
//! transport on top of this crate.
//!
//! ## Ground rules
//!
//! 1. Amounts are `u64`. No floating point near money.
//! 2. Every output map sums to its input amount and is signed by its sender.
//! 3. Balances are never stored. They are recomputed from the chain.
//! 4. Everything is in memory. A restarted node catches up from the root.

pub mod config;
pub mod crypto;
pub mod ledger;
pub mod network;
pub mod transaction;
pub mod vault;

pub use ledger::{Block, BlockData, Blockchain, ChainError};
pub use network::{NodeState, PubSub, SharedState, TransactionMiner, TransactionPool};
pub use transaction::{Transaction, TransactionError};
pub use vault::{calculate_balance, Wallet, WalletError};

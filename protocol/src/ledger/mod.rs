//! # Ledger
//!
//! Blocks and the chain. Held in memory; nothing is persisted across
//! restarts, and a peer that starts up catches up from the root node.

pub mod block;
pub mod chain;

pub use block::{Block, BlockData, LedgerEntry};
pub use chain::{Blockchain, ChainError};

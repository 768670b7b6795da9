//! # Block Structure
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │  timestamp: u64      (Unix ms)                │
//! │  lastHash:  String   (hash of the previous)   │
//! │  hash:      String   (sha256 of the fields)   │
//! ├───────────────────────────────────────────────┤
//! │  data: list of transactions, or any JSON      │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! The hash is `sha256(json([timestamp, lastHash, data]))`, hex-encoded.
//! The genesis block is a fixed constant and is compared by value rather
//! than re-hashed.
//!
//! Block data is usually a list of transactions, but arbitrary payloads can
//! be mined through the API and peers may send entries this node does not
//! understand. Both are kept verbatim so hashes still match, and are
//! ignored by balance computation and transaction validation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{GENESIS_HASH, GENESIS_LAST_HASH, GENESIS_TIMESTAMP};
use crate::crypto::hash::crypto_hash_hex;
use crate::transaction::types::now_millis;
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// Block data
// ---------------------------------------------------------------------------

/// One element of a block's transaction list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LedgerEntry {
    Transaction(Transaction),
    /// Anything that does not parse as a transaction.
    Foreign(Value),
}

/// The payload of a block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockData {
    /// A JSON array. Transactions are recognised entry by entry.
    Entries(Vec<LedgerEntry>),
    /// Any other JSON value.
    Opaque(Value),
}

impl BlockData {
    pub fn from_transactions(transactions: Vec<Transaction>) -> Self {
        Self::Entries(transactions.into_iter().map(LedgerEntry::Transaction).collect())
    }

    pub fn empty() -> Self {
        Self::Entries(Vec::new())
    }

    /// Iterates over the well-formed transactions in this payload.
    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> + '_ {
        let entries: &[LedgerEntry] = match self {
            Self::Entries(entries) => entries,
            Self::Opaque(_) => &[],
        };
        entries.iter().filter_map(|entry| match entry {
            LedgerEntry::Transaction(tx) => Some(tx),
            LedgerEntry::Foreign(_) => None,
        })
    }
}

impl Default for BlockData {
    fn default() -> Self {
        Self::empty()
    }
}

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// A block of the chain. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub timestamp: u64,
    pub last_hash: String,
    pub hash: String,
    pub data: BlockData,
}

impl Block {
    /// The fixed first block every chain starts with.
    pub fn genesis() -> Self {
        Self {
            timestamp: GENESIS_TIMESTAMP,
            last_hash: GENESIS_LAST_HASH.to_string(),
            hash: GENESIS_HASH.to_string(),
            data: BlockData::empty(),
        }
    }

    /// Builds a block on top of `parent`, stamped with the current time.
    pub fn new(parent: &Block, data: BlockData) -> Result<Self, serde_json::Error> {
        Self::with_timestamp(parent, data, now_millis())
    }

    pub fn with_timestamp(
        parent: &Block,
        data: BlockData,
        timestamp: u64,
    ) -> Result<Self, serde_json::Error> {
        let last_hash = parent.hash.clone();
        let hash = block_hash(timestamp, &last_hash, &data)?;
        Ok(Self {
            timestamp,
            last_hash,
            hash,
            data,
        })
    }

    /// Recomputes the hash from the block's fields.
    pub fn compute_hash(&self) -> Result<String, serde_json::Error> {
        block_hash(self.timestamp, &self.last_hash, &self.data)
    }

    /// `true` when the stored hash matches the fields.
    pub fn has_valid_hash(&self) -> bool {
        matches!(self.compute_hash(), Ok(hash) if hash == self.hash)
    }

    pub fn is_genesis(&self) -> bool {
        *self == Self::genesis()
    }

    /// The well-formed transactions carried by this block.
    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> + '_ {
        self.data.transactions()
    }
}

/// `sha256(json([timestamp, last_hash, data]))` as hex.
pub fn block_hash(timestamp: u64, last_hash: &str, data: &BlockData) -> Result<String, serde_json::Error> {
    crypto_hash_hex(&(timestamp, last_hash, data))
}

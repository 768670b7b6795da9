//! Core record types for CryptoChain transactions.
//!
//! A transaction is an `input` (who pays, from what balance, signed) and an
//! `outputMap` (who receives how much, including the sender's own change).
//! The JSON shape is the wire format exchanged between peers, hence the
//! camelCase renames.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::REWARD_INPUT_ADDRESS;

/// Address → amount. A `BTreeMap` so the serialized (and therefore signed)
/// form has a single canonical key order.
pub type OutputMap = BTreeMap<String, u64>;

// ---------------------------------------------------------------------------
// TransactionInput
// ---------------------------------------------------------------------------

/// The signed half of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransactionInput {
    /// Unix timestamp (milliseconds) of the latest signature.
    pub timestamp: u64,
    /// Sender balance at creation time. Equals the sum of the output map.
    pub amount: u64,
    /// Sender address (hex public key), or [`REWARD_INPUT_ADDRESS`].
    pub address: String,
    /// Hex Ed25519 signature over `crypto_hash(outputMap)`. Empty for
    /// reward transactions.
    pub signature: String,
}

impl TransactionInput {
    /// Returns `true` for the fixed input carried by mining rewards.
    pub fn is_reward(&self) -> bool {
        self.address == REWARD_INPUT_ADDRESS
    }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A transfer of value from one address to one or more recipients.
///
/// Fields are crate-visible only. Outside the crate a transaction can be
/// read, cloned, and (de)serialized, but its output map changes only through
/// [`Transaction::update`](super::signing), which re-signs it.
///
/// Unknown fields are rejected, so a ledger entry carrying extras is kept
/// as foreign JSON and re-serializes byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Transaction {
    pub(crate) id: String,
    pub(crate) output_map: OutputMap,
    pub(crate) input: TransactionInput,
}

impl Transaction {
    /// Unique id (UUID v4), fixed for the life of the transaction.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn output_map(&self) -> &OutputMap {
        &self.output_map
    }

    pub fn input(&self) -> &TransactionInput {
        &self.input
    }

    /// Sender address.
    pub fn sender(&self) -> &str {
        &self.input.address
    }

    /// The amount recorded for `address`, if it has an output entry.
    pub fn output_for(&self, address: &str) -> Option<u64> {
        self.output_map.get(address).copied()
    }

    /// Sum of all outputs, `None` on overflow.
    pub fn output_total(&self) -> Option<u64> {
        self.output_map
            .values()
            .try_fold(0u64, |acc, value| acc.checked_add(*value))
    }

    pub fn is_reward(&self) -> bool {
        self.input.is_reward()
    }
}

/// Current wall-clock time in Unix milliseconds.
pub(crate) fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}

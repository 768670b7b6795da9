//! Transaction validation: the structural sum check and the signature check.
//!
//! A transaction is valid when its outputs add up to exactly the input
//! amount and the input signature verifies over the output map against the
//! input address. The sum check runs first because it is a few additions,
//! while the signature check is an Ed25519 verification.

use thiserror::Error;

use super::types::Transaction;
use crate::crypto::signatures;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised while building, amending, or validating a transaction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransactionError {
    /// Transfers of zero are rejected.
    #[error("amount must be > 0")]
    InvalidAmount,

    /// The recipient is the sender's own address.
    #[error("sender and recipient must differ: both are {address}")]
    SelfTransfer { address: String },

    /// An amendment was attempted by a wallet other than the transaction's sender.
    #[error("transaction belongs to {expected}, not {actual}")]
    SenderMismatch { expected: String, actual: String },

    /// The requested amount is larger than what the sender has left.
    #[error("amount {requested} exceeds balance {available}")]
    AmountExceedsBalance { available: u64, requested: u64 },

    /// Crediting a recipient would overflow its output entry.
    #[error("output for {address} would overflow")]
    OutputOverflow { address: String },

    /// Output entries do not sum to the input amount.
    #[error("invalid transaction from {address}: outputs total {outputs:?}, input amount {input}")]
    OutputTotalMismatch {
        address: String,
        input: u64,
        outputs: Option<u64>,
    },

    /// The signature does not verify over the output map.
    #[error("invalid signature from {address}")]
    InvalidSignature { address: String },

    /// The output map could not be encoded for signing.
    #[error("failed to sign transaction: {0}")]
    Signing(String),
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl Transaction {
    /// Checks the sum and signature of a transfer.
    ///
    /// Reward transactions carry no signature and fail here. The ledger
    /// validates them separately against the mining reward.
    pub fn validate(&self) -> Result<(), TransactionError> {
        let input = &self.input;

        let outputs = self.output_total();
        if outputs != Some(input.amount) {
            return Err(TransactionError::OutputTotalMismatch {
                address: input.address.clone(),
                input: input.amount,
                outputs,
            });
        }

        if !signatures::verify(&input.address, &self.output_map, &input.signature) {
            return Err(TransactionError::InvalidSignature {
                address: input.address.clone(),
            });
        }

        Ok(())
    }

    /// `true` when [`Transaction::validate`] passes.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

//! Creating, amending, and rewarding: every path that produces a signed
//! input.
//!
//! The output map is only ever changed here, and each change is followed by
//! a fresh signature. Amendments are built on a copy and swapped in at the
//! end, so a rejected amendment leaves the transaction exactly as it was.

use uuid::Uuid;

use super::types::{now_millis, OutputMap, Transaction, TransactionInput};
use super::verification::TransactionError;
use crate::config::{MINING_REWARD, REWARD_INPUT_ADDRESS};
use crate::vault::Wallet;

impl Transaction {
    /// Creates a transfer of `amount` from `sender` to `recipient`.
    ///
    /// The input amount is the sender's cached balance and the sender's
    /// change is `balance - amount`. Callers refresh the balance from the
    /// chain first; [`Wallet::create_transaction`] does that.
    pub fn new(sender: &Wallet, recipient: &str, amount: u64) -> Result<Self, TransactionError> {
        if amount == 0 {
            return Err(TransactionError::InvalidAmount);
        }
        if recipient == sender.address() {
            return Err(TransactionError::SelfTransfer {
                address: recipient.to_string(),
            });
        }

        let balance = sender.balance();
        let change = balance
            .checked_sub(amount)
            .ok_or(TransactionError::AmountExceedsBalance {
                available: balance,
                requested: amount,
            })?;

        let mut output_map = OutputMap::new();
        output_map.insert(recipient.to_string(), amount);
        output_map.insert(sender.address().to_string(), change);

        let input = signed_input(sender, balance, &output_map)?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            output_map,
            input,
        })
    }

    /// Adds `amount` for `recipient` to a pending transaction.
    ///
    /// An existing recipient's amount accumulates. The sender's change
    /// shrinks by `amount`, the output map is re-signed, and the input gets
    /// a new timestamp and signature. The input amount is untouched so the
    /// outputs keep summing to it. The id never changes.
    pub fn update(
        &mut self,
        sender: &Wallet,
        recipient: &str,
        amount: u64,
    ) -> Result<(), TransactionError> {
        if amount == 0 {
            return Err(TransactionError::InvalidAmount);
        }
        let address = sender.address();
        if self.input.address != address {
            return Err(TransactionError::SenderMismatch {
                expected: self.input.address.clone(),
                actual: address.to_string(),
            });
        }
        if recipient == address {
            return Err(TransactionError::SelfTransfer {
                address: address.to_string(),
            });
        }

        let remaining = self.output_for(address).unwrap_or(0);
        let change = remaining
            .checked_sub(amount)
            .ok_or(TransactionError::AmountExceedsBalance {
                available: remaining,
                requested: amount,
            })?;

        let mut output_map = self.output_map.clone();
        let credited = output_map.entry(recipient.to_string()).or_insert(0);
        *credited = credited
            .checked_add(amount)
            .ok_or_else(|| TransactionError::OutputOverflow {
                address: recipient.to_string(),
            })?;
        output_map.insert(address.to_string(), change);

        let input = signed_input(sender, self.input.amount, &output_map)?;

        self.output_map = output_map;
        self.input = input;
        Ok(())
    }

    /// The reward transaction paying [`MINING_REWARD`] to `miner`.
    ///
    /// Reward inputs use [`REWARD_INPUT_ADDRESS`] and carry no signature.
    pub fn reward(miner: &Wallet) -> Self {
        let mut output_map = OutputMap::new();
        output_map.insert(miner.address().to_string(), MINING_REWARD);

        Self {
            id: Uuid::new_v4().to_string(),
            output_map,
            input: TransactionInput {
                timestamp: now_millis(),
                amount: MINING_REWARD,
                address: REWARD_INPUT_ADDRESS.to_string(),
                signature: String::new(),
            },
        }
    }
}

fn signed_input(
    sender: &Wallet,
    amount: u64,
    output_map: &OutputMap,
) -> Result<TransactionInput, TransactionError> {
    let signature = sender
        .sign(output_map)
        .map_err(|e| TransactionError::Signing(e.to_string()))?;

    Ok(TransactionInput {
        timestamp: now_millis(),
        amount,
        address: sender.address().to_string(),
        signature: signature.to_hex(),
    })
}

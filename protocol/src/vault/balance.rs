//! # Balance Scan
//!
//! Balances are not stored anywhere. They are recomputed from the chain by
//! walking backwards from the tip:
//!
//! - every output addressed to the wallet in a scanned block is added up;
//! - the scan stops after the first (newest) block that contains a send
//!   from the wallet, because that send's change output already carries
//!   everything the wallet owned up to that point;
//! - an address that has never sent also gets [`STARTING_BALANCE`].
//!
//! The genesis block is never scanned. Blocks whose data is not a list of
//! transactions, and list entries that are not transactions, contribute
//! nothing.

use crate::config::STARTING_BALANCE;
use crate::ledger::Block;

/// Computes the balance of `address` from `chain`.
///
/// Total over all inputs: an empty slice or a genesis-only chain yields
/// [`STARTING_BALANCE`]. Sums saturate instead of wrapping.
pub fn calculate_balance(chain: &[Block], address: &str) -> u64 {
    let mut has_conducted_transaction = false;
    let mut outputs_total: u64 = 0;

    for block in chain.iter().skip(1).rev() {
        for transaction in block.transactions() {
            if transaction.input().address == address {
                has_conducted_transaction = true;
            }
            if let Some(value) = transaction.output_for(address) {
                outputs_total = outputs_total.saturating_add(value);
            }
        }

        if has_conducted_transaction {
            break;
        }
    }

    if has_conducted_transaction {
        outputs_total
    } else {
        STARTING_BALANCE.saturating_add(outputs_total)
    }
}

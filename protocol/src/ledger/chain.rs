//! # Blockchain
//!
//! The ordered list of blocks a node believes in, and the rules for giving
//! it up in favour of a peer's.
//!
//! ## Replacement rules
//!
//! An incoming chain replaces the local one only when all hold:
//!
//! 1. it is strictly longer;
//! 2. it starts with the genesis block, every block links to its
//!    predecessor's hash, and every hash recomputes;
//! 3. when transaction checking is requested, every block's transaction
//!    data is valid (see [`Blockchain::validate_transaction_data`]).
//!
//! Otherwise the local chain is kept and the reason is returned.

use std::collections::HashSet;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::block::{Block, BlockData};
use crate::config::MINING_REWARD;
use crate::vault::calculate_balance;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    /// The incoming chain is not longer than ours.
    #[error("incoming chain must be longer: {incoming} <= {local}")]
    ChainNotLonger { incoming: usize, local: usize },

    /// Structural validation failed.
    #[error("incoming chain must be valid: {0}")]
    InvalidChain(String),

    /// A block's transactions break the ledger rules.
    #[error("incoming chain has invalid transaction data: {0}")]
    InvalidTransactionData(String),

    /// A block hash could not be computed.
    #[error("failed to encode block: {0}")]
    Encoding(String),
}

impl From<serde_json::Error> for ChainError {
    fn from(e: serde_json::Error) -> Self {
        Self::Encoding(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Blockchain
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Blockchain {
    blocks: Vec<Block>,
}

impl Blockchain {
    /// A chain holding only the genesis block.
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::genesis()],
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always `false`: a chain has at least its genesis block.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn tip(&self) -> &Block {
        // Invariant: `blocks` starts with genesis and is never emptied.
        &self.blocks[self.blocks.len() - 1]
    }

    /// Appends a block carrying `data` on top of the current tip.
    pub fn add_block(&mut self, data: BlockData) -> Result<&Block, ChainError> {
        let block = Block::new(self.tip(), data)?;
        debug!(hash = %block.hash, height = self.blocks.len(), "block added");
        self.blocks.push(block);
        Ok(self.tip())
    }

    /// Replaces the local chain with `chain` if it passes the rules above.
    pub fn replace_chain(
        &mut self,
        chain: Vec<Block>,
        validate_transactions: bool,
    ) -> Result<(), ChainError> {
        if chain.len() <= self.blocks.len() {
            return Err(ChainError::ChainNotLonger {
                incoming: chain.len(),
                local: self.blocks.len(),
            });
        }

        if let Err(e) = Self::validate_chain(&chain) {
            warn!(error = %e, "rejecting incoming chain");
            return Err(e);
        }

        if validate_transactions {
            if let Err(e) = Self::validate_transaction_data(&chain) {
                warn!(error = %e, "rejecting incoming chain");
                return Err(e);
            }
        }

        info!(
            old_length = self.blocks.len(),
            new_length = chain.len(),
            "replacing chain"
        );
        self.blocks = chain;
        Ok(())
    }

    /// Structural validity: genesis, hash links, and hash recomputation.
    pub fn validate_chain(chain: &[Block]) -> Result<(), ChainError> {
        match chain.first() {
            Some(first) if first.is_genesis() => {}
            _ => return Err(ChainError::InvalidChain("first block is not genesis".into())),
        }

        for (index, pair) in chain.windows(2).enumerate() {
            let (previous, block) = (&pair[0], &pair[1]);
            let height = index + 1;

            if block.last_hash != previous.hash {
                return Err(ChainError::InvalidChain(format!(
                    "block {height} lastHash {} does not match previous hash {}",
                    block.last_hash, previous.hash
                )));
            }

            if !block.has_valid_hash() {
                return Err(ChainError::InvalidChain(format!(
                    "block {height} hash {} does not match its contents",
                    block.hash
                )));
            }
        }

        Ok(())
    }

    pub fn is_valid_chain(chain: &[Block]) -> bool {
        Self::validate_chain(chain).is_ok()
    }

    /// Ledger rules for every block after genesis:
    ///
    /// - at most one reward transaction, paying exactly [`MINING_REWARD`];
    /// - every other transaction passes [`Transaction::validate`](crate::transaction::Transaction::validate);
    /// - each sender's input amount equals its balance computed from the
    ///   blocks before this one;
    /// - no transaction id appears twice in the same block.
    ///
    /// Entries that are not transactions are skipped.
    pub fn validate_transaction_data(chain: &[Block]) -> Result<(), ChainError> {
        for (height, block) in chain.iter().enumerate().skip(1) {
            let mut seen = HashSet::new();
            let mut reward_count = 0usize;

            for transaction in block.transactions() {
                if transaction.is_reward() {
                    reward_count += 1;
                    if reward_count > 1 {
                        return Err(ChainError::InvalidTransactionData(format!(
                            "block {height} has more than one reward"
                        )));
                    }
                    if transaction.output_total() != Some(MINING_REWARD) {
                        return Err(ChainError::InvalidTransactionData(format!(
                            "block {height} reward {} is not {MINING_REWARD}",
                            transaction.id()
                        )));
                    }
                } else {
                    transaction.validate().map_err(|e| {
                        ChainError::InvalidTransactionData(format!("block {height}: {e}"))
                    })?;

                    let true_balance = calculate_balance(&chain[..height], transaction.sender());
                    if transaction.input().amount != true_balance {
                        return Err(ChainError::InvalidTransactionData(format!(
                            "block {height} transaction {} claims input {} but balance is {true_balance}",
                            transaction.id(),
                            transaction.input().amount
                        )));
                    }
                }

                if !seen.insert(transaction.id()) {
                    return Err(ChainError::InvalidTransactionData(format!(
                        "block {height} repeats transaction {}",
                        transaction.id()
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::Transaction;
    use crate::vault::Wallet;
    use serde_json::json;

    fn opaque(value: &str) -> BlockData {
        BlockData::Opaque(json!(value))
    }

    fn chain_of(data: &[&str]) -> Blockchain {
        let mut chain = Blockchain::new();
        for d in data {
            chain.add_block(opaque(d)).unwrap();
        }
        chain
    }

    #[test]
    fn starts_with_genesis() {
        let chain = Blockchain::new();
        assert_eq!(chain.len(), 1);
        assert!(chain.blocks()[0].is_genesis());
        assert!(!chain.is_empty());
    }

    #[test]
    fn add_block_links_to_tip() {
        let mut chain = Blockchain::new();
        let hash = chain.add_block(opaque("foo")).unwrap().hash.clone();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.tip().hash, hash);
        assert_eq!(chain.tip().last_hash, "hash-one");
        assert!(Blockchain::is_valid_chain(chain.blocks()));
    }

    #[test]
    fn rejects_chain_not_starting_with_genesis() {
        let mut blocks = chain_of(&["a"]).blocks().to_vec();
        blocks[0].data = opaque("fake-genesis");
        assert!(matches!(
            Blockchain::validate_chain(&blocks),
            Err(ChainError::InvalidChain(_))
        ));
    }

    #[test]
    fn rejects_broken_link() {
        let mut blocks = chain_of(&["a", "b", "c"]).blocks().to_vec();
        blocks[2].last_hash = "broken-lastHash".into();
        assert!(!Blockchain::is_valid_chain(&blocks));
    }

    #[test]
    fn rejects_tampered_data() {
        let mut blocks = chain_of(&["a", "b", "c"]).blocks().to_vec();
        blocks[2].data = opaque("some-bad-and-evil-data");
        assert!(!Blockchain::is_valid_chain(&blocks));
    }

    #[test]
    fn replace_requires_longer_chain() {
        let mut local = chain_of(&["a", "b"]);
        let before = local.clone();
        let incoming = chain_of(&["x"]).blocks().to_vec();

        let err = local.replace_chain(incoming, false).unwrap_err();
        assert_eq!(err, ChainError::ChainNotLonger { incoming: 2, local: 3 });
        assert_eq!(local, before);

        let same_length = chain_of(&["x", "y"]).blocks().to_vec();
        assert!(local.replace_chain(same_length, false).is_err());
    }

    #[test]
    fn replace_rejects_invalid_longer_chain() {
        let mut local = Blockchain::new();
        let mut incoming = chain_of(&["a", "b"]).blocks().to_vec();
        incoming[1].hash = "forged".into();

        assert!(matches!(
            local.replace_chain(incoming, false),
            Err(ChainError::InvalidChain(_))
        ));
        assert_eq!(local.len(), 1);
    }

    #[test]
    fn replace_accepts_valid_longer_chain() {
        let mut local = Blockchain::new();
        let incoming = chain_of(&["a", "b"]);
        local.replace_chain(incoming.blocks().to_vec(), true).unwrap();
        assert_eq!(local, incoming);
    }

    // -- transaction data ---------------------------------------------------

    fn with_transactions(txs: Vec<Transaction>) -> Vec<Block> {
        let mut chain = Blockchain::new();
        chain.add_block(BlockData::from_transactions(txs)).unwrap();
        chain.blocks().to_vec()
    }

    #[test]
    fn valid_transaction_data_passes() {
        let alice = Wallet::new();
        let miner = Wallet::new();
        let tx = Transaction::new(&alice, "bob", 10).unwrap();
        let blocks = with_transactions(vec![tx, Transaction::reward(&miner)]);
        assert_eq!(Blockchain::validate_transaction_data(&blocks), Ok(()));
    }

    #[test]
    fn multiple_rewards_are_rejected() {
        let miner = Wallet::new();
        let blocks = with_transactions(vec![Transaction::reward(&miner), Transaction::reward(&miner)]);
        assert!(matches!(
            Blockchain::validate_transaction_data(&blocks),
            Err(ChainError::InvalidTransactionData(_))
        ));
    }

    #[test]
    fn inflated_reward_is_rejected() {
        let miner = Wallet::new();
        let mut reward = Transaction::reward(&miner);
        reward.output_map.insert(miner.address().to_string(), 999_999);
        let blocks = with_transactions(vec![reward]);
        assert!(Blockchain::validate_transaction_data(&blocks).is_err());
    }

    #[test]
    fn malformed_transaction_is_rejected() {
        let alice = Wallet::new();
        let mut tx = Transaction::new(&alice, "bob", 10).unwrap();
        tx.output_map.insert(alice.address().to_string(), 999_999);
        let blocks = with_transactions(vec![tx]);
        assert!(Blockchain::validate_transaction_data(&blocks).is_err());
    }

    #[test]
    fn fake_input_balance_is_rejected() {
        // A correctly signed transaction built from an invented balance.
        let mut alice = Wallet::new();
        let mut rich = Blockchain::new();
        rich.add_block(BlockData::from_transactions(vec![
            Transaction::new(&Wallet::new(), alice.address(), 500).unwrap(),
        ]))
        .unwrap();
        let tx = alice.create_transaction(100, "bob", Some(rich.blocks())).unwrap();
        assert_eq!(tx.input().amount, 1_500);
        assert!(tx.is_valid());

        let blocks = with_transactions(vec![tx]);
        let err = Blockchain::validate_transaction_data(&blocks).unwrap_err();
        assert!(err.to_string().contains("balance is 1000"));
    }

    #[test]
    fn duplicate_transaction_in_block_is_rejected() {
        let alice = Wallet::new();
        let tx = Transaction::new(&alice, "bob", 10).unwrap();
        let blocks = with_transactions(vec![tx.clone(), tx]);
        assert!(Blockchain::validate_transaction_data(&blocks).is_err());
    }

    #[test]
    fn replace_with_transaction_check_rejects_bad_data() {
        let miner = Wallet::new();
        let blocks = with_transactions(vec![Transaction::reward(&miner), Transaction::reward(&miner)]);
        let mut local = Blockchain::new();

        // Structure is fine, so skipping the check accepts it.
        assert!(local.clone().replace_chain(blocks.clone(), false).is_ok());
        assert!(matches!(
            local.replace_chain(blocks, true),
            Err(ChainError::InvalidTransactionData(_))
        ));
        assert_eq!(local.len(), 1);
    }

    #[test]
    fn foreign_entries_are_ignored_by_transaction_check() {
        let mut chain = Blockchain::new();
        let data: BlockData = serde_json::from_value(json!([{ "junk": 1 }, "text"])).unwrap();
        chain.add_block(data).unwrap();
        assert_eq!(Blockchain::validate_transaction_data(chain.blocks()), Ok(()));
    }
}

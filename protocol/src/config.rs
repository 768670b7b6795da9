//! # Protocol Configuration & Constants
//!
//! Every magic number in CryptoChain lives here. Balances, rewards, the
//! genesis block, and the well-known root port are all part of the ledger
//! model: two nodes that disagree on any of them will compute different
//! balances from the same chain.

// ---------------------------------------------------------------------------
// Ledger Economics
// ---------------------------------------------------------------------------

/// Implicit credit every address starts with before it has ever sent.
///
/// This is never written to the chain. It is added by the balance scan only
/// while the address has no recorded send; the first send folds it into the
/// sender's own remainder output.
pub const STARTING_BALANCE: u64 = 1_000;

/// Amount paid to the miner by the reward transaction of each mined block.
pub const MINING_REWARD: u64 = 50;

/// Input address used by reward transactions. Not a valid hex public key,
/// so it can never collide with a wallet address.
pub const REWARD_INPUT_ADDRESS: &str = "*authorized-reward*";

// ---------------------------------------------------------------------------
// Genesis Block
// ---------------------------------------------------------------------------

/// Genesis block timestamp. Fixed so every node agrees on block zero.
pub const GENESIS_TIMESTAMP: u64 = 1;

/// Genesis `last_hash`. There is no previous block, so this is a filler.
pub const GENESIS_LAST_HASH: &str = "-----";

/// Genesis hash. Not a real digest; the genesis block is compared by value,
/// never re-hashed.
pub const GENESIS_HASH: &str = "hash-one";

// ---------------------------------------------------------------------------
// Network Parameters
// ---------------------------------------------------------------------------

/// Port the root node listens on. A node listening anywhere else considers
/// itself a peer and synchronizes against the root on startup.
pub const DEFAULT_PORT: u16 = 3000;

/// Upper bound of the random offset added to [`DEFAULT_PORT`] when a peer
/// asks for a generated port.
pub const PEER_PORT_RANGE: u16 = 1000;

/// Root node address used when none is configured.
pub const DEFAULT_ROOT_NODE_URL: &str = "http://localhost:3000";

/// Capacity of the in-process pubsub bus. Slow subscribers that fall further
/// behind than this lose messages, which matches the at-most-once contract.
pub const PUBSUB_CHANNEL_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// Utility
// ---------------------------------------------------------------------------

/// Returns `true` if a node listening on `port` is the root node.
///
/// Root detection is purely positional.
pub fn is_root_port(port: u16) -> bool {
    port == DEFAULT_PORT
}

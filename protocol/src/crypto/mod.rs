//! # Cryptographic Primitives
//!
//! Thin, typed wrappers over audited implementations:
//!
//! - **Ed25519** (`ed25519-dalek`) for wallet keys and signatures.
//! - **SHA-256** (`sha2`) for block hashes and the digest that gets signed.
//!
//! Nothing in here knows what a transaction is. The transaction and ledger
//! modules hand over serializable values and get back digests and
//! signatures.

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::{crypto_hash, crypto_hash_hex, sha256, sha256_hex};
pub use keys::{KeyError, Keypair, PublicKey, Signature};
pub use signatures::{sign, verify, SignatureError};

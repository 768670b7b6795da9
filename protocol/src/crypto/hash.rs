//! # Hashing Utilities
//!
//! SHA-256 over canonical JSON. Blocks hash their header fields through
//! [`crypto_hash`], and signatures are taken over the same digest of the
//! signed value, so both sides of the wire must serialize identically.
//!
//! Canonical here means `serde_json` output of types whose maps are
//! `BTreeMap`s (sorted keys). `serde_json::Value` objects are sorted as
//! well as long as the `preserve_order` feature stays off.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// SHA-256 digest as a fixed-size array.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-256 digest, hex-encoded.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Hashes any serializable value: `sha256(json(value))`.
///
/// Fails only if the value cannot be represented as JSON (for example a map
/// with non-string keys), which none of the ledger types produce.
pub fn crypto_hash<T: Serialize + ?Sized>(value: &T) -> Result<[u8; 32], serde_json::Error> {
    let bytes = serde_json::to_vec(value)?;
    Ok(sha256(&bytes))
}

/// Hex-encoded [`crypto_hash`].
pub fn crypto_hash_hex<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    crypto_hash(value).map(hex::encode)
}

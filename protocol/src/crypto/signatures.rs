//! # Digital Signatures
//!
//! The signing service used by wallets and transactions. Messages are
//! structured values, not raw bytes: we sign `crypto_hash(data)` so that a
//! transaction's output map can be signed and re-verified on another node
//! without agreeing on anything except the JSON encoding.

use serde::Serialize;
use thiserror::Error;

use super::hash::crypto_hash;
use super::keys::{Keypair, PublicKey, Signature};

/// Errors during signature operations.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// The value to sign could not be serialized.
    #[error("failed to encode signed data: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Signs the hash of a serializable value.
pub fn sign<T: Serialize + ?Sized>(keypair: &Keypair, data: &T) -> Result<Signature, SignatureError> {
    let digest = crypto_hash(data)?;
    Ok(keypair.sign(&digest))
}

/// Verifies a hex signature over the hash of `data` against a hex address.
///
/// Any malformed input (bad address, bad signature hex, unserializable data)
/// is simply `false`.
pub fn verify<T: Serialize + ?Sized>(address: &str, data: &T, signature_hex: &str) -> bool {
    let Ok(public_key) = PublicKey::from_hex(address) else {
        return false;
    };
    let Ok(signature) = Signature::from_hex(signature_hex) else {
        return false;
    };
    let Ok(digest) = crypto_hash(data) else {
        return false;
    };
    public_key.verify(&digest, &signature)
}

//! # SHA-256 Hashing
//!
//! Content checksums, keyed integrity tags and key derivation.

use crate::CryptoError;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

/// SHA-256 output (256-bit).
pub type Hash = [u8; 32];

type HmacSha256 = Hmac<Sha256>;

/// Hash data with SHA-256 (one-shot).
pub fn sha256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}

/// Derive a 256-bit key from a context label and input key material.
pub fn derive_key(context: &str, key_material: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(context.as_bytes());
    hasher.update([0u8]);
    hasher.update(key_material);
    hasher.finalize().into()
}

/// HMAC-SHA256 tag over `data`.
///
/// # Errors
///
/// Returns `CryptoError::InvalidMacKey` if the key is rejected.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Hash, CryptoError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| CryptoError::InvalidMacKey(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}

/// Verify an HMAC-SHA256 tag in constant time.
///
/// # Errors
///
/// Returns `CryptoError::SignatureVerificationFailed` on mismatch.
pub fn verify_hmac_sha256(key: &[u8], data: &[u8], tag: &[u8]) -> Result<(), CryptoError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| CryptoError::InvalidMacKey(e.to_string()))?;
    mac.update(data);
    mac.verify_slice(tag)
        .map_err(|_| CryptoError::SignatureVerificationFailed)
}

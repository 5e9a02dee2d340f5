//! # Integrity Processors
//!
//! - `HmacIntegrityProcessor`: HMAC-SHA256 keyed with a configured secret.
//! - `Ed25519IntegrityProcessor`: Ed25519 signature by a key derived from a
//!   configured secret.

use crate::ports::IntegrityProcessor;
use shared_crypto::{hmac_sha256, verify_hmac_sha256, Ed25519KeyPair, Ed25519Signature};
use shared_types::{Integral, StorageError};
use zeroize::Zeroizing;

pub struct HmacIntegrityProcessor {
    key: Zeroizing<Vec<u8>>,
}

impl HmacIntegrityProcessor {
    pub fn new(key: &[u8]) -> Self {
        Self {
            key: Zeroizing::new(key.to_vec()),
        }
    }
}

impl IntegrityProcessor for HmacIntegrityProcessor {
    fn calculate_integrity(&self, object: &dyn Integral) -> Result<Vec<u8>, StorageError> {
        hmac_sha256(&self.key, &object.integral_data())
            .map(|tag| tag.to_vec())
            .map_err(|e| StorageError::Crypto(e.to_string()))
    }

    fn validate_integrity(&self, object: &dyn Integral) -> Result<bool, StorageError> {
        Ok(verify_hmac_sha256(&self.key, &object.integral_data(), object.integrity()).is_ok())
    }
}

pub struct Ed25519IntegrityProcessor {
    keypair: Ed25519KeyPair,
}

impl Ed25519IntegrityProcessor {
    pub fn new(keypair: Ed25519KeyPair) -> Self {
        Self { keypair }
    }

    pub fn from_secret(secret: &[u8]) -> Self {
        Self::new(Ed25519KeyPair::from_secret(secret))
    }
}

impl IntegrityProcessor for Ed25519IntegrityProcessor {
    fn calculate_integrity(&self, object: &dyn Integral) -> Result<Vec<u8>, StorageError> {
        Ok(self.keypair.sign(&object.integral_data()).as_bytes().to_vec())
    }

    fn validate_integrity(&self, object: &dyn Integral) -> Result<bool, StorageError> {
        let Ok(signature) = Ed25519Signature::from_slice(object.integrity()) else {
            return Ok(false);
        };
        Ok(self
            .keypair
            .public_key()
            .verify(&object.integral_data(), &signature)
            .is_ok())
    }
}

//! # Symmetric Encryption
//!
//! Provides XChaCha20-Poly1305 (default) and AES-256-GCM encryption.
//! Sealed output is `nonce || ciphertext`, so a sealed value is
//! self-contained and can be stored as one opaque string.
//!
//! ## Security Properties
//!
//! - **XChaCha20-Poly1305**: 192-bit nonce, constant-time ARX design
//! - **AES-GCM**: 96-bit nonce, use only with AES-NI hardware acceleration

use crate::CryptoError;
use aes_gcm::Aes256Gcm;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305,
};
use zeroize::Zeroize;

/// Key length in bytes for every supported cipher.
pub const KEY_LEN: usize = 32;

/// Secret key (256-bit).
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretKey([u8; KEY_LEN]);

impl SecretKey {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, validating its length.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKeyLength` unless `bytes` is 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; KEY_LEN] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: KEY_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(key))
    }

    /// Generate random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
        Self(bytes)
    }

    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// Cipher selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Cipher {
    /// XChaCha20-Poly1305 (default, side-channel immune)
    #[default]
    XChaCha20Poly1305,
    /// AES-256-GCM (use with AES-NI only)
    Aes256Gcm,
}

impl Cipher {
    /// Nonce length in bytes.
    pub fn nonce_len(self) -> usize {
        match self {
            Cipher::XChaCha20Poly1305 => 24,
            Cipher::Aes256Gcm => 12,
        }
    }
}

impl std::str::FromStr for Cipher {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xchacha20poly1305" | "xchacha20-poly1305" => Ok(Cipher::XChaCha20Poly1305),
            "aes256gcm" | "aes-256-gcm" => Ok(Cipher::Aes256Gcm),
            other => Err(format!("unknown cipher: {other}")),
        }
    }
}

fn random_nonce(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
    bytes
}

/// Encrypt plaintext with a fresh random nonce.
///
/// Returns `nonce || ciphertext`.
///
/// # Errors
///
/// Returns `CryptoError::EncryptionFailed` if encryption fails.
pub fn seal(cipher: Cipher, key: &SecretKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let nonce = random_nonce(cipher.nonce_len());

    let ciphertext = match cipher {
        Cipher::XChaCha20Poly1305 => XChaCha20Poly1305::new(key.as_bytes().into())
            .encrypt(chacha20poly1305::XNonce::from_slice(&nonce), plaintext),
        Cipher::Aes256Gcm => Aes256Gcm::new(key.as_bytes().into())
            .encrypt(aes_gcm::Nonce::from_slice(&nonce), plaintext),
    }
    .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut sealed = nonce;
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Decrypt a value produced by [`seal`].
///
/// # Errors
///
/// Returns `CryptoError::CiphertextTooShort` if no nonce is present and
/// `CryptoError::DecryptionFailed` if authentication fails.
pub fn open(cipher: Cipher, key: &SecretKey, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let nonce_len = cipher.nonce_len();
    if sealed.len() < nonce_len {
        return Err(CryptoError::CiphertextTooShort {
            minimum: nonce_len,
            actual: sealed.len(),
        });
    }
    let (nonce, ciphertext) = sealed.split_at(nonce_len);

    match cipher {
        Cipher::XChaCha20Poly1305 => XChaCha20Poly1305::new(key.as_bytes().into())
            .decrypt(chacha20poly1305::XNonce::from_slice(nonce), ciphertext),
        Cipher::Aes256Gcm => Aes256Gcm::new(key.as_bytes().into())
            .decrypt(aes_gcm::Nonce::from_slice(nonce), ciphertext),
    }
    .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}

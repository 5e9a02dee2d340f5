//! # AEAD Encrypter
//!
//! Credential encryption backed by `shared-crypto`. Output is
//! `nonce || ciphertext`.

use crate::ports::Encrypter;
use shared_crypto::{open, seal, Cipher, CryptoError, SecretKey};
use shared_types::StorageError;

#[derive(Debug, Clone, Copy, Default)]
pub struct AeadEncrypter {
    cipher: Cipher,
}

impl AeadEncrypter {
    pub fn new(cipher: Cipher) -> Self {
        Self { cipher }
    }
}

fn crypto_error(err: CryptoError) -> StorageError {
    StorageError::Crypto(err.to_string())
}

impl Encrypter for AeadEncrypter {
    fn encrypt(&self, plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>, StorageError> {
        let key = SecretKey::from_slice(key).map_err(crypto_error)?;
        seal(self.cipher, &key, plaintext).map_err(crypto_error)
    }

    fn decrypt(&self, ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>, StorageError> {
        let key = SecretKey::from_slice(key).map_err(crypto_error)?;
        open(self.cipher, &key, ciphertext).map_err(crypto_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_and_wrong_key() {
        let encrypter = AeadEncrypter::default();
        let key = [3u8; 32];
        let sealed = encrypter.encrypt(b"password", &key).unwrap();
        assert_eq!(encrypter.decrypt(&sealed, &key).unwrap(), b"password");
        assert!(matches!(
            encrypter.decrypt(&sealed, &[4u8; 32]),
            Err(StorageError::Crypto(_))
        ));
    }

    #[test]
    fn test_short_key_rejected() {
        let err = AeadEncrypter::new(Cipher::Aes256Gcm)
            .encrypt(b"password", b"short")
            .unwrap_err();
        assert!(err.to_string().contains("Invalid key length"));
    }
}

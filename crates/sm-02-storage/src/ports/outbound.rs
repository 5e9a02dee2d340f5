//! Outbound Ports (Driven Side)
//!
//! Dependencies of the security decorators on infrastructure.

use async_trait::async_trait;
use shared_types::{CredentialTransform, Integral, RequestContext, StorageError};

/// Distributed mutual exclusion, scoped to encryption key bootstrap.
#[async_trait]
pub trait Locker: Send + Sync {
    /// Block until the lock is held.
    async fn lock(&self, ctx: &RequestContext) -> Result<(), StorageError>;

    /// Take the lock if it is free. Returns whether it was taken.
    async fn try_lock(&self, ctx: &RequestContext) -> Result<bool, StorageError>;

    async fn unlock(&self, ctx: &RequestContext) -> Result<(), StorageError>;
}

/// Persistent home of the data encryption key.
///
/// The key is stored transformed; callers pass the master-key encryption on
/// write and the matching decryption on read.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// `Ok(None)` when no key was ever stored.
    async fn get_encryption_key(
        &self,
        ctx: &RequestContext,
        transform: CredentialTransform<'_>,
    ) -> Result<Option<Vec<u8>>, StorageError>;

    async fn set_encryption_key(
        &self,
        ctx: &RequestContext,
        key: &[u8],
        transform: CredentialTransform<'_>,
    ) -> Result<(), StorageError>;
}

/// Symmetric cipher used for credentials.
pub trait Encrypter: Send + Sync {
    fn encrypt(&self, plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>, StorageError>;

    fn decrypt(&self, ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>, StorageError>;
}

/// Computes and checks integrity values of Integral objects.
pub trait IntegrityProcessor: Send + Sync {
    fn calculate_integrity(&self, object: &dyn Integral) -> Result<Vec<u8>, StorageError>;

    fn validate_integrity(&self, object: &dyn Integral) -> Result<bool, StorageError>;
}

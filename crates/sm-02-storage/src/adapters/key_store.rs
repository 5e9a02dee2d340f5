//! # In-Memory Key Store
//!
//! Holds the data encryption key in its transformed (encrypted) form, the
//! way a database table would.

use crate::ports::KeyStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{CredentialTransform, RequestContext, StorageError};

#[derive(Default)]
pub struct InMemoryKeyStore {
    stored: Mutex<Option<Vec<u8>>>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The key exactly as persisted.
    pub fn stored_key(&self) -> Option<Vec<u8>> {
        self.stored.lock().clone()
    }
}

#[async_trait]
impl KeyStore for InMemoryKeyStore {
    async fn get_encryption_key(
        &self,
        ctx: &RequestContext,
        transform: CredentialTransform<'_>,
    ) -> Result<Option<Vec<u8>>, StorageError> {
        ctx.check()?;
        let stored = self.stored.lock().clone();
        stored.map(|encrypted| transform(&encrypted)).transpose()
    }

    async fn set_encryption_key(
        &self,
        ctx: &RequestContext,
        key: &[u8],
        transform: CredentialTransform<'_>,
    ) -> Result<(), StorageError> {
        ctx.check()?;
        let encrypted = transform(key)?;
        *self.stored.lock() = Some(encrypted);
        Ok(())
    }
}

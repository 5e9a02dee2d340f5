//! # Encryption Decorator
//!
//! Encrypts the credentials of Secured objects before writes reach the
//! wrapped repository and decrypts them on the way back, so callers only
//! ever see plaintext while storage only ever sees ciphertext.
//!
//! ## Key Bootstrap
//!
//! ```text
//! lock (bounded) ──→ get key (decrypt with master) ──→ found? ──→ unlock
//!                                                   └─ absent ──→ generate 32 bytes
//!                                                                  └─ set key (encrypt with master)
//! ```

use crate::ports::{Encrypter, KeyStore, Locker};
use async_trait::async_trait;
use shared_crypto::SecretKey;
use shared_types::{
    Criterion, LabelChange, Object, ObjectList, ObjectType, Repository, RequestContext,
    StorageError, TransactionFn, TransactionalRepository,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

/// Default bound on waiting for the bootstrap lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

/// Collaborators of the encryption decorator.
#[derive(Clone)]
pub struct EncryptionSettings {
    pub encrypter: Arc<dyn Encrypter>,
    pub key_store: Arc<dyn KeyStore>,
    pub locker: Arc<dyn Locker>,
    /// Key protecting the data key at rest. Must be 32 bytes.
    pub master_key: Arc<Zeroizing<Vec<u8>>>,
    pub lock_timeout: Duration,
}

/// Load the data encryption key, creating and persisting one on first use.
///
/// Runs behind the distributed lock so that concurrently starting processes
/// agree on one key.
pub async fn bootstrap_encryption_key(
    ctx: &RequestContext,
    settings: &EncryptionSettings,
) -> Result<Zeroizing<Vec<u8>>, StorageError> {
    match tokio::time::timeout(settings.lock_timeout, settings.locker.lock(ctx)).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(StorageError::Lock(format!(
                "timed out after {:?} waiting for the encryption key lock",
                settings.lock_timeout
            )))
        }
    }

    let result = load_or_create_key(ctx, settings).await;

    if let Err(err) = settings.locker.unlock(ctx).await {
        warn!(error = %err, "Failed to release the encryption key lock");
    }
    result
}

async fn load_or_create_key(
    ctx: &RequestContext,
    settings: &EncryptionSettings,
) -> Result<Zeroizing<Vec<u8>>, StorageError> {
    let master_key = settings.master_key.as_slice();
    let encrypter = settings.encrypter.as_ref();

    let decrypt_with_master = |bytes: &[u8]| encrypter.decrypt(bytes, master_key);
    if let Some(key) = settings
        .key_store
        .get_encryption_key(ctx, &decrypt_with_master)
        .await?
    {
        debug!("Loaded existing encryption key");
        return Ok(Zeroizing::new(key));
    }

    let key = Zeroizing::new(SecretKey::generate().as_bytes().to_vec());
    let encrypt_with_master = |bytes: &[u8]| encrypter.encrypt(bytes, master_key);
    settings
        .key_store
        .set_encryption_key(ctx, &key, &encrypt_with_master)
        .await?;
    info!("Generated and stored a new encryption key");
    Ok(key)
}

/// Repository that encrypts credentials at rest.
pub struct EncryptingRepository<R: ?Sized> {
    inner: Arc<R>,
    encrypter: Arc<dyn Encrypter>,
    key: Arc<Zeroizing<Vec<u8>>>,
}

impl<R: ?Sized> EncryptingRepository<R> {
    /// Wrap `inner` with an already bootstrapped data key.
    pub fn with_key(inner: Arc<R>, encrypter: Arc<dyn Encrypter>, key: Zeroizing<Vec<u8>>) -> Self {
        Self {
            inner,
            encrypter,
            key: Arc::new(key),
        }
    }

    /// Bootstrap the data key, then wrap `inner`.
    pub async fn new(
        ctx: &RequestContext,
        inner: Arc<R>,
        settings: &EncryptionSettings,
    ) -> Result<Self, StorageError> {
        let key = bootstrap_encryption_key(ctx, settings).await?;
        Ok(Self::with_key(inner, settings.encrypter.clone(), key))
    }

    fn encrypt(&self, object: &mut Box<dyn Object>) -> Result<(), StorageError> {
        if let Some(secured) = object.as_secured_mut() {
            let (encrypter, key) = (&self.encrypter, &self.key);
            let transform = |plaintext: &[u8]| encrypter.encrypt(plaintext, key);
            secured.encrypt(&transform)?;
        }
        Ok(())
    }

    fn decrypt(&self, mut object: Box<dyn Object>) -> Result<Box<dyn Object>, StorageError> {
        if let Some(secured) = object.as_secured_mut() {
            let (encrypter, key) = (&self.encrypter, &self.key);
            let transform = |ciphertext: &[u8]| encrypter.decrypt(ciphertext, key);
            secured.decrypt(&transform)?;
        }
        Ok(object)
    }

    fn decrypt_all(&self, objects: ObjectList) -> Result<ObjectList, StorageError> {
        objects.into_iter().map(|object| self.decrypt(object)).collect()
    }
}

#[async_trait]
impl<R: Repository + ?Sized> Repository for EncryptingRepository<R> {
    async fn create(
        &self,
        ctx: &RequestContext,
        mut object: Box<dyn Object>,
    ) -> Result<Box<dyn Object>, StorageError> {
        self.encrypt(&mut object)?;
        let created = self.inner.create(ctx, object).await?;
        self.decrypt(created)
    }

    async fn get(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<Box<dyn Object>, StorageError> {
        let object = self.inner.get(ctx, object_type, criteria).await?;
        self.decrypt(object)
    }

    async fn list(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<ObjectList, StorageError> {
        let objects = self.inner.list(ctx, object_type, criteria).await?;
        self.decrypt_all(objects)
    }

    async fn list_no_labels(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<ObjectList, StorageError> {
        let objects = self.inner.list_no_labels(ctx, object_type, criteria).await?;
        self.decrypt_all(objects)
    }

    async fn count(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<usize, StorageError> {
        self.inner.count(ctx, object_type, criteria).await
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        mut object: Box<dyn Object>,
        label_changes: &[LabelChange],
    ) -> Result<Box<dyn Object>, StorageError> {
        self.encrypt(&mut object)?;
        let updated = self.inner.update(ctx, object, label_changes).await?;
        self.decrypt(updated)
    }

    async fn update_labels(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        id: &str,
        label_changes: &[LabelChange],
    ) -> Result<(), StorageError> {
        self.inner
            .update_labels(ctx, object_type, id, label_changes)
            .await
    }

    async fn delete(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<(), StorageError> {
        self.inner.delete(ctx, object_type, criteria).await
    }

    async fn delete_returning(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<ObjectList, StorageError> {
        let objects = self.inner.delete_returning(ctx, object_type, criteria).await?;
        self.decrypt_all(objects)
    }
}

#[async_trait]
impl<R: TransactionalRepository + ?Sized> TransactionalRepository for EncryptingRepository<R> {
    async fn in_transaction(
        &self,
        ctx: &RequestContext,
        body: TransactionFn,
    ) -> Result<ObjectList, StorageError> {
        let encrypter = self.encrypter.clone();
        let key = self.key.clone();
        self.inner
            .in_transaction(
                ctx,
                Box::new(move |ctx, tx| {
                    let scoped: Arc<dyn Repository> = Arc::new(EncryptingRepository {
                        inner: tx,
                        encrypter,
                        key,
                    });
                    body(ctx, scoped)
                }),
            )
            .await
    }
}

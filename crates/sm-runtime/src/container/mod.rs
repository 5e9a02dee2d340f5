//! # Service Container
//!
//! Composition root holding every storage-core component with its lifetime
//! and dependencies resolved.
//!
//! ## Wiring Order
//!
//! 1. Raw transactional repository
//! 2. Decorator stack in the configured order (first is innermost)
//! 3. Interceptor registry: notifications, broker cache invalidation
//! 4. Interceptable façade over the decorated repository
//! 5. Storage registry, notificator, cleaner, broker read cache

pub mod config;

pub use config::{
    ConfigError, DecoratorKind, IntegrityAlgorithm, NotificationConfig, ServiceManagerConfig,
    StorageConfig,
};

use shared_crypto::derive_key;
use shared_types::{
    ConfigurationError, Criterion, ObjectType, Repository, RequestContext, ServiceBroker,
    StorageError, TransactionalRepository,
};
use sm_01_interceptors::{
    delete_around_tx, update_around_tx, DeleteAroundTxFn, DeleteInterceptor,
    DeleteInterceptorProvider, InterceptorRegistry, Named, UpdateAroundTxFn, UpdateInterceptor,
    UpdateInterceptorProvider,
};
use sm_02_storage::decorators::{self, Decorator};
use sm_02_storage::{
    AeadEncrypter, Ed25519IntegrityProcessor, EncryptionSettings, HmacIntegrityProcessor,
    InMemoryKeyStore, InMemoryLocker, InMemoryRepository, IntegrityProcessor,
    InterceptableTransactionalRepository, ReadCache, StorageRegistry,
};
use sm_03_notifications::{
    register_notification_interceptors, CleanerError, CleanerSettings, NotificationCleaner,
    Notificator,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use zeroize::Zeroizing;

/// Name of the primary storage in the storage registry.
pub const PRIMARY_STORAGE: &str = "primary";

/// Context string for deriving the master key from the encryption secret.
const MASTER_KEY_CONTEXT: &str = "sm-master-key";

/// Context string for deriving the HMAC key from the integrity secret.
const INTEGRITY_KEY_CONTEXT: &str = "sm-integrity-hmac";

/// Errors while building or running the runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Cleaner(#[from] CleanerError),
}

/// Drops cached brokers once an update or delete of them has committed.
struct BrokerCacheInvalidator {
    cache: Arc<ReadCache<ServiceBroker>>,
}

impl Named for BrokerCacheInvalidator {
    fn name(&self) -> String {
        "broker-cache".to_string()
    }
}

impl UpdateInterceptorProvider for BrokerCacheInvalidator {
    fn provide(&self) -> Arc<dyn UpdateInterceptor> {
        Arc::new(BrokerCacheInvalidator {
            cache: self.cache.clone(),
        })
    }
}

impl DeleteInterceptorProvider for BrokerCacheInvalidator {
    fn provide(&self) -> Arc<dyn DeleteInterceptor> {
        Arc::new(BrokerCacheInvalidator {
            cache: self.cache.clone(),
        })
    }
}

impl UpdateInterceptor for BrokerCacheInvalidator {
    fn around_tx_update(&self, next: UpdateAroundTxFn) -> UpdateAroundTxFn {
        let cache = self.cache.clone();
        update_around_tx(move |ctx, object, label_changes| {
            let next = next.clone();
            let cache = cache.clone();
            async move {
                let updated = next(ctx, object, label_changes).await?;
                cache.invalidate(updated.id());
                Ok(updated)
            }
        })
    }
}

impl DeleteInterceptor for BrokerCacheInvalidator {
    fn around_tx_delete(&self, next: DeleteAroundTxFn) -> DeleteAroundTxFn {
        let cache = self.cache.clone();
        delete_around_tx(move |ctx, object_type, criteria| {
            let next = next.clone();
            let cache = cache.clone();
            async move {
                let deleted = next(ctx, object_type, criteria).await?;
                for object in &deleted {
                    cache.invalidate(object.id());
                }
                Ok(deleted)
            }
        })
    }
}

/// Build the ordered decorator constructors for `config`.
fn decorator_chain(ctx: &RequestContext, config: &StorageConfig) -> Vec<Decorator> {
    config
        .decorator_order
        .iter()
        .map(|kind| match kind {
            DecoratorKind::Encryption => {
                let master_key = derive_key(MASTER_KEY_CONTEXT, config.encryption_secret.as_bytes());
                decorators::encryption(
                    ctx.clone(),
                    EncryptionSettings {
                        encrypter: Arc::new(AeadEncrypter::new(config.cipher)),
                        key_store: Arc::new(InMemoryKeyStore::new()),
                        locker: Arc::new(InMemoryLocker::new()),
                        master_key: Arc::new(Zeroizing::new(master_key.to_vec())),
                        lock_timeout: config.lock_timeout,
                    },
                )
            }
            DecoratorKind::Checksum => decorators::checksum(),
            DecoratorKind::Integrity => {
                let processor: Arc<dyn IntegrityProcessor> = match config.integrity_algorithm {
                    IntegrityAlgorithm::Hmac => {
                        let key = Zeroizing::new(derive_key(
                            INTEGRITY_KEY_CONTEXT,
                            config.integrity_secret.as_bytes(),
                        ));
                        Arc::new(HmacIntegrityProcessor::new(key.as_slice()))
                    }
                    IntegrityAlgorithm::Ed25519 => Arc::new(Ed25519IntegrityProcessor::from_secret(
                        config.integrity_secret.as_bytes(),
                    )),
                };
                decorators::integrity(processor)
            }
        })
        .collect()
}

/// Every storage-core component, wired.
pub struct ServiceContainer {
    /// Configuration the container was built from.
    pub config: ServiceManagerConfig,
    /// Undecorated store, for diagnostics.
    pub raw: Arc<InMemoryRepository>,
    /// Façade all callers go through.
    pub repository: Arc<InterceptableTransactionalRepository>,
    /// Interceptor providers, frozen after bootstrap.
    pub interceptors: Arc<InterceptorRegistry>,
    /// Named storages.
    pub storages: StorageRegistry,
    /// Notification fan-out.
    pub notificator: Arc<Notificator>,
    /// Old notification cleanup.
    pub cleaner: Arc<NotificationCleaner>,
    /// Broker lookups.
    pub broker_cache: Arc<ReadCache<ServiceBroker>>,
}

impl ServiceContainer {
    /// Build the container.
    ///
    /// # Errors
    ///
    /// Any wiring defect or a failed encryption key bootstrap.
    pub async fn build(config: ServiceManagerConfig) -> Result<Self, RuntimeError> {
        let ctx = RequestContext::background();
        let raw = Arc::new(InMemoryRepository::new());
        let decorated = decorators::decorate(
            raw.clone() as Arc<dyn TransactionalRepository>,
            decorator_chain(&ctx, &config.storage),
        )
        .await?;
        info!(
            order = ?config.storage.decorator_order,
            "Storage decorators applied"
        );

        let notificator = Arc::new(Notificator::new(config.notifications.queue_size));
        let broker_cache = Arc::new(ReadCache::new(config.storage.broker_cache_ttl));

        let mut interceptors = InterceptorRegistry::new();
        register_notification_interceptors(&mut interceptors, notificator.clone(), &ObjectType::ALL)?;
        let invalidator = Arc::new(BrokerCacheInvalidator {
            cache: broker_cache.clone(),
        });
        interceptors
            .update(ObjectType::ServiceBroker, invalidator.clone())
            .register()?;
        interceptors
            .delete(ObjectType::ServiceBroker, invalidator)
            .register()?;
        let interceptors = Arc::new(interceptors);

        let repository = Arc::new(InterceptableTransactionalRepository::new(
            decorated,
            interceptors.clone(),
        ));

        let mut storages = StorageRegistry::new();
        storages.register(PRIMARY_STORAGE, repository.clone())?;

        let cleaner = Arc::new(NotificationCleaner::new(
            repository.clone(),
            CleanerSettings {
                keep_for: config.notifications.keep_for,
                interval: config.notifications.clean_interval,
            },
        ));

        info!("Service container built");
        Ok(Self {
            config,
            raw,
            repository,
            interceptors,
            storages,
            notificator,
            cleaner,
            broker_cache,
        })
    }

    /// Look a broker up by id through the read cache.
    pub async fn broker(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<ServiceBroker, StorageError> {
        self.broker_cache
            .get_or_load(id, move || async move {
                let object = self
                    .repository
                    .get(ctx, ObjectType::ServiceBroker, &[Criterion::by_id(id)])
                    .await?;
                object
                    .downcast_ref::<ServiceBroker>()
                    .cloned()
                    .ok_or_else(|| {
                        StorageError::Internal(format!("object {id} is not a service broker"))
                    })
            })
            .await
    }
}

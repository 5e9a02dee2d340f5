//! # Decorator Stacking
//!
//! Encryption, checksum and integrity decorators must compose in any order.
//! Every permutation is exercised through the interceptable façade, with
//! reads and writes made inside a caller-managed transaction.

#[cfg(test)]
mod tests {
    use crate::fixtures::broker;
    use shared_crypto::Cipher;
    use shared_types::{
        transaction, Criterion, Object, ObjectType, Repository, RequestContext, ServiceBroker,
        StorageError, TransactionalRepository,
    };
    use sm_01_interceptors::InterceptorRegistry;
    use sm_02_storage::decorators::{self, Decorator};
    use sm_02_storage::{
        AeadEncrypter, EncryptionSettings, HmacIntegrityProcessor, InMemoryKeyStore,
        InMemoryLocker, InMemoryRepository, InterceptableTransactionalRepository,
        DEFAULT_LOCK_TIMEOUT,
    };
    use std::sync::Arc;
    use zeroize::Zeroizing;

    const BROKER: ObjectType = ObjectType::ServiceBroker;

    #[derive(Debug, Clone, Copy)]
    enum Layer {
        Encryption,
        Checksum,
        Integrity,
    }

    use Layer::{Checksum, Encryption, Integrity};

    const PERMUTATIONS: [[Layer; 3]; 6] = [
        [Encryption, Checksum, Integrity],
        [Encryption, Integrity, Checksum],
        [Checksum, Encryption, Integrity],
        [Checksum, Integrity, Encryption],
        [Integrity, Encryption, Checksum],
        [Integrity, Checksum, Encryption],
    ];

    // =========================================================================
    // Fixtures
    // =========================================================================

    fn decorator(ctx: &RequestContext, layer: Layer) -> Decorator {
        match layer {
            Layer::Encryption => decorators::encryption(
                ctx.clone(),
                EncryptionSettings {
                    encrypter: Arc::new(AeadEncrypter::new(Cipher::XChaCha20Poly1305)),
                    key_store: Arc::new(InMemoryKeyStore::new()),
                    locker: Arc::new(InMemoryLocker::new()),
                    master_key: Arc::new(Zeroizing::new(vec![7u8; 32])),
                    lock_timeout: DEFAULT_LOCK_TIMEOUT,
                },
            ),
            Layer::Checksum => decorators::checksum(),
            Layer::Integrity => {
                decorators::integrity(Arc::new(HmacIntegrityProcessor::new(b"integrity-key")))
            }
        }
    }

    async fn stack(
        ctx: &RequestContext,
        order: [Layer; 3],
    ) -> (Arc<InMemoryRepository>, InterceptableTransactionalRepository) {
        let store = Arc::new(InMemoryRepository::new());
        let decorated = decorators::decorate(
            store.clone(),
            order.iter().map(|layer| decorator(ctx, *layer)).collect(),
        )
        .await
        .unwrap();
        let repository =
            InterceptableTransactionalRepository::new(decorated, Arc::new(InterceptorRegistry::new()));
        (store, repository)
    }

    fn password(object: &dyn Object) -> String {
        object
            .downcast_ref::<ServiceBroker>()
            .and_then(|broker| broker.credentials.as_ref())
            .and_then(|credentials| credentials.basic.as_ref())
            .map(|basic| basic.password.clone())
            .unwrap_or_default()
    }

    // =========================================================================
    // Stacking
    // =========================================================================

    #[tokio::test]
    async fn test_every_order_round_trips_inside_transaction() {
        let ctx = RequestContext::background();

        for order in PERMUTATIONS {
            let (store, repository) = stack(&ctx, order).await;

            let read_back = repository
                .in_transaction(
                    &ctx,
                    transaction(|ctx, tx| async move {
                        let created = tx.create(&ctx, broker("nested")).await?;
                        let id = created.id().to_string();
                        let fetched = tx.get(&ctx, BROKER, &[Criterion::by_id(&id)]).await?;
                        let mut renamed = fetched
                            .downcast_ref::<ServiceBroker>()
                            .cloned()
                            .ok_or_else(|| StorageError::Internal("not a broker".to_string()))?;
                        renamed.name = "renamed".to_string();
                        tx.update(&ctx, Box::new(renamed), &[]).await?;
                        Ok(vec![tx.get(&ctx, BROKER, &[Criterion::by_id(&id)]).await?])
                    }),
                )
                .await
                .unwrap_or_else(|e| panic!("{order:?}: {e}"));

            assert_eq!(password(read_back[0].as_ref()), "s3cret", "{order:?}");

            let committed = repository.get(&ctx, BROKER, &[]).await.unwrap();
            assert_eq!(password(committed.as_ref()), "s3cret", "{order:?}");
            assert_eq!(
                committed.downcast_ref::<ServiceBroker>().unwrap().name,
                "renamed",
                "{order:?}"
            );

            let at_rest = store.get(&ctx, BROKER, &[]).await.unwrap();
            let at_rest = at_rest.downcast_ref::<ServiceBroker>().unwrap();
            assert_ne!(password(at_rest), "s3cret", "{order:?}");
            assert_eq!(at_rest.checksum.len(), 64, "{order:?}");
            assert!(!at_rest.integrity.is_empty(), "{order:?}");
        }
    }

    #[tokio::test]
    async fn test_every_order_detects_tampering_at_rest() {
        let ctx = RequestContext::background();

        for order in PERMUTATIONS {
            let (store, repository) = stack(&ctx, order).await;
            repository.create(&ctx, broker("victim")).await.unwrap();

            let stored = store.get(&ctx, BROKER, &[]).await.unwrap();
            let mut tampered = stored.downcast_ref::<ServiceBroker>().cloned().unwrap();
            tampered.broker_url = "https://attacker.example.com".to_string();
            store.update(&ctx, Box::new(tampered), &[]).await.unwrap();

            let err = repository.get(&ctx, BROKER, &[]).await.unwrap_err();
            assert!(
                matches!(err, StorageError::ChecksumMismatch { .. }),
                "{order:?}: {err}"
            );
        }
    }

    #[tokio::test]
    async fn test_failed_transaction_leaves_store_untouched() {
        let ctx = RequestContext::background();

        for order in PERMUTATIONS {
            let (store, repository) = stack(&ctx, order).await;
            let keys_before = store.len(BROKER);

            let result = repository
                .in_transaction(
                    &ctx,
                    transaction(|ctx, tx| async move {
                        tx.create(&ctx, broker("doomed")).await?;
                        Err(StorageError::Rejected("abort".to_string()))
                    }),
                )
                .await;

            assert!(result.is_err(), "{order:?}");
            assert_eq!(store.len(BROKER), keys_before, "{order:?}");
        }
    }
}

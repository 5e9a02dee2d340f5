//! # Interceptor Chain Flows
//!
//! Drives the interceptable façade over a journaling in-memory store and
//! checks the exact interleaving of hooks, transaction boundaries and the
//! storage write.

#[cfg(test)]
mod tests {
    use crate::fixtures::{entries, instance, journal, Journal, Journaling, Recorder};
    use shared_types::{
        transaction, Criterion, LabelChange, ObjectType, Repository, RequestContext, StorageError,
        TransactionalRepository,
    };
    use sm_01_interceptors::InterceptorRegistry;
    use sm_02_storage::{InMemoryRepository, InterceptableTransactionalRepository};
    use std::sync::Arc;

    const INSTANCE: ObjectType = ObjectType::ServiceInstance;

    // =========================================================================
    // Fixtures
    // =========================================================================

    struct Harness {
        store: Arc<InMemoryRepository>,
        repository: InterceptableTransactionalRepository,
        journal: Journal,
    }

    impl Harness {
        fn new(registry: InterceptorRegistry, journal: &Journal) -> Self {
            let store = Arc::new(InMemoryRepository::new());
            let raw: Arc<dyn TransactionalRepository> =
                Arc::new(Journaling::new(store.clone(), journal));
            Self {
                store,
                repository: InterceptableTransactionalRepository::new(raw, Arc::new(registry)),
                journal: journal.clone(),
            }
        }

        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.journal.lock())
        }
    }

    /// A with no ordering, B after A, on every family.
    fn a_then_b(journal: &Journal) -> InterceptorRegistry {
        let mut registry = InterceptorRegistry::new();
        let a = Recorder::new("A", journal).shared();
        let b = Recorder::new("B", journal).shared();
        registry.create(INSTANCE, a.clone()).register().unwrap();
        registry.create(INSTANCE, b.clone()).after("A").register().unwrap();
        registry.update(INSTANCE, a.clone()).register().unwrap();
        registry.update(INSTANCE, b.clone()).after("A").register().unwrap();
        registry.delete(INSTANCE, a).register().unwrap();
        registry.delete(INSTANCE, b).after("A").register().unwrap();
        registry
    }

    fn only_a(journal: &Journal) -> InterceptorRegistry {
        let mut registry = InterceptorRegistry::new();
        registry
            .create(INSTANCE, Recorder::new("A", journal).shared())
            .register()
            .unwrap();
        registry
    }

    // =========================================================================
    // Ordering
    // =========================================================================

    #[tokio::test]
    async fn test_create_runs_around_then_on_tx_then_write() {
        let journal = journal();
        let harness = Harness::new(a_then_b(&journal), &journal);
        let ctx = RequestContext::background();

        harness.repository.create(&ctx, instance("db")).await.unwrap();

        assert_eq!(
            harness.take(),
            vec!["A:around", "B:around", "tx:open", "A:on_tx", "B:on_tx", "write", "tx:commit"]
        );
        assert_eq!(harness.store.len(INSTANCE), 1);
    }

    #[tokio::test]
    async fn test_removing_provider_falls_back_to_remaining_order() {
        let journal = journal();
        let ctx = RequestContext::background();

        let full = Harness::new(a_then_b(&journal), &journal);
        full.repository.create(&ctx, instance("first")).await.unwrap();
        full.take();

        for _ in 0..3 {
            let reduced = Harness::new(only_a(&journal), &journal);
            reduced
                .repository
                .create(&ctx, instance("second"))
                .await
                .unwrap();
            assert_eq!(
                reduced.take(),
                vec!["A:around", "tx:open", "A:on_tx", "write", "tx:commit"]
            );
        }
    }

    #[tokio::test]
    async fn test_before_anchor_moves_provider_outward() {
        let journal = journal();
        let mut registry = a_then_b(&journal);
        registry
            .create(INSTANCE, Recorder::new("C", &journal).shared())
            .before("A")
            .register()
            .unwrap();
        let harness = Harness::new(registry, &journal);

        harness
            .repository
            .create(&RequestContext::background(), instance("db"))
            .await
            .unwrap();

        assert_eq!(
            harness.take(),
            vec![
                "C:around", "A:around", "B:around", "tx:open", "C:on_tx", "A:on_tx", "B:on_tx",
                "write", "tx:commit"
            ]
        );
    }

    #[tokio::test]
    async fn test_update_applies_label_changes_after_hooks() {
        let journal = journal();
        let harness = Harness::new(a_then_b(&journal), &journal);
        let ctx = RequestContext::background();
        let created = harness.repository.create(&ctx, instance("db")).await.unwrap();
        harness.take();

        harness
            .repository
            .update(&ctx, created, &[LabelChange::add("env", ["prod"])])
            .await
            .unwrap();

        assert_eq!(
            harness.take(),
            vec!["A:around", "B:around", "tx:open", "A:on_tx", "B:on_tx", "write", "tx:commit"]
        );
        let stored = harness.store.get(&ctx, INSTANCE, &[]).await.unwrap();
        assert_eq!(stored.labels().get("env"), Some(&vec!["prod".to_string()]));
    }

    #[tokio::test]
    async fn test_delete_writes_before_on_tx_hooks() {
        let journal = journal();
        let harness = Harness::new(a_then_b(&journal), &journal);
        let ctx = RequestContext::background();
        let created = harness.repository.create(&ctx, instance("db")).await.unwrap();
        harness.take();

        let deleted = harness
            .repository
            .delete_returning(&ctx, INSTANCE, &[Criterion::by_id(created.id())])
            .await
            .unwrap();

        assert_eq!(deleted.len(), 1);
        assert_eq!(
            harness.take(),
            vec!["A:around", "B:around", "tx:open", "write", "A:on_tx", "B:on_tx", "tx:commit"]
        );
        assert_eq!(harness.store.len(INSTANCE), 0);
    }

    // =========================================================================
    // Failure and cancellation
    // =========================================================================

    #[tokio::test]
    async fn test_on_tx_rejection_rolls_back() {
        let journal = journal();
        let mut registry = InterceptorRegistry::new();
        registry
            .create(INSTANCE, Recorder::new("A", &journal).shared())
            .register()
            .unwrap();
        registry
            .create(INSTANCE, Recorder::new("B", &journal).rejecting().shared())
            .after("A")
            .register()
            .unwrap();
        let harness = Harness::new(registry, &journal);

        let err = harness
            .repository
            .create(&RequestContext::background(), instance("db"))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Rejected(_)));
        assert_eq!(
            harness.take(),
            vec!["A:around", "B:around", "tx:open", "A:on_tx", "B:on_tx", "tx:rollback"]
        );
        assert_eq!(harness.store.len(INSTANCE), 0);
    }

    #[tokio::test]
    async fn test_cancelled_request_touches_nothing() {
        let journal = journal();
        let harness = Harness::new(a_then_b(&journal), &journal);
        let (ctx, cancel) = RequestContext::cancellable();
        cancel.send(true).unwrap();

        let err = harness.repository.create(&ctx, instance("db")).await.unwrap_err();

        assert_eq!(err, StorageError::Cancelled);
        assert!(harness.take().is_empty());
        assert!(harness.store.is_empty());
    }

    // =========================================================================
    // Caller-managed transactions
    // =========================================================================

    #[tokio::test]
    async fn test_caller_transaction_runs_only_on_tx_hooks() {
        let journal = journal();
        let harness = Harness::new(a_then_b(&journal), &journal);
        let ctx = RequestContext::background();

        let created = harness
            .repository
            .in_transaction(
                &ctx,
                transaction(|ctx, tx| async move {
                    let first = tx.create(&ctx, instance("one")).await?;
                    let second = tx.create(&ctx, instance("two")).await?;
                    Ok(vec![first, second])
                }),
            )
            .await
            .unwrap();

        assert_eq!(created.len(), 2);
        assert_eq!(
            harness.take(),
            vec![
                "tx:open", "A:on_tx", "B:on_tx", "write", "A:on_tx", "B:on_tx", "write",
                "tx:commit"
            ]
        );
        assert_eq!(harness.store.len(INSTANCE), 2);
    }

    #[tokio::test]
    async fn test_caller_transaction_error_discards_every_write() {
        let journal = journal();
        let harness = Harness::new(a_then_b(&journal), &journal);
        let ctx = RequestContext::background();

        let result = harness
            .repository
            .in_transaction(
                &ctx,
                transaction(|ctx, tx| async move {
                    tx.create(&ctx, instance("one")).await?;
                    Err(StorageError::Rejected("caller gave up".to_string()))
                }),
            )
            .await;

        assert!(result.is_err());
        assert_eq!(entries(&journal).last().map(String::as_str), Some("tx:rollback"));
        assert_eq!(harness.store.len(INSTANCE), 0);
    }
}

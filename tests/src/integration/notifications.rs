//! # Notification Flows
//!
//! Changes made through the fully wired container reach registered
//! consumers after commit, without credentials, in revision order.

#[cfg(test)]
mod tests {
    use crate::fixtures::broker;
    use shared_types::{
        transaction, Criterion, Notification, NotificationType, ObjectType, Repository,
        RequestContext, TransactionalRepository,
    };
    use sm_03_notifications::QueueChannel;
    use sm_runtime::{ServiceContainer, ServiceManagerConfig, ServiceManagerRuntime};

    async fn container() -> ServiceContainer {
        ServiceContainer::build(ServiceManagerConfig::default())
            .await
            .unwrap()
    }

    fn drain(channel: &QueueChannel) -> Vec<Notification> {
        std::iter::from_fn(|| channel.try_recv()).collect()
    }

    // =========================================================================
    // Delivery
    // =========================================================================

    #[tokio::test]
    async fn test_lifecycle_of_a_broker_is_notified_in_order() {
        let container = container().await;
        let channel = container.notificator.register_consumer().channel();
        let ctx = RequestContext::background();

        let created = container.repository.create(&ctx, broker("b1")).await.unwrap();
        let id = created.id().to_string();
        let fetched = container
            .repository
            .get(&ctx, ObjectType::ServiceBroker, &[Criterion::by_id(&id)])
            .await
            .unwrap();
        container.repository.update(&ctx, fetched, &[]).await.unwrap();
        container
            .repository
            .delete(&ctx, ObjectType::ServiceBroker, &[Criterion::by_id(&id)])
            .await
            .unwrap();

        let received = drain(&channel);
        let types: Vec<_> = received.iter().map(|n| n.notification_type).collect();
        assert_eq!(
            types,
            vec![
                NotificationType::Created,
                NotificationType::Modified,
                NotificationType::Deleted
            ]
        );
        assert!(received
            .iter()
            .all(|n| n.resource == ObjectType::ServiceBroker));
        assert!(received.windows(2).all(|w| w[0].revision < w[1].revision));
        assert!(received
            .iter()
            .all(|n| n.payload.get("credentials") == Some(&serde_json::Value::Null)));
        assert_eq!(container.raw.len(ObjectType::Notification), 3);
    }

    #[tokio::test]
    async fn test_failed_change_is_not_notified() {
        let container = container().await;
        let channel = container.notificator.register_consumer().channel();
        let ctx = RequestContext::background();

        let err = container
            .repository
            .delete(&ctx, ObjectType::ServiceBroker, &[Criterion::by_id("missing")])
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(drain(&channel).is_empty());
        assert_eq!(container.raw.len(ObjectType::Notification), 0);
    }

    #[tokio::test]
    async fn test_writes_through_caller_transaction_are_notified_once_committed() {
        let container = container().await;
        let channel = container.notificator.register_consumer().channel();
        let ctx = RequestContext::background();

        container
            .repository
            .in_transaction(
                &ctx,
                transaction(|ctx, tx| async move {
                    let created = tx.create(&ctx, broker("b1")).await?;
                    tx.create(&ctx, broker("b2")).await?;
                    let id = created.id().to_string();
                    tx.delete(&ctx, ObjectType::ServiceBroker, &[Criterion::by_id(&id)])
                        .await?;
                    Ok(Vec::new())
                }),
            )
            .await
            .unwrap();

        let types: Vec<_> = drain(&channel)
            .iter()
            .map(|n| n.notification_type)
            .collect();
        assert_eq!(
            types,
            vec![
                NotificationType::Created,
                NotificationType::Created,
                NotificationType::Deleted
            ]
        );
        assert_eq!(container.raw.len(ObjectType::Notification), 3);
    }

    #[tokio::test]
    async fn test_slow_consumer_is_disconnected() {
        let container = container().await;
        let slow = container.notificator.register_consumer_with_size(1).channel();
        let fast = container.notificator.register_consumer().channel();
        let ctx = RequestContext::background();

        for name in ["b1", "b2", "b3"] {
            container.repository.create(&ctx, broker(name)).await.unwrap();
        }

        assert_eq!(drain(&fast).len(), 3);
        assert_eq!(slow.try_recv().map(|n| n.notification_type), Some(NotificationType::Created));
        assert!(slow.recv().await.is_none());
        assert_eq!(container.notificator.consumer_count(), 1);
    }

    // =========================================================================
    // Runtime lifecycle
    // =========================================================================

    #[tokio::test]
    async fn test_runtime_keeps_recent_notifications() {
        let runtime = ServiceManagerRuntime::new(ServiceManagerConfig::default())
            .await
            .unwrap();
        runtime.start().await.unwrap();
        let container = runtime.container();
        let ctx = RequestContext::background();

        container.repository.create(&ctx, broker("b1")).await.unwrap();
        assert_eq!(container.cleaner.clean(&ctx).await.unwrap(), 0);
        assert_eq!(container.raw.len(ObjectType::Notification), 1);

        runtime.shutdown().await;
    }
}

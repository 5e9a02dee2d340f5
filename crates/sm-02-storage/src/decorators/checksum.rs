//! # Checksum Decorator
//!
//! Attaches a SHA-256 checksum of the canonical bytes of every Secured
//! object on create and update, and recomputes it on every read. A mismatch
//! means the record was altered outside this stack.

use async_trait::async_trait;
use shared_crypto::sha256;
use shared_types::{
    Criterion, LabelChange, Object, ObjectList, ObjectType, Repository, RequestContext,
    StorageError, TransactionFn, TransactionalRepository,
};
use std::sync::Arc;
use tracing::error;

fn digest(data: &[u8]) -> Vec<u8> {
    sha256(data).to_vec()
}

/// Repository that validates content checksums.
pub struct ChecksumRepository<R: ?Sized> {
    inner: Arc<R>,
}

impl<R: ?Sized> ChecksumRepository<R> {
    pub fn new(inner: Arc<R>) -> Self {
        Self { inner }
    }
}

fn attach(object: &mut Box<dyn Object>) -> Result<(), StorageError> {
    if object.as_secured().is_some() {
        object.ensure_id();
        object.set_checksum(digest)?;
    }
    Ok(())
}

fn validate(object: Box<dyn Object>) -> Result<Box<dyn Object>, StorageError> {
    if object.validate_checksum(digest)? {
        return Ok(object);
    }
    let object_type = object.object_type();
    let id = object.id().to_string();
    error!(object_type = %object_type, id = %id, "Checksum mismatch");
    Err(StorageError::ChecksumMismatch { object_type, id })
}

fn validate_all(objects: ObjectList) -> Result<ObjectList, StorageError> {
    objects.into_iter().map(validate).collect()
}

#[async_trait]
impl<R: Repository + ?Sized> Repository for ChecksumRepository<R> {
    async fn create(
        &self,
        ctx: &RequestContext,
        mut object: Box<dyn Object>,
    ) -> Result<Box<dyn Object>, StorageError> {
        attach(&mut object)?;
        self.inner.create(ctx, object).await
    }

    async fn get(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<Box<dyn Object>, StorageError> {
        validate(self.inner.get(ctx, object_type, criteria).await?)
    }

    async fn list(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<ObjectList, StorageError> {
        validate_all(self.inner.list(ctx, object_type, criteria).await?)
    }

    async fn list_no_labels(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<ObjectList, StorageError> {
        validate_all(self.inner.list_no_labels(ctx, object_type, criteria).await?)
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
        attach(&mut object)?;
        self.inner.update(ctx, object, label_changes).await
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

    // Deleted records are not validated so corrupted ones can still be removed.
    async fn delete_returning(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<ObjectList, StorageError> {
        self.inner.delete_returning(ctx, object_type, criteria).await
    }
}

#[async_trait]
impl<R: TransactionalRepository + ?Sized> TransactionalRepository for ChecksumRepository<R> {
    async fn in_transaction(
        &self,
        ctx: &RequestContext,
        body: TransactionFn,
    ) -> Result<ObjectList, StorageError> {
        self.inner
            .in_transaction(
                ctx,
                Box::new(move |ctx, tx| {
                    let scoped: Arc<dyn Repository> = Arc::new(ChecksumRepository::new(tx));
                    body(ctx, scoped)
                }),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryRepository;
    use shared_types::{Credentials, LabelChange, ServiceBroker, ServiceInstance};

    fn broker() -> Box<dyn Object> {
        Box::new(
            ServiceBroker::new("broker", "https://broker.example.com")
                .with_credentials(Credentials::basic("admin", "s3cret")),
        )
    }

    #[tokio::test]
    async fn test_checksum_written_and_validated() {
        let ctx = RequestContext::background();
        let raw = Arc::new(InMemoryRepository::new());
        let repo = ChecksumRepository::new(raw.clone());

        let created = repo.create(&ctx, broker()).await.unwrap();
        let stored = created.downcast_ref::<ServiceBroker>().unwrap();
        assert_eq!(stored.checksum.len(), 64);

        let fetched = repo
            .get(&ctx, ObjectType::ServiceBroker, &[Criterion::by_id(created.id())])
            .await
            .unwrap();
        assert_eq!(fetched.id(), created.id());
    }

    #[tokio::test]
    async fn test_tampering_detected_with_type_and_id() {
        let ctx = RequestContext::background();
        let raw = Arc::new(InMemoryRepository::new());
        let repo = ChecksumRepository::new(raw.clone());
        let created = repo.create(&ctx, broker()).await.unwrap();

        // Write around the decorator.
        let mut tampered = created.downcast_ref::<ServiceBroker>().unwrap().clone();
        tampered.broker_url = "https://evil.example.com".to_string();
        raw.update(&ctx, Box::new(tampered), &[]).await.unwrap();

        let err = repo
            .list(&ctx, ObjectType::ServiceBroker, &[])
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StorageError::ChecksumMismatch {
                object_type: ObjectType::ServiceBroker,
                id: created.id().to_string(),
            }
        );

        // Corrupted records can still be deleted.
        let deleted = repo
            .delete_returning(&ctx, ObjectType::ServiceBroker, &[])
            .await
            .unwrap();
        assert_eq!(deleted.len(), 1);
    }

    #[tokio::test]
    async fn test_label_updates_keep_checksum_valid() {
        let ctx = RequestContext::background();
        let repo = ChecksumRepository::new(Arc::new(InMemoryRepository::new()));
        let created = repo.create(&ctx, broker()).await.unwrap();

        repo.update_labels(
            &ctx,
            ObjectType::ServiceBroker,
            created.id(),
            &[LabelChange::add("env", ["prod"])],
        )
        .await
        .unwrap();
        let fetched = repo
            .get(&ctx, ObjectType::ServiceBroker, &[])
            .await
            .unwrap();
        assert_eq!(fetched.labels()["env"], vec!["prod".to_string()]);
    }

    #[tokio::test]
    async fn test_plain_objects_pass_through() {
        let ctx = RequestContext::background();
        let repo = ChecksumRepository::new(Arc::new(InMemoryRepository::new()));
        repo.create(&ctx, Box::new(ServiceInstance::new("db", "plan")))
            .await
            .unwrap();
        assert_eq!(
            repo.list(&ctx, ObjectType::ServiceInstance, &[])
                .await
                .unwrap()
                .len(),
            1
        );
    }
}

//! # Integrity Decorator
//!
//! Same structure as the checksum decorator, keyed on the Integral
//! capability and a pluggable `IntegrityProcessor`. Label updates pass
//! through untouched because labels are never part of the signed payload.

use crate::ports::IntegrityProcessor;
use async_trait::async_trait;
use shared_types::{
    Criterion, LabelChange, Object, ObjectList, ObjectType, Repository, RequestContext,
    StorageError, TransactionFn, TransactionalRepository,
};
use std::sync::Arc;
use tracing::error;

/// Repository that signs and verifies integrity values.
pub struct IntegrityRepository<R: ?Sized> {
    inner: Arc<R>,
    processor: Arc<dyn IntegrityProcessor>,
}

impl<R: ?Sized> IntegrityRepository<R> {
    pub fn new(inner: Arc<R>, processor: Arc<dyn IntegrityProcessor>) -> Self {
        Self { inner, processor }
    }

    fn attach(&self, object: &mut Box<dyn Object>) -> Result<(), StorageError> {
        if let Some(integral) = object.as_integral_mut() {
            let integrity = self.processor.calculate_integrity(&*integral)?;
            integral.set_integrity(integrity);
        }
        Ok(())
    }

    fn validate(&self, object: Box<dyn Object>) -> Result<Box<dyn Object>, StorageError> {
        let valid = match object.as_integral() {
            Some(integral) => self.processor.validate_integrity(integral)?,
            None => true,
        };
        if valid {
            return Ok(object);
        }
        let object_type = object.object_type();
        let id = object.id().to_string();
        error!(object_type = %object_type, id = %id, "Integrity validation failed");
        Err(StorageError::IntegrityViolation { object_type, id })
    }

    fn validate_all(&self, objects: ObjectList) -> Result<ObjectList, StorageError> {
        objects
            .into_iter()
            .map(|object| self.validate(object))
            .collect()
    }
}

#[async_trait]
impl<R: Repository + ?Sized> Repository for IntegrityRepository<R> {
    async fn create(
        &self,
        ctx: &RequestContext,
        mut object: Box<dyn Object>,
    ) -> Result<Box<dyn Object>, StorageError> {
        self.attach(&mut object)?;
        self.inner.create(ctx, object).await
    }

    async fn get(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<Box<dyn Object>, StorageError> {
        self.validate(self.inner.get(ctx, object_type, criteria).await?)
    }

    async fn list(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<ObjectList, StorageError> {
        self.validate_all(self.inner.list(ctx, object_type, criteria).await?)
    }

    async fn list_no_labels(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<ObjectList, StorageError> {
        self.validate_all(self.inner.list_no_labels(ctx, object_type, criteria).await?)
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
        self.attach(&mut object)?;
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
impl<R: TransactionalRepository + ?Sized> TransactionalRepository for IntegrityRepository<R> {
    async fn in_transaction(
        &self,
        ctx: &RequestContext,
        body: TransactionFn,
    ) -> Result<ObjectList, StorageError> {
        let processor = self.processor.clone();
        self.inner
            .in_transaction(
                ctx,
                Box::new(move |ctx, tx| {
                    let scoped: Arc<dyn Repository> =
                        Arc::new(IntegrityRepository::new(tx, processor));
                    body(ctx, scoped)
                }),
            )
            .await
    }
}

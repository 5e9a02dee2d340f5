//! # Repository Ports
//!
//! Storage abstractions implemented by the in-memory adapter, by each
//! security decorator and by the interceptable façade.

use crate::context::RequestContext;
use crate::errors::StorageError;
use crate::object::{Object, ObjectType};
use crate::query::{Criterion, LabelChange};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Objects returned by list and delete operations.
pub type ObjectList = Vec<Box<dyn Object>>;

/// Future returned by a transaction body.
pub type TxFuture = BoxFuture<'static, Result<ObjectList, StorageError>>;

/// Body run inside a transaction. It receives a repository scoped to the
/// open transaction; an error rolls back everything it wrote.
pub type TransactionFn = Box<dyn FnOnce(RequestContext, Arc<dyn Repository>) -> TxFuture + Send>;

/// Generic resource storage.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Store `object`, assigning an id when empty.
    async fn create(
        &self,
        ctx: &RequestContext,
        object: Box<dyn Object>,
    ) -> Result<Box<dyn Object>, StorageError>;

    /// Fetch the single object matching `criteria`.
    async fn get(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<Box<dyn Object>, StorageError>;

    async fn list(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<ObjectList, StorageError>;

    /// Same as `list` with labels omitted from the results.
    async fn list_no_labels(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<ObjectList, StorageError>;

    async fn count(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<usize, StorageError>;

    /// Replace the stored object with the same id and apply `label_changes`.
    async fn update(
        &self,
        ctx: &RequestContext,
        object: Box<dyn Object>,
        label_changes: &[LabelChange],
    ) -> Result<Box<dyn Object>, StorageError>;

    /// Apply `label_changes` to the labels of one object only.
    async fn update_labels(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        id: &str,
        label_changes: &[LabelChange],
    ) -> Result<(), StorageError>;

    /// Delete everything matching `criteria`. `NotFound` when nothing matched.
    async fn delete(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<(), StorageError>;

    /// Delete everything matching `criteria` and return what was removed.
    async fn delete_returning(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<ObjectList, StorageError>;
}

/// Storage that can run a body atomically.
#[async_trait]
pub trait TransactionalRepository: Repository {
    /// Run `body` inside one transaction: commit on `Ok`, roll back on `Err`.
    async fn in_transaction(
        &self,
        ctx: &RequestContext,
        body: TransactionFn,
    ) -> Result<ObjectList, StorageError>;
}

/// Build a [`TransactionFn`] from a closure.
pub fn transaction<F, Fut>(body: F) -> TransactionFn
where
    F: FnOnce(RequestContext, Arc<dyn Repository>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Result<ObjectList, StorageError>> + Send + 'static,
{
    Box::new(move |ctx, repository| Box::pin(body(ctx, repository)))
}

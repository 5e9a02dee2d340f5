//! Hook function shapes.
//!
//! AroundTx hooks wrap the whole operation including transaction
//! acquisition. OnTx hooks run inside the open transaction and receive the
//! transaction-scoped repository.

use futures::future::BoxFuture;
use shared_types::{
    Criterion, LabelChange, Object, ObjectList, ObjectType, Repository, RequestContext, StorageError,
};
use std::future::Future;
use std::sync::Arc;

pub type ObjectResult = Result<Box<dyn Object>, StorageError>;
pub type ListResult = Result<ObjectList, StorageError>;

pub type CreateAroundTxFn =
    Arc<dyn Fn(RequestContext, Box<dyn Object>) -> BoxFuture<'static, ObjectResult> + Send + Sync>;

pub type CreateOnTxFn = Arc<
    dyn Fn(RequestContext, Arc<dyn Repository>, Box<dyn Object>) -> BoxFuture<'static, ObjectResult>
        + Send
        + Sync,
>;

pub type UpdateAroundTxFn = Arc<
    dyn Fn(RequestContext, Box<dyn Object>, Vec<LabelChange>) -> BoxFuture<'static, ObjectResult>
        + Send
        + Sync,
>;

pub type UpdateOnTxFn = Arc<
    dyn Fn(
            RequestContext,
            Arc<dyn Repository>,
            Box<dyn Object>,
            Vec<LabelChange>,
        ) -> BoxFuture<'static, ObjectResult>
        + Send
        + Sync,
>;

pub type DeleteAroundTxFn = Arc<
    dyn Fn(RequestContext, ObjectType, Vec<Criterion>) -> BoxFuture<'static, ListResult>
        + Send
        + Sync,
>;

/// Receives the objects already removed by delete-returning.
pub type DeleteOnTxFn = Arc<
    dyn Fn(RequestContext, Arc<dyn Repository>, ObjectList, Vec<Criterion>) -> BoxFuture<'static, ListResult>
        + Send
        + Sync,
>;

pub fn create_around_tx<F, Fut>(f: F) -> CreateAroundTxFn
where
    F: Fn(RequestContext, Box<dyn Object>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ObjectResult> + Send + 'static,
{
    Arc::new(
        move |ctx: RequestContext, object: Box<dyn Object>| -> BoxFuture<'static, ObjectResult> {
            Box::pin(f(ctx, object))
        },
    )
}

pub fn create_on_tx<F, Fut>(f: F) -> CreateOnTxFn
where
    F: Fn(RequestContext, Arc<dyn Repository>, Box<dyn Object>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ObjectResult> + Send + 'static,
{
    Arc::new(
        move |ctx: RequestContext,
              tx: Arc<dyn Repository>,
              object: Box<dyn Object>|
              -> BoxFuture<'static, ObjectResult> { Box::pin(f(ctx, tx, object)) },
    )
}

pub fn update_around_tx<F, Fut>(f: F) -> UpdateAroundTxFn
where
    F: Fn(RequestContext, Box<dyn Object>, Vec<LabelChange>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ObjectResult> + Send + 'static,
{
    Arc::new(
        move |ctx: RequestContext,
              object: Box<dyn Object>,
              changes: Vec<LabelChange>|
              -> BoxFuture<'static, ObjectResult> { Box::pin(f(ctx, object, changes)) },
    )
}

pub fn update_on_tx<F, Fut>(f: F) -> UpdateOnTxFn
where
    F: Fn(RequestContext, Arc<dyn Repository>, Box<dyn Object>, Vec<LabelChange>) -> Fut
        + Send
        + Sync
        + 'static,
    Fut: Future<Output = ObjectResult> + Send + 'static,
{
    Arc::new(
        move |ctx: RequestContext,
              tx: Arc<dyn Repository>,
              object: Box<dyn Object>,
              changes: Vec<LabelChange>|
              -> BoxFuture<'static, ObjectResult> { Box::pin(f(ctx, tx, object, changes)) },
    )
}

pub fn delete_around_tx<F, Fut>(f: F) -> DeleteAroundTxFn
where
    F: Fn(RequestContext, ObjectType, Vec<Criterion>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ListResult> + Send + 'static,
{
    Arc::new(
        move |ctx: RequestContext,
              object_type: ObjectType,
              criteria: Vec<Criterion>|
              -> BoxFuture<'static, ListResult> { Box::pin(f(ctx, object_type, criteria)) },
    )
}

pub fn delete_on_tx<F, Fut>(f: F) -> DeleteOnTxFn
where
    F: Fn(RequestContext, Arc<dyn Repository>, ObjectList, Vec<Criterion>) -> Fut
        + Send
        + Sync
        + 'static,
    Fut: Future<Output = ListResult> + Send + 'static,
{
    Arc::new(
        move |ctx: RequestContext,
              tx: Arc<dyn Repository>,
              deleted: ObjectList,
              criteria: Vec<Criterion>|
              -> BoxFuture<'static, ListResult> { Box::pin(f(ctx, tx, deleted, criteria)) },
    )
}

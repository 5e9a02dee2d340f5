//! # Interceptable Transactional Repository
//!
//! Façade running the registered interceptor chains around the decorated
//! repository.
//!
//! ```text
//! create(ctx, obj)
//!   └─ AroundTx[0] ─→ AroundTx[1] ─→ ... ─→ in_transaction
//!                                             └─ OnTx[0] ─→ ... ─→ tx.create
//! ```
//!
//! Each call asks every provider of the resource type for one interceptor;
//! the same instances serve the AroundTx and the OnTx stage. Any hook error
//! aborts the chain and rolls the transaction back. Results of create,
//! update and delete leave the façade with credentials scrubbed.
//!
//! Every transaction the façade opens carries a commit scope on its
//! context. Actions deferred with `RequestContext::after_commit` from any
//! hook, including hooks of cascaded writes, run once that transaction
//! commits and are dropped when it rolls back.

use async_trait::async_trait;
use chrono::Utc;
use shared_types::{
    transaction, Criterion, LabelChange, Object, ObjectList, ObjectType, Repository,
    RequestContext, StorageError, TransactionFn, TransactionalRepository,
};
use sm_01_interceptors::{
    create_around_tx, create_on_tx, delete_around_tx, delete_on_tx, update_around_tx,
    update_on_tx, ChainInstance, CreateAroundTxFn, CreateFamily, DeleteAroundTxFn, DeleteFamily,
    HookShape, InterceptorRegistry, UpdateAroundTxFn, UpdateFamily,
};
use std::sync::Arc;
use tracing::debug;

fn single(mut objects: ObjectList) -> Result<Box<dyn Object>, StorageError> {
    objects
        .pop()
        .ok_or_else(|| StorageError::Internal("transaction returned no object".to_string()))
}

fn scrub_all(mut objects: ObjectList) -> ObjectList {
    for object in &mut objects {
        object.scrub_credentials();
    }
    objects
}

/// Runs `body` in a transaction of `raw`, then the actions it deferred
/// until commit.
async fn committed(
    raw: &dyn TransactionalRepository,
    ctx: &RequestContext,
    body: TransactionFn,
) -> Result<ObjectList, StorageError> {
    let (ctx, hooks) = ctx.commit_scope();
    match raw.in_transaction(&ctx, body).await {
        Ok(objects) => {
            hooks.run();
            Ok(objects)
        }
        Err(e) => {
            hooks.discard();
            Err(e)
        }
    }
}

/// Runs the OnTx stage of a create inside an open transaction.
async fn create_in_tx(
    ctx: RequestContext,
    tx: Arc<dyn Repository>,
    registry: Arc<InterceptorRegistry>,
    chain: ChainInstance<CreateFamily>,
    object: Box<dyn Object>,
) -> Result<Box<dyn Object>, StorageError> {
    let raw_tx = tx.clone();
    let store = create_on_tx(move |ctx, _tx, object| {
        let raw_tx = raw_tx.clone();
        async move { raw_tx.create(&ctx, object).await }
    });
    let composed = chain.compose(HookShape::OnTx, store, |interceptor, next| {
        interceptor.on_tx_create(next)
    });
    let handle: Arc<dyn Repository> = Arc::new(TxInterceptableRepository::new(tx, registry));
    composed(ctx, handle, object).await
}

/// Runs the OnTx stage of an update inside an open transaction.
async fn update_in_tx(
    ctx: RequestContext,
    tx: Arc<dyn Repository>,
    registry: Arc<InterceptorRegistry>,
    chain: ChainInstance<UpdateFamily>,
    object: Box<dyn Object>,
    label_changes: Vec<LabelChange>,
) -> Result<Box<dyn Object>, StorageError> {
    let raw_tx = tx.clone();
    let store = update_on_tx(move |ctx, _tx, object, label_changes| {
        let raw_tx = raw_tx.clone();
        async move { raw_tx.update(&ctx, object, &label_changes).await }
    });
    let composed = chain.compose(HookShape::OnTx, store, |interceptor, next| {
        interceptor.on_tx_update(next)
    });
    let handle: Arc<dyn Repository> = Arc::new(TxInterceptableRepository::new(tx, registry));
    composed(ctx, handle, object, label_changes).await
}

/// Deletes inside an open transaction, then runs the OnTx stage over the
/// deleted objects.
async fn delete_in_tx(
    ctx: RequestContext,
    tx: Arc<dyn Repository>,
    registry: Arc<InterceptorRegistry>,
    chain: ChainInstance<DeleteFamily>,
    object_type: ObjectType,
    criteria: Vec<Criterion>,
) -> Result<ObjectList, StorageError> {
    let deleted = tx.delete_returning(&ctx, object_type, &criteria).await?;
    let passthrough = delete_on_tx(|_ctx, _tx, deleted, _criteria| async move { Ok(deleted) });
    let composed = chain.compose(HookShape::OnTx, passthrough, |interceptor, next| {
        interceptor.on_tx_delete(next)
    });
    let handle: Arc<dyn Repository> = Arc::new(TxInterceptableRepository::new(tx, registry));
    composed(ctx, handle, deleted, criteria).await
}

/// Repository façade running interceptor chains.
pub struct InterceptableTransactionalRepository {
    raw: Arc<dyn TransactionalRepository>,
    registry: Arc<InterceptorRegistry>,
}

impl InterceptableTransactionalRepository {
    /// `raw` is the fully decorated repository.
    pub fn new(raw: Arc<dyn TransactionalRepository>, registry: Arc<InterceptorRegistry>) -> Self {
        Self { raw, registry }
    }

    pub fn registry(&self) -> &Arc<InterceptorRegistry> {
        &self.registry
    }

    fn create_innermost(&self, chain: ChainInstance<CreateFamily>) -> CreateAroundTxFn {
        let raw = self.raw.clone();
        let registry = self.registry.clone();
        create_around_tx(move |ctx, object| {
            let raw = raw.clone();
            let registry = registry.clone();
            let chain = chain.clone();
            async move {
                let body = transaction(move |ctx, tx| async move {
                    Ok(vec![create_in_tx(ctx, tx, registry, chain, object).await?])
                });
                single(committed(raw.as_ref(), &ctx, body).await?)
            }
        })
    }

    fn update_innermost(&self, chain: ChainInstance<UpdateFamily>) -> UpdateAroundTxFn {
        let raw = self.raw.clone();
        let registry = self.registry.clone();
        update_around_tx(move |ctx, object, label_changes| {
            let raw = raw.clone();
            let registry = registry.clone();
            let chain = chain.clone();
            async move {
                let body = transaction(move |ctx, tx| async move {
                    Ok(vec![
                        update_in_tx(ctx, tx, registry, chain, object, label_changes).await?,
                    ])
                });
                single(committed(raw.as_ref(), &ctx, body).await?)
            }
        })
    }

    fn delete_innermost(&self, chain: ChainInstance<DeleteFamily>) -> DeleteAroundTxFn {
        let raw = self.raw.clone();
        let registry = self.registry.clone();
        delete_around_tx(move |ctx, object_type, criteria| {
            let raw = raw.clone();
            let registry = registry.clone();
            let chain = chain.clone();
            async move {
                let body = transaction(move |ctx, tx| {
                    delete_in_tx(ctx, tx, registry, chain, object_type, criteria)
                });
                committed(raw.as_ref(), &ctx, body).await
            }
        })
    }

    async fn intercepted_delete(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<ObjectList, StorageError> {
        ctx.check()?;
        let chain = self.registry.delete_chains().instantiate(object_type);
        let innermost = self.delete_innermost(chain.clone());
        let composed = chain.compose(HookShape::AroundTx, innermost, |interceptor, next| {
            interceptor.around_tx_delete(next)
        });
        let deleted = composed(ctx.clone(), object_type, criteria.to_vec()).await?;
        debug!(
            correlation_id = %ctx.correlation_id(),
            object_type = %object_type,
            count = deleted.len(),
            "Deleted objects"
        );
        Ok(scrub_all(deleted))
    }
}

#[async_trait]
impl Repository for InterceptableTransactionalRepository {
    async fn create(
        &self,
        ctx: &RequestContext,
        mut object: Box<dyn Object>,
    ) -> Result<Box<dyn Object>, StorageError> {
        ctx.check()?;
        object.ensure_id();
        let chain = self
            .registry
            .create_chains()
            .instantiate(object.object_type());
        let innermost = self.create_innermost(chain.clone());
        let composed = chain.compose(HookShape::AroundTx, innermost, |interceptor, next| {
            interceptor.around_tx_create(next)
        });
        let mut created = composed(ctx.clone(), object).await?;
        debug!(
            correlation_id = %ctx.correlation_id(),
            object_type = %created.object_type(),
            id = %created.id(),
            "Created object"
        );
        created.scrub_credentials();
        Ok(created)
    }

    async fn get(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<Box<dyn Object>, StorageError> {
        self.raw.get(ctx, object_type, criteria).await
    }

    async fn list(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<ObjectList, StorageError> {
        self.raw.list(ctx, object_type, criteria).await
    }

    async fn list_no_labels(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<ObjectList, StorageError> {
        self.raw.list_no_labels(ctx, object_type, criteria).await
    }

    async fn count(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<usize, StorageError> {
        self.raw.count(ctx, object_type, criteria).await
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        mut object: Box<dyn Object>,
        label_changes: &[LabelChange],
    ) -> Result<Box<dyn Object>, StorageError> {
        ctx.check()?;
        object.base_mut().updated_at = Utc::now();
        let chain = self
            .registry
            .update_chains()
            .instantiate(object.object_type());
        let innermost = self.update_innermost(chain.clone());
        let composed = chain.compose(HookShape::AroundTx, innermost, |interceptor, next| {
            interceptor.around_tx_update(next)
        });
        let mut updated = composed(ctx.clone(), object, label_changes.to_vec()).await?;
        debug!(
            correlation_id = %ctx.correlation_id(),
            object_type = %updated.object_type(),
            id = %updated.id(),
            "Updated object"
        );
        updated.scrub_credentials();
        Ok(updated)
    }

    async fn update_labels(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        id: &str,
        label_changes: &[LabelChange],
    ) -> Result<(), StorageError> {
        self.raw
            .update_labels(ctx, object_type, id, label_changes)
            .await
    }

    async fn delete(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<(), StorageError> {
        self.intercepted_delete(ctx, object_type, criteria)
            .await
            .map(drop)
    }

    async fn delete_returning(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<ObjectList, StorageError> {
        self.intercepted_delete(ctx, object_type, criteria).await
    }
}

#[async_trait]
impl TransactionalRepository for InterceptableTransactionalRepository {
    /// Writes made through the transaction handle run the OnTx chains of
    /// the touched resource types.
    async fn in_transaction(
        &self,
        ctx: &RequestContext,
        body: TransactionFn,
    ) -> Result<ObjectList, StorageError> {
        let registry = self.registry.clone();
        committed(
            self.raw.as_ref(),
            ctx,
            Box::new(move |ctx, tx| {
                let handle: Arc<dyn Repository> =
                    Arc::new(TxInterceptableRepository::new(tx, registry));
                body(ctx, handle)
            }),
        )
        .await
    }
}

/// Transaction handle given to OnTx hooks.
///
/// Writes through it run the OnTx chain of the written resource type against
/// the same open transaction. AroundTx hooks never run here: the transaction
/// is already open.
#[derive(Clone)]
pub struct TxInterceptableRepository {
    tx: Arc<dyn Repository>,
    registry: Arc<InterceptorRegistry>,
}

impl TxInterceptableRepository {
    pub fn new(tx: Arc<dyn Repository>, registry: Arc<InterceptorRegistry>) -> Self {
        Self { tx, registry }
    }
}

#[async_trait]
impl Repository for TxInterceptableRepository {
    async fn create(
        &self,
        ctx: &RequestContext,
        mut object: Box<dyn Object>,
    ) -> Result<Box<dyn Object>, StorageError> {
        object.ensure_id();
        let chain = self
            .registry
            .create_chains()
            .instantiate(object.object_type());
        create_in_tx(ctx.clone(), self.tx.clone(), self.registry.clone(), chain, object).await
    }

    async fn get(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<Box<dyn Object>, StorageError> {
        self.tx.get(ctx, object_type, criteria).await
    }

    async fn list(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<ObjectList, StorageError> {
        self.tx.list(ctx, object_type, criteria).await
    }

    async fn list_no_labels(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<ObjectList, StorageError> {
        self.tx.list_no_labels(ctx, object_type, criteria).await
    }

    async fn count(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<usize, StorageError> {
        self.tx.count(ctx, object_type, criteria).await
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        object: Box<dyn Object>,
        label_changes: &[LabelChange],
    ) -> Result<Box<dyn Object>, StorageError> {
        let chain = self
            .registry
            .update_chains()
            .instantiate(object.object_type());
        update_in_tx(
            ctx.clone(),
            self.tx.clone(),
            self.registry.clone(),
            chain,
            object,
            label_changes.to_vec(),
        )
        .await
    }

    async fn update_labels(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        id: &str,
        label_changes: &[LabelChange],
    ) -> Result<(), StorageError> {
        self.tx
            .update_labels(ctx, object_type, id, label_changes)
            .await
    }

    async fn delete(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<(), StorageError> {
        self.delete_returning(ctx, object_type, criteria)
            .await
            .map(drop)
    }

    async fn delete_returning(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<ObjectList, StorageError> {
        let chain = self.registry.delete_chains().instantiate(object_type);
        delete_in_tx(
            ctx.clone(),
            self.tx.clone(),
            self.registry.clone(),
            chain,
            object_type,
            criteria.to_vec(),
        )
        .await
    }
}

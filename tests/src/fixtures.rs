//! Shared fixtures: recording interceptors, a journaling repository and
//! sample objects.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{
    Credentials, Criterion, LabelChange, Object, ObjectList, ObjectType, Repository,
    RequestContext, ServiceBroker, ServiceInstance, StorageError, TransactionFn,
    TransactionalRepository,
};
use sm_01_interceptors::{
    create_around_tx, create_on_tx, delete_around_tx, delete_on_tx, update_around_tx, update_on_tx,
    CreateAroundTxFn, CreateInterceptor, CreateInterceptorProvider, CreateOnTxFn,
    DeleteAroundTxFn, DeleteInterceptor, DeleteInterceptorProvider, DeleteOnTxFn, Named,
    UpdateAroundTxFn, UpdateInterceptor, UpdateInterceptorProvider, UpdateOnTxFn,
};
use std::sync::Arc;

/// Ordered record of what ran.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Journal::default()
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().clone()
}

// =============================================================================
// Recording interceptors
// =============================================================================

/// Provider whose interceptors write `<name>:around` and `<name>:on_tx`
/// to a journal. A rejecting recorder fails its OnTx hook after recording.
#[derive(Clone)]
pub struct Recorder {
    name: &'static str,
    journal: Journal,
    reject_on_tx: bool,
}

impl Recorder {
    pub fn new(name: &'static str, journal: &Journal) -> Self {
        Self {
            name,
            journal: journal.clone(),
            reject_on_tx: false,
        }
    }

    pub fn rejecting(mut self) -> Self {
        self.reject_on_tx = true;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn record(&self, stage: &str) {
        self.journal.lock().push(format!("{}:{stage}", self.name));
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.reject_on_tx {
            return Err(StorageError::Rejected(format!("{} vetoed", self.name)));
        }
        Ok(())
    }
}

impl Named for Recorder {
    fn name(&self) -> String {
        self.name.to_string()
    }
}

impl CreateInterceptorProvider for Recorder {
    fn provide(&self) -> Arc<dyn CreateInterceptor> {
        Arc::new(self.clone())
    }
}

impl UpdateInterceptorProvider for Recorder {
    fn provide(&self) -> Arc<dyn UpdateInterceptor> {
        Arc::new(self.clone())
    }
}

impl DeleteInterceptorProvider for Recorder {
    fn provide(&self) -> Arc<dyn DeleteInterceptor> {
        Arc::new(self.clone())
    }
}

impl CreateInterceptor for Recorder {
    fn around_tx_create(&self, next: CreateAroundTxFn) -> CreateAroundTxFn {
        let recorder = self.clone();
        create_around_tx(move |ctx, object| {
            let next = next.clone();
            let recorder = recorder.clone();
            async move {
                recorder.record("around");
                next(ctx, object).await
            }
        })
    }

    fn on_tx_create(&self, next: CreateOnTxFn) -> CreateOnTxFn {
        let recorder = self.clone();
        create_on_tx(move |ctx, tx, object| {
            let next = next.clone();
            let recorder = recorder.clone();
            async move {
                recorder.record("on_tx");
                recorder.check()?;
                next(ctx, tx, object).await
            }
        })
    }
}

impl UpdateInterceptor for Recorder {
    fn around_tx_update(&self, next: UpdateAroundTxFn) -> UpdateAroundTxFn {
        let recorder = self.clone();
        update_around_tx(move |ctx, object, label_changes| {
            let next = next.clone();
            let recorder = recorder.clone();
            async move {
                recorder.record("around");
                next(ctx, object, label_changes).await
            }
        })
    }

    fn on_tx_update(&self, next: UpdateOnTxFn) -> UpdateOnTxFn {
        let recorder = self.clone();
        update_on_tx(move |ctx, tx, object, label_changes| {
            let next = next.clone();
            let recorder = recorder.clone();
            async move {
                recorder.record("on_tx");
                recorder.check()?;
                next(ctx, tx, object, label_changes).await
            }
        })
    }
}

impl DeleteInterceptor for Recorder {
    fn around_tx_delete(&self, next: DeleteAroundTxFn) -> DeleteAroundTxFn {
        let recorder = self.clone();
        delete_around_tx(move |ctx, object_type, criteria| {
            let next = next.clone();
            let recorder = recorder.clone();
            async move {
                recorder.record("around");
                next(ctx, object_type, criteria).await
            }
        })
    }

    fn on_tx_delete(&self, next: DeleteOnTxFn) -> DeleteOnTxFn {
        let recorder = self.clone();
        delete_on_tx(move |ctx, tx, deleted, criteria| {
            let next = next.clone();
            let recorder = recorder.clone();
            async move {
                recorder.record("on_tx");
                recorder.check()?;
                next(ctx, tx, deleted, criteria).await
            }
        })
    }
}

// =============================================================================
// Journaling repository
// =============================================================================

/// Repository wrapper that journals `tx:open`, `write` and `tx:done` around
/// the storage calls it forwards.
pub struct Journaling<R: ?Sized> {
    inner: Arc<R>,
    journal: Journal,
}

impl<R: ?Sized> Journaling<R> {
    pub fn new(inner: Arc<R>, journal: &Journal) -> Self {
        Self {
            inner,
            journal: journal.clone(),
        }
    }

    fn record(&self, entry: &str) {
        self.journal.lock().push(entry.to_string());
    }
}

#[async_trait]
impl<R: Repository + ?Sized> Repository for Journaling<R> {
    async fn create(
        &self,
        ctx: &RequestContext,
        object: Box<dyn Object>,
    ) -> Result<Box<dyn Object>, StorageError> {
        self.record("write");
        self.inner.create(ctx, object).await
    }

    async fn get(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<Box<dyn Object>, StorageError> {
        self.inner.get(ctx, object_type, criteria).await
    }

    async fn list(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<ObjectList, StorageError> {
        self.inner.list(ctx, object_type, criteria).await
    }

    async fn list_no_labels(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<ObjectList, StorageError> {
        self.inner.list_no_labels(ctx, object_type, criteria).await
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
        object: Box<dyn Object>,
        label_changes: &[LabelChange],
    ) -> Result<Box<dyn Object>, StorageError> {
        self.record("write");
        self.inner.update(ctx, object, label_changes).await
    }

    async fn update_labels(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        id: &str,
        label_changes: &[LabelChange],
    ) -> Result<(), StorageError> {
        self.record("write");
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
        self.record("write");
        self.inner.delete(ctx, object_type, criteria).await
    }

    async fn delete_returning(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<ObjectList, StorageError> {
        self.record("write");
        self.inner.delete_returning(ctx, object_type, criteria).await
    }
}

#[async_trait]
impl<R: TransactionalRepository + ?Sized> TransactionalRepository for Journaling<R> {
    async fn in_transaction(
        &self,
        ctx: &RequestContext,
        body: TransactionFn,
    ) -> Result<ObjectList, StorageError> {
        self.record("tx:open");
        let journal = self.journal.clone();
        let result = self
            .inner
            .in_transaction(
                ctx,
                Box::new(move |ctx, tx| {
                    let scoped: Arc<dyn Repository> = Arc::new(Journaling::new(tx, &journal));
                    body(ctx, scoped)
                }),
            )
            .await;
        self.record(if result.is_ok() { "tx:commit" } else { "tx:rollback" });
        result
    }
}

// =============================================================================
// Sample objects
// =============================================================================

pub fn broker(name: &str) -> Box<dyn Object> {
    Box::new(
        ServiceBroker::new(name, format!("https://{name}.example.com"))
            .with_credentials(Credentials::basic("admin", "s3cret")),
    )
}

pub fn instance(name: &str) -> Box<dyn Object> {
    Box::new(ServiceInstance::new(name, "plan-1"))
}

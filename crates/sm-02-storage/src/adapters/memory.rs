//! # In-Memory Transactional Repository
//!
//! Committed state lives behind a `parking_lot::RwLock`. Writers, both single
//! operations and whole transactions, are serialised by an async mutex.
//! A transaction works on a private copy of the committed state, which
//! replaces the committed state on success and is dropped on error.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_types::{
    apply_label_changes, Criterion, LabelChange, Object, ObjectList, ObjectType, Repository,
    RequestContext, StorageError, TransactionFn, TransactionalRepository,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

/// Objects keyed by type and id.
#[derive(Clone, Default)]
struct Store {
    objects: HashMap<ObjectType, BTreeMap<String, Box<dyn Object>>>,
}

impl Store {
    fn select(
        &self,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<ObjectList, StorageError> {
        let Some(objects) = self.objects.get(&object_type) else {
            return Ok(Vec::new());
        };
        let mut selected = Vec::new();
        for object in objects.values() {
            if matches_all(object.as_ref(), criteria)? {
                selected.push(object.clone());
            }
        }
        Ok(selected)
    }

    fn create(&mut self, mut object: Box<dyn Object>) -> Result<Box<dyn Object>, StorageError> {
        let object_type = object.object_type();
        let id = object.ensure_id().to_string();
        let objects = self.objects.entry(object_type).or_default();
        if objects.contains_key(&id) {
            return Err(StorageError::AlreadyExists { object_type, id });
        }
        objects.insert(id, object.clone());
        Ok(object)
    }

    fn update(
        &mut self,
        mut object: Box<dyn Object>,
        label_changes: &[LabelChange],
    ) -> Result<Box<dyn Object>, StorageError> {
        let object_type = object.object_type();
        let stored = self
            .objects
            .get_mut(&object_type)
            .and_then(|objects| objects.get_mut(object.id()))
            .ok_or(StorageError::NotFound { object_type })?;

        let mut labels = stored.labels().clone();
        apply_label_changes(&mut labels, label_changes);
        object.base_mut().labels = labels;
        *stored = object.clone();
        Ok(object)
    }

    fn update_labels(
        &mut self,
        object_type: ObjectType,
        id: &str,
        label_changes: &[LabelChange],
    ) -> Result<(), StorageError> {
        let stored = self
            .objects
            .get_mut(&object_type)
            .and_then(|objects| objects.get_mut(id))
            .ok_or(StorageError::NotFound { object_type })?;
        apply_label_changes(&mut stored.base_mut().labels, label_changes);
        Ok(())
    }

    fn delete_returning(
        &mut self,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<ObjectList, StorageError> {
        let selected = self.select(object_type, criteria)?;
        if selected.is_empty() {
            return Err(StorageError::NotFound { object_type });
        }
        if let Some(objects) = self.objects.get_mut(&object_type) {
            for object in &selected {
                objects.remove(object.id());
            }
        }
        Ok(selected)
    }
}

fn matches_all(object: &dyn Object, criteria: &[Criterion]) -> Result<bool, StorageError> {
    for criterion in criteria {
        if !criterion.matches(object)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn strip_labels(mut objects: ObjectList) -> ObjectList {
    for object in &mut objects {
        object.base_mut().labels.clear();
    }
    objects
}

fn first_or_not_found(
    mut objects: ObjectList,
    object_type: ObjectType,
) -> Result<Box<dyn Object>, StorageError> {
    if objects.is_empty() {
        return Err(StorageError::NotFound { object_type });
    }
    Ok(objects.swap_remove(0))
}

/// In-memory repository for tests and single-process deployments.
#[derive(Default)]
pub struct InMemoryRepository {
    committed: RwLock<Store>,
    writer: tokio::sync::Mutex<()>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed objects of `object_type`.
    pub fn len(&self, object_type: ObjectType) -> usize {
        self.committed
            .read()
            .objects
            .get(&object_type)
            .map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.committed.read().objects.values().all(BTreeMap::is_empty)
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn create(
        &self,
        ctx: &RequestContext,
        object: Box<dyn Object>,
    ) -> Result<Box<dyn Object>, StorageError> {
        ctx.check()?;
        let _writer = self.writer.lock().await;
        self.committed.write().create(object)
    }

    async fn get(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<Box<dyn Object>, StorageError> {
        ctx.check()?;
        let selected = self.committed.read().select(object_type, criteria)?;
        first_or_not_found(selected, object_type)
    }

    async fn list(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<ObjectList, StorageError> {
        ctx.check()?;
        self.committed.read().select(object_type, criteria)
    }

    async fn list_no_labels(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<ObjectList, StorageError> {
        ctx.check()?;
        let selected = self.committed.read().select(object_type, criteria)?;
        Ok(strip_labels(selected))
    }

    async fn count(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<usize, StorageError> {
        ctx.check()?;
        Ok(self.committed.read().select(object_type, criteria)?.len())
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        object: Box<dyn Object>,
        label_changes: &[LabelChange],
    ) -> Result<Box<dyn Object>, StorageError> {
        ctx.check()?;
        let _writer = self.writer.lock().await;
        self.committed.write().update(object, label_changes)
    }

    async fn update_labels(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        id: &str,
        label_changes: &[LabelChange],
    ) -> Result<(), StorageError> {
        ctx.check()?;
        let _writer = self.writer.lock().await;
        self.committed
            .write()
            .update_labels(object_type, id, label_changes)
    }

    async fn delete(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<(), StorageError> {
        self.delete_returning(ctx, object_type, criteria).await.map(drop)
    }

    async fn delete_returning(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<ObjectList, StorageError> {
        ctx.check()?;
        let _writer = self.writer.lock().await;
        self.committed.write().delete_returning(object_type, criteria)
    }
}

#[async_trait]
impl TransactionalRepository for InMemoryRepository {
    async fn in_transaction(
        &self,
        ctx: &RequestContext,
        body: TransactionFn,
    ) -> Result<ObjectList, StorageError> {
        ctx.check()?;
        let _writer = self.writer.lock().await;

        let working = self.committed.read().clone();
        let tx = Arc::new(TransactionScope {
            working: Mutex::new(Some(working)),
        });
        let result = ctx.run(body(ctx.clone(), tx.clone())).await;
        let working = tx.working.lock().take();

        match (result, working) {
            (Ok(objects), Some(working)) => {
                *self.committed.write() = working;
                debug!(correlation_id = %ctx.correlation_id(), "Transaction committed");
                Ok(objects)
            }
            (Ok(_), None) => Err(StorageError::Internal(
                "transaction state lost before commit".to_string(),
            )),
            (Err(err), _) => {
                warn!(correlation_id = %ctx.correlation_id(), error = %err, "Transaction rolled back");
                Err(err)
            }
        }
    }
}

/// Repository handed to a transaction body.
///
/// Once the transaction finishes every operation fails.
struct TransactionScope {
    working: Mutex<Option<Store>>,
}

impl TransactionScope {
    fn with_store<T>(
        &self,
        ctx: &RequestContext,
        op: impl FnOnce(&mut Store) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        ctx.check()?;
        let mut working = self.working.lock();
        let store = working
            .as_mut()
            .ok_or_else(|| StorageError::Internal("transaction is already finished".to_string()))?;
        op(store)
    }
}

#[async_trait]
impl Repository for TransactionScope {
    async fn create(
        &self,
        ctx: &RequestContext,
        object: Box<dyn Object>,
    ) -> Result<Box<dyn Object>, StorageError> {
        self.with_store(ctx, |store| store.create(object))
    }

    async fn get(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<Box<dyn Object>, StorageError> {
        let selected = self.with_store(ctx, |store| store.select(object_type, criteria))?;
        first_or_not_found(selected, object_type)
    }

    async fn list(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<ObjectList, StorageError> {
        self.with_store(ctx, |store| store.select(object_type, criteria))
    }

    async fn list_no_labels(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<ObjectList, StorageError> {
        self.with_store(ctx, |store| store.select(object_type, criteria))
            .map(strip_labels)
    }

    async fn count(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<usize, StorageError> {
        self.with_store(ctx, |store| Ok(store.select(object_type, criteria)?.len()))
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        object: Box<dyn Object>,
        label_changes: &[LabelChange],
    ) -> Result<Box<dyn Object>, StorageError> {
        self.with_store(ctx, |store| store.update(object, label_changes))
    }

    async fn update_labels(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        id: &str,
        label_changes: &[LabelChange],
    ) -> Result<(), StorageError> {
        self.with_store(ctx, |store| store.update_labels(object_type, id, label_changes))
    }

    async fn delete(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<(), StorageError> {
        self.with_store(ctx, |store| store.delete_returning(object_type, criteria))
            .map(drop)
    }

    async fn delete_returning(
        &self,
        ctx: &RequestContext,
        object_type: ObjectType,
        criteria: &[Criterion],
    ) -> Result<ObjectList, StorageError> {
        self.with_store(ctx, |store| store.delete_returning(object_type, criteria))
    }
}

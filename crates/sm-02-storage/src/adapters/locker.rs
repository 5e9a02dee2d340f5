//! # In-Process Locker
//!
//! Single-permit semaphore standing in for the database advisory lock.

use crate::ports::Locker;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{RequestContext, StorageError};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub struct InMemoryLocker {
    semaphore: Arc<Semaphore>,
    held: Mutex<Option<OwnedSemaphorePermit>>,
}

impl Default for InMemoryLocker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLocker {
    pub fn new() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
            held: Mutex::new(None),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.held.lock().is_some()
    }
}

#[async_trait]
impl Locker for InMemoryLocker {
    async fn lock(&self, ctx: &RequestContext) -> Result<(), StorageError> {
        let permit = ctx
            .run(async {
                self.semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|e| StorageError::Lock(e.to_string()))
            })
            .await?;
        *self.held.lock() = Some(permit);
        Ok(())
    }

    async fn try_lock(&self, ctx: &RequestContext) -> Result<bool, StorageError> {
        ctx.check()?;
        match self.semaphore.clone().try_acquire_owned() {
            Ok(permit) => {
                *self.held.lock() = Some(permit);
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    async fn unlock(&self, _ctx: &RequestContext) -> Result<(), StorageError> {
        self.held
            .lock()
            .take()
            .map(drop)
            .ok_or_else(|| StorageError::Lock("lock is not held".to_string()))
    }
}

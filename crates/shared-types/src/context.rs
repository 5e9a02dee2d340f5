//! # Request Context
//!
//! Carries cancellation and deadline information through every storage call.
//! Cancellation is signalled through a `tokio::sync::watch` channel, the same
//! way the runtime signals shutdown.
//!
//! A context inside a transaction also carries that transaction's
//! after-commit actions. They run once the outermost caller has committed and
//! are dropped on rollback.

use crate::errors::StorageError;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

type CommitAction = Box<dyn FnOnce() + Send>;

/// Actions deferred until a transaction commits.
#[derive(Clone, Default)]
pub struct CommitHooks {
    actions: Arc<Mutex<Vec<CommitAction>>>,
}

impl CommitHooks {
    pub fn len(&self) -> usize {
        self.actions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.lock().is_empty()
    }

    fn push(&self, action: CommitAction) {
        self.actions.lock().push(action);
    }

    /// Run every deferred action in registration order.
    pub fn run(self) {
        let actions = std::mem::take(&mut *self.actions.lock());
        if !actions.is_empty() {
            debug!(count = actions.len(), "Running after-commit actions");
        }
        for action in actions {
            action();
        }
    }

    /// Drop every deferred action without running it.
    pub fn discard(self) {
        let dropped = std::mem::take(&mut *self.actions.lock()).len();
        if dropped > 0 {
            debug!(count = dropped, "Discarded after-commit actions");
        }
    }
}

impl fmt::Debug for CommitHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitHooks")
            .field("pending", &self.len())
            .finish()
    }
}

/// Per-request context.
#[derive(Debug, Clone)]
pub struct RequestContext {
    correlation_id: Uuid,
    cancel: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
    commit_hooks: Option<CommitHooks>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::background()
    }
}

impl RequestContext {
    /// Context that is never cancelled and has no deadline.
    #[must_use]
    pub fn background() -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            cancel: None,
            deadline: None,
            commit_hooks: None,
        }
    }

    /// Attach a cancellation receiver; `true` on the channel cancels.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Context plus the sender that cancels it.
    #[must_use]
    pub fn cancellable() -> (Self, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self::background().with_cancellation(rx), tx)
    }

    /// Set a deadline `timeout` from now. An earlier deadline is kept.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    /// Context for one transaction plus the hooks to run once it commits.
    ///
    /// A context already inside a transaction keeps its hooks, and the
    /// returned handle is empty: the outermost scope runs them.
    #[must_use]
    pub fn commit_scope(&self) -> (Self, CommitHooks) {
        if self.commit_hooks.is_some() {
            return (self.clone(), CommitHooks::default());
        }
        let hooks = CommitHooks::default();
        let mut scoped = self.clone();
        scoped.commit_hooks = Some(hooks.clone());
        (scoped, hooks)
    }

    /// Defer `action` until the enclosing transaction commits.
    ///
    /// Returns `false`, without keeping `action`, when the context has no
    /// commit scope.
    pub fn after_commit(&self, action: impl FnOnce() + Send + 'static) -> bool {
        match &self.commit_hooks {
            Some(hooks) => {
                hooks.push(Box::new(action));
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Fail fast when the context is already cancelled or expired.
    pub fn check(&self) -> Result<(), StorageError> {
        if self.is_cancelled() {
            return Err(StorageError::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(StorageError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Drive `fut` until it completes, the context is cancelled or the
    /// deadline passes.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, StorageError>>,
    {
        self.check()?;
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            result = fut => result,
            _ = self.cancelled() => Err(StorageError::Cancelled),
            _ = deadline => Err(StorageError::DeadlineExceeded),
        }
    }

    async fn cancelled(&self) {
        let Some(mut rx) = self.cancel.clone() else {
            return std::future::pending().await;
        };
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender dropped without cancelling.
                return std::future::pending().await;
            }
        }
    }
}

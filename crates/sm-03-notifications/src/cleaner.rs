//! # Notification Cleaner
//!
//! Background task deleting notification records older than `keep_for`.
//!
//! - Starts at most once per cleaner.
//! - A tick that finds nothing to delete is a success.
//! - Any other storage error is logged and the loop carries on.
//! - Only the shutdown signal stops it. The same signal cancels a run in
//!   progress.

use crate::errors::CleanerError;
use chrono::Utc;
use shared_types::{Criterion, ObjectType, Operator, Repository, RequestContext, StorageError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Default retention for notification records (12 hours).
pub const DEFAULT_KEEP_FOR: Duration = Duration::from_secs(12 * 60 * 60);

/// Default time between cleanup runs (1 hour).
pub const DEFAULT_CLEAN_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Cleaner timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanerSettings {
    /// How long notifications are kept.
    pub keep_for: Duration,
    /// Time between runs.
    pub interval: Duration,
}

impl Default for CleanerSettings {
    fn default() -> Self {
        Self {
            keep_for: DEFAULT_KEEP_FOR,
            interval: DEFAULT_CLEAN_INTERVAL,
        }
    }
}

/// Periodic deleter of old notifications.
pub struct NotificationCleaner {
    repository: Arc<dyn Repository>,
    settings: CleanerSettings,
    started: AtomicBool,
}

impl NotificationCleaner {
    pub fn new(repository: Arc<dyn Repository>, settings: CleanerSettings) -> Self {
        Self {
            repository,
            settings,
            started: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> CleanerSettings {
        self.settings
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Spawn the cleanup loop. It runs until `shutdown` turns `true` or its
    /// sender is dropped.
    ///
    /// # Errors
    ///
    /// `CleanerError::AlreadyStarted` on every call after the first.
    pub fn start(
        self: &Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<JoinHandle<()>, CleanerError> {
        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CleanerError::AlreadyStarted);
        }

        let cleaner = Arc::clone(self);
        info!(
            keep_for_secs = self.settings.keep_for.as_secs(),
            interval_secs = self.settings.interval.as_secs(),
            "Notification cleaner started"
        );
        Ok(tokio::spawn(async move {
            let ctx = RequestContext::background().with_cancellation(shutdown.clone());
            let period = cleaner.settings.interval;
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // Errors are already logged; the loop keeps running.
                        let _ = cleaner.clean(&ctx).await;
                        if ctx.is_cancelled() {
                            info!("Notification cleaner stopped");
                            return;
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            info!("Notification cleaner stopped");
                            return;
                        }
                    }
                }
            }
        }))
    }

    /// Delete notifications created before `now - keep_for`. Returns how many
    /// were removed.
    pub async fn clean(&self, ctx: &RequestContext) -> Result<usize, StorageError> {
        let keep_for = chrono::Duration::from_std(self.settings.keep_for)
            .map_err(|e| StorageError::Internal(format!("invalid retention: {e}")))?;
        let cutoff = Utc::now() - keep_for;
        let criteria = [Criterion::by_field(
            Operator::LessThan,
            "created_at",
            [cutoff.to_rfc3339()],
        )];

        match self
            .repository
            .delete_returning(ctx, ObjectType::Notification, &criteria)
            .await
        {
            Ok(deleted) => {
                info!(count = deleted.len(), cutoff = %cutoff, "Old notifications deleted");
                Ok(deleted.len())
            }
            Err(err) if err.is_not_found() => {
                debug!(cutoff = %cutoff, "No notifications to clean");
                Ok(0)
            }
            Err(StorageError::Cancelled) => {
                debug!("Notification cleanup cancelled");
                Err(StorageError::Cancelled)
            }
            Err(err) => {
                error!(error = %err, "Notification cleanup failed");
                Err(err)
            }
        }
    }
}

//! # Notificator
//!
//! Registry of consumer queues. Committed notifications are fanned out to
//! every registered queue.
//!
//! A queue that cannot take a notification because it is full is closed and
//! removed: its consumer has missed a change and must resync from storage.

use crate::errors::QueueError;
use crate::queue::NotificationQueue;
use parking_lot::RwLock;
use shared_types::Notification;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Default per-consumer queue size.
pub const DEFAULT_QUEUE_SIZE: usize = 100;

/// Fan-out point for committed notifications.
pub struct Notificator {
    queues: RwLock<HashMap<Uuid, Arc<NotificationQueue>>>,
    queue_size: usize,
    revision: AtomicI64,
    dispatched: AtomicU64,
}

impl Notificator {
    pub fn new(queue_size: usize) -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
            queue_size,
            revision: AtomicI64::new(0),
            dispatched: AtomicU64::new(0),
        }
    }

    /// Register a consumer with the configured queue size.
    pub fn register_consumer(&self) -> Arc<NotificationQueue> {
        self.register_consumer_with_size(self.queue_size)
    }

    pub fn register_consumer_with_size(&self, size: usize) -> Arc<NotificationQueue> {
        let queue = Arc::new(NotificationQueue::new(size));
        self.queues.write().insert(queue.id(), queue.clone());
        debug!(queue_id = %queue.id(), size, "Consumer registered");
        queue
    }

    /// Close and forget the queue. Returns whether it was registered.
    pub fn unregister_consumer(&self, queue_id: Uuid) -> bool {
        match self.queues.write().remove(&queue_id) {
            Some(queue) => {
                queue.close();
                debug!(queue_id = %queue_id, "Consumer unregistered");
                true
            }
            None => false,
        }
    }

    pub fn consumer_count(&self) -> usize {
        self.queues.read().len()
    }

    /// Next notification revision.
    pub fn next_revision(&self) -> i64 {
        self.revision.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Total notifications dispatched.
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Deliver `notification` to every consumer. Returns how many queues
    /// accepted it.
    pub fn dispatch(&self, notification: &Notification) -> usize {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        let mut delivered = 0;
        let mut dropped = Vec::new();
        for (id, queue) in self.queues.read().iter() {
            match queue.enqueue(notification.clone()) {
                Ok(()) => delivered += 1,
                Err(QueueError::Full) => {
                    warn!(queue_id = %id, "Notification queue full, closing consumer");
                    queue.close();
                    dropped.push(*id);
                }
                Err(QueueError::Closed) => dropped.push(*id),
            }
        }
        if !dropped.is_empty() {
            let mut queues = self.queues.write();
            for id in dropped {
                queues.remove(&id);
            }
        }
        debug!(
            resource = %notification.resource,
            revision = notification.revision,
            delivered,
            "Notification dispatched"
        );
        delivered
    }
}

impl Default for Notificator {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{NotificationType, ObjectType};

    fn notification() -> Notification {
        Notification::new(
            ObjectType::Platform,
            NotificationType::Modified,
            serde_json::Value::Null,
        )
    }

    #[test]
    fn test_dispatch_reaches_every_consumer() {
        let notificator = Notificator::new(4);
        let first = notificator.register_consumer();
        let second = notificator.register_consumer();

        assert_eq!(notificator.dispatch(&notification()), 2);
        assert!(first.channel().try_recv().is_some());
        assert!(second.channel().try_recv().is_some());
    }

    #[test]
    fn test_full_queue_is_closed_and_removed() {
        let notificator = Notificator::new(4);
        let slow = notificator.register_consumer_with_size(1);
        let _fast = notificator.register_consumer();

        assert_eq!(notificator.dispatch(&notification()), 2);
        assert_eq!(notificator.dispatch(&notification()), 1);

        assert!(slow.is_closed());
        assert_eq!(notificator.consumer_count(), 1);
    }

    #[test]
    fn test_unregister_closes_queue() {
        let notificator = Notificator::default();
        let queue = notificator.register_consumer();

        assert!(notificator.unregister_consumer(queue.id()));
        assert!(!notificator.unregister_consumer(queue.id()));
        assert!(queue.is_closed());
        assert_eq!(notificator.dispatch(&notification()), 0);
    }

    #[test]
    fn test_revisions_increase() {
        let notificator = Notificator::default();
        assert_eq!(notificator.next_revision(), 1);
        assert_eq!(notificator.next_revision(), 2);
    }
}

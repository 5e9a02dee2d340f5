//! # Notification Queue
//!
//! Bounded per-consumer delivery queue.
//!
//! - `enqueue` never blocks: it fails with `QueueError::Full` at capacity
//!   and with `QueueError::Closed` after `close`.
//! - A queue of size 0 is always full.
//! - `close` is idempotent.
//! - `channel` hands out a receiving view. Once the queue is closed and
//!   drained, reads return `None` without waiting.
//!
//! The closed flag and the sender sit behind one mutex so an enqueue can
//! never race a close.

use crate::errors::QueueError;
use parking_lot::Mutex;
use shared_types::Notification;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

struct QueueState {
    closed: bool,
    sender: Option<mpsc::Sender<Notification>>,
}

/// Bounded notification queue owned by one consumer.
pub struct NotificationQueue {
    id: Uuid,
    size: usize,
    state: Mutex<QueueState>,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<Notification>>>,
}

impl NotificationQueue {
    pub fn new(size: usize) -> Self {
        // mpsc channels need a capacity of at least one; size 0 is rejected
        // in `enqueue` before the channel is touched.
        let (sender, receiver) = mpsc::channel(size.max(1));
        Self {
            id: Uuid::new_v4(),
            size,
            state: Mutex::new(QueueState {
                closed: false,
                sender: Some(sender),
            }),
            receiver: Arc::new(tokio::sync::Mutex::new(receiver)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Queue `notification` without waiting for room.
    pub fn enqueue(&self, notification: Notification) -> Result<(), QueueError> {
        let state = self.state.lock();
        let sender = match (&state.sender, state.closed) {
            (Some(sender), false) => sender,
            _ => return Err(QueueError::Closed),
        };
        if self.size == 0 {
            return Err(QueueError::Full);
        }
        sender.try_send(notification).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => QueueError::Full,
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })
    }

    /// Close the queue. Calling it again has no effect.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        state.sender = None;
    }

    /// Receiving view of the queue.
    pub fn channel(&self) -> QueueChannel {
        QueueChannel {
            queue_id: self.id,
            receiver: self.receiver.clone(),
        }
    }
}

/// Read side of a `NotificationQueue`.
#[derive(Clone)]
pub struct QueueChannel {
    queue_id: Uuid,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<Notification>>>,
}

impl QueueChannel {
    pub fn queue_id(&self) -> Uuid {
        self.queue_id
    }

    /// Next notification; `None` once the queue is closed and drained.
    pub async fn recv(&self) -> Option<Notification> {
        self.receiver.lock().await.recv().await
    }

    /// Next notification if one is ready.
    pub fn try_recv(&self) -> Option<Notification> {
        self.receiver.try_lock().ok()?.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{NotificationType, ObjectType};

    fn notification() -> Notification {
        Notification::new(
            ObjectType::ServiceBroker,
            NotificationType::Created,
            serde_json::json!({"name": "broker"}),
        )
    }

    #[test]
    fn test_size_zero_is_always_full() {
        let queue = NotificationQueue::new(0);
        assert_eq!(queue.enqueue(notification()), Err(QueueError::Full));
        assert_eq!(queue.enqueue(notification()), Err(QueueError::Full));
    }

    #[test]
    fn test_size_one_accepts_exactly_one() {
        let queue = NotificationQueue::new(1);
        assert_eq!(queue.enqueue(notification()), Ok(()));
        assert_eq!(queue.enqueue(notification()), Err(QueueError::Full));
    }

    #[tokio::test]
    async fn test_closed_queue_rejects_and_never_blocks() {
        let queue = NotificationQueue::new(4);
        let channel = queue.channel();
        queue.close();

        assert_eq!(queue.enqueue(notification()), Err(QueueError::Closed));
        assert!(channel.recv().await.is_none());
        assert!(channel.try_recv().is_none());
    }

    #[test]
    fn test_double_close_is_noop() {
        let queue = NotificationQueue::new(1);
        queue.close();
        queue.close();
        assert!(queue.is_closed());
    }

    #[tokio::test]
    async fn test_delivery_in_order() {
        let queue = NotificationQueue::new(2);
        let channel = queue.channel();
        let mut first = notification();
        first.revision = 1;
        let mut second = notification();
        second.revision = 2;
        queue.enqueue(first).unwrap();
        queue.enqueue(second).unwrap();

        assert_eq!(channel.recv().await.unwrap().revision, 1);
        assert_eq!(channel.try_recv().unwrap().revision, 2);
        assert!(channel.try_recv().is_none());
        assert_eq!(channel.queue_id(), queue.id());
    }

    #[test]
    fn test_queues_have_distinct_ids() {
        assert_ne!(NotificationQueue::new(1).id(), NotificationQueue::new(1).id());
    }
}

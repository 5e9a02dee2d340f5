//! Error types for notification delivery and cleanup.

use thiserror::Error;

/// Errors returned synchronously by `NotificationQueue::enqueue`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The queue holds as many notifications as it can.
    #[error("notification queue is full")]
    Full,

    /// The queue was closed.
    #[error("notification queue is closed")]
    Closed,
}

/// Errors from the notification cleaner lifecycle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CleanerError {
    /// `start` was called on a cleaner that is already running.
    #[error("notification cleaner already started")]
    AlreadyStarted,
}

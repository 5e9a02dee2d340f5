//! # Notifications (sm-03)
//!
//! Delivery of change notifications to consumers and cleanup of old
//! notification records.
//!
//! ```text
//! façade ──OnTx──→ Notification record (same transaction)
//!    └──AroundTx, after commit──→ Notificator ──→ NotificationQueue (per consumer)
//!
//! NotificationCleaner ──every interval──→ delete created_at < now - keep_for
//! ```
//!
//! ## Crate Structure
//!
//! - `queue.rs` - bounded per-consumer queue with explicit close
//! - `notificator.rs` - consumer registry and fan-out
//! - `interceptors.rs` - create/update/delete notification interceptors
//! - `cleaner.rs` - periodic deletion of old notifications
//! - `errors.rs` - `QueueError`, `CleanerError`

pub mod cleaner;
pub mod errors;
pub mod interceptors;
pub mod notificator;
pub mod queue;

pub use cleaner::{CleanerSettings, NotificationCleaner, DEFAULT_CLEAN_INTERVAL, DEFAULT_KEEP_FOR};
pub use errors::{CleanerError, QueueError};
pub use interceptors::{
    register_notification_interceptors, NotificationInterceptor, NotificationInterceptorProvider,
    NOTIFICATIONS_INTERCEPTOR,
};
pub use notificator::{Notificator, DEFAULT_QUEUE_SIZE};
pub use queue::{NotificationQueue, QueueChannel};

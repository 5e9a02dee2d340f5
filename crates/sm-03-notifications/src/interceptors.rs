//! # Notification Interceptors
//!
//! Create, update and delete interceptors that record a `Notification` for
//! every change and hand it to the notificator once the change is durable.
//!
//! ```text
//! tx ──→ OnTx: store change, persist Notification, defer dispatch
//!  │
//!  └── after commit: dispatch deferred notifications
//! ```
//!
//! Dispatch is deferred on the transaction's commit scope, so writes made
//! through the transaction handle (cascades from other hooks, or a caller's
//! own `in_transaction`) are delivered exactly like top-level calls. A
//! rolled back transaction drops them.

use crate::notificator::Notificator;
use shared_types::{
    ConfigurationError, Notification, NotificationType, Object, ObjectType, Repository,
    RequestContext, StorageError,
};
use sm_01_interceptors::{
    create_on_tx, delete_on_tx, update_on_tx, CreateInterceptor, CreateInterceptorProvider,
    CreateOnTxFn, DeleteInterceptor, DeleteInterceptorProvider, DeleteOnTxFn,
    InterceptorRegistry, Named, UpdateInterceptor, UpdateInterceptorProvider, UpdateOnTxFn,
};
use std::sync::Arc;
use tracing::debug;

/// Provider name used for ordering anchors.
pub const NOTIFICATIONS_INTERCEPTOR: &str = "notifications";

/// Build the notification for `object` with credentials removed from the
/// payload.
fn notification_for(
    object: &dyn Object,
    notification_type: NotificationType,
    revision: i64,
) -> Result<Notification, StorageError> {
    let mut copy = object.clone_object();
    copy.scrub_credentials();
    let payload = copy.to_value()?;
    let platform_id = payload
        .get("platform_id")
        .and_then(serde_json::Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    let mut notification = Notification::new(object.object_type(), notification_type, payload);
    notification.platform_id = platform_id;
    notification.revision = revision;
    Ok(notification)
}

/// Persist one notification through the open transaction and defer its
/// dispatch until that transaction commits.
async fn record(
    ctx: &RequestContext,
    tx: &Arc<dyn Repository>,
    notificator: &Arc<Notificator>,
    object: &dyn Object,
    notification_type: NotificationType,
) -> Result<(), StorageError> {
    let notification = notification_for(object, notification_type, notificator.next_revision())?;
    let stored = tx.create(ctx, Box::new(notification)).await?;
    let Some(notification) = stored.downcast_ref::<Notification>().cloned() else {
        return Err(StorageError::Internal(
            "stored notification has an unexpected type".to_string(),
        ));
    };
    let notificator = notificator.clone();
    let deferred = ctx.after_commit(move || {
        notificator.dispatch(&notification);
    });
    if deferred {
        Ok(())
    } else {
        Err(StorageError::Internal(
            "notification recorded outside a transaction".to_string(),
        ))
    }
}

/// Registers the notification interceptors for one resource type.
pub struct NotificationInterceptorProvider {
    notificator: Arc<Notificator>,
}

impl NotificationInterceptorProvider {
    pub fn new(notificator: Arc<Notificator>) -> Self {
        Self { notificator }
    }

    fn interceptor(&self) -> Arc<NotificationInterceptor> {
        Arc::new(NotificationInterceptor {
            notificator: self.notificator.clone(),
        })
    }
}

impl Named for NotificationInterceptorProvider {
    fn name(&self) -> String {
        NOTIFICATIONS_INTERCEPTOR.to_string()
    }
}

impl CreateInterceptorProvider for NotificationInterceptorProvider {
    fn provide(&self) -> Arc<dyn CreateInterceptor> {
        self.interceptor()
    }
}

impl UpdateInterceptorProvider for NotificationInterceptorProvider {
    fn provide(&self) -> Arc<dyn UpdateInterceptor> {
        self.interceptor()
    }
}

impl DeleteInterceptorProvider for NotificationInterceptorProvider {
    fn provide(&self) -> Arc<dyn DeleteInterceptor> {
        self.interceptor()
    }
}

/// Per-call notification interceptor.
pub struct NotificationInterceptor {
    notificator: Arc<Notificator>,
}

impl CreateInterceptor for NotificationInterceptor {
    fn on_tx_create(&self, next: CreateOnTxFn) -> CreateOnTxFn {
        let notificator = self.notificator.clone();
        create_on_tx(move |ctx, tx, object| {
            let next = next.clone();
            let notificator = notificator.clone();
            async move {
                let created = next(ctx.clone(), tx.clone(), object).await?;
                record(&ctx, &tx, &notificator, &*created, NotificationType::Created).await?;
                Ok(created)
            }
        })
    }
}

impl UpdateInterceptor for NotificationInterceptor {
    fn on_tx_update(&self, next: UpdateOnTxFn) -> UpdateOnTxFn {
        let notificator = self.notificator.clone();
        update_on_tx(move |ctx, tx, object, label_changes| {
            let next = next.clone();
            let notificator = notificator.clone();
            async move {
                let updated = next(ctx.clone(), tx.clone(), object, label_changes).await?;
                record(&ctx, &tx, &notificator, &*updated, NotificationType::Modified).await?;
                Ok(updated)
            }
        })
    }
}

impl DeleteInterceptor for NotificationInterceptor {
    fn on_tx_delete(&self, next: DeleteOnTxFn) -> DeleteOnTxFn {
        let notificator = self.notificator.clone();
        delete_on_tx(move |ctx, tx, deleted, criteria| {
            let next = next.clone();
            let notificator = notificator.clone();
            async move {
                for object in &deleted {
                    record(&ctx, &tx, &notificator, &**object, NotificationType::Deleted)
                        .await?;
                }
                next(ctx, tx, deleted, criteria).await
            }
        })
    }
}

/// Register create, update and delete notification interceptors for every
/// type in `object_types`.
///
/// # Errors
///
/// Fails when a provider named `notifications` is already registered for
/// one of the types.
pub fn register_notification_interceptors(
    registry: &mut InterceptorRegistry,
    notificator: Arc<Notificator>,
    object_types: &[ObjectType],
) -> Result<(), ConfigurationError> {
    let provider = Arc::new(NotificationInterceptorProvider::new(notificator));
    for &object_type in object_types {
        if object_type == ObjectType::Notification {
            continue;
        }
        registry.create(object_type, provider.clone()).register()?;
        registry.update(object_type, provider.clone()).register()?;
        registry.delete(object_type, provider.clone()).register()?;
        debug!(object_type = %object_type, "Notification interceptors registered");
    }
    Ok(())
}

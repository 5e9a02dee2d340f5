//! Security decorators around the transactional repository.
//!
//! Each decorator wraps an `Arc<dyn TransactionalRepository>` and wraps
//! every transaction handle it passes down the same way. Decorators stack in
//! any order: the composition root supplies an ordered list and the first
//! entry ends up innermost.

pub mod checksum;
pub mod encryption;
pub mod integrity;

pub use checksum::ChecksumRepository;
pub use encryption::{
    bootstrap_encryption_key, EncryptingRepository, EncryptionSettings, DEFAULT_LOCK_TIMEOUT,
};
pub use integrity::IntegrityRepository;

use crate::ports::IntegrityProcessor;
use futures::future::BoxFuture;
use shared_types::{RequestContext, StorageError, TransactionalRepository};
use std::sync::Arc;
use tracing::info;

/// Result of applying one decorator.
pub type DecoratorFuture =
    BoxFuture<'static, Result<Arc<dyn TransactionalRepository>, StorageError>>;

/// Constructor wrapping a repository in one decorator.
pub type Decorator = Box<dyn FnOnce(Arc<dyn TransactionalRepository>) -> DecoratorFuture + Send>;

pub fn encryption(ctx: RequestContext, settings: EncryptionSettings) -> Decorator {
    Box::new(move |inner: Arc<dyn TransactionalRepository>| -> DecoratorFuture {
        Box::pin(async move {
            let repository = EncryptingRepository::new(&ctx, inner, &settings).await?;
            Ok(Arc::new(repository) as Arc<dyn TransactionalRepository>)
        })
    })
}

pub fn checksum() -> Decorator {
    Box::new(|inner: Arc<dyn TransactionalRepository>| -> DecoratorFuture {
        Box::pin(async move {
            Ok(Arc::new(ChecksumRepository::new(inner)) as Arc<dyn TransactionalRepository>)
        })
    })
}

pub fn integrity(processor: Arc<dyn IntegrityProcessor>) -> Decorator {
    Box::new(move |inner: Arc<dyn TransactionalRepository>| -> DecoratorFuture {
        Box::pin(async move {
            Ok(Arc::new(IntegrityRepository::new(inner, processor))
                as Arc<dyn TransactionalRepository>)
        })
    })
}

/// Apply `decorators` to `base` in order; the first one is innermost.
pub async fn decorate(
    base: Arc<dyn TransactionalRepository>,
    decorators: Vec<Decorator>,
) -> Result<Arc<dyn TransactionalRepository>, StorageError> {
    let count = decorators.len();
    let mut repository = base;
    for decorator in decorators {
        repository = decorator(repository).await?;
    }
    info!(decorators = count, "Repository decorated");
    Ok(repository)
}

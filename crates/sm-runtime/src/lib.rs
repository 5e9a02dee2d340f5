//! # Service Manager Runtime
//!
//! Composition root and lifecycle of the storage core. The main entry point
//! is the `main.rs` binary; the library exposes the wiring for tests.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Validate secrets when running in production
//! 3. Build the container (decorators, interceptors, façade)
//! 4. Start the notification cleaner
//! 5. Run until the shutdown signal

pub mod container;

pub use container::{
    ConfigError, DecoratorKind, IntegrityAlgorithm, NotificationConfig, RuntimeError,
    ServiceContainer, ServiceManagerConfig, StorageConfig, PRIMARY_STORAGE,
};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Bound on waiting for background tasks during shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// The runtime orchestrating the storage core's background tasks.
pub struct ServiceManagerRuntime {
    /// Wired components.
    container: Arc<ServiceContainer>,
    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,
    /// Shutdown signal receiver.
    shutdown_rx: watch::Receiver<bool>,
    /// Spawned background tasks.
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ServiceManagerRuntime {
    /// Build the runtime from configuration.
    ///
    /// # Errors
    ///
    /// Insecure settings when `production` is set, or any wiring failure.
    pub async fn new(config: ServiceManagerConfig) -> Result<Self, RuntimeError> {
        if config.production {
            config.validate_for_production()?;
        }
        info!("Creating service manager runtime");
        let container = Arc::new(ServiceContainer::build(config).await?);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            container,
            shutdown_tx,
            shutdown_rx,
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Start the background tasks.
    ///
    /// # Errors
    ///
    /// `CleanerError::AlreadyStarted` when called twice.
    pub async fn start(&self) -> Result<(), RuntimeError> {
        let cleaner = self.container.cleaner.start(self.shutdown_rx.clone())?;
        self.tasks.lock().await.push(cleaner);
        info!(
            decorators = ?self.container.config.storage.decorator_order,
            "Service manager running"
        );
        Ok(())
    }

    /// Signal shutdown and wait for the background tasks.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        if let Err(e) = self.shutdown_tx.send(true) {
            warn!(error = %e, "No background task listening for shutdown");
        }

        let tasks = std::mem::take(&mut *self.tasks.lock().await);
        for task in tasks {
            match tokio::time::timeout(SHUTDOWN_GRACE, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Background task failed"),
                Err(_) => warn!("Background task did not stop in time"),
            }
        }
        info!("Shutdown complete");
    }

    /// Get a reference to the service container.
    pub fn container(&self) -> Arc<ServiceContainer> {
        Arc::clone(&self.container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sm_03_notifications::CleanerError;

    #[tokio::test]
    async fn test_production_rejects_default_secrets() {
        let config = ServiceManagerConfig {
            production: true,
            ..ServiceManagerConfig::default()
        };
        let err = ServiceManagerRuntime::new(config).await.err().unwrap();
        assert!(matches!(err, RuntimeError::Config(ConfigError::InsecureSecret(_))));
    }

    #[tokio::test]
    async fn test_start_twice_fails_and_shutdown_stops_cleaner() {
        let runtime = ServiceManagerRuntime::new(ServiceManagerConfig::default())
            .await
            .unwrap();
        runtime.start().await.unwrap();
        assert!(matches!(
            runtime.start().await,
            Err(RuntimeError::Cleaner(CleanerError::AlreadyStarted))
        ));

        runtime.shutdown().await;
        assert!(runtime.tasks.lock().await.is_empty());
    }
}

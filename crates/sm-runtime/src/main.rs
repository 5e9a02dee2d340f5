//! # Service Manager
//!
//! Entry point of the storage core service.
//!
//! ```text
//! env ──→ ServiceManagerConfig ──→ ServiceContainer
//!                                     ├─ InterceptableTransactionalRepository
//!                                     ├─ Notificator
//!                                     └─ NotificationCleaner (background)
//! ```

use anyhow::{Context, Result};
use sm_runtime::{ServiceManagerConfig, ServiceManagerRuntime};
use sm_telemetry::init_telemetry;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = ServiceManagerConfig::from_env().context("Failed to load configuration")?;

    // Initialize logging
    let _telemetry = init_telemetry(config.telemetry.clone())?;

    if !config.production {
        if let Err(e) = config.validate_for_production() {
            warn!(error = %e, "Running with development settings");
        }
    }

    // Create and start the runtime
    let runtime = ServiceManagerRuntime::new(config)
        .await
        .context("Failed to build the service manager")?;
    runtime.start().await?;

    info!("Service manager is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    // Graceful shutdown
    runtime.shutdown().await;
    Ok(())
}

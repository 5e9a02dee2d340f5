//! Named registration of transactional repositories.
//!
//! Populated once by the composition root; lookups afterwards are read-only.

use shared_types::{ConfigurationError, TransactionalRepository};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Registry of storages by name.
#[derive(Default)]
pub struct StorageRegistry {
    storages: BTreeMap<String, Arc<dyn TransactionalRepository>>,
}

impl StorageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `storage` under `name`.
    ///
    /// # Errors
    ///
    /// `ConfigurationError::DuplicateStorage` when the name is taken.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        storage: Arc<dyn TransactionalRepository>,
    ) -> Result<(), ConfigurationError> {
        let name = name.into();
        if self.storages.contains_key(&name) {
            return Err(ConfigurationError::DuplicateStorage(name));
        }
        info!(name = %name, "Storage registered");
        self.storages.insert(name, storage);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TransactionalRepository>> {
        self.storages.get(name).cloned()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.storages.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.storages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storages.is_empty()
    }
}

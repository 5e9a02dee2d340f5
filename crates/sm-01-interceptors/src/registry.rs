//! Interceptor provider registry.
//!
//! Populated during bootstrap and then shared read-only behind an `Arc`.
//!
//! # Example
//!
//! ```ignore
//! let mut registry = InterceptorRegistry::new();
//! registry
//!     .create(ObjectType::ServiceBroker, Arc::new(CatalogLoader))
//!     .register()?;
//! registry
//!     .create(ObjectType::ServiceBroker, Arc::new(BrokerNotifier))
//!     .around_tx_after("catalog-loader")
//!     .register()?;
//! ```

use crate::domain::chain::{Chain, ChainInstance, HookShape, Named, ProviderFamily};
use crate::domain::order::{InterceptorOrder, InterceptorPosition};
use crate::ports::providers::{
    CreateFamily, CreateInterceptorProvider, DeleteFamily, DeleteInterceptorProvider, UpdateFamily,
    UpdateInterceptorProvider,
};
use shared_types::{ConfigurationError, ObjectType};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Chains of one family keyed by resource type.
pub struct FamilyChains<F: ProviderFamily> {
    chains: HashMap<ObjectType, Chain<F>>,
}

impl<F: ProviderFamily> Default for FamilyChains<F> {
    fn default() -> Self {
        Self {
            chains: HashMap::new(),
        }
    }
}

impl<F: ProviderFamily> FamilyChains<F> {
    fn register(
        &mut self,
        object_type: ObjectType,
        provider: Arc<F::Provider>,
        order: &InterceptorOrder,
    ) -> Result<(), ConfigurationError> {
        let name = provider.name();
        self.chains
            .entry(object_type)
            .or_insert_with(|| Chain::new(object_type))
            .register(provider, order)?;
        debug!(
            family = F::NAME,
            object_type = %object_type,
            name = %name,
            around_tx = ?order.around_tx,
            on_tx = ?order.on_tx,
            "Registered interceptor provider"
        );
        Ok(())
    }

    pub fn chain(&self, object_type: ObjectType) -> Option<&Chain<F>> {
        self.chains.get(&object_type)
    }

    /// Fresh interceptors for one call on `object_type`.
    pub fn instantiate(&self, object_type: ObjectType) -> ChainInstance<F> {
        self.chains
            .get(&object_type)
            .map(Chain::instantiate)
            .unwrap_or_else(ChainInstance::empty)
    }

    pub fn names(&self, object_type: ObjectType, shape: HookShape) -> Vec<String> {
        self.chains
            .get(&object_type)
            .map(|chain| chain.names(shape).to_vec())
            .unwrap_or_default()
    }
}

/// Every registered interceptor provider, per family and resource type.
#[derive(Default)]
pub struct InterceptorRegistry {
    create: FamilyChains<CreateFamily>,
    update: FamilyChains<UpdateFamily>,
    delete: FamilyChains<DeleteFamily>,
}

impl InterceptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_create(
        &mut self,
        object_type: ObjectType,
        provider: Arc<dyn CreateInterceptorProvider>,
        order: InterceptorOrder,
    ) -> Result<(), ConfigurationError> {
        self.create.register(object_type, provider, &order)
    }

    pub fn register_update(
        &mut self,
        object_type: ObjectType,
        provider: Arc<dyn UpdateInterceptorProvider>,
        order: InterceptorOrder,
    ) -> Result<(), ConfigurationError> {
        self.update.register(object_type, provider, &order)
    }

    pub fn register_delete(
        &mut self,
        object_type: ObjectType,
        provider: Arc<dyn DeleteInterceptorProvider>,
        order: InterceptorOrder,
    ) -> Result<(), ConfigurationError> {
        self.delete.register(object_type, provider, &order)
    }

    /// Start a fluent create registration.
    pub fn create(
        &mut self,
        object_type: ObjectType,
        provider: Arc<dyn CreateInterceptorProvider>,
    ) -> Registration<'_, CreateFamily> {
        Registration::new(&mut self.create, object_type, provider)
    }

    /// Start a fluent update registration.
    pub fn update(
        &mut self,
        object_type: ObjectType,
        provider: Arc<dyn UpdateInterceptorProvider>,
    ) -> Registration<'_, UpdateFamily> {
        Registration::new(&mut self.update, object_type, provider)
    }

    /// Start a fluent delete registration.
    pub fn delete(
        &mut self,
        object_type: ObjectType,
        provider: Arc<dyn DeleteInterceptorProvider>,
    ) -> Registration<'_, DeleteFamily> {
        Registration::new(&mut self.delete, object_type, provider)
    }

    pub fn create_chains(&self) -> &FamilyChains<CreateFamily> {
        &self.create
    }

    pub fn update_chains(&self) -> &FamilyChains<UpdateFamily> {
        &self.update
    }

    pub fn delete_chains(&self) -> &FamilyChains<DeleteFamily> {
        &self.delete
    }
}

/// Pending registration built through chained position setters.
#[must_use = "call register() to add the provider"]
pub struct Registration<'a, F: ProviderFamily> {
    chains: &'a mut FamilyChains<F>,
    object_type: ObjectType,
    provider: Arc<F::Provider>,
    order: InterceptorOrder,
}

impl<'a, F: ProviderFamily> Registration<'a, F> {
    fn new(chains: &'a mut FamilyChains<F>, object_type: ObjectType, provider: Arc<F::Provider>) -> Self {
        Self {
            chains,
            object_type,
            provider,
            order: InterceptorOrder::default(),
        }
    }

    pub fn around_tx_before(mut self, name: impl Into<String>) -> Self {
        self.order.around_tx = InterceptorPosition::before(name);
        self
    }

    pub fn around_tx_after(mut self, name: impl Into<String>) -> Self {
        self.order.around_tx = InterceptorPosition::after(name);
        self
    }

    pub fn on_tx_before(mut self, name: impl Into<String>) -> Self {
        self.order.on_tx = InterceptorPosition::before(name);
        self
    }

    pub fn on_tx_after(mut self, name: impl Into<String>) -> Self {
        self.order.on_tx = InterceptorPosition::after(name);
        self
    }

    /// Place before `name` in both hook shapes.
    pub fn before(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.around_tx_before(name.clone()).on_tx_before(name)
    }

    /// Place after `name` in both hook shapes.
    pub fn after(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.around_tx_after(name.clone()).on_tx_after(name)
    }

    pub fn with_order(mut self, order: InterceptorOrder) -> Self {
        self.order = order;
        self
    }

    pub fn register(self) -> Result<(), ConfigurationError> {
        self.chains
            .register(self.object_type, self.provider, &self.order)
    }
}

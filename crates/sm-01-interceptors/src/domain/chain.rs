//! Generic interceptor chain.
//!
//! One implementation serves all three provider families. A chain keeps the
//! registered providers of one family for one resource type together with an
//! ordered name list per hook shape. Lists are spliced at registration time,
//! so composing a chain is a plain reverse fold: the first name ends up
//! outermost.

use crate::domain::order::{InterceptorOrder, InterceptorPosition, PositionType};
use shared_types::{ConfigurationError, ObjectType};
use std::collections::HashMap;
use std::sync::Arc;

/// A provider of one interceptor family.
pub trait Named {
    /// Unique name of the provider within its family and resource type.
    fn name(&self) -> String;
}

/// Binds a provider trait to the interceptor trait it produces.
pub trait ProviderFamily {
    type Provider: ?Sized + Named + Send + Sync;
    type Interceptor: ?Sized + Send + Sync;

    /// Family name used in configuration errors.
    const NAME: &'static str;

    /// One fresh interceptor for one call.
    fn provide(provider: &Self::Provider) -> Arc<Self::Interceptor>;
}

/// Hook shape of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookShape {
    AroundTx,
    OnTx,
}

impl HookShape {
    fn as_str(self) -> &'static str {
        match self {
            HookShape::AroundTx => "around_tx",
            HookShape::OnTx => "on_tx",
        }
    }
}

/// Registered providers of one family for one resource type.
pub struct Chain<F: ProviderFamily> {
    object_type: ObjectType,
    providers: HashMap<String, Arc<F::Provider>>,
    around_tx_names: Vec<String>,
    on_tx_names: Vec<String>,
}

impl<F: ProviderFamily> Chain<F> {
    pub fn new(object_type: ObjectType) -> Self {
        Self {
            object_type,
            providers: HashMap::new(),
            around_tx_names: Vec::new(),
            on_tx_names: Vec::new(),
        }
    }

    /// Add `provider` at the positions given by `order`.
    ///
    /// Nothing is changed when validation fails.
    pub fn register(
        &mut self,
        provider: Arc<F::Provider>,
        order: &InterceptorOrder,
    ) -> Result<(), ConfigurationError> {
        let name = provider.name();
        if self.providers.contains_key(&name) {
            return Err(ConfigurationError::DuplicateInterceptor {
                family: F::NAME,
                object_type: self.object_type,
                name,
            });
        }

        let around_tx_at = self.insertion_index(HookShape::AroundTx, &name, &order.around_tx)?;
        let on_tx_at = self.insertion_index(HookShape::OnTx, &name, &order.on_tx)?;

        self.around_tx_names.insert(around_tx_at, name.clone());
        self.on_tx_names.insert(on_tx_at, name.clone());
        self.providers.insert(name, provider);
        Ok(())
    }

    fn insertion_index(
        &self,
        shape: HookShape,
        name: &str,
        position: &InterceptorPosition,
    ) -> Result<usize, ConfigurationError> {
        let names = self.names(shape);
        let Some(anchor) = position.anchor() else {
            return Ok(names.len());
        };
        let index = names
            .iter()
            .position(|existing| existing == anchor)
            .ok_or_else(|| ConfigurationError::MissingAnchor {
                family: F::NAME,
                object_type: self.object_type,
                hook: shape.as_str(),
                name: name.to_string(),
                anchor: anchor.to_string(),
            })?;
        Ok(match position.position_type {
            PositionType::Before => index,
            PositionType::After | PositionType::None => index + 1,
        })
    }

    /// Provider names for `shape`, outermost first.
    pub fn names(&self, shape: HookShape) -> &[String] {
        match shape {
            HookShape::AroundTx => &self.around_tx_names,
            HookShape::OnTx => &self.on_tx_names,
        }
    }

    pub fn around_tx_names(&self) -> &[String] {
        &self.around_tx_names
    }

    pub fn on_tx_names(&self) -> &[String] {
        &self.on_tx_names
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Ask every provider for one interceptor. Both hook shapes of a call
    /// share these instances.
    pub fn instantiate(&self) -> ChainInstance<F> {
        let interceptors = self
            .providers
            .iter()
            .map(|(name, provider)| (name.clone(), F::provide(provider)))
            .collect();
        ChainInstance {
            interceptors,
            around_tx_names: self.around_tx_names.clone(),
            on_tx_names: self.on_tx_names.clone(),
        }
    }
}

/// Interceptors of one call, ready to be composed.
pub struct ChainInstance<F: ProviderFamily> {
    interceptors: HashMap<String, Arc<F::Interceptor>>,
    around_tx_names: Vec<String>,
    on_tx_names: Vec<String>,
}

impl<F: ProviderFamily> Clone for ChainInstance<F> {
    fn clone(&self) -> Self {
        Self {
            interceptors: self.interceptors.clone(),
            around_tx_names: self.around_tx_names.clone(),
            on_tx_names: self.on_tx_names.clone(),
        }
    }
}

impl<F: ProviderFamily> ChainInstance<F> {
    /// Instance with no interceptors; composing it returns the innermost
    /// function unchanged.
    pub fn empty() -> Self {
        Self {
            interceptors: HashMap::new(),
            around_tx_names: Vec::new(),
            on_tx_names: Vec::new(),
        }
    }

    /// Wrap `innermost` with the hooks of `shape`.
    ///
    /// `hook` receives one interceptor and the function it wraps and returns
    /// the wrapped function.
    pub fn compose<H>(
        &self,
        shape: HookShape,
        innermost: H,
        hook: impl Fn(&F::Interceptor, H) -> H,
    ) -> H {
        let names = match shape {
            HookShape::AroundTx => &self.around_tx_names,
            HookShape::OnTx => &self.on_tx_names,
        };
        names
            .iter()
            .rev()
            .filter_map(|name| self.interceptors.get(name))
            .fold(innermost, |next, interceptor| hook(interceptor, next))
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

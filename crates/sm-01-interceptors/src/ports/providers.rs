//! Interceptor and provider traits.
//!
//! Providers are registered once at bootstrap. Each call asks every provider
//! of the affected resource type for a fresh interceptor, so interceptors may
//! keep per-call state shared between their AroundTx and OnTx hooks.
//!
//! Every hook defaults to passing `next` through unchanged.

use crate::domain::chain::{Named, ProviderFamily};
use crate::ports::hooks::{
    CreateAroundTxFn, CreateOnTxFn, DeleteAroundTxFn, DeleteOnTxFn, UpdateAroundTxFn, UpdateOnTxFn,
};
use std::sync::Arc;

pub trait CreateInterceptor: Send + Sync {
    fn around_tx_create(&self, next: CreateAroundTxFn) -> CreateAroundTxFn {
        next
    }

    fn on_tx_create(&self, next: CreateOnTxFn) -> CreateOnTxFn {
        next
    }
}

pub trait CreateInterceptorProvider: Named + Send + Sync {
    fn provide(&self) -> Arc<dyn CreateInterceptor>;
}

pub trait UpdateInterceptor: Send + Sync {
    fn around_tx_update(&self, next: UpdateAroundTxFn) -> UpdateAroundTxFn {
        next
    }

    fn on_tx_update(&self, next: UpdateOnTxFn) -> UpdateOnTxFn {
        next
    }
}

pub trait UpdateInterceptorProvider: Named + Send + Sync {
    fn provide(&self) -> Arc<dyn UpdateInterceptor>;
}

pub trait DeleteInterceptor: Send + Sync {
    fn around_tx_delete(&self, next: DeleteAroundTxFn) -> DeleteAroundTxFn {
        next
    }

    fn on_tx_delete(&self, next: DeleteOnTxFn) -> DeleteOnTxFn {
        next
    }
}

pub trait DeleteInterceptorProvider: Named + Send + Sync {
    fn provide(&self) -> Arc<dyn DeleteInterceptor>;
}

/// Create family marker.
pub struct CreateFamily;

impl ProviderFamily for CreateFamily {
    type Provider = dyn CreateInterceptorProvider;
    type Interceptor = dyn CreateInterceptor;
    const NAME: &'static str = "create";

    fn provide(provider: &Self::Provider) -> Arc<Self::Interceptor> {
        provider.provide()
    }
}

/// Update family marker.
pub struct UpdateFamily;

impl ProviderFamily for UpdateFamily {
    type Provider = dyn UpdateInterceptorProvider;
    type Interceptor = dyn UpdateInterceptor;
    const NAME: &'static str = "update";

    fn provide(provider: &Self::Provider) -> Arc<Self::Interceptor> {
        provider.provide()
    }
}

/// Delete family marker.
pub struct DeleteFamily;

impl ProviderFamily for DeleteFamily {
    type Provider = dyn DeleteInterceptorProvider;
    type Interceptor = dyn DeleteInterceptor;
    const NAME: &'static str = "delete";

    fn provide(provider: &Self::Provider) -> Arc<Self::Interceptor> {
        provider.provide()
    }
}

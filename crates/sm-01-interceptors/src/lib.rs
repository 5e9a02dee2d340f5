//! # Interceptor Chain Engine (sm-01)
//!
//! Registration, validation and ordered composition of create, update and
//! delete hooks per resource type.
//!
//! ## Hook Shapes
//!
//! ```text
//! AroundTx chain ──→ [open transaction] ──→ OnTx chain ──→ repository
//!   (outermost first)                         (outermost first)
//! ```
//!
//! - **AroundTx** wraps everything, including transaction acquisition.
//! - **OnTx** runs inside the open transaction with the transaction-scoped
//!   repository.
//!
//! ## Invariants
//!
//! | Invariant | Enforced by |
//! |-----------|-------------|
//! | Unique provider names per family and resource type | `Chain::register` |
//! | Before/after anchors exist for the hook shape | `Chain::register` |
//! | First entry of a chain is outermost | `ChainInstance::compose` |
//! | One interceptor instance per provider per call | `Chain::instantiate` |
//!
//! ## Crate Structure
//!
//! - `domain/` - ordering descriptors and the generic chain
//! - `ports/` - hook function shapes, interceptor and provider traits
//! - `registry.rs` - provider registry with fluent registration

pub mod domain;
pub mod ports;
pub mod registry;

pub use domain::{
    Chain, ChainInstance, HookShape, InterceptorOrder, InterceptorPosition, Named, PositionType,
    ProviderFamily,
};
pub use ports::*;
pub use registry::{FamilyChains, InterceptorRegistry, Registration};

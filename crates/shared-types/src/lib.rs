//! # Shared Types Crate
//!
//! Resource object model, capability traits, query criteria, request context
//! and repository ports shared by every Service Manager crate.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every stored resource type is defined here.
//! - **Capabilities, not hierarchy**: credential handling and integrity are
//!   optional traits discovered through `Object::as_secured` and
//!   `Object::as_integral`.
//! - **Ports live with the model**: `Repository` and `TransactionalRepository`
//!   are defined next to the objects they store so adapters and decorators
//!   depend on one crate only.

pub mod context;
pub mod entities;
pub mod errors;
pub mod object;
pub mod query;
pub mod repository;

pub use context::{CommitHooks, RequestContext};
pub use entities::*;
pub use errors::{ConfigurationError, StorageError};
pub use object::{Base, CredentialTransform, Integral, Object, ObjectType, Secured};
pub use query::{
    apply_label_changes, Criterion, CriterionType, LabelChange, LabelOperation, Labels, Operator,
};
pub use repository::{
    transaction, ObjectList, Repository, TransactionFn, TransactionalRepository, TxFuture,
};

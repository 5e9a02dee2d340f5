//! Domain Layer
//!
//! Ordering descriptors and the generic chain shared by every provider
//! family. No I/O happens here.

pub mod chain;
pub mod order;

pub use chain::{Chain, ChainInstance, HookShape, Named, ProviderFamily};
pub use order::{InterceptorOrder, InterceptorPosition, PositionType};

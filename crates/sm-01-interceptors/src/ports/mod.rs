//! Ports Layer
//!
//! - `hooks` - function shapes of AroundTx and OnTx hooks
//! - `providers` - interceptor and provider traits per family

pub mod hooks;
pub mod providers;

pub use hooks::*;
pub use providers::*;

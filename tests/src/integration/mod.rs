//! Integration flows.
//!
//! - `chains` - interceptor ordering, transaction boundaries, rollback
//! - `decorators` - every decorator stacking order inside transactions
//! - `notifications` - change notifications from the wired container

pub mod chains;
pub mod decorators;
pub mod notifications;

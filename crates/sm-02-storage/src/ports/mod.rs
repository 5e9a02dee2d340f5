//! Ports Layer
//!
//! Driven ports of the storage core. The repository ports themselves live in
//! `shared-types` next to the object model.

pub mod outbound;

pub use outbound::{Encrypter, IntegrityProcessor, KeyStore, Locker};

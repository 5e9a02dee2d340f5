//! Adapters Layer
//!
//! In-process implementations of every storage port.

pub mod encrypter;
pub mod integrity;
pub mod key_store;
pub mod locker;
pub mod memory;

pub use encrypter::AeadEncrypter;
pub use integrity::{Ed25519IntegrityProcessor, HmacIntegrityProcessor};
pub use key_store::InMemoryKeyStore;
pub use locker::InMemoryLocker;
pub use memory::InMemoryRepository;

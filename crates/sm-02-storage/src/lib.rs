//! # Storage Core (sm-02)
//!
//! Transactional repository façade with interceptor chains, the security
//! decorator stack and the in-process adapters behind it.
//!
//! ## Architecture
//!
//! ```text
//! caller
//!   └─ InterceptableTransactionalRepository   (AroundTx → tx → OnTx)
//!        └─ decorators (ordered list, first is innermost)
//!             ├─ EncryptingRepository       credentials encrypted at rest
//!             ├─ ChecksumRepository         SHA-256 over canonical bytes
//!             └─ IntegrityRepository        HMAC / Ed25519 integrity
//!                  └─ InMemoryRepository    serialised transactions
//! ```
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Credential scrubbing | Create/update/delete results never carry credentials |
//! | 2 | Atomic transactions | A failing hook or body discards every write |
//! | 3 | Tamper detection | Every read recomputes checksum and integrity |
//! | 4 | Single key bootstrap | The encryption key is created under the lock |
//! | 5 | Transaction handles wrapped | Decorators apply inside transactions too |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `ports/` - Locker, KeyStore, Encrypter, IntegrityProcessor
//! - `adapters/` - in-memory and crypto-backed port implementations
//! - `decorators/` - encryption, checksum and integrity layers
//! - `interceptable.rs` - façade running the interceptor chains
//! - `registry.rs` - named storages
//! - `cache.rs` - TTL read cache

pub mod adapters;
pub mod cache;
pub mod decorators;
pub mod interceptable;
pub mod ports;
pub mod registry;

pub use adapters::{
    AeadEncrypter, Ed25519IntegrityProcessor, HmacIntegrityProcessor, InMemoryKeyStore,
    InMemoryLocker, InMemoryRepository,
};
pub use cache::{ReadCache, ReadCacheStats, DEFAULT_TTL};
pub use decorators::{
    bootstrap_encryption_key, decorate, ChecksumRepository, Decorator, DecoratorFuture,
    EncryptingRepository, EncryptionSettings, IntegrityRepository, DEFAULT_LOCK_TIMEOUT,
};
pub use interceptable::{InterceptableTransactionalRepository, TxInterceptableRepository};
pub use ports::{Encrypter, IntegrityProcessor, KeyStore, Locker};
pub use registry::StorageRegistry;

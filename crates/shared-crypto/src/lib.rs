//! # Shared Crypto - Credential Protection Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `symmetric` | XChaCha20-Poly1305, AES-256-GCM | Credential encryption at rest |
//! | `hashing` | SHA-256, HMAC-SHA256 | Checksums, keyed integrity, key derivation |
//! | `signatures` | Ed25519 | Signed integrity values |
//!
//! ## Security Properties
//!
//! - **XChaCha20**: 192-bit nonce, constant-time, side-channel immune
//! - **Ed25519**: Deterministic nonces, no RNG dependency
//! - **HMAC**: constant-time tag verification

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod signatures;
pub mod symmetric;

// Re-exports
pub use errors::CryptoError;
pub use hashing::{derive_key, hmac_sha256, sha256, verify_hmac_sha256, Hash};
pub use signatures::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use symmetric::{open, seal, Cipher, SecretKey, KEY_LEN};

//! # Error Types
//!
//! Error taxonomy shared by the interceptor engine, the repository façade and
//! the decorator stack.

use crate::object::ObjectType;
use thiserror::Error;

/// Errors surfaced by repositories, decorators and interceptors.
///
/// Not-found and conflict errors are returned verbatim from the storage
/// collaborator; callers translate them into protocol responses.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// No object matched the lookup.
    #[error("{object_type} not found")]
    NotFound { object_type: ObjectType },

    /// An object with the same identity already exists.
    #[error("{object_type} with id {id} already exists")]
    AlreadyExists { object_type: ObjectType, id: String },

    /// The stored checksum does not match the object's content.
    #[error("checksum mismatch for {object_type} with id {id}")]
    ChecksumMismatch { object_type: ObjectType, id: String },

    /// The stored integrity value does not verify.
    #[error("integrity violation for {object_type} with id {id}")]
    IntegrityViolation { object_type: ObjectType, id: String },

    /// Encryption or decryption of credentials failed.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// The distributed lock could not be acquired or released.
    #[error("lock error: {0}")]
    Lock(String),

    /// The encryption key store failed.
    #[error("key store error: {0}")]
    KeyStore(String),

    /// An interceptor rejected the operation.
    #[error("operation rejected: {0}")]
    Rejected(String),

    /// The request context was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// The request context deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Unexpected storage failure.
    #[error("storage error: {0}")]
    Internal(String),
}

impl StorageError {
    /// Whether this is a not-found result.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Internal(format!("serialization failed: {err}"))
    }
}

/// Wiring defects discovered while the process bootstraps.
///
/// These are never recoverable: the composition root aborts startup when one
/// is returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Two providers of the same family share a name for one resource type.
    #[error("{family} interceptor provider {name} for {object_type} is already registered")]
    DuplicateInterceptor {
        family: &'static str,
        object_type: ObjectType,
        name: String,
    },

    /// An ordering anchor names a provider that is not registered.
    #[error(
        "{family} interceptor {name} for {object_type} references missing {hook} anchor {anchor}"
    )]
    MissingAnchor {
        family: &'static str,
        object_type: ObjectType,
        hook: &'static str,
        name: String,
        anchor: String,
    },

    /// A storage with the same name is already registered.
    #[error("storage {0} is already registered")]
    DuplicateStorage(String),

    /// A setting is missing or malformed.
    #[error("invalid setting {key}: {reason}")]
    InvalidSetting { key: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_error_names_type_and_id() {
        let err = StorageError::ChecksumMismatch {
            object_type: ObjectType::ServiceBroker,
            id: "broker-1".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("ServiceBroker"));
        assert!(message.contains("broker-1"));
    }

    #[test]
    fn test_not_found_predicate() {
        let err = StorageError::NotFound {
            object_type: ObjectType::Notification,
        };
        assert!(err.is_not_found());
        assert!(!StorageError::Cancelled.is_not_found());
    }
}

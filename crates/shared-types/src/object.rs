//! # Resource Object Model
//!
//! Every stored resource is handled as a `Box<dyn Object>`. Optional
//! capabilities are discovered at runtime through `as_secured` and
//! `as_integral`; decorators query them on every call instead of relying on a
//! type hierarchy.

use crate::errors::StorageError;
use crate::query::Labels;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

/// Resource type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectType {
    ServiceBroker,
    Platform,
    ServiceOffering,
    ServicePlan,
    ServiceInstance,
    ServiceBinding,
    Operation,
    Notification,
}

impl ObjectType {
    /// All known resource types.
    pub const ALL: [ObjectType; 8] = [
        ObjectType::ServiceBroker,
        ObjectType::Platform,
        ObjectType::ServiceOffering,
        ObjectType::ServicePlan,
        ObjectType::ServiceInstance,
        ObjectType::ServiceBinding,
        ObjectType::Operation,
        ObjectType::Notification,
    ];

    /// Stable name used in logs and error messages.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::ServiceBroker => "ServiceBroker",
            ObjectType::Platform => "Platform",
            ObjectType::ServiceOffering => "ServiceOffering",
            ObjectType::ServicePlan => "ServicePlan",
            ObjectType::ServiceInstance => "ServiceInstance",
            ObjectType::ServiceBinding => "ServiceBinding",
            ObjectType::Operation => "Operation",
            ObjectType::Notification => "Notification",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields common to every resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Base {
    /// Unique identifier, assigned on create when empty.
    #[serde(default)]
    pub id: String,
    /// Generic attribute map.
    #[serde(default)]
    pub labels: Labels,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Base {
    /// Fresh base stamped with the current time and no id.
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            labels: Labels::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Transform applied to credential bytes by the encryption layer.
pub type CredentialTransform<'a> = &'a (dyn Fn(&[u8]) -> Result<Vec<u8>, StorageError> + Send + Sync);

/// Capability of objects carrying credentials.
///
/// Secret strings are stored hex-encoded once encrypted.
pub trait Secured {
    /// Current secret values (empty strings are skipped by transforms).
    fn secrets(&self) -> Vec<&str>;

    /// Mutable access to the secret values.
    fn secrets_mut(&mut self) -> Vec<&mut String>;

    /// Stored checksum, hex encoded.
    fn checksum(&self) -> &str;

    /// Replace the stored checksum.
    fn set_checksum_value(&mut self, checksum: String);

    /// Remove the credentials entirely.
    fn scrub(&mut self);

    /// Whether any non-empty secret is present.
    fn has_credentials(&self) -> bool {
        self.secrets().iter().any(|secret| !secret.is_empty())
    }

    /// Encrypt every secret with `transform`.
    fn encrypt(&mut self, transform: CredentialTransform<'_>) -> Result<(), StorageError> {
        for secret in self.secrets_mut() {
            if secret.is_empty() {
                continue;
            }
            let ciphertext = transform(secret.as_bytes())?;
            *secret = hex::encode(ciphertext);
        }
        Ok(())
    }

    /// Decrypt every secret with `transform`.
    fn decrypt(&mut self, transform: CredentialTransform<'_>) -> Result<(), StorageError> {
        for secret in self.secrets_mut() {
            if secret.is_empty() {
                continue;
            }
            let ciphertext = hex::decode(secret.as_str())
                .map_err(|e| StorageError::Crypto(format!("credential is not ciphertext: {e}")))?;
            let plaintext = transform(&ciphertext)?;
            *secret = String::from_utf8(plaintext)
                .map_err(|e| StorageError::Crypto(format!("credential is not utf-8: {e}")))?;
        }
        Ok(())
    }
}

/// Capability of objects carrying a signable integrity value.
pub trait Integral {
    /// Payload covered by the integrity value. Labels are never part of it.
    fn integral_data(&self) -> Vec<u8>;

    /// Stored integrity value.
    fn integrity(&self) -> &[u8];

    /// Replace the stored integrity value.
    fn set_integrity(&mut self, integrity: Vec<u8>);
}

/// A stored resource.
pub trait Object: Send + Sync + fmt::Debug + Any {
    fn object_type(&self) -> ObjectType;

    fn base(&self) -> &Base;

    fn base_mut(&mut self) -> &mut Base;

    /// JSON view of the object; field criteria are evaluated against it.
    fn to_value(&self) -> Result<serde_json::Value, StorageError>;

    fn clone_object(&self) -> Box<dyn Object>;

    fn as_any(&self) -> &dyn Any;

    fn as_secured(&self) -> Option<&dyn Secured> {
        None
    }

    fn as_secured_mut(&mut self) -> Option<&mut dyn Secured> {
        None
    }

    fn as_integral(&self) -> Option<&dyn Integral> {
        None
    }

    fn as_integral_mut(&mut self) -> Option<&mut dyn Integral> {
        None
    }
}

impl Clone for Box<dyn Object> {
    fn clone(&self) -> Self {
        self.clone_object()
    }
}

impl dyn Object {
    pub fn id(&self) -> &str {
        &self.base().id
    }

    pub fn labels(&self) -> &Labels {
        &self.base().labels
    }

    /// Assign a fresh UUID when the object has no id yet.
    pub fn ensure_id(&mut self) -> &str {
        let base = self.base_mut();
        if base.id.is_empty() {
            base.id = uuid::Uuid::new_v4().to_string();
        }
        &self.base().id
    }

    /// Downcast to a concrete resource.
    pub fn downcast_ref<T: Object>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Bytes covered by the checksum: the JSON view with labels, checksum and
    /// integrity cleared. Object keys serialize sorted, so the output is stable.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, StorageError> {
        let mut copy = self.clone_object();
        copy.base_mut().labels.clear();
        if let Some(secured) = copy.as_secured_mut() {
            secured.set_checksum_value(String::new());
        }
        if let Some(integral) = copy.as_integral_mut() {
            integral.set_integrity(Vec::new());
        }
        Ok(serde_json::to_vec(&copy.to_value()?)?)
    }

    /// Compute and attach a checksum with `hash`.
    ///
    /// Returns `false` when the object is not Secured.
    pub fn set_checksum(&mut self, hash: impl Fn(&[u8]) -> Vec<u8>) -> Result<bool, StorageError> {
        if self.as_secured().is_none() {
            return Ok(false);
        }
        let checksum = hex::encode(hash(&self.canonical_bytes()?));
        if let Some(secured) = self.as_secured_mut() {
            secured.set_checksum_value(checksum);
        }
        Ok(true)
    }

    /// Recompute the checksum with `hash` and compare it with the stored one.
    ///
    /// Objects that are not Secured always validate.
    pub fn validate_checksum(&self, hash: impl Fn(&[u8]) -> Vec<u8>) -> Result<bool, StorageError> {
        let Some(secured) = self.as_secured() else {
            return Ok(true);
        };
        let expected = hex::encode(hash(&self.canonical_bytes()?));
        Ok(secured.checksum() == expected)
    }

    /// Scrub credentials if the object is Secured.
    pub fn scrub_credentials(&mut self) {
        if let Some(secured) = self.as_secured_mut() {
            secured.scrub();
        }
    }
}

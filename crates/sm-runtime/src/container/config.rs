//! # Service Manager Configuration
//!
//! Unified configuration for the storage core and its background tasks.
//!
//! ## Security Requirements
//!
//! - `encryption_secret` and `integrity_secret` MUST NOT be the defaults in
//!   production
//! - All timeouts and limits have sane defaults with override capability

use shared_crypto::Cipher;
use sm_02_storage::DEFAULT_LOCK_TIMEOUT;
use sm_03_notifications::{DEFAULT_CLEAN_INTERVAL, DEFAULT_KEEP_FOR, DEFAULT_QUEUE_SIZE};
use sm_telemetry::TelemetryConfig;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Development-only encryption secret. Rejected by `validate_for_production`.
pub const DEFAULT_ENCRYPTION_SECRET: &str = "insecure-development-encryption-secret";

/// Development-only integrity secret. Rejected by `validate_for_production`.
pub const DEFAULT_INTEGRITY_SECRET: &str = "insecure-development-integrity-secret";

/// Complete service manager configuration.
#[derive(Debug, Clone, Default)]
pub struct ServiceManagerConfig {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Notification configuration.
    pub notifications: NotificationConfig,
    /// Logging configuration.
    pub telemetry: TelemetryConfig,
    /// Refuse to start with insecure settings.
    pub production: bool,
}

impl ServiceManagerConfig {
    /// Load configuration from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `SM_ENCRYPTION_SECRET`, `SM_INTEGRITY_SECRET`: secrets
    /// - `SM_CIPHER`: `xchacha20poly1305` (default) or `aes256gcm`
    /// - `SM_INTEGRITY_ALGORITHM`: `hmac` (default) or `ed25519`
    /// - `SM_LOCK_TIMEOUT_MS`: key bootstrap lock timeout (default: 2000)
    /// - `SM_DECORATOR_ORDER`: comma separated, first is innermost
    ///   (default: `encryption,checksum,integrity`)
    /// - `SM_NOTIFICATION_QUEUE_SIZE`: per-consumer queue size (default: 100)
    /// - `SM_NOTIFICATION_KEEP_FOR_SECS`: retention (default: 43200)
    /// - `SM_NOTIFICATION_CLEAN_INTERVAL_SECS`: cleaner period (default: 3600)
    /// - `SM_BROKER_CACHE_TTL_SECS`: broker read cache TTL (default: 30)
    /// - `SM_PRODUCTION`: enforce `validate_for_production` at startup
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` with variables read through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self {
            telemetry: TelemetryConfig::from_lookup(&lookup),
            ..Self::default()
        };

        let storage = &mut config.storage;
        if let Some(secret) = lookup("SM_ENCRYPTION_SECRET") {
            storage.encryption_secret = secret;
        }
        if let Some(secret) = lookup("SM_INTEGRITY_SECRET") {
            storage.integrity_secret = secret;
        }
        if let Some(value) = lookup("SM_CIPHER") {
            storage.cipher = value
                .parse()
                .map_err(|_| ConfigError::invalid("SM_CIPHER", &value))?;
        }
        if let Some(value) = lookup("SM_INTEGRITY_ALGORITHM") {
            storage.integrity_algorithm = value.parse()?;
        }
        if let Some(value) = lookup("SM_LOCK_TIMEOUT_MS") {
            storage.lock_timeout = Duration::from_millis(parse("SM_LOCK_TIMEOUT_MS", &value)?);
        }
        if let Some(value) = lookup("SM_DECORATOR_ORDER") {
            storage.decorator_order = parse_decorator_order(&value)?;
        }
        if let Some(value) = lookup("SM_BROKER_CACHE_TTL_SECS") {
            storage.broker_cache_ttl =
                Duration::from_secs(parse("SM_BROKER_CACHE_TTL_SECS", &value)?);
        }

        let notifications = &mut config.notifications;
        if let Some(value) = lookup("SM_NOTIFICATION_QUEUE_SIZE") {
            notifications.queue_size = parse("SM_NOTIFICATION_QUEUE_SIZE", &value)?;
        }
        if let Some(value) = lookup("SM_NOTIFICATION_KEEP_FOR_SECS") {
            notifications.keep_for =
                Duration::from_secs(parse("SM_NOTIFICATION_KEEP_FOR_SECS", &value)?);
        }
        if let Some(value) = lookup("SM_NOTIFICATION_CLEAN_INTERVAL_SECS") {
            let secs: u64 = parse("SM_NOTIFICATION_CLEAN_INTERVAL_SECS", &value)?;
            if secs == 0 {
                return Err(ConfigError::invalid("SM_NOTIFICATION_CLEAN_INTERVAL_SECS", &value));
            }
            notifications.clean_interval = Duration::from_secs(secs);
        }

        config.production = lookup("SM_PRODUCTION")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(false);
        Ok(config)
    }

    /// Validate configuration for production readiness.
    ///
    /// # Returns
    ///
    /// Returns `Err` if:
    /// - either secret is empty or the development default
    /// - the decorator order is empty
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        let storage = &self.storage;
        if storage.encryption_secret.is_empty()
            || storage.encryption_secret == DEFAULT_ENCRYPTION_SECRET
        {
            return Err(ConfigError::InsecureSecret("SM_ENCRYPTION_SECRET"));
        }
        if storage.integrity_secret.is_empty()
            || storage.integrity_secret == DEFAULT_INTEGRITY_SECRET
        {
            return Err(ConfigError::InsecureSecret("SM_INTEGRITY_SECRET"));
        }
        if storage.decorator_order.is_empty() {
            return Err(ConfigError::NoDecorators);
        }
        Ok(())
    }
}

fn parse<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, value))
}

fn parse_decorator_order(value: &str) -> Result<Vec<DecoratorKind>, ConfigError> {
    let mut order = Vec::new();
    for name in value.split(',').map(str::trim).filter(|name| !name.is_empty()) {
        let kind: DecoratorKind = name.parse()?;
        if order.contains(&kind) {
            return Err(ConfigError::invalid("SM_DECORATOR_ORDER", value));
        }
        order.push(kind);
    }
    Ok(order)
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A secret is missing or left at its development default.
    #[error(
        "SECURITY VIOLATION: {0} is empty or the development default. \
         Set it in the environment before starting in production."
    )]
    InsecureSecret(&'static str),

    /// The decorator stack is empty.
    #[error("SECURITY VIOLATION: no storage decorators configured")]
    NoDecorators,

    /// A variable could not be parsed.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    /// Unknown decorator name in `SM_DECORATOR_ORDER`.
    #[error("unknown decorator {0:?}; expected encryption, checksum or integrity")]
    UnknownDecorator(String),

    /// Unknown integrity algorithm.
    #[error("unknown integrity algorithm {0:?}; expected hmac or ed25519")]
    UnknownIntegrityAlgorithm(String),
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str) -> Self {
        ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }
    }
}

/// One layer of the storage decorator stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoratorKind {
    Encryption,
    Checksum,
    Integrity,
}

impl FromStr for DecoratorKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "encryption" => Ok(DecoratorKind::Encryption),
            "checksum" => Ok(DecoratorKind::Checksum),
            "integrity" => Ok(DecoratorKind::Integrity),
            other => Err(ConfigError::UnknownDecorator(other.to_string())),
        }
    }
}

impl fmt::Display for DecoratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DecoratorKind::Encryption => "encryption",
            DecoratorKind::Checksum => "checksum",
            DecoratorKind::Integrity => "integrity",
        })
    }
}

/// Integrity processor selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IntegrityAlgorithm {
    /// HMAC-SHA256 keyed with the integrity secret
    #[default]
    Hmac,
    /// Ed25519 signatures with a key derived from the integrity secret
    Ed25519,
}

impl FromStr for IntegrityAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hmac" | "hmac-sha256" => Ok(IntegrityAlgorithm::Hmac),
            "ed25519" => Ok(IntegrityAlgorithm::Ed25519),
            other => Err(ConfigError::UnknownIntegrityAlgorithm(other.to_string())),
        }
    }
}

/// Storage configuration.
#[derive(Clone)]
pub struct StorageConfig {
    /// Secret the master key is derived from.
    pub encryption_secret: String,
    /// Secret the integrity key is derived from.
    pub integrity_secret: String,
    /// AEAD used for credentials.
    pub cipher: Cipher,
    /// Integrity processor.
    pub integrity_algorithm: IntegrityAlgorithm,
    /// Bound on waiting for the key bootstrap lock.
    pub lock_timeout: Duration,
    /// Decorators applied to the raw repository, first is innermost.
    pub decorator_order: Vec<DecoratorKind>,
    /// Time-to-live of cached broker lookups.
    pub broker_cache_ttl: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            encryption_secret: DEFAULT_ENCRYPTION_SECRET.to_string(),
            integrity_secret: DEFAULT_INTEGRITY_SECRET.to_string(),
            cipher: Cipher::default(),
            integrity_algorithm: IntegrityAlgorithm::default(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            decorator_order: vec![
                DecoratorKind::Encryption,
                DecoratorKind::Checksum,
                DecoratorKind::Integrity,
            ],
            broker_cache_ttl: Duration::from_secs(30),
        }
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("encryption_secret", &"<redacted>")
            .field("integrity_secret", &"<redacted>")
            .field("cipher", &self.cipher)
            .field("integrity_algorithm", &self.integrity_algorithm)
            .field("lock_timeout", &self.lock_timeout)
            .field("decorator_order", &self.decorator_order)
            .field("broker_cache_ttl", &self.broker_cache_ttl)
            .finish()
    }
}

/// Notification configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    /// Per-consumer queue size.
    pub queue_size: usize,
    /// Retention of notification records.
    pub keep_for: Duration,
    /// Time between cleaner runs.
    pub clean_interval: Duration,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            queue_size: DEFAULT_QUEUE_SIZE,
            keep_for: DEFAULT_KEEP_FOR,
            clean_interval: DEFAULT_CLEAN_INTERVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServiceManagerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceManagerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_fail_production_validation() {
        let config = load(&[]).unwrap();
        assert_eq!(
            config.validate_for_production(),
            Err(ConfigError::InsecureSecret("SM_ENCRYPTION_SECRET"))
        );
        assert!(!config.production);
    }

    #[test]
    fn test_secrets_from_env_pass_validation() {
        let config = load(&[
            ("SM_ENCRYPTION_SECRET", "a-real-secret"),
            ("SM_INTEGRITY_SECRET", "another-real-secret"),
        ])
        .unwrap();
        assert!(config.validate_for_production().is_ok());
    }

    #[test]
    fn test_decorator_order_parsed() {
        let config = load(&[("SM_DECORATOR_ORDER", "integrity, encryption")]).unwrap();
        assert_eq!(
            config.storage.decorator_order,
            vec![DecoratorKind::Integrity, DecoratorKind::Encryption]
        );

        assert_eq!(
            load(&[("SM_DECORATOR_ORDER", "encryption,compression")]).unwrap_err(),
            ConfigError::UnknownDecorator("compression".to_string())
        );
        assert!(matches!(
            load(&[("SM_DECORATOR_ORDER", "checksum,checksum")]).unwrap_err(),
            ConfigError::InvalidValue { key: "SM_DECORATOR_ORDER", .. }
        ));
    }

    #[test]
    fn test_numeric_overrides() {
        let config = load(&[
            ("SM_LOCK_TIMEOUT_MS", "250"),
            ("SM_NOTIFICATION_QUEUE_SIZE", "0"),
            ("SM_NOTIFICATION_KEEP_FOR_SECS", "60"),
            ("SM_NOTIFICATION_CLEAN_INTERVAL_SECS", "5"),
        ])
        .unwrap();
        assert_eq!(config.storage.lock_timeout, Duration::from_millis(250));
        assert_eq!(config.notifications.queue_size, 0);
        assert_eq!(config.notifications.keep_for, Duration::from_secs(60));
        assert_eq!(config.notifications.clean_interval, Duration::from_secs(5));

        assert_eq!(
            load(&[("SM_LOCK_TIMEOUT_MS", "soon")]).unwrap_err(),
            ConfigError::InvalidValue {
                key: "SM_LOCK_TIMEOUT_MS",
                value: "soon".to_string(),
            }
        );
        assert!(load(&[("SM_NOTIFICATION_CLEAN_INTERVAL_SECS", "0")]).is_err());
    }

    #[test]
    fn test_algorithm_selection() {
        let config = load(&[("SM_CIPHER", "aes-256-gcm"), ("SM_INTEGRITY_ALGORITHM", "ed25519")])
            .unwrap();
        assert_eq!(config.storage.cipher, Cipher::Aes256Gcm);
        assert_eq!(config.storage.integrity_algorithm, IntegrityAlgorithm::Ed25519);
        assert!(load(&[("SM_CIPHER", "rot13")]).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", StorageConfig::default());
        assert!(!rendered.contains(DEFAULT_ENCRYPTION_SECRET));
    }
}

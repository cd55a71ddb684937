//! Token configuration.
//!
//! # Example (TOML)
//!
//! ```toml
//! issuer = "https://api.example.com"
//! ttl = 60
//! refresh_ttl = "unlimited"
//! leeway = 30
//! persistent_claims = ["role"]
//!
//! [blacklist]
//! grace_period = 30
//!
//! [signing]
//! algorithm = "HS256"
//! secret = "change-me"
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::claims::names;
use crate::error::AuthError;
use crate::factory::{DEFAULT_ISSUER, DEFAULT_TTL};
use crate::signer::SigningAlgorithm;
use crate::validator::{DEFAULT_REFRESH_TTL, DEFAULT_REQUIRED_CLAIMS};

/// Root token configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct JwtConfig {
    /// Value of the default `iss` claim.
    pub issuer: String,

    /// Token lifetime in minutes. `"unlimited"` issues tokens without `exp`.
    #[serde(with = "minutes")]
    pub ttl: Option<u64>,

    /// How long after `iat` a token may still be refreshed, in minutes.
    /// `"unlimited"` removes the bound.
    #[serde(with = "minutes")]
    pub refresh_ttl: Option<u64>,

    /// Clock-skew tolerance in seconds for `nbf`/`iat`/`exp`.
    pub leeway: u64,

    /// Claims every payload must carry.
    pub required_claims: Vec<String>,

    /// Claims carried over from the old token on refresh.
    pub persistent_claims: Vec<String>,

    /// Emit the `prv` claim locking a token to its subject's provider.
    pub lock_subject: bool,

    /// Revocation settings.
    pub blacklist: BlacklistConfig,

    /// Signing algorithm and key material.
    pub signing: SigningConfig,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            issuer: DEFAULT_ISSUER.to_string(),
            ttl: Some(DEFAULT_TTL),
            refresh_ttl: Some(DEFAULT_REFRESH_TTL),
            leeway: 0,
            required_claims: DEFAULT_REQUIRED_CLAIMS.iter().map(|s| s.to_string()).collect(),
            persistent_claims: Vec::new(),
            lock_subject: true,
            blacklist: BlacklistConfig::default(),
            signing: SigningConfig::default(),
        }
    }
}

/// Revocation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BlacklistConfig {
    /// Whether revocation is active. Invalidation fails when it is not.
    pub enabled: bool,

    /// Seconds a rotated token stays usable after revocation.
    pub grace_period: u64,

    /// Claim used as the blacklist key.
    pub key: String,
}

impl Default for BlacklistConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            grace_period: 0,
            key: names::JWT_ID.to_string(),
        }
    }
}

/// Signing algorithm and key material.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// One of HS256/384/512, RS256/384/512, ES256/384.
    pub algorithm: String,

    /// Shared secret for HMAC algorithms.
    pub secret: Option<String>,

    /// PEM private key for RSA/EC algorithms.
    pub private_key: Option<String>,

    /// PEM public key for RSA/EC algorithms.
    pub public_key: Option<String>,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            algorithm: "HS256".to_string(),
            secret: None,
            private_key: None,
            public_key: None,
        }
    }
}

impl fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("SigningConfig")
            .field("algorithm", &self.algorithm)
            .field("secret", &redact(&self.secret))
            .field("private_key", &redact(&self.private_key))
            .field("public_key", &self.public_key.as_ref().map(|_| "[PEM]"))
            .finish()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),

    /// Configuration sources could not be read or deserialized.
    #[error("Failed to load configuration: {0}")]
    Load(String),
}

impl From<ConfigError> for AuthError {
    fn from(err: ConfigError) -> Self {
        AuthError::configuration(err.to_string())
    }
}

impl JwtConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The issuer is empty
    /// - `ttl` or `refresh_ttl` is zero
    /// - A required claim name or the blacklist key is empty
    /// - The signing algorithm is not supported
    ///
    /// Returns `ConfigError::Missing` if the key material the algorithm needs
    /// is not set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.is_empty() {
            return Err(ConfigError::InvalidValue(
                "issuer cannot be empty".to_string(),
            ));
        }

        if self.ttl == Some(0) {
            return Err(ConfigError::InvalidValue(
                "ttl must be > 0 or \"unlimited\"".to_string(),
            ));
        }

        if self.refresh_ttl == Some(0) {
            return Err(ConfigError::InvalidValue(
                "refresh_ttl must be > 0 or \"unlimited\"".to_string(),
            ));
        }

        if self.required_claims.iter().any(String::is_empty) {
            return Err(ConfigError::InvalidValue(
                "required_claims cannot contain empty names".to_string(),
            ));
        }

        if self.blacklist.key.is_empty() {
            return Err(ConfigError::InvalidValue(
                "blacklist.key cannot be empty".to_string(),
            ));
        }

        let algorithm: SigningAlgorithm = self.signing.algorithm.parse().map_err(|_| {
            ConfigError::InvalidValue(format!(
                "Invalid signing algorithm: '{}'. Must be one of HS256, HS384, HS512, RS256, RS384, RS512, ES256, ES384",
                self.signing.algorithm
            ))
        })?;

        if algorithm.is_hmac() {
            if self.signing.secret.as_deref().is_none_or(str::is_empty) {
                return Err(ConfigError::Missing(format!(
                    "signing.secret is required for {algorithm}"
                )));
            }
        } else {
            if self.signing.private_key.is_none() {
                return Err(ConfigError::Missing(format!(
                    "signing.private_key is required for {algorithm}"
                )));
            }
            if self.signing.public_key.is_none() {
                return Err(ConfigError::Missing(format!(
                    "signing.public_key is required for {algorithm}"
                )));
            }
        }

        Ok(())
    }

    /// The required claims actually enforced: `exp` is dropped when tokens
    /// are issued without expiry.
    #[must_use]
    pub fn effective_required_claims(&self) -> Vec<String> {
        self.required_claims
            .iter()
            .filter(|name| self.ttl.is_some() || name.as_str() != names::EXPIRATION)
            .cloned()
            .collect()
    }
}

/// (De)serializes an optional minute count where `None` is `"unlimited"`.
mod minutes {
    use std::fmt;

    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    const UNLIMITED: &str = "unlimited";

    pub fn serialize<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(minutes) => serializer.serialize_u64(*minutes),
            None => serializer.serialize_str(UNLIMITED),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        deserializer.deserialize_any(MinutesVisitor)
    }

    struct MinutesVisitor;

    impl<'de> Visitor<'de> for MinutesVisitor {
        type Value = Option<u64>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative number of minutes or \"unlimited\"")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            u64::try_from(v)
                .map(Some)
                .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            let v = v.trim();
            if v.eq_ignore_ascii_case(UNLIMITED) {
                return Ok(None);
            }
            v.parse::<u64>()
                .map(Some)
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
            deserializer.deserialize_any(self)
        }
    }
}

pub mod loader {
    use std::path::PathBuf;

    use config::{Config, Environment, File};

    use super::{ConfigError, JwtConfig};

    /// Default file looked up when no path is given.
    pub const DEFAULT_CONFIG_FILE: &str = "tokenwarden.toml";

    /// Loads configuration from an optional TOML file, then environment
    /// overrides, then validates it.
    ///
    /// Environment variables use the `TOKENWARDEN` prefix and `__` as the
    /// nesting separator, e.g. `TOKENWARDEN__BLACKLIST__GRACE_PERIOD=30`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Load` if a source cannot be read or
    /// deserialized, or the validation error otherwise.
    pub fn load_config(path: Option<&str>) -> Result<JwtConfig, ConfigError> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., TOKENWARDEN__TTL=unlimited
        builder = builder.add_source(
            Environment::with_prefix("TOKENWARDEN")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| ConfigError::Load(format!("config build error: {e}")))?;
        let merged: JwtConfig = cfg
            .try_deserialize()
            .map_err(|e| ConfigError::Load(format!("config deserialize error: {e}")))?;
        merged.validate()?;
        tracing::debug!(
            issuer = %merged.issuer,
            algorithm = %merged.signing.algorithm,
            blacklist_enabled = merged.blacklist.enabled,
            "Token configuration loaded"
        );
        Ok(merged)
    }
}

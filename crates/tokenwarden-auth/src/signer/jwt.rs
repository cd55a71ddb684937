//! JWS signer backed by `jsonwebtoken`.
//!
//! ## Supported Algorithms
//!
//! - **HS256/HS384/HS512**: HMAC with a shared secret
//! - **RS256/RS384/RS512**: RSA PKCS#1 v1.5 with PEM keys
//! - **ES256/ES384**: ECDSA on P-256/P-384 with PEM keys
//!
//! All of the library's own claim checks (`exp`, `nbf`, `aud`, required
//! claims) are switched off: the signer only proves authenticity.

use std::fmt;
use std::str::FromStr;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};

use super::{Signer, SignerError};
use crate::config::SigningConfig;

impl From<jsonwebtoken::errors::Error> for SignerError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => Self::InvalidSignature,
            ErrorKind::InvalidRsaKey(_)
            | ErrorKind::InvalidEcdsaKey
            | ErrorKind::InvalidKeyFormat => Self::invalid_key(err.to_string()),
            _ => Self::malformed(err.to_string()),
        }
    }
}

/// Signing algorithms accepted by [`JwtSigner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningAlgorithm {
    /// HMAC with SHA-256 (shared secret).
    HS256,
    /// HMAC with SHA-384.
    HS384,
    /// HMAC with SHA-512.
    HS512,
    /// RSA with SHA-256 (widely compatible).
    RS256,
    /// RSA with SHA-384.
    RS384,
    /// RSA with SHA-512.
    RS512,
    /// ECDSA with P-256 curve and SHA-256.
    ES256,
    /// ECDSA with P-384 curve and SHA-384.
    ES384,
}

impl SigningAlgorithm {
    /// Converts to the `jsonwebtoken` Algorithm type.
    #[must_use]
    pub fn to_jwt_algorithm(self) -> Algorithm {
        match self {
            Self::HS256 => Algorithm::HS256,
            Self::HS384 => Algorithm::HS384,
            Self::HS512 => Algorithm::HS512,
            Self::RS256 => Algorithm::RS256,
            Self::RS384 => Algorithm::RS384,
            Self::RS512 => Algorithm::RS512,
            Self::ES256 => Algorithm::ES256,
            Self::ES384 => Algorithm::ES384,
        }
    }

    /// Returns the algorithm name as used in JWT headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
        }
    }

    /// Returns `true` if this is an HMAC algorithm.
    #[must_use]
    pub fn is_hmac(&self) -> bool {
        matches!(self, Self::HS256 | Self::HS384 | Self::HS512)
    }

    /// Returns `true` if this is an RSA-based algorithm.
    #[must_use]
    pub fn is_rsa(&self) -> bool {
        matches!(self, Self::RS256 | Self::RS384 | Self::RS512)
    }

    /// Returns `true` if this is an EC-based algorithm.
    #[must_use]
    pub fn is_ec(&self) -> bool {
        matches!(self, Self::ES256 | Self::ES384)
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SigningAlgorithm {
    type Err = SignerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HS256" => Ok(Self::HS256),
            "HS384" => Ok(Self::HS384),
            "HS512" => Ok(Self::HS512),
            "RS256" => Ok(Self::RS256),
            "RS384" => Ok(Self::RS384),
            "RS512" => Ok(Self::RS512),
            "ES256" => Ok(Self::ES256),
            "ES384" => Ok(Self::ES384),
            other => Err(SignerError::unsupported_algorithm(other)),
        }
    }
}

/// Signs and verifies compact JWS tokens.
#[derive(Clone)]
pub struct JwtSigner {
    algorithm: SigningAlgorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtSigner {
    /// Creates an HMAC signer from a shared secret.
    ///
    /// # Errors
    ///
    /// Returns `SignerError::InvalidKey` if the algorithm is not HMAC or the
    /// secret is empty.
    pub fn hmac(algorithm: SigningAlgorithm, secret: &[u8]) -> Result<Self, SignerError> {
        if !algorithm.is_hmac() {
            return Err(SignerError::invalid_key(format!(
                "{algorithm} requires a key pair, not a shared secret"
            )));
        }
        if secret.is_empty() {
            return Err(SignerError::invalid_key("secret cannot be empty"));
        }

        Ok(Self::with_keys(
            algorithm,
            EncodingKey::from_secret(secret),
            DecodingKey::from_secret(secret),
        ))
    }

    /// Creates an asymmetric signer from PEM-encoded keys.
    ///
    /// # Errors
    ///
    /// Returns `SignerError::InvalidKey` if the algorithm is HMAC or either key
    /// cannot be parsed.
    pub fn from_pem(
        algorithm: SigningAlgorithm,
        private_pem: &[u8],
        public_pem: &[u8],
    ) -> Result<Self, SignerError> {
        let (encoding_key, decoding_key) = if algorithm.is_rsa() {
            (
                EncodingKey::from_rsa_pem(private_pem)?,
                DecodingKey::from_rsa_pem(public_pem)?,
            )
        } else if algorithm.is_ec() {
            (
                EncodingKey::from_ec_pem(private_pem)?,
                DecodingKey::from_ec_pem(public_pem)?,
            )
        } else {
            return Err(SignerError::invalid_key(format!(
                "{algorithm} uses a shared secret, not PEM keys"
            )));
        };

        Ok(Self::with_keys(algorithm, encoding_key, decoding_key))
    }

    /// Creates a signer from the signing section of the configuration.
    ///
    /// # Errors
    ///
    /// Returns `SignerError::UnsupportedAlgorithm` for an unknown algorithm
    /// name, and `SignerError::InvalidKey` when the key material required by
    /// the algorithm is missing or unusable.
    pub fn from_config(config: &SigningConfig) -> Result<Self, SignerError> {
        let algorithm: SigningAlgorithm = config.algorithm.parse()?;

        if algorithm.is_hmac() {
            let secret = config
                .secret
                .as_deref()
                .ok_or_else(|| SignerError::invalid_key("signing.secret is not set"))?;
            return Self::hmac(algorithm, secret.as_bytes());
        }

        let private_key = config
            .private_key
            .as_deref()
            .ok_or_else(|| SignerError::invalid_key("signing.private_key is not set"))?;
        let public_key = config
            .public_key
            .as_deref()
            .ok_or_else(|| SignerError::invalid_key("signing.public_key is not set"))?;
        Self::from_pem(algorithm, private_key.as_bytes(), public_key.as_bytes())
    }

    fn with_keys(
        algorithm: SigningAlgorithm,
        encoding_key: EncodingKey,
        decoding_key: DecodingKey,
    ) -> Self {
        let mut validation = Validation::new(algorithm.to_jwt_algorithm());
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        Self {
            algorithm,
            encoding_key,
            decoding_key,
            validation,
        }
    }

    /// Returns the signing algorithm.
    #[must_use]
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }
}

impl fmt::Debug for JwtSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSigner")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl Signer for JwtSigner {
    fn encode(&self, claims: &Map<String, Value>) -> Result<String, SignerError> {
        let header = Header::new(self.algorithm.to_jwt_algorithm());
        jsonwebtoken::encode(&header, claims, &self.encoding_key).map_err(|err| {
            match SignerError::from(err) {
                key @ SignerError::InvalidKey { .. } => key,
                other => SignerError::encoding(other.to_string()),
            }
        })
    }

    fn decode(&self, token: &str) -> Result<Map<String, Value>, SignerError> {
        let data =
            jsonwebtoken::decode::<Map<String, Value>>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}

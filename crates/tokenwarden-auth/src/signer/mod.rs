//! Wire-format signing seam.
//!
//! The core never parses or signs tokens itself. It hands the raw claim map to
//! a [`Signer`] on the way out and receives one back on the way in. The
//! [`JwtSigner`] implementation covers the common JWS algorithms.

mod jwt;

pub use jwt::{JwtSigner, SigningAlgorithm};

use serde_json::{Map, Value};

/// Errors a signer can report.
///
/// Malformed input and signature mismatch are kept apart so callers can log
/// them differently, even though both surface as `TokenInvalid`.
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    /// The input is not a well-formed token.
    #[error("Malformed token: {message}")]
    Malformed {
        /// Description of the malformation.
        message: String,
    },

    /// The token is well formed but its signature does not verify.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The claims could not be serialized or signed.
    #[error("Failed to encode token: {message}")]
    Encoding {
        /// Description of the encoding error.
        message: String,
    },

    /// The key material is unusable for the chosen algorithm.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of why the key is invalid.
        message: String,
    },

    /// The algorithm name is not one this signer supports.
    #[error("Unsupported algorithm: {algorithm}")]
    UnsupportedAlgorithm {
        /// The rejected algorithm name.
        algorithm: String,
    },
}

impl SignerError {
    /// Creates a new `Malformed` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Creates a new `Encoding` error.
    #[must_use]
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Creates a new `UnsupportedAlgorithm` error.
    #[must_use]
    pub fn unsupported_algorithm(algorithm: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm {
            algorithm: algorithm.into(),
        }
    }

    /// Returns `true` if the failure lies in the token rather than the signer setup.
    #[must_use]
    pub fn is_token_error(&self) -> bool {
        matches!(self, Self::Malformed { .. } | Self::InvalidSignature)
    }
}

/// Turns claim maps into wire tokens and back.
///
/// `decode` must verify authenticity before returning anything. It must not
/// apply temporal checks; those belong to the payload validator.
pub trait Signer: Send + Sync {
    /// Signs the claims and returns the wire token.
    ///
    /// # Errors
    ///
    /// Returns `SignerError::Encoding` or `SignerError::InvalidKey` on failure.
    fn encode(&self, claims: &Map<String, Value>) -> Result<String, SignerError>;

    /// Verifies a wire token and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns `SignerError::Malformed` for unparsable input and
    /// `SignerError::InvalidSignature` when verification fails.
    fn decode(&self, token: &str) -> Result<Map<String, Value>, SignerError>;
}

/// Shareable signer handle.
pub type DynSigner = std::sync::Arc<dyn Signer>;

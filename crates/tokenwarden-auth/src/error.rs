//! Token error types.
//!
//! This module defines all error types that can occur while issuing,
//! validating, refreshing, and revoking tokens.
//!
//! `TokenExpired` means "was valid, now stale" and invites a refresh;
//! `TokenInvalid` means "never valid" and must be rejected outright. Nothing
//! in this crate converts one into the other.

use std::fmt;

use tokenwarden_storage::StorageError;

use crate::signer::SignerError;

/// Errors that can occur during token operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A claim value failed its type-specific rule at construction.
    #[error("Invalid value provided for claim [{claim}]: {message}")]
    InvalidClaim {
        /// Name of the offending claim.
        claim: String,
        /// Description of why the value was rejected.
        message: String,
    },

    /// The token is structurally invalid: a required claim is missing, the
    /// wire format is malformed, or the signature does not verify.
    #[error("Token invalid: {message}")]
    TokenInvalid {
        /// Description of why the token is invalid.
        message: String,
        /// The signer failure behind this error, when there is one.
        #[source]
        source: Option<SignerError>,
    },

    /// The token has expired, or can no longer be refreshed.
    #[error("Token expired: {message}")]
    TokenExpired {
        /// Description of which temporal bound was crossed.
        message: String,
    },

    /// The token is valid but has been revoked.
    #[error("The token has been blacklisted")]
    TokenBlacklisted,

    /// A single-claim lookup found nothing.
    #[error("The claim [{claim}] does not exist on the payload")]
    ClaimNotFound {
        /// Name of the claim that was looked up.
        claim: String,
    },

    /// Operational misuse, such as invalidating with the blacklist disabled.
    #[error("{message}")]
    Jwt {
        /// Description of the misuse.
        message: String,
    },

    /// The blacklist storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The token configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidClaim` error.
    #[must_use]
    pub fn invalid_claim(claim: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidClaim {
            claim: claim.into(),
            message: message.into(),
        }
    }

    /// Creates a new `TokenInvalid` error without an underlying cause.
    #[must_use]
    pub fn token_invalid(message: impl Into<String>) -> Self {
        Self::TokenInvalid {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new `TokenInvalid` error caused by a signer failure.
    #[must_use]
    pub fn token_invalid_from(message: impl Into<String>, source: SignerError) -> Self {
        Self::TokenInvalid {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a new `TokenExpired` error.
    #[must_use]
    pub fn token_expired(message: impl Into<String>) -> Self {
        Self::TokenExpired {
            message: message.into(),
        }
    }

    /// Creates a new `ClaimNotFound` error.
    #[must_use]
    pub fn claim_not_found(claim: impl Into<String>) -> Self {
        Self::ClaimNotFound {
            claim: claim.into(),
        }
    }

    /// Creates a new generic `Jwt` error.
    #[must_use]
    pub fn jwt(message: impl Into<String>) -> Self {
        Self::Jwt {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns `true` if the error describes the token itself being unusable.
    #[must_use]
    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            Self::TokenInvalid { .. } | Self::TokenExpired { .. } | Self::TokenBlacklisted
        )
    }

    /// Returns `true` if the caller sent something that can never succeed as is.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidClaim { .. }
                | Self::TokenInvalid { .. }
                | Self::TokenExpired { .. }
                | Self::TokenBlacklisted
                | Self::ClaimNotFound { .. }
        )
    }

    /// Returns `true` if the failure lies with a collaborator or the setup.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Configuration { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidClaim { .. } | Self::ClaimNotFound { .. } => ErrorCategory::Claims,
            Self::TokenInvalid { .. } | Self::TokenExpired { .. } | Self::TokenBlacklisted => {
                ErrorCategory::Token
            }
            Self::Jwt { .. } => ErrorCategory::Usage,
            Self::Storage(_) => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
        }
    }
}

/// Categories of token errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Claim construction or lookup errors.
    Claims,
    /// Token validation errors (invalid, expired, revoked).
    Token,
    /// API misuse.
    Usage,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Claims => write!(f, "claims"),
            Self::Token => write!(f, "token"),
            Self::Usage => write!(f, "usage"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::invalid_claim("exp", "must be a unix timestamp");
        assert_eq!(
            err.to_string(),
            "Invalid value provided for claim [exp]: must be a unix timestamp"
        );

        let err = AuthError::token_expired("Token has expired");
        assert_eq!(err.to_string(), "Token expired: Token has expired");

        assert_eq!(
            AuthError::TokenBlacklisted.to_string(),
            "The token has been blacklisted"
        );

        let err = AuthError::jwt("A token is required");
        assert_eq!(err.to_string(), "A token is required");
    }

    #[test]
    fn test_token_invalid_preserves_signer_cause() {
        let err = AuthError::token_invalid_from("Could not decode token", SignerError::InvalidSignature);
        let source = err.source().expect("source should be attached");
        assert_eq!(source.to_string(), "Invalid signature");

        let err = AuthError::token_invalid("missing claims");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_error_predicates() {
        assert!(AuthError::TokenBlacklisted.is_token_error());
        assert!(AuthError::token_expired("x").is_token_error());
        assert!(!AuthError::claim_not_found("sub").is_token_error());

        assert!(AuthError::invalid_claim("exp", "x").is_client_error());
        assert!(!AuthError::invalid_claim("exp", "x").is_server_error());

        let err: AuthError = StorageError::connection_error("down").into();
        assert!(err.is_server_error());
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            AuthError::claim_not_found("foo").category(),
            ErrorCategory::Claims
        );
        assert_eq!(AuthError::TokenBlacklisted.category(), ErrorCategory::Token);
        assert_eq!(AuthError::jwt("x").category(), ErrorCategory::Usage);
        assert_eq!(
            AuthError::configuration("x").category(),
            ErrorCategory::Configuration
        );
        assert_eq!(ErrorCategory::Infrastructure.to_string(), "infrastructure");
    }
}

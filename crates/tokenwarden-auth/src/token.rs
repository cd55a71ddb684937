//! Wire token value object.

use std::fmt;
use std::str::FromStr;

use crate::AuthResult;
use crate::error::AuthError;

/// An opaque three-segment bearer token.
///
/// Construction only checks the shape (`header.payload.signature`, each a
/// non-empty base64url string). Verification is the signer's job.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    /// Wraps a wire token after checking its shape.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenInvalid` if the value does not have exactly
    /// three non-empty base64url segments.
    pub fn new(value: impl Into<String>) -> AuthResult<Self> {
        let value = value.into();
        let segments: Vec<&str> = value.split('.').collect();

        if segments.len() != 3 {
            return Err(AuthError::token_invalid("Wrong number of segments"));
        }
        if segments
            .iter()
            .any(|segment| segment.is_empty() || !segment.bytes().all(is_base64url))
        {
            return Err(AuthError::token_invalid("Malformed token"));
        }

        Ok(Self(value))
    }

    /// Returns the token string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

fn is_base64url(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_'
}

impl FromStr for Token {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Never prints the token itself.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(..)")
    }
}

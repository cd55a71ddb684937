//! Single typed claims.

use std::fmt;

use serde_json::Value;
use time::{Duration, OffsetDateTime};

use crate::AuthResult;
use crate::error::AuthError;

/// The claim names this crate knows how to validate.
///
/// Anything else is carried as [`ClaimKind::Custom`] with no value rule
/// beyond being JSON.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClaimKind {
    /// `sub`: the subject the token is about.
    Subject,
    /// `iss`: who issued the token.
    Issuer,
    /// `aud`: intended recipients (string or array of strings).
    Audience,
    /// `iat`: when the token was issued (unix seconds).
    IssuedAt,
    /// `exp`: when the token stops being valid (unix seconds).
    Expiration,
    /// `nbf`: when the token starts being valid (unix seconds).
    NotBefore,
    /// `jti`: unique token identifier, used as the revocation key.
    JwtId,
    /// Any other claim name.
    Custom(String),
}

impl ClaimKind {
    /// Maps a claim name to its kind. Unknown names become `Custom`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "sub" => Self::Subject,
            "iss" => Self::Issuer,
            "aud" => Self::Audience,
            "iat" => Self::IssuedAt,
            "exp" => Self::Expiration,
            "nbf" => Self::NotBefore,
            "jti" => Self::JwtId,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Returns the claim name as it appears on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Subject => "sub",
            Self::Issuer => "iss",
            Self::Audience => "aud",
            Self::IssuedAt => "iat",
            Self::Expiration => "exp",
            Self::NotBefore => "nbf",
            Self::JwtId => "jti",
            Self::Custom(name) => name,
        }
    }

    /// Returns `true` for `iat`, `exp` and `nbf`.
    #[must_use]
    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::IssuedAt | Self::Expiration | Self::NotBefore)
    }

    /// Returns `true` for every kind except `Custom`.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }

    /// Checks `value` against this kind's rule and returns it normalized.
    fn validate(&self, value: Value) -> AuthResult<Value> {
        match self {
            Self::IssuedAt | Self::Expiration | Self::NotBefore => {
                normalize_timestamp(self.as_str(), &value)
            }
            Self::Subject | Self::Issuer | Self::JwtId => {
                if value.is_null() {
                    return Err(AuthError::invalid_claim(self.as_str(), "value cannot be null"));
                }
                Ok(value)
            }
            Self::Audience => match &value {
                Value::String(_) => Ok(value),
                Value::Array(items) if items.iter().all(Value::is_string) => Ok(value),
                _ => Err(AuthError::invalid_claim(
                    "aud",
                    "must be a string or an array of strings",
                )),
            },
            Self::Custom(name) => {
                if name.is_empty() {
                    return Err(AuthError::invalid_claim(name.as_str(), "claim name cannot be empty"));
                }
                Ok(value)
            }
        }
    }
}

impl fmt::Display for ClaimKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Temporal claims are whole unix seconds. Fractional seconds are floored.
fn normalize_timestamp(name: &str, value: &Value) -> AuthResult<Value> {
    let Value::Number(number) = value else {
        return Err(AuthError::invalid_claim(
            name,
            "must be a numeric unix timestamp",
        ));
    };

    if let Some(seconds) = number.as_i64() {
        return Ok(Value::from(seconds));
    }

    match number.as_f64() {
        Some(f) if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
            Ok(Value::from(f.floor() as i64))
        }
        _ => Err(AuthError::invalid_claim(
            name,
            "timestamp is out of range",
        )),
    }
}

/// A point in time for temporal claims, in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix seconds.
    #[must_use]
    pub fn from_unix(seconds: i64) -> Self {
        Self(seconds)
    }

    /// Creates a timestamp `offset` away from `now`.
    #[must_use]
    pub fn offset(now: OffsetDateTime, offset: Duration) -> Self {
        Self(now.unix_timestamp().saturating_add(offset.whole_seconds()))
    }

    /// Returns the unix seconds.
    #[must_use]
    pub fn unix(self) -> i64 {
        self.0
    }
}

impl From<i64> for Timestamp {
    fn from(seconds: i64) -> Self {
        Self(seconds)
    }
}

impl From<OffsetDateTime> for Timestamp {
    fn from(at: OffsetDateTime) -> Self {
        Self(at.unix_timestamp())
    }
}

/// A named claim whose value has passed its kind's rule.
///
/// Claims are immutable; [`Claim::with_value`] produces a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
    kind: ClaimKind,
    value: Value,
}

impl Claim {
    /// Builds a claim from a name and raw value.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidClaim` if the value violates the rule for
    /// the name's kind.
    pub fn new(name: &str, value: impl Into<Value>) -> AuthResult<Self> {
        Self::of(ClaimKind::from_name(name), value)
    }

    /// Builds a claim of a known kind.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidClaim` if the value violates the kind's rule.
    pub fn of(kind: ClaimKind, value: impl Into<Value>) -> AuthResult<Self> {
        let value = kind.validate(value.into())?;
        Ok(Self { kind, value })
    }

    /// Builds a `sub` claim.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidClaim` if the value is null.
    pub fn subject(value: impl Into<Value>) -> AuthResult<Self> {
        Self::of(ClaimKind::Subject, value)
    }

    /// Builds an `iss` claim.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidClaim` if the value is null.
    pub fn issuer(value: impl Into<Value>) -> AuthResult<Self> {
        Self::of(ClaimKind::Issuer, value)
    }

    /// Builds an `aud` claim.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidClaim` unless the value is a string or an
    /// array of strings.
    pub fn audience(value: impl Into<Value>) -> AuthResult<Self> {
        Self::of(ClaimKind::Audience, value)
    }

    /// Builds a `jti` claim.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidClaim` if the value is null.
    pub fn jwt_id(value: impl Into<Value>) -> AuthResult<Self> {
        Self::of(ClaimKind::JwtId, value)
    }

    /// Builds an `iat` claim.
    #[must_use]
    pub fn issued_at(at: impl Into<Timestamp>) -> Self {
        Self::temporal(ClaimKind::IssuedAt, at.into())
    }

    /// Builds an `exp` claim.
    #[must_use]
    pub fn expiration(at: impl Into<Timestamp>) -> Self {
        Self::temporal(ClaimKind::Expiration, at.into())
    }

    /// Builds an `nbf` claim.
    #[must_use]
    pub fn not_before(at: impl Into<Timestamp>) -> Self {
        Self::temporal(ClaimKind::NotBefore, at.into())
    }

    fn temporal(kind: ClaimKind, at: Timestamp) -> Self {
        Self {
            kind,
            value: Value::from(at.unix()),
        }
    }

    /// Returns the claim kind.
    #[must_use]
    pub fn kind(&self) -> &ClaimKind {
        &self.kind
    }

    /// Returns the claim name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.kind.as_str()
    }

    /// Returns the validated value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Consumes the claim, returning its value.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Returns the unix seconds of a temporal claim, `None` for other kinds.
    #[must_use]
    pub fn as_timestamp(&self) -> Option<i64> {
        if self.kind.is_temporal() {
            self.value.as_i64()
        } else {
            None
        }
    }

    /// Returns a new claim of the same kind carrying `value`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidClaim` if the value violates the kind's rule.
    pub fn with_value(&self, value: impl Into<Value>) -> AuthResult<Self> {
        Self::of(self.kind.clone(), value)
    }

    /// Compares the claim value with `value`.
    ///
    /// Strict comparison is JSON equality. Loose comparison also treats a
    /// number and its numeric string as equal, and booleans as equal to
    /// `"true"`/`"1"` and `"false"`/`"0"`/`""`.
    #[must_use]
    pub fn matches(&self, value: &Value, strict: bool) -> bool {
        if strict {
            &self.value == value
        } else {
            loose_eq(&self.value, value)
        }
    }
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name(), self.value)
    }
}

fn loose_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }

    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            match (s.trim().parse::<f64>(), n.as_f64()) {
                (Ok(parsed), Some(number)) => parsed == number,
                _ => false,
            }
        }
        (Value::Bool(flag), other) | (other, Value::Bool(flag)) => {
            as_flag(other) == Some(*flag)
        }
        _ => false,
    }
}

fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::String(s) => match s.as_str() {
            "true" | "1" => Some(true),
            "false" | "0" | "" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::Null => Some(false),
        _ => None,
    }
}

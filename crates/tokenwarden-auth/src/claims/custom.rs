//! Caller-supplied claims passed into token issuance and refresh.

use serde_json::{Map, Value};

use super::ClaimSet;
use crate::AuthResult;

/// Extra claims a caller wants on a token.
///
/// Values are validated only when they are turned into a [`ClaimSet`], so a
/// bad value surfaces as `InvalidClaim` at issuance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomClaims {
    claims: Map<String, Value>,
}

impl CustomClaims {
    /// Creates an empty set of custom claims.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a claim, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Adds a claim, replacing any previous value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.claims.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// Validates the claims and returns them as a claim set.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidClaim` for the first invalid value.
    pub fn to_claim_set(&self) -> AuthResult<ClaimSet> {
        ClaimSet::from_values(self.claims.iter().map(|(k, v)| (k.as_str(), v.clone())))
    }

    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.claims
    }
}

impl From<Map<String, Value>> for CustomClaims {
    fn from(claims: Map<String, Value>) -> Self {
        Self { claims }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for CustomClaims {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        Self {
            claims: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

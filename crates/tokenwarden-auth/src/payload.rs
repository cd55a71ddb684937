//! Validated, read-only claim payloads.
//!
//! A [`Payload`] can only be obtained by running a [`PayloadValidator`] over a
//! [`ClaimSet`], and exposes no way to change its claims afterwards. To derive
//! a different payload, take the claims back with [`Payload::into_claims`] and
//! build a new one.

use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::AuthResult;
use crate::claims::{Claim, ClaimSet, names};
use crate::error::AuthError;
use crate::subject::provider_hash;
use crate::validator::PayloadValidator;

/// The full, validated set of claims carried by a token.
#[derive(Debug, Clone)]
pub struct Payload {
    claims: ClaimSet,
    refresh_flow: bool,
}

impl Payload {
    /// Validates `claims` and wraps them.
    ///
    /// # Errors
    ///
    /// Propagates the validator's `TokenInvalid` or `TokenExpired` unchanged.
    pub fn new(
        claims: ClaimSet,
        validator: &PayloadValidator,
        refresh_flow: bool,
    ) -> AuthResult<Self> {
        validator.check(&claims, refresh_flow)?;
        Ok(Self {
            claims,
            refresh_flow,
        })
    }

    /// Like [`Payload::new`] but validates as of `now` (unix seconds).
    ///
    /// # Errors
    ///
    /// Propagates the validator's `TokenInvalid` or `TokenExpired` unchanged.
    pub fn new_at(
        claims: ClaimSet,
        validator: &PayloadValidator,
        refresh_flow: bool,
        now: i64,
    ) -> AuthResult<Self> {
        validator.check_at(&claims, refresh_flow, now)?;
        Ok(Self {
            claims,
            refresh_flow,
        })
    }

    /// Returns a claim's raw value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.value(name)
    }

    /// Returns a claim's raw value, failing if it is absent.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ClaimNotFound` if the payload has no such claim.
    pub fn require(&self, name: &str) -> AuthResult<&Value> {
        self.get(name)
            .ok_or_else(|| AuthError::claim_not_found(name))
    }

    /// Looks up several claims at once, `None` for each one absent.
    pub fn get_many<'a, I>(&self, names: I) -> Vec<Option<&Value>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names.into_iter().map(|name| self.get(name)).collect()
    }

    /// Returns the typed claim.
    #[must_use]
    pub fn claim(&self, name: &str) -> Option<&Claim> {
        self.claims.get(name)
    }

    /// Returns the underlying claim set.
    #[must_use]
    pub fn claims(&self) -> &ClaimSet {
        &self.claims
    }

    /// Returns every claim as a name to raw value map.
    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        self.claims.to_map()
    }

    /// Consumes the payload, returning its claims.
    #[must_use]
    pub fn into_claims(self) -> ClaimSet {
        self.claims
    }

    /// Returns `true` if the payload was validated in refresh mode.
    #[must_use]
    pub fn is_refresh_flow(&self) -> bool {
        self.refresh_flow
    }

    #[must_use]
    pub fn subject(&self) -> Option<&Value> {
        self.get(names::SUBJECT)
    }

    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        self.get(names::ISSUER).and_then(Value::as_str)
    }

    #[must_use]
    pub fn audience(&self) -> Option<&Value> {
        self.get(names::AUDIENCE)
    }

    #[must_use]
    pub fn issued_at(&self) -> Option<i64> {
        self.timestamp(names::ISSUED_AT)
    }

    #[must_use]
    pub fn expiration(&self) -> Option<i64> {
        self.timestamp(names::EXPIRATION)
    }

    #[must_use]
    pub fn not_before(&self) -> Option<i64> {
        self.timestamp(names::NOT_BEFORE)
    }

    #[must_use]
    pub fn jwt_id(&self) -> Option<&Value> {
        self.get(names::JWT_ID)
    }

    /// Returns the provider lock hash (`prv`), if any.
    #[must_use]
    pub fn provider(&self) -> Option<&str> {
        self.get(names::PROVIDER).and_then(Value::as_str)
    }

    fn timestamp(&self, name: &str) -> Option<i64> {
        self.claims.get(name).and_then(Claim::as_timestamp)
    }

    /// Returns `true` if the payload is not locked to a provider, or is
    /// locked to `provider`.
    #[must_use]
    pub fn matches_provider(&self, provider: &str) -> bool {
        match self.get(names::PROVIDER) {
            None => true,
            Some(prv) => prv.as_str() == Some(provider_hash(provider).as_str()),
        }
    }

    /// Returns `true` if a claim with this name exists.
    #[must_use]
    pub fn has_key(&self, name: &str) -> bool {
        self.claims.contains(name)
    }

    /// Returns `true` if the payload holds exactly this claim.
    #[must_use]
    pub fn has(&self, claim: &Claim) -> bool {
        self.claims
            .get(claim.name())
            .is_some_and(|held| held.matches(claim.value(), true))
    }

    /// Returns `true` if every given claim is present and matches.
    ///
    /// Loose matching treats `1` and `"1"` as equal; see [`Claim::matches`].
    pub fn matches<'a, I>(&self, values: I, strict: bool) -> bool
    where
        I: IntoIterator<Item = (&'a str, &'a Value)>,
    {
        let mut values = values.into_iter().peekable();
        if values.peek().is_none() {
            return false;
        }

        values.all(|(name, value)| {
            self.claims
                .get(name)
                .is_some_and(|claim| claim.matches(value, strict))
        })
    }

    /// Strict form of [`Payload::matches`].
    pub fn matches_strict<'a, I>(&self, values: I) -> bool
    where
        I: IntoIterator<Item = (&'a str, &'a Value)>,
    {
        self.matches(values, true)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Returns the claims as a JSON object string.
    #[must_use]
    pub fn to_json(&self) -> String {
        Value::Object(self.to_map()).to_string()
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        self.to_map() == other.to_map()
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.claims.len()))?;
        for claim in &self.claims {
            map.serialize_entry(claim.name(), claim.value())?;
        }
        map.end()
    }
}

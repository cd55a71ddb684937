//! Builds the claim set for newly issued tokens.
//!
//! Claims are layered, each layer overriding the previous one by name:
//!
//! 1. defaults: `iss`, `iat`, `exp` (unless ttl is unlimited), `nbf`, `jti`
//! 2. subject: `sub`, and `prv` when subjects are locked to their provider
//! 3. the subject's own custom claims
//! 4. caller-supplied [`CustomClaims`]

use std::fmt;

use uuid::Uuid;

use crate::AuthResult;
use crate::claims::{Claim, ClaimSet, CustomClaims, names};
use crate::clock::DynClock;
use crate::payload::Payload;
use crate::subject::{Subject, provider_hash};
use crate::validator::PayloadValidator;

/// Default token lifetime in minutes.
pub const DEFAULT_TTL: u64 = 60;

/// Default `iss` value.
pub const DEFAULT_ISSUER: &str = "http://localhost";

/// Issues validated payloads.
#[derive(Clone)]
pub struct PayloadFactory {
    validator: PayloadValidator,
    clock: DynClock,
    issuer: String,
    ttl: Option<u64>,
    lock_subject: bool,
}

impl PayloadFactory {
    /// Creates a factory sharing the validator's clock, with a one hour ttl.
    #[must_use]
    pub fn new(validator: PayloadValidator) -> Self {
        let clock = validator.clock().clone();
        Self {
            validator,
            clock,
            issuer: DEFAULT_ISSUER.to_string(),
            ttl: Some(DEFAULT_TTL),
            lock_subject: true,
        }
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Sets the token lifetime in minutes; `None` issues tokens without `exp`.
    #[must_use]
    pub fn with_ttl(mut self, minutes: Option<u64>) -> Self {
        self.ttl = minutes;
        self
    }

    /// Whether to emit the `prv` provider lock claim.
    #[must_use]
    pub fn with_lock_subject(mut self, lock: bool) -> Self {
        self.lock_subject = lock;
        self
    }

    #[must_use]
    pub fn validator(&self) -> &PayloadValidator {
        &self.validator
    }

    #[must_use]
    pub fn clock(&self) -> &DynClock {
        &self.clock
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn ttl(&self) -> Option<u64> {
        self.ttl
    }

    #[must_use]
    pub fn lock_subject(&self) -> bool {
        self.lock_subject
    }

    /// The default claim layer as of now, with a fresh `jti`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidClaim` only if the issuer is unusable.
    pub fn default_claims(&self) -> AuthResult<ClaimSet> {
        let now = self.clock.timestamp();
        let mut claims = ClaimSet::new()
            .with(Claim::issuer(self.issuer.as_str())?)
            .with(Claim::issued_at(now));
        if let Some(exp) = self.expiration_from(now) {
            claims.put(Claim::expiration(exp));
        }
        claims.put(Claim::not_before(now));
        claims.put(Claim::jwt_id(Uuid::new_v4().to_string())?);
        Ok(claims)
    }

    /// The subject layer: `sub`, `prv`, then the subject's own claims.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidClaim` if the identifier is null or a
    /// subject claim fails its rule.
    pub fn subject_claims<S: Subject + ?Sized>(&self, subject: &S) -> AuthResult<ClaimSet> {
        let mut claims = ClaimSet::new().with(Claim::subject(subject.identifier())?);
        if self.lock_subject {
            claims.put(Claim::new(names::PROVIDER, provider_hash(subject.provider()))?);
        }
        claims.merge(ClaimSet::from_map(subject.custom_claims())?);
        Ok(claims)
    }

    /// Builds and validates the payload for a new token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidClaim` for a bad claim value, or the
    /// validator's error if the merged claims do not validate.
    pub fn for_subject<S: Subject + ?Sized>(
        &self,
        subject: &S,
        custom: &CustomClaims,
    ) -> AuthResult<Payload> {
        let mut claims = self.default_claims()?;
        claims.merge(self.subject_claims(subject)?);
        claims.merge(custom.to_claim_set()?);
        self.make(claims, false)
    }

    /// Validates an already assembled claim set.
    ///
    /// # Errors
    ///
    /// Propagates the validator's `TokenInvalid` or `TokenExpired`.
    pub fn make(&self, claims: ClaimSet, refresh_flow: bool) -> AuthResult<Payload> {
        Payload::new(claims, &self.validator, refresh_flow)
    }

    /// `exp` for a token issued at `now`, or `None` when ttl is unlimited.
    #[must_use]
    pub fn expiration_from(&self, now: i64) -> Option<i64> {
        self.ttl_seconds().map(|ttl| now.saturating_add(ttl))
    }

    /// `exp` for the token that replaces one expiring at `old_exp`.
    ///
    /// Moves the old expiry forward by whole ttl steps, the fewest (at least
    /// one) that put it after `now`. Without an old expiry, starts from `now`.
    #[must_use]
    pub fn next_expiration(&self, old_exp: Option<i64>, now: i64) -> Option<i64> {
        let ttl = self.ttl_seconds()?;
        let Some(exp) = old_exp else {
            return Some(now.saturating_add(ttl));
        };
        if ttl == 0 {
            return Some(exp.max(now));
        }

        if exp.saturating_add(ttl) > now {
            return Some(exp.saturating_add(ttl));
        }

        // Widened so a far-past exp cannot overflow.
        let (exp, now, ttl) = (i128::from(exp), i128::from(now), i128::from(ttl));
        let next = exp + ((now - exp) / ttl + 1) * ttl;
        Some(i64::try_from(next).unwrap_or(i64::MAX))
    }

    fn ttl_seconds(&self) -> Option<i64> {
        self.ttl
            .map(|minutes| i64::try_from(minutes.saturating_mul(60)).unwrap_or(i64::MAX))
    }
}

impl fmt::Debug for PayloadFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadFactory")
            .field("validator", &self.validator)
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .field("lock_subject", &self.lock_subject)
            .finish_non_exhaustive()
    }
}

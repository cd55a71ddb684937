//! Structural and temporal payload validation.
//!
//! One validator, two modes. Normal mode checks `nbf`, `iat` and `exp`
//! against the clock with leeway. Refresh mode ignores `exp`/`nbf` and only
//! asks whether the token is still young enough (by `iat`) to be exchanged
//! for a new one.

use std::fmt;

use crate::AuthResult;
use crate::claims::{ClaimSet, names};
use crate::clock::DynClock;
use crate::error::AuthError;

/// Claims a payload must carry unless configured otherwise.
pub const DEFAULT_REQUIRED_CLAIMS: [&str; 6] = [
    names::ISSUER,
    names::ISSUED_AT,
    names::EXPIRATION,
    names::NOT_BEFORE,
    names::SUBJECT,
    names::JWT_ID,
];

/// Default refresh window: two weeks, in minutes.
pub const DEFAULT_REFRESH_TTL: u64 = 20_160;

/// Stateless payload checker built once from configuration.
#[derive(Clone)]
pub struct PayloadValidator {
    required_claims: Vec<String>,
    refresh_ttl: Option<u64>,
    leeway: u64,
    clock: DynClock,
}

impl PayloadValidator {
    /// Creates a validator with the default required claims, a two-week
    /// refresh window and no leeway.
    #[must_use]
    pub fn new(clock: DynClock) -> Self {
        Self {
            required_claims: DEFAULT_REQUIRED_CLAIMS.iter().map(|s| s.to_string()).collect(),
            refresh_ttl: Some(DEFAULT_REFRESH_TTL),
            leeway: 0,
            clock,
        }
    }

    /// Replaces the required-claims list.
    #[must_use]
    pub fn with_required_claims<I, S>(mut self, claims: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_claims = claims.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the refresh window in minutes; `None` allows refreshing forever.
    #[must_use]
    pub fn with_refresh_ttl(mut self, minutes: Option<u64>) -> Self {
        self.refresh_ttl = minutes;
        self
    }

    /// Sets the clock-skew tolerance in seconds.
    #[must_use]
    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway = seconds;
        self
    }

    #[must_use]
    pub fn required_claims(&self) -> &[String] {
        &self.required_claims
    }

    #[must_use]
    pub fn refresh_ttl(&self) -> Option<u64> {
        self.refresh_ttl
    }

    #[must_use]
    pub fn leeway(&self) -> u64 {
        self.leeway
    }

    #[must_use]
    pub fn clock(&self) -> &DynClock {
        &self.clock
    }

    /// Validates `claims` against the current time.
    ///
    /// # Errors
    ///
    /// See [`PayloadValidator::check_at`].
    pub fn check(&self, claims: &ClaimSet, refresh_flow: bool) -> AuthResult<()> {
        self.check_at(claims, refresh_flow, self.clock.timestamp())
    }

    /// Returns `true` if [`PayloadValidator::check`] would succeed.
    #[must_use]
    pub fn is_valid(&self, claims: &ClaimSet, refresh_flow: bool) -> bool {
        self.check(claims, refresh_flow).is_ok()
    }

    /// Validates `claims` as of `now` (unix seconds).
    ///
    /// # Errors
    ///
    /// - `TokenInvalid` if a required claim is missing, or (normal mode)
    ///   `nbf`/`iat` lie in the future
    /// - `TokenExpired` if (normal mode) `exp` has passed, or (refresh mode)
    ///   the refresh window measured from `iat` has closed
    pub fn check_at(&self, claims: &ClaimSet, refresh_flow: bool, now: i64) -> AuthResult<()> {
        if !claims.has_all(&self.required_claims) {
            return Err(AuthError::token_invalid(
                "JWT payload does not contain the required claims",
            ));
        }

        if refresh_flow {
            self.check_refresh(claims, now)
        } else {
            self.check_temporal(claims, now)
        }
    }

    fn check_temporal(&self, claims: &ClaimSet, now: i64) -> AuthResult<()> {
        let leeway = i64::try_from(self.leeway).unwrap_or(i64::MAX);
        let timestamp = |name: &str| claims.get(name).and_then(|claim| claim.as_timestamp());

        if let Some(nbf) = timestamp(names::NOT_BEFORE)
            && nbf.saturating_sub(leeway) > now
        {
            return Err(AuthError::token_invalid(
                "Not Before (nbf) timestamp cannot be in the future",
            ));
        }

        if let Some(iat) = timestamp(names::ISSUED_AT)
            && iat.saturating_sub(leeway) > now
        {
            return Err(AuthError::token_invalid(
                "Issued At (iat) timestamp cannot be in the future",
            ));
        }

        if let Some(exp) = timestamp(names::EXPIRATION)
            && exp.saturating_add(leeway) < now
        {
            return Err(AuthError::token_expired("Token has expired"));
        }

        Ok(())
    }

    fn check_refresh(&self, claims: &ClaimSet, now: i64) -> AuthResult<()> {
        let Some(refresh_ttl) = self.refresh_ttl else {
            return Ok(());
        };
        let Some(iat) = claims.get(names::ISSUED_AT).and_then(|claim| claim.as_timestamp()) else {
            return Ok(());
        };

        if now.saturating_sub(iat) >= window_seconds(refresh_ttl) {
            return Err(AuthError::token_expired(
                "Token has expired and can no longer be refreshed",
            ));
        }

        Ok(())
    }

    /// Returns the unix time after which a token issued at `iat` can no
    /// longer be refreshed, or `None` when the window is unbounded.
    #[must_use]
    pub fn refresh_deadline(&self, iat: i64) -> Option<i64> {
        self.refresh_ttl
            .map(|minutes| iat.saturating_add(window_seconds(minutes)))
    }
}

fn window_seconds(minutes: u64) -> i64 {
    i64::try_from(minutes.saturating_mul(60)).unwrap_or(i64::MAX)
}

impl fmt::Debug for PayloadValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadValidator")
            .field("required_claims", &self.required_claims)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("leeway", &self.leeway)
            .finish_non_exhaustive()
    }
}

//! Token revocation registry.
//!
//! Entries are keyed by a unique claim (`jti` by default) and hold either the
//! string `"forever"` or `{"valid_until": <unix seconds>}`. A token counts as
//! blacklisted once `valid_until` is reached, so the grace period set at
//! revocation time lets in-flight requests carrying a just-rotated token
//! finish.

use std::fmt;

use serde_json::{Value, json};
use tokenwarden_storage::{DynStorage, StorageError};

use crate::AuthResult;
use crate::claims::names;
use crate::clock::DynClock;
use crate::payload::Payload;
use crate::validator::DEFAULT_REFRESH_TTL;

/// Stored value of a permanently revoked token.
pub const FOREVER: &str = "forever";

const VALID_UNTIL: &str = "valid_until";

/// Revocation registry on top of a key/value [`Storage`](tokenwarden_storage::Storage).
#[derive(Clone)]
pub struct Blacklist {
    storage: DynStorage,
    clock: DynClock,
    grace_period: u64,
    refresh_ttl: Option<u64>,
    key: String,
}

impl Blacklist {
    /// Creates a blacklist keyed by `jti`, with no grace period and a
    /// two-week refresh window.
    #[must_use]
    pub fn new(storage: DynStorage, clock: DynClock) -> Self {
        Self {
            storage,
            clock,
            grace_period: 0,
            refresh_ttl: Some(DEFAULT_REFRESH_TTL),
            key: names::JWT_ID.to_string(),
        }
    }

    /// Sets the grace period in seconds.
    #[must_use]
    pub fn with_grace_period(mut self, seconds: u64) -> Self {
        self.grace_period = seconds;
        self
    }

    /// Sets the refresh window in minutes; `None` means unbounded.
    #[must_use]
    pub fn with_refresh_ttl(mut self, minutes: Option<u64>) -> Self {
        self.refresh_ttl = minutes;
        self
    }

    /// Sets the claim used as the storage key.
    #[must_use]
    pub fn with_key(mut self, claim: impl Into<String>) -> Self {
        self.key = claim.into();
        self
    }

    #[must_use]
    pub fn grace_period(&self) -> u64 {
        self.grace_period
    }

    #[must_use]
    pub fn refresh_ttl(&self) -> Option<u64> {
        self.refresh_ttl
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Revokes the token until it can neither be used nor refreshed.
    ///
    /// Returns `false` without writing if the token is already expired and
    /// past its refresh window. A token without `exp`, or with an unbounded
    /// refresh window, is revoked forever.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ClaimNotFound` if the key claim is missing, or
    /// `AuthError::Storage` if the backend fails.
    pub async fn add(&self, payload: &Payload) -> AuthResult<bool> {
        let Some(exp) = payload.expiration() else {
            return self.add_forever(payload).await;
        };
        let refresh_deadline = match (self.refresh_ttl, payload.issued_at()) {
            (Some(minutes), Some(iat)) => iat.saturating_add(minutes_to_seconds(minutes)),
            _ => return self.add_forever(payload).await,
        };

        let key = self.key_for(payload)?;
        let now = self.clock.timestamp();

        if exp < now && refresh_deadline <= now {
            tracing::debug!(key = %key, "Token is past expiry and refresh window, not blacklisting");
            return Ok(false);
        }

        if self.storage.get(&key).await?.is_some() {
            tracing::trace!(key = %key, "Token already blacklisted");
            return Ok(true);
        }

        let valid_until = now.saturating_add(i64::try_from(self.grace_period).unwrap_or(i64::MAX));
        let minutes = minutes_until(exp.max(refresh_deadline), now);
        self.storage
            .add(&key, json!({ VALID_UNTIL: valid_until }), minutes)
            .await?;

        tracing::debug!(key = %key, minutes, valid_until, "Token added to blacklist");
        Ok(true)
    }

    /// Revokes the token permanently.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ClaimNotFound` if the key claim is missing, or
    /// `AuthError::Storage` if the backend fails.
    pub async fn add_forever(&self, payload: &Payload) -> AuthResult<bool> {
        let key = self.key_for(payload)?;
        self.storage.forever(&key, Value::from(FOREVER)).await?;
        tracing::debug!(key = %key, "Token added to blacklist forever");
        Ok(true)
    }

    /// Returns `true` if the token is currently blacklisted.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend fails or holds an entry
    /// this blacklist did not write.
    pub async fn has(&self, payload: &Payload) -> AuthResult<bool> {
        // Without the key claim the token cannot have been revoked.
        if !payload.has_key(&self.key) {
            return Ok(false);
        }
        let key = self.key_for(payload)?;
        let Some(entry) = self.storage.get(&key).await? else {
            return Ok(false);
        };

        if entry.as_str() == Some(FOREVER) {
            return Ok(true);
        }

        match entry.get(VALID_UNTIL).and_then(Value::as_i64) {
            Some(valid_until) => Ok(valid_until <= self.clock.timestamp()),
            None => {
                tracing::warn!(key = %key, "Unrecognised blacklist entry");
                Err(StorageError::serialization(format!(
                    "unrecognised blacklist entry for key {key}"
                ))
                .into())
            }
        }
    }

    /// Lifts the revocation of a token. Returns whether an entry existed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ClaimNotFound` if the key claim is missing, or
    /// `AuthError::Storage` if the backend fails.
    pub async fn remove(&self, payload: &Payload) -> AuthResult<bool> {
        let key = self.key_for(payload)?;
        let removed = self.storage.destroy(&key).await?;
        tracing::debug!(key = %key, removed, "Token removed from blacklist");
        Ok(removed)
    }

    /// Removes every entry.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend fails.
    pub async fn clear(&self) -> AuthResult<bool> {
        self.storage.flush().await?;
        tracing::debug!("Blacklist cleared");
        Ok(true)
    }

    /// Returns the storage key for a payload: its key claim, as a string.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ClaimNotFound` if the key claim is missing.
    pub fn key_for(&self, payload: &Payload) -> AuthResult<String> {
        Ok(match payload.require(&self.key)? {
            Value::String(key) => key.clone(),
            other => other.to_string(),
        })
    }
}

impl fmt::Debug for Blacklist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blacklist")
            .field("grace_period", &self.grace_period)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

fn minutes_to_seconds(minutes: u64) -> i64 {
    i64::try_from(minutes.saturating_mul(60)).unwrap_or(i64::MAX)
}

/// Whole minutes from `now` until one minute past `until`, rounded up.
fn minutes_until(until: i64, now: i64) -> u64 {
    let seconds = until.saturating_add(60).saturating_sub(now).max(0);
    u64::try_from(seconds).unwrap_or(0).div_ceil(60)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::claims::{Claim, ClaimSet};
    use crate::clock::FixedClock;
    use crate::error::AuthError;
    use crate::validator::PayloadValidator;
    use tokenwarden_storage::Storage;
    use tokenwarden_storage_memory::InMemoryStorage;

    const NOW: i64 = 1_700_000_000;

    struct Fixture {
        clock: Arc<FixedClock>,
        storage: Arc<InMemoryStorage>,
        blacklist: Blacklist,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(FixedClock::at(NOW));
        let storage = Arc::new(InMemoryStorage::new());
        let blacklist = Blacklist::new(storage.clone(), clock.clone());
        Fixture {
            clock,
            storage,
            blacklist,
        }
    }

    fn payload(jti: &str, exp: Option<i64>, iat: i64) -> Payload {
        let mut claims = ClaimSet::new()
            .with(Claim::subject(1).unwrap())
            .with(Claim::issuer("http://example.com").unwrap())
            .with(Claim::not_before(iat))
            .with(Claim::issued_at(iat))
            .with(Claim::jwt_id(jti).unwrap());
        if let Some(exp) = exp {
            claims.put(Claim::expiration(exp));
        }
        let validator = PayloadValidator::new(Arc::new(FixedClock::at(NOW)))
            .with_required_claims(["sub", "jti"])
            .with_refresh_ttl(None);
        Payload::new(claims, &validator, true).unwrap()
    }

    #[test]
    fn test_minutes_until_rounds_up_with_pad() {
        assert_eq!(minutes_until(NOW + 3600, NOW), 61);
        assert_eq!(minutes_until(NOW + 3601, NOW), 62);
        assert_eq!(minutes_until(NOW, NOW), 1);
        assert_eq!(minutes_until(NOW - 600, NOW), 0);
    }

    #[tokio::test]
    async fn test_add_then_has() {
        let f = fixture();
        let payload = payload("foo", Some(NOW + 3600), NOW);

        assert!(!f.blacklist.has(&payload).await.unwrap());
        assert!(f.blacklist.add(&payload).await.unwrap());
        assert!(f.blacklist.has(&payload).await.unwrap());
        // repeated reads agree
        assert!(f.blacklist.has(&payload).await.unwrap());
        assert_eq!(
            f.storage.get("foo").await.unwrap(),
            Some(json!({"valid_until": NOW}))
        );
    }

    #[tokio::test]
    async fn test_grace_period_delays_effect() {
        let f = fixture();
        let blacklist = f.blacklist.clone().with_grace_period(30);
        let payload = payload("foo", Some(NOW + 3600), NOW);

        blacklist.add(&payload).await.unwrap();
        assert!(!blacklist.has(&payload).await.unwrap());

        f.clock.advance(29);
        assert!(!blacklist.has(&payload).await.unwrap());

        f.clock.advance(1);
        assert!(blacklist.has(&payload).await.unwrap());
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let f = fixture();
        let blacklist = f.blacklist.clone().with_grace_period(30);
        let payload = payload("foo", Some(NOW + 3600), NOW);

        blacklist.add(&payload).await.unwrap();
        f.clock.advance(10);
        assert!(blacklist.add(&payload).await.unwrap());
        assert_eq!(
            f.storage.get("foo").await.unwrap(),
            Some(json!({"valid_until": NOW + 30}))
        );
    }

    #[tokio::test]
    async fn test_no_exp_is_added_forever() {
        let f = fixture();
        let payload = payload("foo", None, NOW);

        assert!(f.blacklist.add(&payload).await.unwrap());
        assert_eq!(f.storage.get("foo").await.unwrap(), Some(json!("forever")));
        assert!(f.blacklist.has(&payload).await.unwrap());
    }

    #[tokio::test]
    async fn test_unbounded_refresh_window_is_added_forever() {
        let f = fixture();
        let blacklist = f.blacklist.clone().with_refresh_ttl(None);
        let payload = payload("foo", Some(NOW + 3600), NOW);

        blacklist.add(&payload).await.unwrap();
        assert_eq!(f.storage.get("foo").await.unwrap(), Some(json!("forever")));
    }

    #[tokio::test]
    async fn test_dead_token_is_not_added() {
        let f = fixture();
        let iat = NOW - 20_160 * 60 - 60;
        let payload = payload("foo", Some(NOW - 3600), iat);

        assert!(!f.blacklist.add(&payload).await.unwrap());
        assert!(f.storage.is_empty());
    }

    #[tokio::test]
    async fn test_forever_ignores_time() {
        let f = fixture();
        f.storage.forever("foo", json!("forever")).await.unwrap();
        let payload = payload("foo", Some(NOW + 3600), NOW);

        assert!(f.blacklist.has(&payload).await.unwrap());
        f.clock.set(0);
        assert!(f.blacklist.has(&payload).await.unwrap());
    }

    #[tokio::test]
    async fn test_unrecognised_entry_is_storage_error() {
        let f = fixture();
        f.storage.forever("foo", json!({"until": 1})).await.unwrap();
        let payload = payload("foo", Some(NOW + 3600), NOW);

        let err = f.blacklist.has(&payload).await.unwrap_err();
        assert!(matches!(err, AuthError::Storage(StorageError::Serialization { .. })));
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let f = fixture();
        let a = payload("a", Some(NOW + 3600), NOW);
        let b = payload("b", None, NOW);
        f.blacklist.add(&a).await.unwrap();
        f.blacklist.add(&b).await.unwrap();

        assert!(f.blacklist.remove(&a).await.unwrap());
        assert!(!f.blacklist.remove(&a).await.unwrap());
        assert!(!f.blacklist.has(&a).await.unwrap());

        assert!(f.blacklist.clear().await.unwrap());
        assert!(!f.blacklist.has(&b).await.unwrap());
    }

    #[tokio::test]
    async fn test_custom_key_claim() {
        let f = fixture();
        let blacklist = f.blacklist.clone().with_key("sub");
        let payload = payload("foo", None, NOW);

        blacklist.add_forever(&payload).await.unwrap();
        assert_eq!(f.storage.get("1").await.unwrap(), Some(json!("forever")));

        let missing = f.blacklist.clone().with_key("missing");
        assert!(matches!(
            missing.add(&payload).await,
            Err(AuthError::ClaimNotFound { .. })
        ));
        assert!(!missing.has(&payload).await.unwrap());
    }
}

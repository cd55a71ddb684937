//! Token lifecycle orchestration.
//!
//! [`TokenManager`] ties the signer, payload factory and blacklist together:
//!
//! - `encode`: payload to wire token
//! - `decode`: wire token to validated payload, rejecting revoked tokens
//! - `refresh`: exchange a token (possibly expired, but still inside its
//!   refresh window) for a new one and revoke the old one
//! - `invalidate`: revoke a token

use std::fmt;
use std::sync::Arc;

use tokenwarden_storage::DynStorage;

use crate::AuthResult;
use crate::blacklist::Blacklist;
use crate::claims::{Claim, ClaimSet, CustomClaims, names};
use crate::clock::DynClock;
use crate::config::JwtConfig;
use crate::error::AuthError;
use crate::factory::PayloadFactory;
use crate::payload::Payload;
use crate::signer::{DynSigner, JwtSigner};
use crate::subject::Subject;
use crate::token::Token;
use crate::validator::PayloadValidator;

/// Issues, verifies, refreshes and revokes tokens.
#[derive(Clone)]
pub struct TokenManager {
    signer: DynSigner,
    factory: PayloadFactory,
    blacklist: Blacklist,
    blacklist_enabled: bool,
    persistent_claims: Vec<String>,
}

impl TokenManager {
    /// Creates a manager with the blacklist enabled and no persistent claims.
    #[must_use]
    pub fn new(signer: DynSigner, factory: PayloadFactory, blacklist: Blacklist) -> Self {
        Self {
            signer,
            factory,
            blacklist,
            blacklist_enabled: true,
            persistent_claims: Vec::new(),
        }
    }

    /// Wires a manager from configuration around the given signer.
    ///
    /// The configuration is used as is; call [`JwtConfig::validate`] first
    /// when it comes from an untrusted source.
    #[must_use]
    pub fn from_config(
        config: &JwtConfig,
        signer: DynSigner,
        storage: DynStorage,
        clock: DynClock,
    ) -> Self {
        let validator = PayloadValidator::new(clock.clone())
            .with_required_claims(config.effective_required_claims())
            .with_refresh_ttl(config.refresh_ttl)
            .with_leeway(config.leeway);
        let factory = PayloadFactory::new(validator)
            .with_issuer(config.issuer.as_str())
            .with_ttl(config.ttl)
            .with_lock_subject(config.lock_subject);
        let blacklist = Blacklist::new(storage, clock)
            .with_grace_period(config.blacklist.grace_period)
            .with_refresh_ttl(config.refresh_ttl)
            .with_key(config.blacklist.key.as_str());

        Self::new(signer, factory, blacklist)
            .with_blacklist_enabled(config.blacklist.enabled)
            .with_persistent_claims(config.persistent_claims.iter().cloned())
    }

    /// Validates the configuration and wires a manager with a [`JwtSigner`].
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the configuration is invalid or
    /// the signing keys cannot be loaded.
    pub fn with_jwt_signer(
        config: &JwtConfig,
        storage: DynStorage,
        clock: DynClock,
    ) -> AuthResult<Self> {
        config.validate()?;
        let signer = JwtSigner::from_config(&config.signing)
            .map_err(|err| AuthError::configuration(err.to_string()))?;
        Ok(Self::from_config(config, Arc::new(signer), storage, clock))
    }

    #[must_use]
    pub fn with_blacklist_enabled(mut self, enabled: bool) -> Self {
        self.blacklist_enabled = enabled;
        self
    }

    /// Sets the claims carried over from the old token on refresh.
    #[must_use]
    pub fn with_persistent_claims<I, S>(mut self, claims: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.persistent_claims = claims.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn factory(&self) -> &PayloadFactory {
        &self.factory
    }

    #[must_use]
    pub fn blacklist(&self) -> &Blacklist {
        &self.blacklist
    }

    #[must_use]
    pub fn is_blacklist_enabled(&self) -> bool {
        self.blacklist_enabled
    }

    #[must_use]
    pub fn persistent_claims(&self) -> &[String] {
        &self.persistent_claims
    }

    /// Signs a payload.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Jwt` if the signer fails, or `TokenInvalid` if it
    /// returns something that is not a three-segment token.
    pub fn encode(&self, payload: &Payload) -> AuthResult<Token> {
        let raw = self
            .signer
            .encode(&payload.to_map())
            .map_err(|err| AuthError::jwt(format!("Could not create token: {err}")))?;
        Token::new(raw)
    }

    /// Verifies a token and returns its payload, validated in normal mode.
    ///
    /// # Errors
    ///
    /// - `TokenInvalid` for a bad signature, malformed token or missing claims
    /// - `InvalidClaim` if a decoded claim value breaks its rule
    /// - `TokenExpired` if `exp` has passed
    /// - `TokenBlacklisted` if `check_blacklist` is set and the token is revoked
    /// - `Storage` if the blacklist lookup fails
    pub async fn decode(&self, token: &Token, check_blacklist: bool) -> AuthResult<Payload> {
        self.decode_payload(token, false, check_blacklist).await
    }

    /// Exchanges a token for a new one and revokes the old one.
    ///
    /// # Errors
    ///
    /// See [`TokenManager::refresh_with_claims`].
    pub async fn refresh(&self, token: &Token, force_forever: bool) -> AuthResult<Token> {
        self.refresh_with_claims(token, force_forever, &CustomClaims::new())
            .await
    }

    /// Exchanges a token for a new one carrying extra claims, and revokes the
    /// old one.
    ///
    /// The new token keeps `sub`, `iat`, `prv` and the persistent claims of
    /// the old one, gets a fresh `jti`, `iss` and `nbf`, and an `exp` moved
    /// forward from the old `exp` by whole ttl steps.
    ///
    /// # Errors
    ///
    /// - `TokenExpired` if the refresh window has closed
    /// - `TokenBlacklisted` if the old token is already revoked
    /// - `TokenInvalid`/`InvalidClaim` for an unusable token or custom claim
    /// - `Storage` if revoking the old token fails; no new token is issued
    pub async fn refresh_with_claims(
        &self,
        token: &Token,
        force_forever: bool,
        custom: &CustomClaims,
    ) -> AuthResult<Token> {
        let old = self.decode_payload(token, true, true).await?;
        let now = self.factory.clock().timestamp();

        let mut claims = self.factory.default_claims()?;
        match self.factory.next_expiration(old.expiration(), now) {
            Some(exp) => {
                claims.put(Claim::expiration(exp));
            }
            None => {
                claims.remove(names::EXPIRATION);
            }
        }
        claims.merge(custom.to_claim_set()?);

        let carried = [names::SUBJECT, names::ISSUED_AT, names::PROVIDER]
            .into_iter()
            .chain(self.persistent_claims.iter().map(String::as_str));
        for name in carried {
            if let Some(claim) = old.claim(name) {
                claims.put(claim.clone());
            }
        }

        let new = self.factory.make(claims, false)?;

        if self.blacklist_enabled {
            let revoked = if force_forever {
                self.blacklist.add_forever(&old).await?
            } else {
                self.blacklist.add(&old).await?
            };
            if !revoked {
                return Err(AuthError::jwt("Could not blacklist the refreshed token"));
            }
        } else {
            tracing::warn!("Refreshing a token with the blacklist disabled; the old token stays valid");
        }

        let token = self.encode(&new)?;
        tracing::debug!(
            old_jti = ?old.jwt_id(),
            new_jti = ?new.jwt_id(),
            exp = ?new.expiration(),
            "Token refreshed"
        );
        Ok(token)
    }

    /// Revokes a token.
    ///
    /// The token is validated in refresh mode without the blacklist check,
    /// so an expired token that could still be refreshed can be revoked, and
    /// revoking twice is harmless.
    ///
    /// # Errors
    ///
    /// - `Jwt` if the blacklist is disabled
    /// - `TokenExpired` if the token is past its refresh window
    /// - `TokenInvalid`/`InvalidClaim` for an unusable token
    /// - `Storage` if the backend fails
    pub async fn invalidate(&self, token: &Token, force_forever: bool) -> AuthResult<bool> {
        if !self.blacklist_enabled {
            return Err(AuthError::jwt(
                "You must have the blacklist enabled to invalidate a token",
            ));
        }

        let payload = self.decode_payload(token, true, false).await?;
        let revoked = if force_forever {
            self.blacklist.add_forever(&payload).await?
        } else {
            self.blacklist.add(&payload).await?
        };
        tracing::debug!(jti = ?payload.jwt_id(), revoked, force_forever, "Token invalidated");
        Ok(revoked)
    }

    /// Issues a token for a subject.
    ///
    /// # Errors
    ///
    /// Returns `InvalidClaim` for a bad claim value, the validator's error if
    /// the claims do not validate, or `Jwt` if signing fails.
    pub fn from_subject<S: Subject + ?Sized>(
        &self,
        subject: &S,
        custom: &CustomClaims,
    ) -> AuthResult<Token> {
        let payload = self.factory.for_subject(subject, custom)?;
        let token = self.encode(&payload)?;
        tracing::debug!(jti = ?payload.jwt_id(), "Token issued");
        Ok(token)
    }

    async fn decode_payload(
        &self,
        token: &Token,
        refresh_flow: bool,
        check_blacklist: bool,
    ) -> AuthResult<Payload> {
        let raw = self
            .signer
            .decode(token.as_str())
            .map_err(|err| AuthError::token_invalid_from("Could not decode token", err))?;
        let claims = ClaimSet::from_map(raw)?;
        let payload = self.factory.make(claims, refresh_flow)?;

        if check_blacklist && self.blacklist_enabled && self.blacklist.has(&payload).await? {
            tracing::debug!(jti = ?payload.jwt_id(), "Rejected blacklisted token");
            return Err(AuthError::TokenBlacklisted);
        }

        Ok(payload)
    }
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("factory", &self.factory)
            .field("blacklist", &self.blacklist)
            .field("blacklist_enabled", &self.blacklist_enabled)
            .field("persistent_claims", &self.persistent_claims)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{Value, json};
    use tokenwarden_storage_memory::InMemoryStorage;

    use super::*;
    use crate::clock::FixedClock;
    use crate::signer::SigningAlgorithm;

    const NOW: i64 = 1_700_000_000;

    struct User;

    impl Subject for User {
        fn identifier(&self) -> Value {
            json!(42)
        }

        fn provider(&self) -> &str {
            "users"
        }
    }

    fn manager(clock: Arc<FixedClock>) -> TokenManager {
        let config = JwtConfig::default();
        let signer = Arc::new(JwtSigner::hmac(SigningAlgorithm::HS256, b"secret").unwrap());
        TokenManager::from_config(&config, signer, Arc::new(InMemoryStorage::new()), clock)
    }

    #[tokio::test]
    async fn test_issue_and_decode() {
        let clock = Arc::new(FixedClock::at(NOW));
        let manager = manager(clock);

        let token = manager
            .from_subject(&User, &CustomClaims::new().with("role", "admin"))
            .unwrap();
        let payload = manager.decode(&token, true).await.unwrap();

        assert_eq!(payload.subject(), Some(&json!(42)));
        assert_eq!(payload.get("role"), Some(&json!("admin")));
        assert_eq!(payload.expiration(), Some(NOW + 3600));
        assert!(payload.matches_provider("users"));
    }

    #[tokio::test]
    async fn test_encode_decode_round_trip() {
        let clock = Arc::new(FixedClock::at(NOW));
        let manager = manager(clock);
        let payload = manager
            .factory()
            .for_subject(&User, &CustomClaims::new())
            .unwrap();

        let token = manager.encode(&payload).unwrap();
        assert_eq!(manager.decode(&token, false).await.unwrap(), payload);
    }

    #[tokio::test]
    async fn test_decode_rejects_foreign_signature() {
        let clock = Arc::new(FixedClock::at(NOW));
        let manager = manager(clock.clone());
        let other = TokenManager::from_config(
            &JwtConfig::default(),
            Arc::new(JwtSigner::hmac(SigningAlgorithm::HS256, b"other").unwrap()),
            Arc::new(InMemoryStorage::new()),
            clock,
        );

        let token = other.from_subject(&User, &CustomClaims::new()).unwrap();
        let err = manager.decode(&token, true).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid { source: Some(_), .. }));
    }

    #[tokio::test]
    async fn test_invalidate_requires_blacklist() {
        let clock = Arc::new(FixedClock::at(NOW));
        let manager = manager(clock).with_blacklist_enabled(false);
        let token = manager.from_subject(&User, &CustomClaims::new()).unwrap();

        let err = manager.invalidate(&token, false).await.unwrap_err();
        assert!(matches!(err, AuthError::Jwt { .. }));
        // without a blacklist, decoding never consults it
        assert!(manager.decode(&token, true).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_carries_persistent_claims() {
        let clock = Arc::new(FixedClock::at(NOW));
        let manager = manager(clock.clone()).with_persistent_claims(["role"]);
        let token = manager
            .from_subject(
                &User,
                &CustomClaims::new().with("role", "admin").with("scratch", 1),
            )
            .unwrap();

        clock.advance(60);
        let refreshed = manager
            .refresh_with_claims(&token, false, &CustomClaims::new().with("extra", true))
            .await
            .unwrap();
        let payload = manager.decode(&refreshed, true).await.unwrap();

        assert_eq!(payload.get("role"), Some(&json!("admin")));
        assert_eq!(payload.get("extra"), Some(&json!(true)));
        assert!(!payload.has_key("scratch"));
        assert_eq!(payload.issued_at(), Some(NOW));
        assert_eq!(payload.not_before(), Some(NOW + 60));
        assert!(payload.matches_provider("users"));
    }
}

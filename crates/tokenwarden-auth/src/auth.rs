//! Stateful convenience handle around a [`TokenManager`].
//!
//! A [`JwtAuth`] holds the "current" token, typically the one extracted from
//! an incoming request, and answers questions about it.

use std::sync::Arc;

use serde_json::Value;

use crate::AuthResult;
use crate::claims::CustomClaims;
use crate::error::AuthError;
use crate::manager::TokenManager;
use crate::payload::Payload;
use crate::subject::Subject;
use crate::token::Token;

/// Per-request token handle.
#[derive(Debug, Clone)]
pub struct JwtAuth {
    manager: Arc<TokenManager>,
    token: Option<Token>,
}

impl JwtAuth {
    /// Creates a handle with no current token.
    #[must_use]
    pub fn new(manager: Arc<TokenManager>) -> Self {
        Self {
            manager,
            token: None,
        }
    }

    #[must_use]
    pub fn manager(&self) -> &TokenManager {
        &self.manager
    }

    /// Sets the current token.
    pub fn set_token(&mut self, token: Token) -> &mut Self {
        self.token = Some(token);
        self
    }

    /// Clears the current token.
    pub fn unset_token(&mut self) -> &mut Self {
        self.token = None;
        self
    }

    #[must_use]
    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    /// Returns the current token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Jwt` if no token is set.
    pub fn require_token(&self) -> AuthResult<&Token> {
        self.token
            .as_ref()
            .ok_or_else(|| AuthError::jwt("A token is required"))
    }

    /// Issues a token for a subject. The current token is left untouched.
    ///
    /// # Errors
    ///
    /// See [`TokenManager::from_subject`].
    pub fn from_subject<S: Subject + ?Sized>(
        &self,
        subject: &S,
        custom: &CustomClaims,
    ) -> AuthResult<Token> {
        self.manager.from_subject(subject, custom)
    }

    /// Decodes the current token, checking the blacklist.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Jwt` if no token is set, otherwise see
    /// [`TokenManager::decode`].
    pub async fn payload(&self) -> AuthResult<Payload> {
        self.manager.decode(self.require_token()?, true).await
    }

    /// Returns `true` if the current token decodes and validates.
    pub async fn check(&self) -> bool {
        self.payload().await.is_ok()
    }

    /// Like [`JwtAuth::check`] but returns the failure.
    ///
    /// # Errors
    ///
    /// Whatever [`JwtAuth::payload`] fails with.
    pub async fn check_or_fail(&self) -> AuthResult<Payload> {
        self.payload().await
    }

    /// Returns one claim of the current token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ClaimNotFound` if the claim is absent, otherwise
    /// whatever [`JwtAuth::payload`] fails with.
    pub async fn get_claim(&self, name: &str) -> AuthResult<Value> {
        self.payload().await?.require(name).cloned()
    }

    /// Refreshes the current token and makes the new one current.
    ///
    /// # Errors
    ///
    /// See [`TokenManager::refresh_with_claims`]. The current token is kept on
    /// failure.
    pub async fn refresh(&mut self, force_forever: bool, custom: &CustomClaims) -> AuthResult<Token> {
        let token = self
            .manager
            .refresh_with_claims(self.require_token()?, force_forever, custom)
            .await?;
        self.token = Some(token.clone());
        Ok(token)
    }

    /// Revokes the current token and clears it.
    ///
    /// # Errors
    ///
    /// See [`TokenManager::invalidate`]. The current token is kept on failure.
    pub async fn invalidate(&mut self, force_forever: bool) -> AuthResult<bool> {
        let revoked = self
            .manager
            .invalidate(self.require_token()?, force_forever)
            .await?;
        self.token = None;
        Ok(revoked)
    }

    /// Returns `true` if the current token may be used for `provider`'s subjects.
    ///
    /// # Errors
    ///
    /// Whatever [`JwtAuth::payload`] fails with.
    pub async fn check_provider(&self, provider: &str) -> AuthResult<bool> {
        Ok(self.payload().await?.matches_provider(provider))
    }
}

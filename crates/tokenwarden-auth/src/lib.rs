//! # tokenwarden-auth
//!
//! Bearer token issuance, validation, refresh and revocation.
//!
//! This crate provides:
//! - A typed claim model with per-claim validation
//! - Immutable, validated payloads
//! - A two-mode validator (normal and refresh)
//! - A revocation blacklist with a grace period for token rotation
//! - A token manager orchestrating encode/decode/refresh/invalidate
//!
//! ## Overview
//!
//! Outbound, a [`Subject`] and optional [`CustomClaims`] are turned into a
//! [`ClaimSet`] by the [`PayloadFactory`], validated into a [`Payload`] and
//! signed into a [`Token`]. Inbound, the [`Signer`] verifies the token, the
//! claims are validated again and the [`Blacklist`] is consulted.
//!
//! Signing is pluggable through the [`Signer`] trait; [`JwtSigner`] covers
//! HMAC, RSA and ECDSA JWS. Revocation state lives behind the `Storage` trait
//! from `tokenwarden-storage`.
//!
//! ## Modules
//!
//! - [`claims`] - Claims, claim sets and caller-supplied claims
//! - [`payload`] - Validated read-only payloads
//! - [`validator`] - Structural and temporal validation
//! - [`blacklist`] - Token revocation registry
//! - [`manager`] - Token lifecycle orchestration
//! - [`factory`] - Claim set construction for new tokens
//! - [`signer`] - Wire-format signing seam and JWS implementation
//! - [`auth`] - Stateful per-request handle
//! - [`config`] - Configuration types and loader
//! - [`clock`] - Time source

pub mod auth;
pub mod blacklist;
pub mod claims;
pub mod clock;
pub mod config;
pub mod error;
pub mod factory;
pub mod manager;
pub mod payload;
pub mod signer;
pub mod subject;
pub mod token;
pub mod validator;

pub use auth::JwtAuth;
pub use blacklist::Blacklist;
pub use claims::{Claim, ClaimKind, ClaimSet, CustomClaims, Timestamp};
pub use clock::{Clock, DynClock, FixedClock, SystemClock, system_clock};
pub use config::{BlacklistConfig, ConfigError, JwtConfig, SigningConfig};
pub use error::{AuthError, ErrorCategory};
pub use factory::PayloadFactory;
pub use manager::TokenManager;
pub use payload::Payload;
pub use signer::{DynSigner, JwtSigner, Signer, SignerError, SigningAlgorithm};
pub use subject::{Subject, provider_hash};
pub use token::Token;
pub use validator::PayloadValidator;

/// Type alias for token operation results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use tokenwarden_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::auth::JwtAuth;
    pub use crate::blacklist::Blacklist;
    pub use crate::claims::{Claim, ClaimKind, ClaimSet, CustomClaims};
    pub use crate::clock::{Clock, DynClock, SystemClock, system_clock};
    pub use crate::config::{ConfigError, JwtConfig};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::manager::TokenManager;
    pub use crate::payload::Payload;
    pub use crate::signer::{JwtSigner, Signer, SignerError, SigningAlgorithm};
    pub use crate::subject::Subject;
    pub use crate::token::Token;
}

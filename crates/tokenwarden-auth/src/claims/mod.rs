//! Claim model.
//!
//! - [`Claim`] is a single validated name/value pair, typed by [`ClaimKind`]
//! - [`ClaimSet`] is the ordered, name-unique collection a payload wraps
//! - [`CustomClaims`] carries caller-supplied extras into issuance

mod claim;
mod custom;
mod set;

pub use claim::{Claim, ClaimKind, Timestamp};
pub use custom::CustomClaims;
pub use set::ClaimSet;

/// Registered claim names.
pub mod names {
    pub const SUBJECT: &str = "sub";
    pub const ISSUER: &str = "iss";
    pub const AUDIENCE: &str = "aud";
    pub const ISSUED_AT: &str = "iat";
    pub const EXPIRATION: &str = "exp";
    pub const NOT_BEFORE: &str = "nbf";
    pub const JWT_ID: &str = "jti";
    /// Hash of the subject's provider, used to lock a token to one provider.
    pub const PROVIDER: &str = "prv";
}

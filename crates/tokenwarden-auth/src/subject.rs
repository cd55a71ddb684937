//! The claims source a token is issued for.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Something a token can be issued for, typically a user record.
pub trait Subject: Send + Sync {
    /// Value of the `sub` claim.
    fn identifier(&self) -> Value;

    /// Extra claims this subject always carries.
    fn custom_claims(&self) -> Map<String, Value> {
        Map::new()
    }

    /// Name of the provider the subject comes from, hashed into `prv`.
    ///
    /// Defaults to the Rust type name, which is not stable across compiler
    /// versions; override it when tokens must outlive a rebuild.
    fn provider(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Returns the `prv` value for a provider name: hex SHA-256.
#[must_use]
pub fn provider_hash(provider: &str) -> String {
    hex::encode(Sha256::digest(provider.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct User {
        id: u64,
    }

    impl Subject for User {
        fn identifier(&self) -> Value {
            json!(self.id)
        }
    }

    struct Admin;

    impl Subject for Admin {
        fn identifier(&self) -> Value {
            json!("admin")
        }

        fn custom_claims(&self) -> Map<String, Value> {
            let mut claims = Map::new();
            claims.insert("role".to_string(), json!("admin"));
            claims
        }

        fn provider(&self) -> &str {
            "admins"
        }
    }

    #[test]
    fn test_defaults() {
        let user = User { id: 7 };
        assert_eq!(user.identifier(), json!(7));
        assert!(user.custom_claims().is_empty());
        assert!(user.provider().ends_with("User"));
    }

    #[test]
    fn test_overrides() {
        assert_eq!(Admin.provider(), "admins");
        assert_eq!(Admin.custom_claims().get("role"), Some(&json!("admin")));
    }

    #[test]
    fn test_provider_hash_is_hex_sha256() {
        let hash = provider_hash("users");
        assert_eq!(hash.len(), 64);
        assert!(hash.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_eq!(hash, provider_hash("users"));
        assert_ne!(hash, provider_hash("admins"));
        assert_eq!(
            provider_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}

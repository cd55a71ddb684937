//! Storage trait for the revocation key/value store.

use async_trait::async_trait;
use serde_json::Value;

use crate::StorageResult;

/// Key/value storage with optional per-entry decay.
///
/// Backends must make individual key reads and writes atomic. No cross-key
/// transactions are required. Implementations must be thread-safe
/// (`Send + Sync`).
///
/// # Example
///
/// ```ignore
/// use tokenwarden_storage::{Storage, StorageResult};
///
/// async fn is_known(storage: &dyn Storage, jti: &str) -> StorageResult<bool> {
///     Ok(storage.get(jti).await?.is_some())
/// }
/// ```
#[async_trait]
pub trait Storage: Send + Sync {
    /// Stores `value` under `key` for `minutes` minutes.
    ///
    /// Once the lifetime has passed the entry must read as absent. Writing an
    /// existing key replaces its value and lifetime.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot store the value.
    async fn add(&self, key: &str, value: Value, minutes: u64) -> StorageResult<()>;

    /// Stores `value` under `key` with no expiry.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot store the value.
    async fn forever(&self, key: &str, value: Value) -> StorageResult<()>;

    /// Reads the value stored under `key`.
    ///
    /// Returns `None` if the key was never written, was destroyed, or has
    /// decayed.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, not for missing keys.
    async fn get(&self, key: &str) -> StorageResult<Option<Value>>;

    /// Removes `key`.
    ///
    /// Returns `true` if a live entry was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    async fn destroy(&self, key: &str) -> StorageResult<bool>;

    /// Removes every entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    async fn flush(&self) -> StorageResult<()>;
}

//! In-memory storage backend for tokenwarden.
//!
//! This crate provides an in-memory implementation of the [`Storage`] trait
//! from `tokenwarden-storage`, using papaya lock-free HashMap for concurrent
//! access. Entries written with a lifetime decay lazily: they read as absent
//! once expired and are physically removed by [`InMemoryStorage::cleanup_expired`].
//!
//! # Example
//!
//! ```ignore
//! use tokenwarden_storage::Storage;
//! use tokenwarden_storage_memory::InMemoryStorage;
//!
//! let storage = InMemoryStorage::new();
//! storage.add("jti-1", serde_json::json!({"valid_until": 0}), 61).await?;
//! assert!(storage.get("jti-1").await?.is_some());
//! ```

pub mod storage;

pub use storage::InMemoryStorage;
pub use tokenwarden_storage::{Storage, StorageError, StorageResult};

/// Type alias for a shareable storage instance.
pub type DynStorage = std::sync::Arc<dyn Storage>;

/// Creates a new in-memory storage instance behind a trait object.
pub fn create_storage() -> DynStorage {
    std::sync::Arc::new(InMemoryStorage::new())
}

//! # tokenwarden-storage
//!
//! Storage abstraction consumed by the tokenwarden blacklist.
//!
//! This crate defines the key/value contract that revocation backends must
//! implement. It does not contain any implementations - those are provided by
//! separate crates.
//!
//! ## Overview
//!
//! The main trait is [`Storage`], a minimal cache-like interface:
//! - `add` - store a value that decays after a number of minutes
//! - `forever` - store a value that never decays
//! - `get` - read a value back (decayed entries read as absent)
//! - `destroy` - remove a single key
//! - `flush` - remove everything
//!
//! ## Storage Backends
//!
//! To implement a storage backend, implement the [`Storage`] trait:
//!
//! ```ignore
//! use async_trait::async_trait;
//! use serde_json::Value;
//! use tokenwarden_storage::{Storage, StorageResult};
//!
//! struct RedisStorage {
//!     // ...
//! }
//!
//! #[async_trait]
//! impl Storage for RedisStorage {
//!     async fn add(&self, key: &str, value: Value, minutes: u64) -> StorageResult<()> {
//!         // SET key value EX minutes*60
//!     }
//!     // ... other methods
//! }
//! ```
//!
//! Implementations are provided in separate crates:
//! - `tokenwarden-storage-memory` - in-memory backend

mod error;
mod traits;

pub use error::{ErrorCategory, StorageError};
pub use traits::Storage;

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shareable storage trait object.
pub type DynStorage = std::sync::Arc<dyn Storage>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use tokenwarden_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ErrorCategory, StorageError};
    pub use crate::traits::Storage;
    pub use crate::{DynStorage, StorageResult};
}

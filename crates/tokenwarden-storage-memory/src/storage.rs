use async_trait::async_trait;
use papaya::HashMap as PapayaHashMap;
use serde_json::Value;
use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use tokenwarden_storage::{Storage, StorageResult};

/// A stored value together with the instant it decays, if any.
#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<OffsetDateTime>,
}

impl Entry {
    fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory key/value storage using papaya lock-free HashMap.
///
/// This storage implementation provides:
/// - Lock-free concurrent access via papaya::HashMap
/// - Per-entry lifetimes measured in minutes
/// - Lazy decay on read plus explicit bulk cleanup
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    data: Arc<PapayaHashMap<String, Entry>>,
}

impl InMemoryStorage {
    /// Creates a new, empty in-memory storage.
    pub fn new() -> Self {
        Self {
            data: Arc::new(PapayaHashMap::new()),
        }
    }

    /// Removes every decayed entry and returns how many were dropped.
    pub fn cleanup_expired(&self) -> u64 {
        let now = OffsetDateTime::now_utc();
        let pinned = self.data.pin();
        let before = pinned.len();
        pinned.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(pinned.len()) as u64;
        if removed > 0 {
            tracing::debug!(removed, "Cleaned up expired storage entries");
        }
        removed
    }

    /// Number of entries currently held, including decayed ones not yet cleaned up.
    pub fn len(&self) -> usize {
        self.data.pin().len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn put(&self, key: &str, value: Value, expires_at: Option<OffsetDateTime>) {
        self.data
            .pin()
            .insert(key.to_string(), Entry { value, expires_at });
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn add(&self, key: &str, value: Value, minutes: u64) -> StorageResult<()> {
        let minutes = i64::try_from(minutes).unwrap_or(i64::MAX / 60);
        let expires_at = OffsetDateTime::now_utc().checked_add(Duration::minutes(minutes));
        // Past the representable range the entry simply never decays.
        self.put(key, value, expires_at);
        tracing::trace!(key = %key, minutes, "Stored entry with lifetime");
        Ok(())
    }

    async fn forever(&self, key: &str, value: Value) -> StorageResult<()> {
        self.put(key, value, None);
        tracing::trace!(key = %key, "Stored entry without expiry");
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        let now = OffsetDateTime::now_utc();
        let pinned = self.data.pin();
        Ok(pinned
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone()))
    }

    async fn destroy(&self, key: &str) -> StorageResult<bool> {
        let now = OffsetDateTime::now_utc();
        let pinned = self.data.pin();
        Ok(pinned
            .remove(key)
            .is_some_and(|entry| !entry.is_expired(now)))
    }

    async fn flush(&self) -> StorageResult<()> {
        self.data.pin().clear();
        Ok(())
    }
}

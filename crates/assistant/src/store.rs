//! Keyed state stores for process-wide mutable records.
//!
//! Rate-limit windows and provider cooldown state live behind
//! [`KeyValueStore`] so the single-process [`MemoryStore`] can be swapped for
//! a shared external store when the service runs on several instances. Every
//! read-modify-write goes through [`KeyValueStore::compare_and_swap`]; no
//! operation spans more than one key.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use thiserror::Error;
use tracing::debug;

/// Errors returned by a state store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached or rejected the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Compare-and-swap kept losing to concurrent writers.
    #[error("too much contention on key {0}")]
    Contention(String),
}

/// A keyed store with per-entry expiry and atomic compare-and-swap.
#[async_trait]
pub trait KeyValueStore<V>: Send + Sync
where
    V: Clone + PartialEq + Send + Sync + 'static,
{
    /// Read the live value for a key. Expired entries read as absent.
    async fn get(&self, key: &str) -> Result<Option<V>, StoreError>;

    /// Unconditionally write a value.
    async fn set(&self, key: &str, value: V, ttl: Option<TimeDelta>) -> Result<(), StoreError>;

    /// Write `new` only if the live value equals `expected` (`None` meaning absent).
    ///
    /// Returns whether the write happened.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&V>,
        new: V,
        ttl: Option<TimeDelta>,
    ) -> Result<bool, StoreError>;

    /// Remove every expired entry, returning how many were dropped.
    async fn sweep_expired(&self) -> Result<usize, StoreError>;
}

#[derive(Debug, Clone)]
struct StoreEntry<V> {
    value: V,
    expires_at: Option<DateTime<Utc>>,
}

impl<V> StoreEntry<V> {
    fn new(value: V, ttl: Option<TimeDelta>, now: DateTime<Utc>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| now + ttl),
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-process store backed by `DashMap`.
///
/// Correct within one process only. Cloning shares the underlying map.
#[derive(Debug)]
pub struct MemoryStore<V> {
    entries: Arc<DashMap<String, StoreEntry<V>>>,
}

impl<V> MemoryStore<V> {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Number of entries currently held, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries, expired or not.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Clone for MemoryStore<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> KeyValueStore<V> for MemoryStore<V>
where
    V: Clone + PartialEq + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<V>, StoreError> {
        let now = Utc::now();
        Ok(self
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: V, ttl: Option<TimeDelta>) -> Result<(), StoreError> {
        self.entries
            .insert(key.to_string(), StoreEntry::new(value, ttl, Utc::now()));
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&V>,
        new: V,
        ttl: Option<TimeDelta>,
    ) -> Result<bool, StoreError> {
        let now = Utc::now();

        // The entry guard holds the shard lock, so the check and the write are atomic.
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let matches = {
                    let current = occupied.get();
                    let live = (!current.is_expired(now)).then_some(&current.value);
                    live == expected
                };
                if !matches {
                    return Ok(false);
                }
                occupied.insert(StoreEntry::new(new, ttl, now));
                Ok(true)
            }
            Entry::Vacant(vacant) => {
                if expected.is_some() {
                    return Ok(false);
                }
                vacant.insert(StoreEntry::new(new, ttl, now));
                Ok(true)
            }
        }
    }

    async fn sweep_expired(&self) -> Result<usize, StoreError> {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "Swept expired store entries");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_compare_and_swap_on_absent_key() {
        let store = MemoryStore::<u32>::new();

        assert!(store.compare_and_swap("k", None, 1, None).await.expect("cas"));
        // A second writer that also believed the key was absent loses.
        assert!(!store.compare_and_swap("k", None, 7, None).await.expect("cas"));
        assert_eq!(store.get("k").await.expect("get"), Some(1));
    }

    #[tokio::test]
    async fn test_compare_and_swap_requires_current_value() {
        let store = MemoryStore::<u32>::new();
        store.set("k", 1, None).await.expect("set");

        assert!(!store.compare_and_swap("k", Some(&5), 6, None).await.expect("cas"));
        assert!(store.compare_and_swap("k", Some(&1), 2, None).await.expect("cas"));
        assert_eq!(store.get("k").await.expect("get"), Some(2));
    }

    #[tokio::test]
    async fn test_expired_entries_read_as_absent_and_are_swept() {
        let store = MemoryStore::<u32>::new();
        store.set("old", 1, Some(TimeDelta::zero())).await.expect("set");
        store.set("fresh", 2, Some(TimeDelta::minutes(5))).await.expect("set");
        store.set("forever", 3, None).await.expect("set");

        assert_eq!(store.get("old").await.expect("get"), None);
        // An expired entry counts as absent for compare-and-swap too.
        assert!(store.compare_and_swap("old", None, 9, Some(TimeDelta::zero())).await.expect("cas"));

        let removed = store.sweep_expired().await.expect("sweep");
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_len_counts_expired_until_swept() {
        let store = MemoryStore::<u32>::new();
        assert!(store.is_empty());

        store.set("k", 1, Some(TimeDelta::zero())).await.expect("set");
        assert!(!store.is_empty());
        assert_eq!(store.len(), 1);

        assert_eq!(store.sweep_expired().await.expect("sweep"), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let store = MemoryStore::<String>::new();
        let other = store.clone();
        store.set("k", "v".to_string(), None).await.expect("set");
        assert_eq!(other.get("k").await.expect("get").as_deref(), Some("v"));
    }
}

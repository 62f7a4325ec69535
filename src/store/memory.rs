//! In-process cache store.
//!
//! [`MemoryStore`] implements [`CacheStore`] on top of moka's async
//! cache. Each entry carries its own TTL (moka's [`Expiry`] policy reads it
//! back on insert and on overwrite), and the store is bounded: past
//! `max_entries`, moka evicts the least recently used entries.
//!
//! Misses are not coalesced. Two tasks missing the same key at once both
//! recompute and the later write wins.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use serde::Deserialize;
use serde_json::Value;

use super::{CacheLookup, CacheStore, Recompute};
use crate::Result;

/// Configuration for [`MemoryStore`].
///
/// ```rust
/// # use cachet::StoreConfig;
/// let config = StoreConfig::new().max_entries(50_000);
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Maximum number of entries. Default: 10,000.
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

fn default_max_entries() -> u64 {
    10_000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of entries.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }
}

/// Write metadata of one live entry.
#[derive(Debug, Clone, Copy)]
pub struct EntryInfo {
    pub ttl: Duration,
    /// When the entry was last written (by a miss or by `set`).
    pub written_at: Instant,
}

impl EntryInfo {
    pub fn expires_at(&self) -> Instant {
        self.written_at + self.ttl
    }
}

#[derive(Debug)]
struct StoredEntry {
    value: Value,
    info: EntryInfo,
}

/// Reads each entry's own TTL.
struct PerEntryTtl;

impl Expiry<String, Arc<StoredEntry>> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Arc<StoredEntry>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.info.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Arc<StoredEntry>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.info.ttl)
    }
}

/// Bounded in-memory [`CacheStore`] with per-entry TTL.
pub struct MemoryStore {
    entries: Cache<String, Arc<StoredEntry>>,
}

impl MemoryStore {
    /// Create a store with the default capacity (10,000).
    pub fn new() -> Self {
        Self::with_config(&StoreConfig::default())
    }

    pub fn with_config(config: &StoreConfig) -> Self {
        let entries = Cache::builder()
            .max_capacity(config.max_entries)
            .expire_after(PerEntryTtl)
            .build();
        Self { entries }
    }

    /// Write metadata for a live entry, `None` if absent or expired.
    pub async fn entry_info(&self, key: &str) -> Option<EntryInfo> {
        self.entries.get(key).await.map(|entry| entry.info)
    }

    /// Stored value for a live entry, without recomputing on a miss.
    pub async fn peek(&self, key: &str) -> Option<Value> {
        self.entries.get(key).await.map(|entry| entry.value.clone())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Approximate number of entries (moka applies writes lazily).
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    /// Evict all entries.
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }

    async fn write(&self, key: &str, value: Value, ttl: Duration) {
        let entry = StoredEntry {
            value,
            info: EntryInfo {
                ttl,
                written_at: Instant::now(),
            },
        };
        self.entries.insert(key.to_owned(), Arc::new(entry)).await;
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str, ttl: Duration, recompute: Recompute<'_>) -> Result<CacheLookup> {
        if let Some(entry) = self.entries.get(key).await {
            return Ok(CacheLookup::hit(entry.value.clone()));
        }
        let value = recompute.await?;
        self.write(key, value.clone(), ttl).await;
        Ok(CacheLookup::miss(value))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.invalidate(key).await;
        Ok(())
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        self.write(key, value, ttl).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures_util::FutureExt;
    use serde_json::json;

    use super::*;
    use crate::CachetError;

    const TTL: Duration = Duration::from_secs(300);

    fn recompute(value: Value, calls: &AtomicUsize) -> Recompute<'_> {
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(value)
        }
        .boxed()
    }

    #[tokio::test]
    async fn miss_then_hit() {
        let store = MemoryStore::new();
        let calls = AtomicUsize::new(0);

        let first = store.get("k", TTL, recompute(json!(3), &calls)).await.unwrap();
        assert!(!first.hit);
        assert_eq!(first.value, json!(3));

        let second = store.get("k", TTL, recompute(json!(99), &calls)).await.unwrap();
        assert!(second.hit);
        assert_eq!(second.value, json!(3));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_recompute_writes_nothing() {
        let store = MemoryStore::new();
        let result = store
            .get(
                "k",
                TTL,
                async { Err(CachetError::Compute("boom".into())) }.boxed(),
            )
            .await;
        assert!(matches!(result, Err(CachetError::Compute(_))));
        assert!(store.peek("k").await.is_none());
    }

    #[tokio::test]
    async fn delete_missing_key_is_ok() {
        let store = MemoryStore::new();
        store.delete("nothing-here").await.unwrap();
    }

    #[tokio::test]
    async fn delete_forces_recompute() {
        let store = MemoryStore::new();
        let calls = AtomicUsize::new(0);
        store.get("k", TTL, recompute(json!(1), &calls)).await.unwrap();
        store.delete("k").await.unwrap();
        let again = store.get("k", TTL, recompute(json!(2), &calls)).await.unwrap();
        assert!(!again.hit);
        assert_eq!(again.value, json!(2));
    }

    #[tokio::test]
    async fn set_overwrites_and_stamps() {
        let store = MemoryStore::new();
        store.set("k", json!("old"), TTL).await.unwrap();
        let before = store.entry_info("k").await.unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        store.set("k", json!("new"), Duration::from_secs(60)).await.unwrap();
        let after = store.entry_info("k").await.unwrap();

        assert_eq!(store.peek("k").await, Some(json!("new")));
        assert!(after.written_at > before.written_at);
        assert_eq!(after.ttl, Duration::from_secs(60));
        assert_eq!(after.expires_at(), after.written_at + after.ttl);
    }

    #[tokio::test]
    async fn per_entry_ttl() {
        let store = MemoryStore::new();
        store.set("short", json!(1), Duration::from_millis(50)).await.unwrap();
        store.set("long", json!(2), TTL).await.unwrap();

        tokio::time::sleep(Duration::from_millis(120)).await;

        assert!(store.peek("short").await.is_none());
        assert_eq!(store.peek("long").await, Some(json!(2)));
    }

    #[tokio::test]
    async fn clear_evicts_everything() {
        let store = MemoryStore::new();
        store.set("a", json!(1), TTL).await.unwrap();
        store.set("b", json!(2), TTL).await.unwrap();
        store.clear();
        assert!(store.peek("a").await.is_none());
        assert!(!store.contains_key("b"));
    }

    #[test]
    fn config_builder_pattern() {
        let config = StoreConfig::new().max_entries(500);
        assert_eq!(config.max_entries, 500);
        assert_eq!(StoreConfig::default().max_entries, 10_000);
    }
}

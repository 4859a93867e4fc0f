//! In-process cache store for tests and single-node runs.

use super::{wrap_pattern, CacheStore};
use crate::utils::pattern_matches;
use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

const MAX_ENTRIES: u64 = 10_000;

#[derive(Clone, Debug)]
struct MemoryEntry {
    value: String,
    ttl: Duration,
}

/// Expires each entry after the TTL it was written with.
struct EntryTtl;

impl Expiry<String, MemoryEntry> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &MemoryEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    // an overwrite restarts the clock, as SETEX does
    fn expire_after_update(
        &self,
        _key: &String,
        entry: &MemoryEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// `moka`-backed store with per-entry expiry.
///
/// [`MemoryCacheStore::set_connected`] simulates an outage: while
/// disconnected it behaves exactly like an unreachable Redis.
pub struct MemoryCacheStore {
    entries: Cache<String, MemoryEntry>,
    default_ttl: Duration,
    connected: AtomicBool,
}

impl MemoryCacheStore {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(MAX_ENTRIES)
                .expire_after(EntryTtl)
                .build(),
            default_ttl,
            connected: AtomicBool::new(true),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn keys_matching(&self, pattern: &str) -> Vec<String> {
        let pattern = wrap_pattern(pattern);
        self.entries
            .iter()
            .filter(|(key, _)| pattern_matches(&pattern, key))
            .map(|(key, _)| key.to_string())
            .collect()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get_raw(&self, key: &str) -> Option<String> {
        if !self.is_connected() {
            tracing::warn!("Cache read for '{}' degraded to a miss: store offline", key);
            return None;
        }
        self.entries.get(key).await.map(|entry| entry.value)
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Option<Duration>) -> bool {
        if !self.is_connected() {
            tracing::warn!("Cache write for '{}' skipped: store offline", key);
            return false;
        }
        let entry = MemoryEntry {
            value: value.to_string(),
            ttl: ttl.unwrap_or(self.default_ttl),
        };
        self.entries.insert(key.to_string(), entry).await;
        true
    }

    async fn delete(&self, key: &str) -> u64 {
        if !self.is_connected() || !self.entries.contains_key(key) {
            return 0;
        }
        self.entries.invalidate(key).await;
        1
    }

    async fn exists(&self, key: &str) -> bool {
        self.is_connected() && self.entries.contains_key(key)
    }

    async fn matching_keys(&self, pattern: &str) -> Vec<String> {
        if !self.is_connected() {
            return Vec::new();
        }
        self.keys_matching(pattern)
    }

    async fn clear_on_pattern(&self, pattern: &str) -> u64 {
        if !self.is_connected() {
            return 0;
        }
        let matching = self.keys_matching(pattern);
        for key in &matching {
            self.entries.invalidate(key).await;
        }
        matching.len() as u64
    }

    async fn flush_db(&self) {
        if self.is_connected() {
            self.entries.invalidate_all();
        }
    }

    async fn flush_all(&self) {
        self.flush_db().await;
    }

    async fn ping(&self) -> bool {
        self.is_connected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> MemoryCacheStore {
        let store = MemoryCacheStore::new(Duration::from_secs(60));
        store.set_raw("test1", "\"data1\"", None).await;
        store.set_raw("test5", "\"data5\"", None).await;
        store.set_raw("test55", "\"data5\"", None).await;
        store.set_raw("some_test51_text", "\"data5\"", None).await;
        store.set_raw("test25", "\"data5\"", None).await;
        store
    }

    #[tokio::test]
    async fn test_get_and_set() {
        let store = seeded().await;
        assert_eq!(store.get_raw("test1").await.as_deref(), Some("\"data1\""));
        assert_eq!(store.get_raw("test4").await, None);
        assert!(store.set_raw("test_set2", "5", None).await);
    }

    #[tokio::test]
    async fn test_exists_and_delete() {
        let store = seeded().await;
        assert!(store.exists("test1").await);
        assert!(!store.exists("notAvailable").await);
        assert_eq!(store.delete("test5").await, 1);
        assert_eq!(store.delete("notAvailable").await, 0);
        assert!(!store.exists("test5").await);
    }

    #[tokio::test]
    async fn test_clear_on_pattern() {
        let store = seeded().await;
        assert_eq!(store.clear_on_pattern("test5").await, 3);
        assert!(!store.exists("test55").await);
        assert!(!store.exists("some_test51_text").await);
        assert!(store.exists("test25").await);
        assert!(store.exists("test1").await);
        assert_eq!(store.clear_on_pattern("nothing_here").await, 0);
    }

    #[tokio::test]
    async fn test_matching_keys() {
        let store = seeded().await;
        let mut keys = store.matching_keys("test5").await;
        keys.sort();
        assert_eq!(keys, vec!["some_test51_text", "test5", "test55"]);
        assert!(store.matching_keys("nothing_here").await.is_empty());

        store.set_connected(false);
        assert!(store.matching_keys("test5").await.is_empty());
    }

    #[tokio::test]
    async fn test_overwrite_restarts_ttl() {
        let store = MemoryCacheStore::new(Duration::from_secs(60));
        store
            .set_raw("key", "\"old\"", Some(Duration::from_millis(50)))
            .await;
        store.set_raw("key", "\"new\"", None).await;

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(store.get_raw("key").await.as_deref(), Some("\"new\""));
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let store = MemoryCacheStore::new(Duration::from_secs(60));
        store
            .set_raw("short", "\"value\"", Some(Duration::from_millis(50)))
            .await;
        assert!(store.exists("short").await);

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(store.get_raw("short").await, None);
        assert!(!store.exists("short").await);
        assert_eq!(store.delete("short").await, 0);
        assert!(store.matching_keys("short").await.is_empty());
        assert_eq!(store.clear_on_pattern("short").await, 0);
    }

    #[tokio::test]
    async fn test_flush() {
        let store = seeded().await;
        store.flush_db().await;
        assert!(!store.exists("test1").await);

        store.set_raw("again", "1", None).await;
        store.flush_all().await;
        assert_eq!(store.get_raw("again").await, None);
    }

    #[tokio::test]
    async fn test_offline_store_fails_open() {
        let store = seeded().await;
        store.set_connected(false);

        assert_eq!(store.get_raw("test1").await, None);
        assert!(!store.set_raw("new", "1", None).await);
        assert!(!store.ping().await);

        store.set_connected(true);
        assert!(store.exists("test1").await);
        assert!(!store.exists("new").await);
    }
}

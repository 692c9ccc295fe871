//! Generic key/value cache with per-entry expiry.
//!
//! One type backs every cache in the service: the live snapshot, its stale
//! backup, channel avatars and subscriber counts. Entries expire lazily: an
//! expired entry is reported absent by [`TtlCache::get`] and evicted on the
//! way out. There is no capacity bound; result sets are capped upstream by
//! the scraper's `max_results`.
//!
//! The map sits behind a single `RwLock` rather than a sharded map so that
//! [`TtlCache::flush_all`] and [`TtlCache::replace_all`] are atomic with
//! respect to readers.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::time::Instant;

/// A stored value and the instant it stops being served.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    /// `None` for permanent entries.
    pub expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Shared TTL cache handle. Clone-cheap; clones see the same entries.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: Arc<RwLock<HashMap<K, CacheEntry<V>>>>,
    ttl: Option<Duration>,
}

impl<K, V> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            ttl: self.ttl,
        }
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Create a cache whose entries live for `ttl`, or forever when `None`.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self::new(Some(ttl))
    }

    pub fn permanent() -> Self {
        Self::new(None)
    }

    /// Store `value` under `key`, replacing any previous entry wholesale.
    pub fn set(&self, key: K, value: V) {
        let entry = self.entry_for(value, Instant::now());
        self.write().insert(key, entry);
    }

    /// Return the value for `key` if it has not expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        {
            let entries = self.read();
            match entries.get(key) {
                None => return None,
                Some(entry) if entry.is_fresh(now) => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        // Expired: evict, re-checking under the write lock in case a writer
        // refreshed the entry in between.
        let mut entries = self.write();
        if entries.get(key).is_some_and(|entry| !entry.is_fresh(now)) {
            entries.remove(key);
        }
        None
    }

    pub fn has(&self, key: &K) -> bool {
        let now = Instant::now();
        self.read().get(key).is_some_and(|entry| entry.is_fresh(now))
    }

    /// Remove every entry in one step.
    pub fn flush_all(&self) {
        self.write().clear();
    }

    /// Flush and repopulate under one write lock.
    ///
    /// Readers observe either the previous contents or the new contents,
    /// never an empty or partially filled map in between.
    pub fn replace_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let now = Instant::now();
        let fresh: HashMap<K, CacheEntry<V>> = entries
            .into_iter()
            .map(|(key, value)| (key, self.entry_for(value, now)))
            .collect();
        *self.write() = fresh;
    }

    /// Number of unexpired entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.read()
            .values()
            .filter(|entry| entry.is_fresh(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry_for(&self, value: V, now: Instant) -> CacheEntry<V> {
        CacheEntry {
            value,
            expires_at: self.ttl.map(|ttl| now + ttl),
        }
    }

    // A panic while holding the lock cannot leave an entry half-written
    // (every mutation is a single insert/remove/assign), so poisoning is
    // safe to ignore.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<K, CacheEntry<V>>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<K, CacheEntry<V>>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn get_returns_value_before_expiry() {
        let cache = TtlCache::with_ttl(Duration::from_secs(30));
        cache.set("UCabc".to_string(), "https://yt3.example/a.jpg".to_string());

        tokio::time::advance(Duration::from_secs(29)).await;
        assert_eq!(
            cache.get(&"UCabc".to_string()).as_deref(),
            Some("https://yt3.example/a.jpg")
        );
        assert!(cache.has(&"UCabc".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn get_reports_absent_after_expiry_and_evicts() {
        let cache = TtlCache::with_ttl(Duration::from_secs(30));
        cache.set("k", 7u64);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(!cache.has(&"k"));
        assert_eq!(cache.get(&"k"), None);
        assert_eq!(cache.read().len(), 0, "expired entry should be evicted");
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_entries_never_expire() {
        let cache = TtlCache::permanent();
        cache.set(1u8, "x");
        tokio::time::advance(Duration::from_secs(365 * 24 * 3600)).await;
        assert_eq!(cache.get(&1), Some("x"));
    }

    #[tokio::test(start_paused = true)]
    async fn set_resets_expiry() {
        let cache = TtlCache::with_ttl(Duration::from_secs(10));
        cache.set("k", 1);
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.set("k", 2);
        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(cache.get(&"k"), Some(2));
    }

    #[test]
    fn flush_all_clears_everything() {
        let cache = TtlCache::permanent();
        cache.set("a", 1);
        cache.set("b", 2);
        cache.flush_all();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&"a"), None);
    }

    #[test]
    fn replace_all_drops_keys_not_in_new_contents() {
        let cache = TtlCache::permanent();
        cache.set("old", 1);
        cache.replace_all([("new", 2), ("newer", 3)]);
        assert_eq!(cache.get(&"old"), None);
        assert_eq!(cache.get(&"new"), Some(2));
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn len_ignores_expired_entries() {
        let cache = TtlCache::with_ttl(Duration::from_secs(5));
        cache.set("a", 1);
        tokio::time::advance(Duration::from_secs(3)).await;
        cache.set("b", 2);
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clones_share_entries() {
        let cache = TtlCache::permanent();
        let other = cache.clone();
        other.set("shared", true);
        assert_eq!(cache.get(&"shared"), Some(true));
    }
}

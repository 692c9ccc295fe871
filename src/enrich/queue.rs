//! Deduplicated pending-work set for one enrichment kind.

use indexmap::IndexSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Insertion-ordered set of channel ids awaiting enrichment.
///
/// A key stays in the set while it is being processed, so re-seeding an
/// in-flight key is a no-op; the worker removes it once the attempt is over.
#[derive(Debug, Clone, Default)]
pub struct PendingSet {
    keys: Arc<Mutex<IndexSet<String>>>,
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `key`. Returns `false` if it was already pending.
    pub fn insert(&self, key: &str) -> bool {
        let mut keys = self.lock();
        if keys.contains(key) {
            return false;
        }
        keys.insert(key.to_string())
    }

    /// The oldest pending key, left in place.
    pub fn front(&self) -> Option<String> {
        self.lock().first().cloned()
    }

    pub fn remove(&self, key: &str) -> bool {
        self.lock().shift_remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the pending keys in queue order.
    pub fn keys(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, IndexSet<String>> {
        self.keys.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent() {
        let set = PendingSet::new();
        assert!(set.insert("@alpha"));
        assert!(!set.insert("@alpha"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn front_follows_insertion_order_and_survives_removal() {
        let set = PendingSet::new();
        set.insert("@a");
        set.insert("@b");
        set.insert("@c");
        assert_eq!(set.front().as_deref(), Some("@a"));

        assert!(set.remove("@a"));
        assert_eq!(set.front().as_deref(), Some("@b"));
        assert!(set.remove("@c"));
        assert_eq!(set.keys(), ["@b"]);
    }

    #[test]
    fn front_does_not_pop() {
        let set = PendingSet::new();
        set.insert("@a");
        set.front();
        assert!(set.contains("@a"));
        assert!(!set.insert("@a"));
    }

    #[test]
    fn removing_missing_key_is_noop() {
        let set = PendingSet::new();
        assert!(!set.remove("@nobody"));
        assert!(set.is_empty());
    }
}

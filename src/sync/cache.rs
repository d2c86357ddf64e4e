//! Pass-scoped remote id → local key cache.
//!
//! Besides the map, the cache remembers how many positions of the item
//! sequence have already been visited. The resolver resumes scanning from
//! that cursor, so every item is loaded at most once per pass no matter how
//! many lookups miss. Once a scan has run off the end of the sequence the
//! cache is marked exhausted and later misses skip the scan entirely.

use std::collections::HashMap;

use crate::storage::ItemKey;

#[derive(Debug, Default)]
pub struct IdCache {
    keys: HashMap<String, ItemKey>,
    visited: usize,
    exhausted: bool,
}

impl IdCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, remote_id: &str) -> Option<ItemKey> {
        self.keys.get(remote_id).copied()
    }

    /// Inserting an id that is already cached overwrites the key.
    pub fn insert(&mut self, remote_id: &str, key: ItemKey) {
        self.keys.insert(remote_id.to_string(), key);
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Number of leading item-sequence positions already inspected.
    ///
    /// Differs from [`len`](Self::len) when items without a source id or with
    /// duplicate source ids have been scanned.
    pub fn visited(&self) -> usize {
        self.visited
    }

    pub(crate) fn mark_visited(&mut self) {
        self.visited += 1;
    }

    /// Every item of the sequence has been visited; a miss is final.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub(crate) fn mark_exhausted(&mut self) {
        self.exhausted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_miss_on_empty_cache() {
        let cache = IdCache::new();
        assert_eq!(cache.lookup("tag:google.com,2005:reader/item/1"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_insert_then_lookup() {
        let mut cache = IdCache::new();
        cache.insert("a", 10);
        cache.insert("b", 11);
        assert_eq!(cache.lookup("a"), Some(10));
        assert_eq!(cache.lookup("b"), Some(11));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_reinsert_overwrites_without_growing() {
        let mut cache = IdCache::new();
        cache.insert("a", 10);
        cache.insert("a", 12);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup("a"), Some(12));
    }

    #[test]
    fn test_lookup_is_exact() {
        let mut cache = IdCache::new();
        cache.insert("Read", 1);
        assert_eq!(cache.lookup("read"), None);
        assert_eq!(cache.lookup("Read "), None);
    }

    #[test]
    fn test_visited_cursor_is_independent_of_len() {
        let mut cache = IdCache::new();
        cache.mark_visited();
        cache.mark_visited();
        cache.insert("a", 1);
        assert_eq!(cache.visited(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_exhausted_only_once_marked() {
        let mut cache = IdCache::new();
        assert!(!cache.is_exhausted());
        cache.mark_visited();
        assert!(!cache.is_exhausted());
        cache.mark_exhausted();
        assert!(cache.is_exhausted());
        assert_eq!(cache.visited(), 1);
    }
}

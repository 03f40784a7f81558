//! Byte-budgeted LRU memory tier.

use std::sync::Arc;

use lru::LruCache;

use crate::artwork::{CacheKey, CachedImage};

/// One memory sub-tier.
///
/// Entries are charged by [`CachedImage::byte_size`]. When the budget is
/// exceeded, least-recently-used entries are evicted; the most recent
/// insertion is always kept, even if it alone exceeds the budget.
pub struct MemoryTier {
    entries: LruCache<CacheKey, Arc<CachedImage>>,
    budget_bytes: usize,
    used_bytes: usize,
}

impl MemoryTier {
    pub fn new(budget_bytes: usize) -> Self {
        Self {
            entries: LruCache::unbounded(),
            budget_bytes,
            used_bytes: 0,
        }
    }

    /// Look up an entry, marking it most recently used.
    pub fn get(&mut self, key: &CacheKey) -> Option<Arc<CachedImage>> {
        self.entries.get(key).cloned()
    }

    /// Check for an entry without touching recency.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains(key)
    }

    pub fn put(&mut self, key: CacheKey, image: Arc<CachedImage>) {
        let size = image.byte_size();
        if let Some(previous) = self.entries.put(key, image) {
            self.used_bytes -= previous.byte_size();
        }
        self.used_bytes += size;
        self.trim();
    }

    fn trim(&mut self) {
        while self.used_bytes > self.budget_bytes && self.entries.len() > 1 {
            let Some((key, evicted)) = self.entries.pop_lru() else {
                break;
            };
            self.used_bytes -= evicted.byte_size();
            tracing::debug!(key = %key, "Evicted from memory tier");
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.used_bytes = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    pub fn budget_bytes(&self) -> usize {
        self.budget_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artwork::{ArtIdentity, ArtworkKind};
    use crate::test_utils::sample_image;

    fn key(album: &str) -> CacheKey {
        CacheKey::new(&ArtIdentity::album("Low", album), ArtworkKind::Thumbnail).unwrap()
    }

    #[test]
    fn test_put_and_get() {
        let mut tier = MemoryTier::new(usize::MAX);
        let image = sample_image(ArtworkKind::Thumbnail);
        tier.put(key("Things We Lost in the Fire"), image.clone());

        let cached = tier.get(&key("Things We Lost in the Fire")).unwrap();
        assert_eq!(*cached, *image);
        assert_eq!(tier.used_bytes(), image.byte_size());
    }

    #[test]
    fn test_replacing_entry_keeps_accounting() {
        let mut tier = MemoryTier::new(usize::MAX);
        let image = sample_image(ArtworkKind::Thumbnail);
        tier.put(key("C'mon"), image.clone());
        tier.put(key("C'mon"), image.clone());
        assert_eq!(tier.len(), 1);
        assert_eq!(tier.used_bytes(), image.byte_size());
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let image = sample_image(ArtworkKind::Thumbnail);
        let mut tier = MemoryTier::new(image.byte_size() * 2);

        tier.put(key("a"), image.clone());
        tier.put(key("b"), image.clone());
        // Touch "a" so "b" becomes the eviction candidate
        assert!(tier.get(&key("a")).is_some());
        tier.put(key("c"), image.clone());

        assert!(tier.contains(&key("a")));
        assert!(!tier.contains(&key("b")));
        assert!(tier.contains(&key("c")));
        assert!(tier.used_bytes() <= tier.budget_bytes());
    }

    #[test]
    fn test_oversized_entry_is_kept_alone() {
        let image = sample_image(ArtworkKind::Thumbnail);
        let mut tier = MemoryTier::new(1);
        tier.put(key("a"), image.clone());
        tier.put(key("b"), image.clone());
        assert_eq!(tier.len(), 1);
        assert!(tier.contains(&key("b")));
    }

    #[test]
    fn test_clear() {
        let mut tier = MemoryTier::new(usize::MAX);
        tier.put(key("a"), sample_image(ArtworkKind::Thumbnail));
        tier.clear();
        assert!(tier.is_empty());
        assert_eq!(tier.used_bytes(), 0);
    }
}

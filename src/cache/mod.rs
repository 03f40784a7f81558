//! Two-tier artwork cache.
//!
//! - **Memory tier**: two independently budgeted LRU sub-tiers, one per
//!   [`ArtworkKind`], so a handful of large full-size images cannot starve
//!   the thumbnail working set.
//! - **Disk tier**: [`DiskCache`], one compressed payload per key.
//!
//! `put` only touches memory. Disk writes go through the
//! [`WriteBehindQueue`] so cache population never waits on disk I/O.
//! Disk hits are treated as always fresh; there is no staleness policy.
//!
//! Every `clear_all` starts a new epoch. Writes tagged with an earlier epoch
//! (queued disk writes, fetches that were in flight during the clear) are
//! dropped, so a clear cannot be undone by work that predates it.

mod disk;
mod memory;
mod write_behind;

pub use disk::{DiskCache, hash_key};
pub use memory::MemoryTier;
pub use write_behind::{WriteBehindQueue, WriteBehindStats};

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::artwork::{ArtworkKind, CacheKey, CachedImage};
use crate::config::CacheConfig;
use crate::error::{Result, ResultExt};

/// Byte budgets for the two memory sub-tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryBudget {
    pub thumbnail_bytes: usize,
    pub full_bytes: usize,
}

impl Default for MemoryBudget {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

impl From<&CacheConfig> for MemoryBudget {
    fn from(config: &CacheConfig) -> Self {
        Self {
            thumbnail_bytes: config.thumbnail_memory_bytes,
            full_bytes: config.full_memory_bytes,
        }
    }
}

/// Snapshot of memory tier occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryUsage {
    pub thumbnail_entries: usize,
    pub thumbnail_bytes: usize,
    pub full_entries: usize,
    pub full_bytes: usize,
}

impl MemoryUsage {
    pub fn entries(&self) -> usize {
        self.thumbnail_entries + self.full_entries
    }
}

/// Memory + disk artwork store.
pub struct CacheStore {
    thumbnails: Mutex<MemoryTier>,
    full: Mutex<MemoryTier>,
    disk: DiskCache,
    /// Held shared by tagged writes, exclusively by `clear_all`
    epoch: RwLock<u64>,
}

impl CacheStore {
    pub fn new(budget: MemoryBudget, disk: DiskCache) -> Self {
        Self {
            thumbnails: Mutex::new(MemoryTier::new(budget.thumbnail_bytes)),
            full: Mutex::new(MemoryTier::new(budget.full_bytes)),
            disk,
            epoch: RwLock::new(0),
        }
    }

    /// Build a store from the `[cache]` config section.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            MemoryBudget::from(config),
            DiskCache::new(config.disk_dir(), config.disk_max_bytes),
        )
    }

    fn tier(&self, kind: ArtworkKind) -> &Mutex<MemoryTier> {
        match kind {
            ArtworkKind::Thumbnail => &self.thumbnails,
            ArtworkKind::Full => &self.full,
        }
    }

    /// Memory tier, then disk tier.
    ///
    /// A disk hit is decoded and promoted into the memory tier. This does
    /// blocking I/O on a miss; async callers should use `spawn_blocking`.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<CachedImage>> {
        if let Some(image) = self.get_memory(key) {
            return Some(image);
        }

        let epoch = self.epoch();
        let bytes = self.disk.get(key.as_str())?;
        match CachedImage::from_encoded(bytes) {
            Ok(image) => {
                let image = Arc::new(image);
                if self.put_at(epoch, key.clone(), image.clone()) {
                    tracing::debug!(key = %key, "Promoted disk entry to memory");
                }
                Some(image)
            }
            Err(e) => {
                tracing::warn!(key = %key, "Discarding undecodable disk entry: {}", e);
                let _ = self.disk.remove(key.as_str());
                None
            }
        }
    }

    /// Memory tier only.
    pub fn get_memory(&self, key: &CacheKey) -> Option<Arc<CachedImage>> {
        self.tier(key.kind()).lock().get(key)
    }

    /// Insert into the memory tier.
    pub fn put(&self, key: CacheKey, image: Arc<CachedImage>) {
        self.tier(key.kind()).lock().put(key, image);
    }

    /// Current clear epoch. Tag deferred writes with it.
    pub fn epoch(&self) -> u64 {
        *self.epoch.read()
    }

    /// Insert into the memory tier unless a clear happened since `epoch`.
    ///
    /// Returns false if the image was dropped.
    pub fn put_at(&self, epoch: u64, key: CacheKey, image: Arc<CachedImage>) -> bool {
        let current = self.epoch.read();
        if *current != epoch {
            return false;
        }
        self.tier(key.kind()).lock().put(key, image);
        true
    }

    /// Write an image's payload to the disk tier.
    pub fn persist(&self, key: &CacheKey, image: &CachedImage) -> Result<()> {
        self.disk
            .put(key.as_str(), image.encoded())
            .with_context(format!("writing {} to disk cache", key))?;
        Ok(())
    }

    /// `persist` unless a clear happened since `epoch`.
    ///
    /// Returns `Ok(false)` if the write was dropped. A running clear waits
    /// for this write to finish.
    pub fn persist_at(&self, epoch: u64, key: &CacheKey, image: &CachedImage) -> Result<bool> {
        let current = self.epoch.read();
        if *current != epoch {
            return Ok(false);
        }
        self.persist(key, image)?;
        Ok(true)
    }

    pub fn contains_on_disk(&self, key: &CacheKey) -> bool {
        self.disk.contains(key.as_str())
    }

    /// Drop both memory sub-tiers. The disk tier is untouched.
    pub fn evict_memory(&self) {
        self.thumbnails.lock().clear();
        self.full.lock().clear();
        tracing::info!("Evicted artwork memory caches");
    }

    /// Drop both memory sub-tiers and delete every disk entry.
    ///
    /// Starts a new epoch first, so writes tagged before the call never land.
    pub fn clear_all(&self) -> Result<()> {
        let mut epoch = self.epoch.write();
        *epoch += 1;
        self.evict_memory();
        self.disk
            .clear()
            .with_context(format!("clearing disk cache {:?}", self.disk.dir()))?;
        tracing::info!("Cleared artwork disk cache");
        Ok(())
    }

    pub fn disk_size_bytes(&self) -> u64 {
        self.disk.size_bytes()
    }

    pub fn memory_usage(&self) -> MemoryUsage {
        let thumbnails = self.thumbnails.lock();
        let full = self.full.lock();
        MemoryUsage {
            thumbnail_entries: thumbnails.len(),
            thumbnail_bytes: thumbnails.used_bytes(),
            full_entries: full.len(),
            full_bytes: full.used_bytes(),
        }
    }
}

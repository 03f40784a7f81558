//! Artwork disk cache.
//!
//! Persists compressed artwork so it survives restarts. Entries are addressed
//! by the SHA-256 of their cache key, which keeps file names filesystem-safe
//! whatever the artist, album or URI contains.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use parking_lot::Mutex;
use sha2::{Digest, Sha256};

/// Extension of finished entries.
const ENTRY_EXT: &str = "jpg";
/// Extension of in-progress writes.
const TEMP_EXT: &str = "tmp";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Artwork disk cache.
pub struct DiskCache {
    cache_dir: PathBuf,
    max_bytes: u64,
    /// Running size of the entries; `None` until first measured
    used_bytes: Mutex<Option<u64>>,
}

impl DiskCache {
    /// Create a new cache in the specified directory.
    ///
    /// `max_bytes` of zero means unbounded.
    pub fn new(cache_dir: impl Into<PathBuf>, max_bytes: u64) -> Self {
        let cache_dir = cache_dir.into();
        // Ensure cache directory exists
        let _ = fs::create_dir_all(&cache_dir);
        Self {
            cache_dir,
            max_bytes,
            used_bytes: Mutex::new(None),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Read the payload stored under a key.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let path = self.cache_path(key);
        let data = fs::read(&path).ok()?;

        // Refresh recency for trimming; failure only affects eviction order
        if let Ok(file) = fs::File::options().write(true).open(&path) {
            let _ = file.set_modified(SystemTime::now());
        }

        Some(data)
    }

    /// Store a payload under a key.
    ///
    /// The payload is written to a temp file and renamed into place, so
    /// concurrent readers see either the old entry or the new one.
    pub fn put(&self, key: &str, data: &[u8]) -> Result<PathBuf, std::io::Error> {
        fs::create_dir_all(&self.cache_dir)?;

        let path = self.cache_path(key);
        let temp_path = path.with_extension(format!(
            "{}.{}",
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed),
            TEMP_EXT
        ));

        let previous = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        if let Err(e) = fs::write(&temp_path, data) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
        if let Err(e) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        if self.max_bytes > 0 {
            self.account(previous, data.len() as u64, &path);
        }
        Ok(path)
    }

    /// Check if a key is cached.
    pub fn contains(&self, key: &str) -> bool {
        self.cache_path(key).exists()
    }

    /// Remove one entry, if present.
    pub fn remove(&self, key: &str) -> Result<(), std::io::Error> {
        let path = self.cache_path(key);
        let len = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        match fs::remove_file(&path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            Err(_) => Ok(()),
            Ok(()) => {
                if let Some(used) = self.used_bytes.lock().as_mut() {
                    *used = used.saturating_sub(len);
                }
                Ok(())
            }
        }
    }

    /// Clear all cached entries.
    pub fn clear(&self) -> Result<(), std::io::Error> {
        // Re-measure on the next write, whatever survives a partial clear
        *self.used_bytes.lock() = None;
        if self.cache_dir.exists() {
            for entry in fs::read_dir(&self.cache_dir)? {
                let entry = entry?;
                if entry.file_type()?.is_file() {
                    fs::remove_file(entry.path())?;
                }
            }
        }
        Ok(())
    }

    /// Get the total size of the cache in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.entries().iter().map(|(_, len, _)| len).sum()
    }

    /// Update the running size after a write and trim once it crosses the
    /// ceiling. Only the first write and trims scan the directory.
    fn account(&self, previous: u64, written: u64, keep: &Path) {
        let mut used = self.used_bytes.lock();
        let total = match *used {
            Some(total) => total.saturating_sub(previous) + written,
            None => self.entries().iter().map(|(_, len, _)| len).sum(),
        };
        *used = Some(if total > self.max_bytes {
            self.trim(keep)
        } else {
            total
        });
    }

    /// Drop the oldest entries until the cache fits its ceiling. Returns
    /// the measured size afterwards.
    fn trim(&self, keep: &Path) -> u64 {
        let mut entries = self.entries();
        let mut total: u64 = entries.iter().map(|(_, len, _)| len).sum();
        if total <= self.max_bytes {
            return total;
        }

        entries.sort_by_key(|(_, _, modified)| *modified);
        for (path, len, _) in entries {
            if total <= self.max_bytes {
                break;
            }
            if path == keep {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    total = total.saturating_sub(len);
                    tracing::debug!("Trimmed disk cache entry {:?}", path);
                }
                Err(e) => tracing::warn!("Failed to trim disk cache entry {:?}: {}", path, e),
            }
        }
        total
    }

    /// Finished entries with their size and modification time.
    fn entries(&self) -> Vec<(PathBuf, u64, SystemTime)> {
        let Ok(read_dir) = fs::read_dir(&self.cache_dir) else {
            return Vec::new();
        };
        read_dir
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some(ENTRY_EXT))
            .filter_map(|e| {
                let meta = e.metadata().ok()?;
                meta.is_file().then(|| {
                    let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                    (e.path(), meta.len(), modified)
                })
            })
            .collect()
    }

    /// Get the cache path for a key.
    fn cache_path(&self, key: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}.{}", hash_key(key), ENTRY_EXT))
    }
}

/// SHA-256 of a cache key as lowercase hex.
pub fn hash_key(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    format!("{:x}", digest)
}

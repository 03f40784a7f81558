//! Test utilities and fixtures for artwork-minder tests.
//!
//! # Example
//!
//! ```ignore
//! use artwork_minder::test_utils::{sample_png, temp_store};
//!
//! #[test]
//! fn test_something() {
//!     let (store, _dir) = temp_store();
//!     let bytes = sample_png(64, 64);
//!     // ... test logic
//! }
//! ```

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use image::{ImageFormat, Rgba, RgbaImage};
use tempfile::TempDir;

use crate::artwork::{ArtworkKind, CachedImage, DecodeOptions};
use crate::cache::{CacheStore, DiskCache, MemoryBudget};

/// Encode a two-tone PNG of the given size.
///
/// The left three quarters are dark blue, the rest orange, so palettes
/// have a predictable dominant colour.
pub fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, _| {
        if x * 4 < width * 3 {
            Rgba([20, 30, 120, 255])
        } else {
            Rgba([230, 120, 20, 255])
        }
    });
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, ImageFormat::Png)
        .expect("Failed to encode sample PNG");
    cursor.into_inner()
}

/// A decoded sample image of the given kind.
pub fn sample_image(kind: ArtworkKind) -> Arc<CachedImage> {
    let bytes = sample_png(64, 48);
    Arc::new(
        CachedImage::decode(&bytes, kind, &DecodeOptions::default())
            .expect("Failed to decode sample image"),
    )
}

/// Creates a cache store backed by a temporary directory.
///
/// Keep the `TempDir` alive for the duration of your test.
pub fn temp_store() -> (Arc<CacheStore>, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let disk = DiskCache::new(dir.path().join("artwork"), 0);
    let store = CacheStore::new(MemoryBudget::default(), disk);
    (Arc::new(store), dir)
}

/// Poll `condition` until it holds or `timeout` passes.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Blocking variant of [`wait_until`] for threaded tests.
pub fn wait_until_blocking(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if std::time::Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_png_decodes() {
        let bytes = sample_png(10, 10);
        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!(img.width(), 10);
    }

    #[test]
    fn test_temp_store_starts_empty() {
        let (store, _dir) = temp_store();
        assert_eq!(store.disk_size_bytes(), 0);
        assert_eq!(store.memory_usage().entries(), 0);
    }
}

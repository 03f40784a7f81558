//! On-device artwork reads.
//!
//! A local URI names either an image file directly or a media file / album
//! directory. For the latter we look for sidecar artwork next to it:
//! - cover.jpg, cover.png
//! - folder.jpg, folder.png
//! - album.jpg, front.jpg, artwork.jpg, albumart.jpg

use std::path::{Path, PathBuf};

use super::domain::SourceError;

/// Common cover art filenames (lowercase for matching)
const COVER_FILENAMES: &[&str] = &["cover", "folder", "album", "front", "artwork", "albumart"];

/// Extensions the decoder can read. Keep in step with the `image` crate
/// features in Cargo.toml.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Reads artwork from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileMediaSource;

impl FileMediaSource {
    pub fn new() -> Self {
        Self
    }

    /// Read the artwork bytes a local URI refers to.
    pub async fn read(&self, uri: &str) -> Result<Vec<u8>, SourceError> {
        let path = to_path(uri)?;
        let owned_uri = uri.to_string();

        tokio::task::spawn_blocking(move || read_artwork(&path))
            .await
            .map_err(|e| local_error(&owned_uri, e))?
            .map_err(|message| SourceError::LocalRead {
                uri: owned_uri,
                message,
            })
    }
}

fn local_error(uri: &str, message: impl ToString) -> SourceError {
    SourceError::LocalRead {
        uri: uri.to_string(),
        message: message.to_string(),
    }
}

/// Map a `file://` URI or bare path to a filesystem path.
fn to_path(uri: &str) -> Result<PathBuf, SourceError> {
    if let Some(rest) = uri.strip_prefix("file://") {
        let decoded = urlencoding::decode(rest).map_err(|e| local_error(uri, e))?;
        return Ok(PathBuf::from(decoded.into_owned()));
    }

    // content:// and android.resource:// need a platform media resolver
    if uri.contains("://") {
        return Err(local_error(uri, "unsupported URI scheme"));
    }

    Ok(PathBuf::from(uri))
}

fn read_artwork(path: &Path) -> Result<Vec<u8>, String> {
    let meta = std::fs::metadata(path).map_err(|e| e.to_string())?;

    let image_path = if meta.is_dir() {
        find_sidecar(path)
    } else if has_image_extension(path) {
        Some(path.to_path_buf())
    } else {
        path.parent().and_then(find_sidecar)
    };

    let image_path = image_path.ok_or_else(|| "no artwork found".to_string())?;
    std::fs::read(&image_path).map_err(|e| format!("{}: {}", image_path.display(), e))
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Find sidecar cover art in `dir`.
fn find_sidecar(dir: &Path) -> Option<PathBuf> {
    // Try each known cover filename
    for name in COVER_FILENAMES {
        for ext in IMAGE_EXTENSIONS {
            let cover_path = dir.join(format!("{}.{}", name, ext));
            if cover_path.is_file() {
                return Some(cover_path);
            }
        }
    }

    // Also check for case variations on case-sensitive filesystems
    let entries = std::fs::read_dir(dir).ok()?;
    entries.filter_map(|e| e.ok()).map(|e| e.path()).find(|path| {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());
        path.is_file()
            && has_image_extension(path)
            && stem.is_some_and(|stem| COVER_FILENAMES.contains(&stem.as_str()))
    })
}

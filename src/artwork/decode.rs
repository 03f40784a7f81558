//! Decoded images and their compressed payloads.

use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat, RgbaImage};

use super::identity::ArtworkKind;
use super::palette::Palette;
use crate::config::CacheConfig;
use crate::error::Result;

/// Target sizes for each artwork kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Longest edge of a thumbnail, in pixels
    pub thumbnail_size: u32,
    /// Longest edge of a full-size image, in pixels
    pub full_size: u32,
}

impl DecodeOptions {
    pub fn max_edge(&self, kind: ArtworkKind) -> u32 {
        match kind {
            ArtworkKind::Thumbnail => self.thumbnail_size,
            ArtworkKind::Full => self.full_size,
        }
    }
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

impl From<&CacheConfig> for DecodeOptions {
    fn from(config: &CacheConfig) -> Self {
        Self {
            thumbnail_size: config.thumbnail_size.max(1),
            full_size: config.full_size.max(1),
        }
    }
}

/// A decoded image ready for display, plus the compressed bytes the disk
/// tier stores and the fast-path snapshot hands out.
#[derive(Clone, PartialEq)]
pub struct CachedImage {
    pixels: Arc<RgbaImage>,
    encoded: Arc<[u8]>,
    palette: Palette,
}

impl CachedImage {
    /// Decode source bytes once and produce both kinds.
    ///
    /// Returns `(thumbnail, full)`.
    pub fn decode_both(bytes: &[u8], options: &DecodeOptions) -> Result<(Self, Self)> {
        let source = image::load_from_memory(bytes)?;
        let thumbnail = Self::from_dynamic(&source, ArtworkKind::Thumbnail, options)?;
        let full = Self::from_dynamic(&source, ArtworkKind::Full, options)?;
        Ok((thumbnail, full))
    }

    /// Decode source bytes at one kind's resolution.
    pub fn decode(bytes: &[u8], kind: ArtworkKind, options: &DecodeOptions) -> Result<Self> {
        let source = image::load_from_memory(bytes)?;
        Self::from_dynamic(&source, kind, options)
    }

    /// Rebuild an image from a payload previously written by the disk tier.
    pub fn from_encoded(encoded: Vec<u8>) -> Result<Self> {
        let pixels = image::load_from_memory(&encoded)?.to_rgba8();
        let palette = Palette::extract(&pixels);
        Ok(Self {
            pixels: Arc::new(pixels),
            encoded: encoded.into(),
            palette,
        })
    }

    fn from_dynamic(source: &DynamicImage, kind: ArtworkKind, options: &DecodeOptions) -> Result<Self> {
        let max_edge = options.max_edge(kind);
        let fitted = if source.width() <= max_edge && source.height() <= max_edge {
            source.clone()
        } else {
            match kind {
                ArtworkKind::Thumbnail => source.thumbnail(max_edge, max_edge),
                ArtworkKind::Full => {
                    source.resize(max_edge, max_edge, image::imageops::FilterType::Triangle)
                }
            }
        };

        let encoded = encode_jpeg(&fitted)?;
        let pixels = fitted.to_rgba8();
        let palette = Palette::extract(&pixels);

        Ok(Self {
            pixels: Arc::new(pixels),
            encoded: encoded.into(),
            palette,
        })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Compressed (JPEG) payload.
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Bytes charged against a memory tier budget.
    pub fn byte_size(&self) -> usize {
        self.pixels.as_raw().len() + self.encoded.len()
    }
}

impl fmt::Debug for CachedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("encoded_len", &self.encoded.len())
            .field("dominant", &self.palette.dominant())
            .finish()
    }
}

fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>> {
    // JPEG has no alpha channel
    let rgb = image.to_rgb8();
    let mut cursor = Cursor::new(Vec::new());
    rgb.write_to(&mut cursor, ImageFormat::Jpeg)?;
    Ok(cursor.into_inner())
}

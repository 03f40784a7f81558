//! Artwork domain model.
//!
//! These are the types every other layer speaks:
//!
//! - [`ArtIdentity`] - who the artwork is for (album, artist, or an explicit URI)
//! - [`ArtworkKind`] - thumbnail or full-size resolution class
//! - [`CacheKey`] - the fingerprint used by both cache tiers and request coalescing
//! - [`CachedImage`] - decoded pixels, the compressed payload, and a [`Palette`]

mod decode;
mod identity;
mod palette;

pub use decode::{CachedImage, DecodeOptions};
pub use identity::{ArtIdentity, ArtSubject, ArtworkKind, CacheKey, is_local_uri};
pub use palette::{Palette, Swatch};

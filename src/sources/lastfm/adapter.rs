//! Adapter layer: Convert Last.fm DTOs to domain models
//!
//! This is the ONLY place where DTO types are converted to domain types.

use super::dto;
use crate::sources::domain::{ArtworkInfo, ImageCandidate, ImageSize, SourceError};

/// Convert an `album.getInfo` response
pub fn album_to_info(response: dto::AlbumInfoResponse) -> ArtworkInfo {
    let album = response.album;
    ArtworkInfo {
        name: Some(album.name),
        mbid: non_empty(album.mbid),
        images: to_candidates(album.image),
    }
}

/// Convert an `artist.getInfo` response
pub fn artist_to_info(response: dto::ArtistInfoResponse) -> ArtworkInfo {
    let artist = response.artist;
    ArtworkInfo {
        name: Some(artist.name),
        mbid: non_empty(artist.mbid),
        images: to_candidates(artist.image),
    }
}

/// Map an API error body to a source error
pub(super) fn to_source_error(error: dto::ApiError) -> SourceError {
    match error.error {
        dto::ERROR_INVALID_PARAMETERS => SourceError::NotFound,
        dto::ERROR_RATE_LIMITED => SourceError::RateLimited,
        dto::ERROR_INVALID_API_KEY => SourceError::NotConfigured(error.message),
        code => SourceError::Api(format!("{}: {}", code, error.message)),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Keep images with a URL and a known size label
fn to_candidates(images: Vec<dto::Image>) -> Vec<ImageCandidate> {
    images
        .into_iter()
        .filter(|image| !image.url.trim().is_empty())
        .filter_map(|image| {
            Some(ImageCandidate {
                size: ImageSize::from_label(&image.size)?,
                url: image.url,
            })
        })
        .collect()
}

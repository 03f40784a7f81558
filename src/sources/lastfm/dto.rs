//! Last.fm API Data Transfer Objects
//!
//! These types match what the Last.fm JSON API returns.
//! DO NOT use these types outside the lastfm module - convert to domain types.
//!
//! API Reference: https://www.last.fm/api/show/album.getInfo

use serde::{Deserialize, Serialize};

/// `album.getInfo` response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlbumInfoResponse {
    pub album: Album,
}

/// `artist.getInfo` response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArtistInfoResponse {
    pub artist: Artist,
}

/// Album info
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Album {
    pub name: String,
    /// Artist name (a plain string here, unlike in search results)
    pub artist: Option<String>,
    /// MusicBrainz release ID; often an empty string
    #[serde(default)]
    pub mbid: Option<String>,
    /// Last.fm page
    pub url: Option<String>,
    #[serde(default)]
    pub image: Vec<Image>,
}

/// Artist info
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Artist {
    pub name: String,
    /// MusicBrainz artist ID; often an empty string
    #[serde(default)]
    pub mbid: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub image: Vec<Image>,
}

/// One image size
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Image {
    /// Image URL; empty when Last.fm has no image of this size
    #[serde(rename = "#text")]
    pub url: String,
    /// "small", "medium", "large", "extralarge", "mega" or ""
    #[serde(default)]
    pub size: String,
}

/// Error body. Last.fm sends these with HTTP 200 as well as 4xx.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    pub error: u32,
    #[serde(default)]
    pub message: String,
}

/// Invalid parameters; what Last.fm returns for unknown albums/artists
pub const ERROR_INVALID_PARAMETERS: u32 = 6;
/// Invalid API key
pub const ERROR_INVALID_API_KEY: u32 = 10;
/// Rate limit exceeded
pub const ERROR_RATE_LIMITED: u32 = 29;

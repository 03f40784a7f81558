//! Internal domain models for artwork sources.
//!
//! These are OUR types - they don't change when external APIs change.
//! Metadata API responses get converted into [`ArtworkInfo`] via adapters.

use std::fmt;

/// A means of obtaining artwork bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// On-device media at the identity's URI
    LocalMedia,
    /// HTTP GET of the identity's URI
    DirectUrl,
    /// Metadata API lookup for an image URL, then HTTP GET
    MetadataApi,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LocalMedia => "local-media",
            Self::DirectUrl => "direct-url",
            Self::MetadataApi => "metadata-api",
        })
    }
}

/// Connectivity snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetworkState {
    /// Connected over Wi-Fi
    pub wifi: bool,
    /// Connected over any network (Wi-Fi included)
    pub connected: bool,
}

impl NetworkState {
    pub const WIFI: Self = Self {
        wifi: true,
        connected: true,
    };
    pub const CELLULAR: Self = Self {
        wifi: false,
        connected: true,
    };
    pub const OFFLINE: Self = Self {
        wifi: false,
        connected: false,
    };

    /// Online for discretionary downloads.
    ///
    /// Wi-Fi always counts; other networks only when the user allows them.
    pub fn online(&self, only_on_wifi: bool) -> bool {
        self.wifi || (self.connected && !only_on_wifi)
    }

    /// Any connection at all.
    pub fn any(&self) -> bool {
        self.wifi || self.connected
    }
}

/// Image sizes a metadata API offers, smallest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImageSize {
    Small,
    Medium,
    Large,
    ExtraLarge,
    Mega,
}

impl ImageSize {
    /// Parse an API size label.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "small" => Some(Self::Small),
            "medium" => Some(Self::Medium),
            "large" => Some(Self::Large),
            "extralarge" => Some(Self::ExtraLarge),
            "mega" => Some(Self::Mega),
            _ => None,
        }
    }
}

/// One downloadable image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    pub size: ImageSize,
    pub url: String,
}

/// Album or artist metadata relevant to artwork.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtworkInfo {
    /// Album or artist name as the service knows it
    pub name: Option<String>,
    /// MusicBrainz ID; entries without one are not trusted
    pub mbid: Option<String>,
    /// Candidate images
    pub images: Vec<ImageCandidate>,
}

impl ArtworkInfo {
    /// Pick the image to download.
    ///
    /// The largest image wins; with `low_resolution` the largest image no
    /// bigger than [`ImageSize::Large`] wins instead, falling back to the
    /// smallest available.
    pub fn best_image_url(&self, low_resolution: bool) -> Option<&str> {
        let best = if low_resolution {
            self.images
                .iter()
                .filter(|c| c.size <= ImageSize::Large)
                .max_by_key(|c| c.size)
                .or_else(|| self.images.iter().min_by_key(|c| c.size))
        } else {
            self.images.iter().max_by_key(|c| c.size)
        };
        best.map(|c| c.url.as_str())
    }
}

/// Errors from a single source attempt.
///
/// These never reach callers; the pipeline logs them and moves on to the
/// next source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {reason}")]
    Http { status: u16, reason: String },

    #[error("Not found")]
    NotFound,

    #[error("Rate limited - try again later")]
    RateLimited,

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("API request failed: {0}")]
    Api(String),

    #[error("Metadata has no stable identifier")]
    MissingIdentifier,

    #[error("No usable image")]
    NoImage,

    #[error("Failed to read local media {uri}: {message}")]
    LocalRead { uri: String, message: String },

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Source not configured: {0}")]
    NotConfigured(String),

    #[error("Cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(sizes: &[ImageSize]) -> ArtworkInfo {
        ArtworkInfo {
            name: Some("Double Negative".to_string()),
            mbid: Some("mbid".to_string()),
            images: sizes
                .iter()
                .map(|&size| ImageCandidate {
                    size,
                    url: format!("https://img.example/{:?}", size),
                })
                .collect(),
        }
    }

    #[test]
    fn test_online_rules() {
        assert!(NetworkState::WIFI.online(true));
        assert!(!NetworkState::CELLULAR.online(true));
        assert!(NetworkState::CELLULAR.online(false));
        assert!(!NetworkState::OFFLINE.online(false));
        assert!(NetworkState::CELLULAR.any());
    }

    #[test]
    fn test_best_image_prefers_largest() {
        let info = info(&[ImageSize::Small, ImageSize::Mega, ImageSize::Large]);
        assert_eq!(info.best_image_url(false), Some("https://img.example/Mega"));
    }

    #[test]
    fn test_low_resolution_caps_at_large() {
        let info = info(&[ImageSize::Small, ImageSize::Mega, ImageSize::Large]);
        assert_eq!(info.best_image_url(true), Some("https://img.example/Large"));
    }

    #[test]
    fn test_low_resolution_falls_back_to_smallest() {
        let info = info(&[ImageSize::Mega, ImageSize::ExtraLarge]);
        assert_eq!(info.best_image_url(true), Some("https://img.example/ExtraLarge"));
    }

    #[test]
    fn test_no_images() {
        assert_eq!(info(&[]).best_image_url(false), None);
    }

    #[test]
    fn test_size_labels() {
        assert_eq!(ImageSize::from_label("extralarge"), Some(ImageSize::ExtraLarge));
        assert_eq!(ImageSize::from_label("MEGA"), Some(ImageSize::Mega));
        assert_eq!(ImageSize::from_label(""), None);
    }
}

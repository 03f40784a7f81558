//! Trait definitions for the collaborators the artwork engine consumes.
//!
//! These traits enable dependency injection and mocking for tests.
//! Production code uses the real implementations ([`HttpClient`],
//! [`LastFmClient`], [`FileMediaSource`]), while tests substitute the mocks
//! in [`mocks`].
//!
//! [`HttpClient`]: super::http::HttpClient
//! [`LastFmClient`]: super::lastfm::LastFmClient
//! [`FileMediaSource`]: super::local::FileMediaSource

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::domain::{ArtworkInfo, NetworkState, SourceError};
use crate::config::ArtworkPreferences;

/// Reads raw bytes from on-device media.
#[async_trait]
pub trait LocalMedia: Send + Sync {
    async fn read(&self, uri: &str) -> Result<Vec<u8>, SourceError>;
}

/// Fetches bytes over HTTP.
///
/// Implementations should coalesce concurrent GETs of the same URL and
/// abort the request when `cancel` fires and nobody else is waiting.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn get(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>, SourceError>;
}

/// Looks up album and artist metadata with candidate image URLs.
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    async fn album_info(&self, artist: &str, album: &str) -> Result<ArtworkInfo, SourceError>;

    async fn artist_info(&self, artist: &str) -> Result<ArtworkInfo, SourceError>;
}

/// Reports current connectivity.
pub trait Connectivity: Send + Sync {
    fn state(&self) -> NetworkState;
}

/// Reports current user preferences.
pub trait PreferenceSource: Send + Sync {
    fn preferences(&self) -> ArtworkPreferences;
}

impl Connectivity for NetworkState {
    fn state(&self) -> NetworkState {
        *self
    }
}

impl PreferenceSource for ArtworkPreferences {
    fn preferences(&self) -> ArtworkPreferences {
        self.clone()
    }
}

// Implement traits for real clients

#[async_trait]
impl LocalMedia for super::local::FileMediaSource {
    async fn read(&self, uri: &str) -> Result<Vec<u8>, SourceError> {
        self.read(uri).await
    }
}

#[async_trait]
impl HttpFetch for super::http::HttpClient {
    async fn get(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>, SourceError> {
        self.get(url, cancel).await
    }
}

#[async_trait]
impl MetadataLookup for super::lastfm::LastFmClient {
    async fn album_info(&self, artist: &str, album: &str) -> Result<ArtworkInfo, SourceError> {
        self.album_info(artist, album).await
    }

    async fn artist_info(&self, artist: &str) -> Result<ArtworkInfo, SourceError> {
        self.artist_info(artist).await
    }
}

/// Mock collaborators for testing.
///
/// Each mock counts its calls so tests can assert how many underlying
/// fetches happened.
#[cfg(test)]
pub mod mocks {
    use super::*;
    use crate::sources::domain::{ImageCandidate, ImageSize};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;

    /// Mock local media keyed by URI.
    #[derive(Default)]
    pub struct MockLocalMedia {
        pub files: HashMap<String, Vec<u8>>,
        pub calls: AtomicUsize,
    }

    impl MockLocalMedia {
        pub fn with_file(uri: &str, data: Vec<u8>) -> Self {
            let mut files = HashMap::new();
            files.insert(uri.to_string(), data);
            Self {
                files,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LocalMedia for MockLocalMedia {
        async fn read(&self, uri: &str) -> Result<Vec<u8>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.files.get(uri).cloned().ok_or_else(|| SourceError::LocalRead {
                uri: uri.to_string(),
                message: "no such file".to_string(),
            })
        }
    }

    /// Mock HTTP client with canned responses.
    ///
    /// With a gate, every `get` waits for a permit (or cancellation) before
    /// answering, so tests can hold requests in flight.
    #[derive(Default)]
    pub struct MockHttp {
        pub responses: HashMap<String, Result<Vec<u8>, SourceError>>,
        pub gate: Option<Arc<Semaphore>>,
        pub calls: AtomicUsize,
        pub cancelled: AtomicUsize,
    }

    impl MockHttp {
        pub fn with_response(url: &str, response: Result<Vec<u8>, SourceError>) -> Self {
            let mut responses = HashMap::new();
            responses.insert(url.to_string(), response);
            Self {
                responses,
                ..Default::default()
            }
        }

        /// Hold every request until the returned semaphore gets permits.
        pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
            let gate = Arc::new(Semaphore::new(0));
            self.gate = Some(gate.clone());
            (self, gate)
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn cancelled(&self) -> usize {
            self.cancelled.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HttpFetch for MockHttp {
        async fn get(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if let Some(gate) = &self.gate {
                tokio::select! {
                    permit = gate.acquire() => {
                        if let Ok(permit) = permit {
                            permit.forget();
                        }
                    }
                    _ = cancel.cancelled() => {
                        self.cancelled.fetch_add(1, Ordering::SeqCst);
                        return Err(SourceError::Cancelled);
                    }
                }
            }

            self.responses
                .get(url)
                .cloned()
                .unwrap_or(Err(SourceError::NotFound))
        }
    }

    /// Mock metadata API.
    #[derive(Default)]
    pub struct MockMetadata {
        /// Result to return from both lookups
        pub info: Option<ArtworkInfo>,
        /// Error to return (takes precedence over info)
        pub error: Option<SourceError>,
        pub calls: AtomicUsize,
    }

    impl MockMetadata {
        /// Metadata with an MBID and a single image at `url`.
        pub fn with_image(url: &str) -> Self {
            Self {
                info: Some(ArtworkInfo {
                    name: Some("Double Negative".to_string()),
                    mbid: Some("mock-mbid".to_string()),
                    images: vec![
                        ImageCandidate {
                            size: ImageSize::Small,
                            url: format!("{url}?small"),
                        },
                        ImageCandidate {
                            size: ImageSize::Mega,
                            url: url.to_string(),
                        },
                    ],
                }),
                ..Default::default()
            }
        }

        pub fn with_error(error: SourceError) -> Self {
            Self {
                error: Some(error),
                ..Default::default()
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn answer(&self) -> Result<ArtworkInfo, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(ref err) = self.error {
                return Err(err.clone());
            }
            self.info.clone().ok_or(SourceError::NotFound)
        }
    }

    #[async_trait]
    impl MetadataLookup for MockMetadata {
        async fn album_info(&self, _artist: &str, _album: &str) -> Result<ArtworkInfo, SourceError> {
            self.answer()
        }

        async fn artist_info(&self, _artist: &str) -> Result<ArtworkInfo, SourceError> {
            self.answer()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_http_gate_releases() {
            let (http, gate) = MockHttp::with_response("u", Ok(vec![1])).gated();
            gate.add_permits(1);
            let result = http.get("u", &CancellationToken::new()).await;
            assert_eq!(result, Ok(vec![1]));
            assert_eq!(http.calls(), 1);
        }

        #[tokio::test]
        async fn test_mock_http_gate_cancels() {
            let (http, _gate) = MockHttp::default().gated();
            let token = CancellationToken::new();
            token.cancel();
            let result = http.get("u", &token).await;
            assert_eq!(result, Err(SourceError::Cancelled));
            assert_eq!(http.cancelled(), 1);
        }

        #[tokio::test]
        async fn test_mock_metadata_error() {
            let mock = MockMetadata::with_error(SourceError::RateLimited);
            let result = mock.album_info("Low", "Double Negative").await;
            assert_eq!(result, Err(SourceError::RateLimited));
        }

        #[tokio::test]
        async fn test_mock_local_missing() {
            let mock = MockLocalMedia::default();
            assert!(mock.read("file:///nope").await.is_err());
            assert_eq!(mock.calls(), 1);
        }

        #[test]
        fn test_static_collaborators() {
            assert_eq!(NetworkState::WIFI.state(), NetworkState::WIFI);
            let prefs = ArtworkPreferences {
                only_on_wifi: false,
                ..Default::default()
            };
            assert!(!prefs.preferences().only_on_wifi);
        }
    }
}

//! Last.fm HTTP client
//!
//! Uses the `album.getInfo` and `artist.getInfo` methods with `format=json`.
//! Last.fm reports most failures as an error body, sometimes with HTTP 200,
//! so the body is checked for an error object before parsing the payload.

use serde::de::DeserializeOwned;

use super::{adapter, dto};
use crate::config::NetworkConfig;
use crate::sources::domain::{ArtworkInfo, SourceError};

const BASE_URL: &str = "https://ws.audioscrobbler.com/2.0/";

/// Last.fm API client
pub struct LastFmClient {
    api_key: Option<String>,
    http_client: reqwest::Client,
    base_url: String,
}

impl LastFmClient {
    /// Create a new client. Without an API key every lookup fails with
    /// [`SourceError::NotConfigured`].
    pub fn new(api_key: Option<String>, config: &NetworkConfig) -> Result<Self, SourceError> {
        let http_client = reqwest::Client::builder()
            .gzip(true)
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            http_client,
            base_url: BASE_URL.to_string(),
        })
    }

    /// Create a client for testing with custom base URL
    #[cfg(test)]
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            http_client: reqwest::Client::builder()
                .no_proxy()
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Look up an album
    pub async fn album_info(&self, artist: &str, album: &str) -> Result<ArtworkInfo, SourceError> {
        let url = self.method_url("album.getinfo", &[("artist", artist), ("album", album)])?;
        let response: dto::AlbumInfoResponse = self.send(&url).await?;
        Ok(adapter::album_to_info(response))
    }

    /// Look up an artist
    pub async fn artist_info(&self, artist: &str) -> Result<ArtworkInfo, SourceError> {
        let url = self.method_url("artist.getinfo", &[("artist", artist)])?;
        let response: dto::ArtistInfoResponse = self.send(&url).await?;
        Ok(adapter::artist_to_info(response))
    }

    fn method_url(&self, method: &str, params: &[(&str, &str)]) -> Result<String, SourceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SourceError::NotConfigured("Last.fm API key not set".to_string()))?;

        let mut url = format!(
            "{}?method={}&api_key={}&autocorrect=1&format=json",
            self.base_url,
            method,
            urlencoding::encode(api_key)
        );
        for (name, value) in params {
            url.push('&');
            url.push_str(name);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        Ok(url)
    }

    /// Send the HTTP request and parse the response
    async fn send<T: DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimited);
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        // Try to parse error response
        if let Ok(error) = serde_json::from_str::<dto::ApiError>(&body) {
            return Err(adapter::to_source_error(error));
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound);
        }

        if !status.is_success() {
            return Err(SourceError::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        serde_json::from_str(&body).map_err(|e| SourceError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_with_custom_url() {
        let client = LastFmClient::with_base_url("key", "http://localhost:8080/");
        assert_eq!(client.base_url, "http://localhost:8080/");
        assert!(client.is_configured());
    }

    #[test]
    fn test_url_encodes_params() {
        let client = LastFmClient::with_base_url("key", "http://localhost/");
        let url = client
            .method_url("album.getinfo", &[("artist", "Sigur Rós"), ("album", "( )")])
            .unwrap();

        assert_eq!(
            url,
            "http://localhost/?method=album.getinfo&api_key=key&autocorrect=1&format=json\
             &artist=Sigur%20R%C3%B3s&album=%28%20%29"
        );
    }

    #[tokio::test]
    async fn test_missing_key_is_not_configured() {
        let client = LastFmClient::new(Some("  ".to_string()), &NetworkConfig::default()).unwrap();
        assert!(!client.is_configured());

        let result = client.album_info("Low", "Double Negative").await;
        assert!(matches!(result, Err(SourceError::NotConfigured(_))));
    }
}

//! HTTP client for artwork downloads.
//!
//! Concurrent GETs of the same URL share one request. Each caller races the
//! shared request against its own cancellation token; when the last waiter
//! gives up the request future is dropped, which aborts the connection.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::domain::SourceError;
use crate::config::NetworkConfig;

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<[u8]>, SourceError>>>;

struct InFlight {
    id: u64,
    fetch: SharedFetch,
}

/// Artwork download client
pub struct HttpClient {
    http_client: reqwest::Client,
    in_flight: Arc<Mutex<HashMap<String, InFlight>>>,
    next_id: AtomicU64,
}

impl HttpClient {
    /// Create a client from the `[network]` config section.
    pub fn new(config: &NetworkConfig) -> Result<Self, SourceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(Self::with_client(http_client))
    }

    /// Wrap an existing reqwest client.
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// GET `url`, joining an identical request already in flight.
    pub async fn get(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>, SourceError> {
        if cancel.is_cancelled() {
            return Err(SourceError::Cancelled);
        }

        let (id, mut fetch) = self.join_or_start(url);

        let outcome = tokio::select! {
            result = &mut fetch => Some(result),
            _ = cancel.cancelled() => None,
        };

        match outcome {
            Some(result) => {
                self.finish(url, id);
                result.map(|bytes| bytes.to_vec())
            }
            None => {
                // Our handle must be gone before counting the remaining waiters
                drop(fetch);
                self.release(url, id);
                tracing::debug!(url, "Download cancelled");
                Err(SourceError::Cancelled)
            }
        }
    }

    /// Requests currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    fn join_or_start(&self, url: &str) -> (u64, SharedFetch) {
        let mut in_flight = self.in_flight.lock();
        if let Some(entry) = in_flight.get(url) {
            tracing::debug!(url, "Joining in-flight download");
            return (entry.id, entry.fetch.clone());
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let client = self.http_client.clone();
        let owned_url = url.to_string();
        let fetch = async move { download(&client, &owned_url).await }
            .boxed()
            .shared();

        in_flight.insert(
            url.to_string(),
            InFlight {
                id,
                fetch: fetch.clone(),
            },
        );
        (id, fetch)
    }

    /// Forget a completed request so later GETs go back to the network.
    fn finish(&self, url: &str, id: u64) {
        let mut in_flight = self.in_flight.lock();
        if in_flight.get(url).is_some_and(|entry| entry.id == id) {
            in_flight.remove(url);
        }
    }

    /// Drop a request nobody is waiting for anymore.
    fn release(&self, url: &str, id: u64) {
        let mut in_flight = self.in_flight.lock();
        let abandoned = in_flight
            .get(url)
            .is_some_and(|entry| entry.id == id && entry.fetch.strong_count() == Some(1));
        if abandoned {
            in_flight.remove(url);
        }
    }
}

/// Download bytes from a URL
async fn download(client: &reqwest::Client, url: &str) -> Result<Arc<[u8]>, SourceError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| SourceError::Network(e.to_string()))?;

    let status = response.status();

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(SourceError::NotFound);
    }

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(SourceError::RateLimited);
    }

    if !status.is_success() {
        return Err(SourceError::Http {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        });
    }

    let data = response
        .bytes()
        .await
        .map_err(|e| SourceError::Network(e.to_string()))?;

    Ok(Arc::from(data.as_ref()))
}

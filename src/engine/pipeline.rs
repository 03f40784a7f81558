//! Source fetches for the `TrySource` effect.
//!
//! A successful fetch decodes the bytes once into both kinds, puts both into
//! the memory tier and queues both for disk. Every await races the request's
//! cancellation token, and nothing is cached once it has fired. Nothing is
//! cached either if the store was cleared after the fetch started.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::artwork::{ArtIdentity, ArtSubject, ArtworkKind, CacheKey, CachedImage, DecodeOptions};
use crate::cache::{CacheStore, WriteBehindQueue};
use crate::sources::{HttpFetch, LocalMedia, MetadataLookup, PreferenceSource, Source, SourceError};

/// Everything a source fetch needs. Shared by all fetch tasks.
pub struct FetchContext {
    pub store: Arc<CacheStore>,
    pub write_behind: WriteBehindQueue,
    pub local: Arc<dyn LocalMedia>,
    pub http: Arc<dyn HttpFetch>,
    pub metadata: Arc<dyn MetadataLookup>,
    pub preferences: Arc<dyn PreferenceSource>,
    pub decode: DecodeOptions,
}

/// One source attempt for a pending request.
#[derive(Debug, Clone)]
pub struct FetchJob {
    pub identity: ArtIdentity,
    /// Key of the requested kind
    pub key: CacheKey,
    /// Key of the other kind, cached from the same download
    pub other_key: CacheKey,
    pub token: CancellationToken,
    /// Store clear epoch when the fetch started
    pub epoch: u64,
}

/// Try one source and return the image of the requested kind.
pub async fn fetch_source(
    ctx: &FetchContext,
    source: Source,
    job: &FetchJob,
) -> Result<Arc<CachedImage>, SourceError> {
    let bytes = match source {
        Source::LocalMedia => {
            let uri = job.identity.artwork_uri().ok_or(SourceError::NotFound)?;
            cancellable(&job.token, ctx.local.read(uri)).await?
        }
        Source::DirectUrl => {
            let uri = job.identity.artwork_uri().ok_or(SourceError::NotFound)?;
            ctx.http.get(uri, &job.token).await?
        }
        Source::MetadataApi => {
            let url = image_url(ctx, job).await?;
            ctx.http.get(&url, &job.token).await?
        }
    };

    let decode = ctx.decode;
    let (thumbnail, full) = cancellable(&job.token, async move {
        tokio::task::spawn_blocking(move || CachedImage::decode_both(&bytes, &decode))
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?
            .map_err(|e| SourceError::Decode(e.to_string()))
    })
    .await?;

    if job.token.is_cancelled() {
        return Err(SourceError::Cancelled);
    }

    let (requested, other) = match job.key.kind() {
        ArtworkKind::Thumbnail => (thumbnail, full),
        ArtworkKind::Full => (full, thumbnail),
    };
    let requested = Arc::new(requested);
    let other = Arc::new(other);
    for (key, image) in [(&job.key, &requested), (&job.other_key, &other)] {
        if !ctx.store.put_at(job.epoch, key.clone(), image.clone()) {
            tracing::debug!(key = %key, "Cache cleared during fetch, not caching");
            break;
        }
        ctx.write_behind.enqueue_at(job.epoch, key.clone(), image.clone());
    }

    tracing::debug!(
        identity = %job.identity,
        %source,
        "Fetched artwork ({}x{})",
        requested.width(),
        requested.height()
    );

    Ok(requested)
}

/// Ask the metadata API for the image to download.
async fn image_url(ctx: &FetchContext, job: &FetchJob) -> Result<String, SourceError> {
    let identity = &job.identity;
    let artist = identity.artist_name().ok_or(SourceError::NotFound)?;

    let info = match identity.subject() {
        ArtSubject::Artist => cancellable(&job.token, ctx.metadata.artist_info(artist)).await?,
        ArtSubject::Album => {
            let album = identity.album_name().ok_or(SourceError::NotFound)?;
            cancellable(&job.token, ctx.metadata.album_info(artist, album)).await?
        }
    };

    // Entries without an MBID are too often the wrong album
    if info.mbid.is_none() {
        return Err(SourceError::MissingIdentifier);
    }

    let low_resolution = ctx.preferences.preferences().want_low_resolution_art;
    info.best_image_url(low_resolution)
        .map(str::to_string)
        .ok_or(SourceError::NoImage)
}

async fn cancellable<T>(
    token: &CancellationToken,
    fut: impl Future<Output = Result<T, SourceError>>,
) -> Result<T, SourceError> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(SourceError::Cancelled),
        result = fut => result,
    }
}

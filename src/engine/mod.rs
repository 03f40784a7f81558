//! Artwork request engine.
//!
//! # Architecture
//!
//! ```text
//! ArtworkManager ──Command──▶ owner loop (one tokio task)
//!      ▲                         │  owns HashMap<CacheKey, PendingRequest>
//!      │                         │  runs transition() and its effects
//!  ArtworkHandle                 ▼
//!  (detach on drop)        spawn_blocking cache lookups,
//!                          spawned source fetches
//!                                │
//!                                └──Command::Io──▶ back to the owner loop
//! ```
//!
//! Only the owner loop touches pending requests, so coalescing needs no
//! locks: a second request for a key that is already in flight just
//! attaches another recipient. I/O results carry the generation of the
//! request that started them; results for a request that has since been
//! cancelled or replaced are dropped.

mod pending;
mod pipeline;
mod recipient;

pub use pending::{Effect, PendingRequest, PipelineEvent, PipelineState, Transition, transition};
pub use pipeline::{FetchContext, FetchJob, fetch_source};
pub use recipient::{ArtworkHandle, ArtworkOutcome, ChannelRecipient, Recipient, RecipientId};

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::artwork::{ArtIdentity, ArtworkKind, CacheKey, CachedImage, DecodeOptions};
use crate::cache::{CacheStore, WriteBehindQueue};
use crate::config::Config;
use crate::error::{Error, Result, consistency_fault};
use crate::sources::{
    Connectivity, FileMediaSource, HttpClient, HttpFetch, LastFmClient, LocalMedia, MetadataLookup,
    PreferenceSource, SourceError, SourceResolver,
};

/// Messages to the owner loop.
pub(crate) enum Command {
    Request {
        key: CacheKey,
        identity: ArtIdentity,
        id: RecipientId,
        recipient: Arc<dyn Recipient>,
    },
    Detach {
        key: CacheKey,
        id: RecipientId,
    },
    Io {
        key: CacheKey,
        generation: u64,
        outcome: IoOutcome,
    },
    ActiveCount {
        reply: oneshot::Sender<usize>,
    },
}

pub(crate) enum IoOutcome {
    Cache(Option<Arc<CachedImage>>),
    Source(std::result::Result<Arc<CachedImage>, SourceError>),
}

/// External services the engine depends on.
pub struct Collaborators {
    pub local: Arc<dyn LocalMedia>,
    pub http: Arc<dyn HttpFetch>,
    pub metadata: Arc<dyn MetadataLookup>,
    pub connectivity: Arc<dyn Connectivity>,
    pub preferences: Arc<dyn PreferenceSource>,
}

/// Entry point for artwork requests.
///
/// Cheap to clone; all clones share one owner loop.
#[derive(Clone)]
pub struct ArtworkManager {
    commands: mpsc::UnboundedSender<Command>,
    store: Arc<CacheStore>,
    write_behind: WriteBehindQueue,
}

impl ArtworkManager {
    /// Start the engine. Must be called from within a tokio runtime.
    pub fn new(
        store: Arc<CacheStore>,
        write_behind: WriteBehindQueue,
        collaborators: Collaborators,
        decode: DecodeOptions,
    ) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();

        let ctx = Arc::new(FetchContext {
            store: store.clone(),
            write_behind: write_behind.clone(),
            local: collaborators.local,
            http: collaborators.http,
            metadata: collaborators.metadata,
            preferences: collaborators.preferences.clone(),
            decode,
        });

        let owner = OwnerLoop {
            ctx,
            resolver: SourceResolver::new(),
            connectivity: collaborators.connectivity,
            preferences: collaborators.preferences,
            active: HashMap::new(),
            commands: commands.downgrade(),
            next_generation: 0,
        };
        tokio::spawn(owner.run(rx));

        Self {
            commands,
            store,
            write_behind,
        }
    }

    /// Build the production engine from config.
    ///
    /// Preferences are fixed at the config's values. Hosts that change them
    /// at runtime pass their own [`PreferenceSource`] to [`Self::new`].
    pub fn from_config(config: &Config, connectivity: Arc<dyn Connectivity>) -> Result<Self> {
        let store = Arc::new(CacheStore::from_config(&config.cache));
        let write_behind = WriteBehindQueue::new(store.clone(), config.cache.write_behind_idle());

        let http = HttpClient::new(&config.network)
            .map_err(|e| Error::config(format!("HTTP client: {}", e)))?;
        let metadata = LastFmClient::new(config.credentials.lastfm_api_key.clone(), &config.network)
            .map_err(|e| Error::config(format!("Last.fm client: {}", e)))?;
        if !metadata.is_configured() {
            tracing::info!("No Last.fm API key configured, metadata lookups disabled");
        }

        let collaborators = Collaborators {
            local: Arc::new(FileMediaSource::new()),
            http: Arc::new(http),
            metadata: Arc::new(metadata),
            connectivity,
            preferences: Arc::new(config.preferences.clone()),
        };

        Ok(Self::new(
            store,
            write_behind,
            collaborators,
            DecodeOptions::from(&config.cache),
        ))
    }

    /// Request artwork for `identity` at `kind`.
    ///
    /// The recipient is completed exactly once, unless it is cancelled
    /// first. An invalid identity completes it immediately with
    /// [`ArtworkOutcome::Exhausted`].
    pub fn request_artwork(
        &self,
        identity: ArtIdentity,
        kind: ArtworkKind,
        recipient: Arc<dyn Recipient>,
    ) -> ArtworkHandle {
        let id = RecipientId::next();

        let key = match CacheKey::new(&identity, kind) {
            Ok(key) => key,
            Err(e) => {
                tracing::debug!("Rejecting artwork request: {}", e);
                recipient.complete(ArtworkOutcome::Exhausted);
                return ArtworkHandle::inert(id, self.commands.clone());
            }
        };

        let command = Command::Request {
            key: key.clone(),
            identity,
            id,
            recipient: recipient.clone(),
        };
        if self.commands.send(command).is_err() {
            tracing::warn!(key = %key, "Artwork engine stopped, request dropped");
            recipient.complete(ArtworkOutcome::Exhausted);
            return ArtworkHandle::inert(id, self.commands.clone());
        }

        ArtworkHandle::new(id, key, self.commands.clone())
    }

    /// Detach a recipient. Same as [`ArtworkHandle::cancel`].
    pub fn cancel(&self, handle: ArtworkHandle) {
        handle.cancel();
    }

    /// Empty both memory tiers and the disk tier.
    pub async fn clear_all_caches(&self) -> bool {
        let store = self.store.clone();
        match tokio::task::spawn_blocking(move || store.clear_all()).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::warn!("Failed to clear artwork caches: {}", e);
                false
            }
            Err(e) => {
                tracing::warn!("Cache clear task failed: {}", e);
                false
            }
        }
    }

    /// Drop both memory tiers; for low-memory signals.
    pub fn evict_memory_caches(&self) {
        self.store.evict_memory();
    }

    /// Compressed bytes of a cached image, memory tier first, then disk.
    /// Never starts a fetch. Blocks on disk I/O.
    pub fn get_cached_bitmap_if_present(&self, identity: &ArtIdentity, kind: ArtworkKind) -> Option<Vec<u8>> {
        let key = CacheKey::new(identity, kind).ok()?;
        self.store.get(&key).map(|image| image.encoded().to_vec())
    }

    /// Number of keys with a pipeline in flight.
    pub async fn active_requests(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::ActiveCount { reply }).is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    pub fn write_behind(&self) -> &WriteBehindQueue {
        &self.write_behind
    }
}

/// Sole owner of the active-request table.
struct OwnerLoop {
    ctx: Arc<FetchContext>,
    resolver: SourceResolver,
    connectivity: Arc<dyn Connectivity>,
    preferences: Arc<dyn PreferenceSource>,
    active: HashMap<CacheKey, PendingRequest>,
    /// Weak so the loop ends once every manager and handle is gone
    commands: mpsc::WeakUnboundedSender<Command>,
    next_generation: u64,
}

impl OwnerLoop {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        tracing::debug!("Artwork engine started");
        while let Some(command) = rx.recv().await {
            match command {
                Command::Request {
                    key,
                    identity,
                    id,
                    recipient,
                } => self.on_request(key, identity, id, recipient),
                Command::Detach { key, id } => self.on_detach(&key, id),
                Command::Io {
                    key,
                    generation,
                    outcome,
                } => self.on_io(key, generation, outcome),
                Command::ActiveCount { reply } => {
                    let _ = reply.send(self.active.len());
                }
            }
        }
        tracing::debug!("Artwork engine stopped");
    }

    fn on_request(&mut self, key: CacheKey, identity: ArtIdentity, id: RecipientId, recipient: Arc<dyn Recipient>) {
        if let Some(pending) = self.active.get_mut(&key) {
            match pending.attach(id, recipient.clone()) {
                Ok(()) => tracing::debug!(key = %key, "Coalesced artwork request"),
                Err(e) => {
                    consistency_fault(&e);
                    recipient.complete(ArtworkOutcome::Exhausted);
                }
            }
            return;
        }

        self.next_generation += 1;
        let mut pending = PendingRequest::new(key.clone(), identity, self.next_generation);
        if let Err(e) = pending.attach(id, recipient) {
            consistency_fault(&e);
            return;
        }
        self.active.insert(key.clone(), pending);
        self.drive(&key, PipelineEvent::Begin);
    }

    fn on_detach(&mut self, key: &CacheKey, id: RecipientId) {
        let Some(pending) = self.active.get_mut(key) else {
            return;
        };
        if !pending.detach(id) || pending.recipient_count() > 0 {
            return;
        }

        tracing::debug!(key = %key, "Last recipient detached, cancelling");
        pending.token().cancel();
        self.drive(key, PipelineEvent::Cancelled);
    }

    fn on_io(&mut self, key: CacheKey, generation: u64, outcome: IoOutcome) {
        let Some(pending) = self.active.get(&key) else {
            tracing::trace!(key = %key, "Dropping I/O result for finished request");
            return;
        };
        if pending.generation() != generation {
            tracing::trace!(key = %key, "Dropping stale I/O result");
            return;
        }

        let event = match outcome {
            IoOutcome::Cache(Some(image)) => PipelineEvent::CacheHit(image),
            IoOutcome::Cache(None) => {
                let plan = self.resolver.decide(
                    pending.identity(),
                    self.connectivity.state(),
                    &self.preferences.preferences(),
                );
                tracing::debug!(key = %key, ?plan, "Cache miss");
                PipelineEvent::CacheMiss { plan }
            }
            IoOutcome::Source(Ok(image)) => PipelineEvent::SourceSucceeded(image),
            IoOutcome::Source(Err(e)) => {
                tracing::debug!(key = %key, state = ?pending.state(), "Source failed: {}", e);
                PipelineEvent::SourceFailed
            }
        };
        self.drive(&key, event);
    }

    /// Feed an event through the state machine, running effects until the
    /// request waits on I/O or reaches a terminal state.
    fn drive(&mut self, key: &CacheKey, event: PipelineEvent) {
        let mut events = VecDeque::from([event]);

        while let Some(event) = events.pop_front() {
            let Some(pending) = self.active.get_mut(key) else {
                return;
            };
            let next = match transition(pending, event) {
                Ok(next) => next,
                Err(e) => {
                    consistency_fault(&e);
                    return;
                }
            };
            pending.apply(next.next);

            for effect in next.effects {
                if let Some(follow_up) = self.run_effect(key, effect) {
                    events.push_back(follow_up);
                }
            }
        }

        if self.active.get(key).is_some_and(|p| p.state().is_terminal()) {
            self.active.remove(key);
        }
    }

    fn run_effect(&mut self, key: &CacheKey, effect: Effect) -> Option<PipelineEvent> {
        let pending = self.active.get_mut(key)?;

        match effect {
            Effect::LookupCache => {
                // Memory hits skip the blocking pool
                if let Some(image) = self.ctx.store.get_memory(key) {
                    return Some(PipelineEvent::CacheHit(image));
                }
                let store = self.ctx.store.clone();
                let lookup_key = key.clone();
                spawn_io(&self.commands, pending, async move {
                    let image = tokio::task::spawn_blocking(move || store.get(&lookup_key))
                        .await
                        .ok()
                        .flatten();
                    IoOutcome::Cache(image)
                });
            }
            Effect::ShowPlaceholder => pending.show_placeholder(),
            Effect::TrySource(source) => {
                let job = match fetch_job(pending, self.ctx.store.epoch()) {
                    Ok(job) => job,
                    Err(e) => {
                        consistency_fault(&e);
                        return Some(PipelineEvent::SourceFailed);
                    }
                };
                tracing::debug!(key = %key, %source, "Trying source");
                let ctx = self.ctx.clone();
                spawn_io(&self.commands, pending, async move {
                    IoOutcome::Source(fetch_source(&ctx, source, &job).await)
                });
            }
            Effect::Deliver(image) => {
                if let Err(e) = pending.complete(ArtworkOutcome::Delivered(image)) {
                    consistency_fault(&e);
                }
            }
            Effect::Exhaust => {
                tracing::debug!(key = %key, "No artwork found");
                if let Err(e) = pending.complete(ArtworkOutcome::Exhausted) {
                    consistency_fault(&e);
                }
            }
        }
        None
    }
}

/// Run `io` on the runtime and post its outcome back to the owner loop.
fn spawn_io(
    commands: &mpsc::WeakUnboundedSender<Command>,
    pending: &PendingRequest,
    io: impl Future<Output = IoOutcome> + Send + 'static,
) {
    let Some(commands) = commands.upgrade() else {
        return;
    };
    let key = pending.key().clone();
    let generation = pending.generation();
    tokio::spawn(async move {
        let outcome = io.await;
        // Loop gone means nobody is waiting
        let _ = commands.send(Command::Io {
            key,
            generation,
            outcome,
        });
    });
}

fn fetch_job(pending: &PendingRequest, epoch: u64) -> Result<FetchJob> {
    let identity = pending.identity().clone();
    let other_key = CacheKey::new(&identity, pending.kind().opposite())?;
    Ok(FetchJob {
        identity,
        key: pending.key().clone(),
        other_key,
        token: pending.token().clone(),
        epoch,
    })
}

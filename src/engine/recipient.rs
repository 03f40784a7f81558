//! Request recipients and the handles callers use to detach them.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use super::Command;
use crate::artwork::{CacheKey, CachedImage};

/// Terminal result of an artwork request.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtworkOutcome {
    /// Artwork found, from cache or a source
    Delivered(Arc<CachedImage>),
    /// Nothing found; keep showing the default artwork
    Exhausted,
}

impl ArtworkOutcome {
    pub fn image(&self) -> Option<&Arc<CachedImage>> {
        match self {
            Self::Delivered(image) => Some(image),
            Self::Exhausted => None,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }
}

/// A sink for one artwork request.
///
/// Callbacks run on the engine's owner task and must not block.
pub trait Recipient: Send + Sync {
    /// False once the recipient has gone away. Dead recipients are skipped
    /// but still count as notified.
    fn is_live(&self) -> bool {
        true
    }

    /// The cache missed; show a placeholder while sources are tried.
    /// May be called before `complete`, never after.
    fn show_placeholder(&self) {}

    /// Called exactly once per request.
    fn complete(&self, outcome: ArtworkOutcome);
}

/// Identifies one attached recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecipientId(u64);

impl RecipientId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Recipient that forwards the outcome to a oneshot channel.
pub struct ChannelRecipient {
    sender: Mutex<Option<oneshot::Sender<ArtworkOutcome>>>,
    placeholder_shown: AtomicBool,
}

impl ChannelRecipient {
    pub fn new() -> (Arc<Self>, oneshot::Receiver<ArtworkOutcome>) {
        let (tx, rx) = oneshot::channel();
        let recipient = Arc::new(Self {
            sender: Mutex::new(Some(tx)),
            placeholder_shown: AtomicBool::new(false),
        });
        (recipient, rx)
    }

    pub fn placeholder_shown(&self) -> bool {
        self.placeholder_shown.load(Ordering::SeqCst)
    }
}

impl Recipient for ChannelRecipient {
    fn is_live(&self) -> bool {
        self.sender.lock().as_ref().is_some_and(|tx| !tx.is_closed())
    }

    fn show_placeholder(&self) {
        self.placeholder_shown.store(true, Ordering::SeqCst);
    }

    fn complete(&self, outcome: ArtworkOutcome) {
        if let Some(tx) = self.sender.lock().take() {
            // Receiver may be gone
            let _ = tx.send(outcome);
        }
    }
}

/// Returned by `request_artwork`. Dropping it detaches the recipient.
#[must_use = "dropping the handle cancels the request"]
pub struct ArtworkHandle {
    id: RecipientId,
    key: Option<CacheKey>,
    commands: mpsc::UnboundedSender<Command>,
    active: bool,
}

impl ArtworkHandle {
    pub(crate) fn new(id: RecipientId, key: CacheKey, commands: mpsc::UnboundedSender<Command>) -> Self {
        Self {
            id,
            key: Some(key),
            commands,
            active: true,
        }
    }

    /// A handle for a request that was answered without being queued.
    pub(crate) fn inert(id: RecipientId, commands: mpsc::UnboundedSender<Command>) -> Self {
        Self {
            id,
            key: None,
            commands,
            active: false,
        }
    }

    pub fn id(&self) -> RecipientId {
        self.id
    }

    /// Cache key of the request; `None` for an invalid identity.
    pub fn key(&self) -> Option<&CacheKey> {
        self.key.as_ref()
    }

    /// Detach this recipient. The last detach cancels the fetch; the
    /// recipient is not notified.
    pub fn cancel(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(key) = self.key.clone() {
            // Engine gone means nothing left to detach from
            let _ = self.commands.send(Command::Detach { key, id: self.id });
        }
    }
}

impl Drop for ArtworkHandle {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for ArtworkHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtworkHandle")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("active", &self.active)
            .finish()
    }
}

//! Per-key pending request and its pipeline state machine.
//!
//! ```text
//! Start --Begin--> CacheLookup --CacheHit--> Delivered
//!                       |
//!                   CacheMiss (placeholder)
//!                       v
//!                  Fetching{plan, index} --SourceSucceeded--> Delivered
//!                       |  ^
//!                SourceFailed (next source)
//!                       v
//!                   Exhausted
//! ```
//!
//! `transition` is pure: it reads the request and an event and returns the
//! next state plus the effects the owner loop must perform. `Cancelled` moves
//! any non-terminal state to `Exhausted` without effects.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::recipient::{ArtworkOutcome, Recipient, RecipientId};
use crate::artwork::{ArtIdentity, ArtworkKind, CacheKey, CachedImage};
use crate::error::{Error, Result};
use crate::sources::Source;

/// Where a request is in its pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    Start,
    CacheLookup,
    /// Trying `plan[index]`
    Fetching { plan: Vec<Source>, index: usize },
    Delivered,
    Exhausted,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Exhausted)
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    Begin,
    CacheHit(Arc<CachedImage>),
    CacheMiss { plan: Vec<Source> },
    SourceSucceeded(Arc<CachedImage>),
    SourceFailed,
    Cancelled,
}

/// Work the owner loop performs after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    LookupCache,
    ShowPlaceholder,
    TrySource(Source),
    Deliver(Arc<CachedImage>),
    Exhaust,
}

/// Result of applying an event.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: PipelineState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn to(next: PipelineState, effects: Vec<Effect>) -> Self {
        Self { next, effects }
    }

    fn exhausted(mut effects: Vec<Effect>) -> Self {
        effects.push(Effect::Exhaust);
        Self::to(PipelineState::Exhausted, effects)
    }

    /// Try `plan[index]`, or give up when the plan is used up.
    fn fetch(plan: Vec<Source>, index: usize, mut effects: Vec<Effect>) -> Self {
        match plan.get(index) {
            Some(&source) => {
                effects.push(Effect::TrySource(source));
                Self::to(PipelineState::Fetching { plan, index }, effects)
            }
            None => Self::exhausted(effects),
        }
    }
}

struct Attached {
    id: RecipientId,
    recipient: Arc<dyn Recipient>,
    completed: bool,
}

/// One in-flight pipeline and everyone waiting on it.
pub struct PendingRequest {
    key: CacheKey,
    identity: ArtIdentity,
    kind: ArtworkKind,
    generation: u64,
    recipients: Vec<Attached>,
    state: PipelineState,
    token: CancellationToken,
    placeholder_shown: bool,
}

impl PendingRequest {
    pub fn new(key: CacheKey, identity: ArtIdentity, generation: u64) -> Self {
        Self {
            kind: key.kind(),
            key,
            identity,
            generation,
            recipients: Vec::new(),
            state: PipelineState::Start,
            token: CancellationToken::new(),
            placeholder_shown: false,
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn identity(&self) -> &ArtIdentity {
        &self.identity
    }

    pub fn kind(&self) -> ArtworkKind {
        self.kind
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn recipient_count(&self) -> usize {
        self.recipients.len()
    }

    pub fn placeholder_shown(&self) -> bool {
        self.placeholder_shown
    }

    /// Add a recipient. Late attachers see the placeholder right away.
    pub fn attach(&mut self, id: RecipientId, recipient: Arc<dyn Recipient>) -> Result<()> {
        if self.state.is_terminal() {
            return Err(Error::consistency(format!(
                "attach to {} in terminal state {:?}",
                self.key, self.state
            )));
        }
        if self.placeholder_shown && recipient.is_live() {
            recipient.show_placeholder();
        }
        self.recipients.push(Attached {
            id,
            recipient,
            completed: false,
        });
        Ok(())
    }

    /// Remove a recipient. Returns false if it was not attached.
    pub fn detach(&mut self, id: RecipientId) -> bool {
        let before = self.recipients.len();
        self.recipients.retain(|r| r.id != id);
        self.recipients.len() != before
    }

    pub fn apply(&mut self, state: PipelineState) {
        self.state = state;
    }

    pub fn show_placeholder(&mut self) {
        self.placeholder_shown = true;
        for attached in &self.recipients {
            if !attached.completed && attached.recipient.is_live() {
                attached.recipient.show_placeholder();
            }
        }
    }

    /// Notify every recipient of the outcome.
    ///
    /// Fails if any recipient was already notified; the others are still
    /// notified.
    pub fn complete(&mut self, outcome: ArtworkOutcome) -> Result<()> {
        let mut already_completed = 0;
        for attached in &mut self.recipients {
            if attached.completed {
                already_completed += 1;
                continue;
            }
            attached.completed = true;
            if attached.recipient.is_live() {
                attached.recipient.complete(outcome.clone());
            }
        }

        if already_completed > 0 {
            return Err(Error::consistency(format!(
                "{} recipient(s) of {} completed twice",
                already_completed, self.key
            )));
        }
        Ok(())
    }
}

/// Compute the next state and effects for an event.
pub fn transition(request: &PendingRequest, event: PipelineEvent) -> Result<Transition> {
    use PipelineEvent as Ev;
    use PipelineState as St;

    if request.state.is_terminal() {
        return Err(Error::consistency(format!(
            "event {:?} for {} in terminal state {:?}",
            event, request.key, request.state
        )));
    }

    let transition = match (&request.state, event) {
        (_, Ev::Cancelled) => Transition::to(St::Exhausted, Vec::new()),

        (St::Start, Ev::Begin) => {
            if request.identity.is_valid() {
                Transition::to(St::CacheLookup, vec![Effect::LookupCache])
            } else {
                Transition::exhausted(Vec::new())
            }
        }

        (St::CacheLookup, Ev::CacheHit(image)) => {
            Transition::to(St::Delivered, vec![Effect::Deliver(image)])
        }
        (St::CacheLookup, Ev::CacheMiss { plan }) => {
            Transition::fetch(plan, 0, vec![Effect::ShowPlaceholder])
        }

        (St::Fetching { .. }, Ev::SourceSucceeded(image)) => {
            Transition::to(St::Delivered, vec![Effect::Deliver(image)])
        }
        (St::Fetching { plan, index }, Ev::SourceFailed) => {
            Transition::fetch(plan.clone(), index + 1, Vec::new())
        }

        (state, event) => {
            return Err(Error::consistency(format!(
                "unexpected event {:?} for {} in state {:?}",
                event, request.key, state
            )));
        }
    };

    Ok(transition)
}

//! Audio playback seam.
//!
//! The host owns the real player (a browser element, a desktop decoder);
//! the practice session only sees it through `AudioPlayback`. Events are
//! pushed back into the session as `AudioDelivery` values tagged with the
//! subscription they were dispatched for.

use std::cell::{Cell, RefCell};
use std::fmt;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlaybackError {
    #[error("no audio handle was provided")]
    Missing,
    #[error("audio is not ready: {0}")]
    NotReady(String),
    #[error("playback was rejected: {0}")]
    Rejected(String),
}

/// Handle returned by `AudioPlayback::subscribe`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioEventKind {
    TimeUpdate,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioEvent {
    /// Playback position moved; seconds from the start of the track.
    TimeUpdate { position: f64 },
    /// The track reached its natural end.
    Ended,
}

impl AudioEvent {
    #[must_use]
    pub fn kind(&self) -> AudioEventKind {
        match self {
            AudioEvent::TimeUpdate { .. } => AudioEventKind::TimeUpdate,
            AudioEvent::Ended => AudioEventKind::Ended,
        }
    }
}

/// An event routed to one subscriber.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioDelivery {
    pub subscription: SubscriptionId,
    pub event: AudioEvent,
}

/// Shared playback handle. Implementations use interior mutability; the
/// host keeps ownership and the session only borrows it through `Rc`.
pub trait AudioPlayback {
    /// Current position in seconds.
    fn current_position(&self) -> f64;

    /// Whether the source is loaded and can be played.
    fn is_ready(&self) -> bool;

    /// # Errors
    ///
    /// Returns `PlaybackError` if the player refuses to start.
    fn play(&self) -> Result<(), PlaybackError>;

    fn pause(&self);

    fn seek(&self, position: f64);

    /// # Errors
    ///
    /// Returns `PlaybackError` if the player cannot deliver events.
    fn subscribe(&self, kind: AudioEventKind) -> Result<SubscriptionId, PlaybackError>;

    fn unsubscribe(&self, id: SubscriptionId);
}

/// Deterministic player driven by explicit `advance` calls.
///
/// Used by tests and by the terminal front-end, which advances it from a
/// timer.
#[derive(Debug)]
pub struct ManualPlayback {
    duration: f64,
    position: Cell<f64>,
    playing: Cell<bool>,
    ended: Cell<bool>,
    ready: Cell<bool>,
    next_id: Cell<u64>,
    subscribers: RefCell<Vec<(SubscriptionId, AudioEventKind)>>,
}

impl ManualPlayback {
    #[must_use]
    pub fn new(duration: f64) -> Self {
        Self {
            duration: if duration.is_finite() { duration.max(0.0) } else { 0.0 },
            position: Cell::new(0.0),
            playing: Cell::new(false),
            ended: Cell::new(false),
            ready: Cell::new(true),
            next_id: Cell::new(0),
            subscribers: RefCell::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn duration(&self) -> f64 {
        self.duration
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playing.get()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.set(ready);
    }

    /// Move the playhead forward by `delta` seconds if playing.
    ///
    /// Returns the events to dispatch, in order: one time update per
    /// time-update subscriber, then `Ended` for ended subscribers when the
    /// track runs out.
    pub fn advance(&self, delta: f64) -> Vec<AudioDelivery> {
        if !self.playing.get() || delta <= 0.0 {
            return Vec::new();
        }
        let next = (self.position.get() + delta).min(self.duration);
        self.position.set(next);

        let mut out = self.dispatch(AudioEvent::TimeUpdate { position: next });
        if next >= self.duration && !self.ended.get() {
            self.playing.set(false);
            self.ended.set(true);
            out.extend(self.dispatch(AudioEvent::Ended));
        }
        out
    }

    fn dispatch(&self, event: AudioEvent) -> Vec<AudioDelivery> {
        self.subscribers
            .borrow()
            .iter()
            .filter(|(_, kind)| *kind == event.kind())
            .map(|(subscription, _)| AudioDelivery {
                subscription: *subscription,
                event,
            })
            .collect()
    }
}

impl AudioPlayback for ManualPlayback {
    fn current_position(&self) -> f64 {
        self.position.get()
    }

    fn is_ready(&self) -> bool {
        self.ready.get()
    }

    fn play(&self) -> Result<(), PlaybackError> {
        if !self.ready.get() {
            return Err(PlaybackError::NotReady("source not loaded".into()));
        }
        if self.position.get() < self.duration {
            self.ended.set(false);
        }
        self.playing.set(true);
        Ok(())
    }

    fn pause(&self) {
        self.playing.set(false);
    }

    fn seek(&self, position: f64) {
        let clamped = if position.is_finite() {
            position.clamp(0.0, self.duration)
        } else {
            0.0
        };
        self.position.set(clamped);
        self.ended.set(false);
    }

    fn subscribe(&self, kind: AudioEventKind) -> Result<SubscriptionId, PlaybackError> {
        if !self.ready.get() {
            return Err(PlaybackError::NotReady("source not loaded".into()));
        }
        let id = SubscriptionId::new(self.next_id.get() + 1);
        self.next_id.set(id.value());
        self.subscribers.borrow_mut().push((id, kind));
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.borrow_mut().retain(|(sub, _)| *sub != id);
    }
}

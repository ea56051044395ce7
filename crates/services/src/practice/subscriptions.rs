use std::rc::Rc;

use super::audio::{AudioEventKind, AudioPlayback, PlaybackError, SubscriptionId};

/// Event subscriptions held by one practice attempt.
///
/// Dropping the value unsubscribes everything, so a restarted or discarded
/// attempt can never receive another event.
pub(crate) struct Subscriptions {
    audio: Rc<dyn AudioPlayback>,
    ids: Vec<SubscriptionId>,
}

impl Subscriptions {
    /// Subscribe to every kind in `kinds`, or to none of them.
    pub(crate) fn acquire(
        audio: Rc<dyn AudioPlayback>,
        kinds: &[AudioEventKind],
    ) -> Result<Self, PlaybackError> {
        let mut subs = Self {
            audio,
            ids: Vec::with_capacity(kinds.len()),
        };
        for kind in kinds {
            // On error `subs` is dropped here, releasing what was acquired.
            let id = subs.audio.subscribe(*kind)?;
            subs.ids.push(id);
        }
        Ok(subs)
    }

    pub(crate) fn owns(&self, id: SubscriptionId) -> bool {
        self.ids.contains(&id)
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        for id in self.ids.drain(..) {
            self.audio.unsubscribe(id);
        }
    }
}

//! Progress emission from a running session.
//!
//! The session calls `ProgressSink::record` synchronously from its handlers;
//! sinks must not block. Errors are reported back so the session can log
//! them, but they never change session state.

use memo_core::model::{PracticeProgress, SessionId};
use tokio::sync::mpsc;

use crate::error::PersistenceError;

/// A progress summary tagged with the song session it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub session_id: Option<SessionId>,
    pub progress: PracticeProgress,
}

pub trait ProgressSink: Send + Sync {
    /// # Errors
    ///
    /// Returns `PersistenceError` when the update could not be handed off.
    fn record(&self, update: ProgressUpdate) -> Result<(), PersistenceError>;
}

/// Discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn record(&self, _update: ProgressUpdate) -> Result<(), PersistenceError> {
        Ok(())
    }
}

/// Hands updates to a `ProgressWriter` task over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelProgressSink {
    tx: mpsc::UnboundedSender<ProgressUpdate>,
}

impl ChannelProgressSink {
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<ProgressUpdate>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn record(&self, update: ProgressUpdate) -> Result<(), PersistenceError> {
        self.tx
            .send(update)
            .map_err(|_| PersistenceError::WriterClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memo_core::time::fixed_now;

    fn update() -> ProgressUpdate {
        ProgressUpdate {
            session_id: None,
            progress: PracticeProgress::new(1, 2, fixed_now()).unwrap(),
        }
    }

    #[test]
    fn channel_sink_forwards_updates() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = ChannelProgressSink::new(tx);
        sink.record(update()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), update());
    }

    #[test]
    fn channel_sink_reports_closed_writer() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sink = ChannelProgressSink::new(tx);
        assert!(matches!(
            sink.record(update()),
            Err(PersistenceError::WriterClosed)
        ));
    }
}

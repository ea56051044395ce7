use std::sync::Arc;

use memo_core::model::SessionId;
use storage::repository::ProgressRepository;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::sink::{ChannelProgressSink, ProgressUpdate};
use crate::error::PersistenceError;
use crate::generation::GenerationClient;

/// Outcome counts for one persistence target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetStats {
    pub saved: usize,
    pub failed: usize,
}

impl TargetStats {
    fn record(&mut self, result: &Result<(), PersistenceError>) {
        match result {
            Ok(()) => self.saved += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// Counts reported when a `ProgressWriter` finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub local: TargetStats,
    /// Stays at zero when no remote is configured.
    pub remote: TargetStats,
    /// Updates without a session id, which have nowhere to go.
    pub skipped: usize,
}

/// Drains progress updates into local storage and, when configured, the
/// generation service. Each target is tried independently; a failure is
/// logged and the update dropped for that target.
pub struct ProgressWriter {
    rx: mpsc::UnboundedReceiver<ProgressUpdate>,
    repo: Arc<dyn ProgressRepository>,
    remote: Option<GenerationClient>,
}

impl ProgressWriter {
    /// Create a connected sink and writer pair.
    #[must_use]
    pub fn channel(
        repo: Arc<dyn ProgressRepository>,
        remote: Option<GenerationClient>,
    ) -> (ChannelProgressSink, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let remote = remote.filter(GenerationClient::enabled);
        (ChannelProgressSink::new(tx), Self { rx, repo, remote })
    }

    /// Run until every sink is dropped.
    pub async fn run(mut self) -> WriterStats {
        let mut stats = WriterStats::default();
        while let Some(update) = self.rx.recv().await {
            let Some(session_id) = update.session_id else {
                debug!("progress update has no session id; skipping");
                stats.skipped += 1;
                continue;
            };

            let local = write_local(self.repo.as_ref(), session_id, &update).await;
            stats.local.record(&local);

            if let Some(remote) = self.remote.as_ref() {
                let result = write_remote(remote, session_id, &update).await;
                stats.remote.record(&result);
            }
        }
        stats
    }
}

async fn write_local(
    repo: &dyn ProgressRepository,
    session_id: SessionId,
    update: &ProgressUpdate,
) -> Result<(), PersistenceError> {
    let result = repo
        .upsert_progress(session_id, &update.progress)
        .await
        .map_err(PersistenceError::from);
    log_outcome("local", session_id, update, &result);
    result
}

async fn write_remote(
    remote: &GenerationClient,
    session_id: SessionId,
    update: &ProgressUpdate,
) -> Result<(), PersistenceError> {
    let result = remote
        .put_progress(session_id, &update.progress)
        .await
        .map_err(PersistenceError::from);
    log_outcome("remote", session_id, update, &result);
    result
}

fn log_outcome(
    target: &'static str,
    session_id: SessionId,
    update: &ProgressUpdate,
    result: &Result<(), PersistenceError>,
) {
    match result {
        Ok(()) => debug!(
            target_store = target,
            %session_id,
            completed = update.progress.completed_blanks(),
            total = update.progress.total_blanks(),
            "progress saved"
        ),
        Err(err) => warn!(
            target_store = target,
            %session_id,
            error = %err,
            "failed to persist progress"
        ),
    }
}

use async_trait::async_trait;
use memo_core::model::{PracticeProgress, SavedTrack, SessionId, TrackDraft, TrackId};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Stored progress together with the song session it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRow {
    pub session_id: SessionId,
    pub progress: PracticeProgress,
}

/// Repository contract for practice progress summaries.
///
/// One row per generated song session; writes replace the previous summary.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Insert or replace the summary for `session_id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the summary cannot be stored.
    async fn upsert_progress(
        &self,
        session_id: SessionId,
        progress: &PracticeProgress,
    ) -> Result<(), StorageError>;

    /// Fetch the summary for `session_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend or mapping failures.
    async fn get_progress(
        &self,
        session_id: SessionId,
    ) -> Result<Option<PracticeProgress>, StorageError>;

    /// Most recently practiced sessions first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend or mapping failures.
    async fn list_progress(&self, limit: u32) -> Result<Vec<ProgressRow>, StorageError>;
}

/// Repository contract for the saved track library.
#[async_trait]
pub trait TrackRepository: Send + Sync {
    /// Persist a new track and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the track cannot be stored.
    async fn insert_track(&self, draft: &TrackDraft) -> Result<SavedTrack, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend or mapping failures.
    async fn get_track(&self, id: TrackId) -> Result<Option<SavedTrack>, StorageError>;

    /// Newest tracks first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend or mapping failures.
    async fn list_tracks(&self, limit: u32) -> Result<Vec<SavedTrack>, StorageError>;

    /// Remove a track. Returns `StorageError::NotFound` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures or a missing id.
    async fn delete_track(&self, id: TrackId) -> Result<(), StorageError>;
}

#[derive(Default)]
struct TrackTable {
    next_id: u64,
    rows: BTreeMap<TrackId, SavedTrack>,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<HashMap<SessionId, PracticeProgress>>>,
    tracks: Arc<Mutex<TrackTable>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn upsert_progress(
        &self,
        session_id: SessionId,
        progress: &PracticeProgress,
    ) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        guard.insert(session_id, progress.clone());
        Ok(())
    }

    async fn get_progress(
        &self,
        session_id: SessionId,
    ) -> Result<Option<PracticeProgress>, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        Ok(guard.get(&session_id).cloned())
    }

    async fn list_progress(&self, limit: u32) -> Result<Vec<ProgressRow>, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        let mut rows: Vec<ProgressRow> = guard
            .iter()
            .map(|(session_id, progress)| ProgressRow {
                session_id: *session_id,
                progress: progress.clone(),
            })
            .collect();
        rows.sort_by(|a, b| {
            b.progress
                .last_practiced_at()
                .cmp(&a.progress.last_practiced_at())
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }
}

#[async_trait]
impl TrackRepository for InMemoryRepository {
    async fn insert_track(&self, draft: &TrackDraft) -> Result<SavedTrack, StorageError> {
        let mut guard = self.tracks.lock().map_err(poisoned)?;
        guard.next_id += 1;
        let id = TrackId::new(guard.next_id);
        let track = draft
            .clone()
            .into_track(id)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        guard.rows.insert(id, track.clone());
        Ok(track)
    }

    async fn get_track(&self, id: TrackId) -> Result<Option<SavedTrack>, StorageError> {
        let guard = self.tracks.lock().map_err(poisoned)?;
        Ok(guard.rows.get(&id).cloned())
    }

    async fn list_tracks(&self, limit: u32) -> Result<Vec<SavedTrack>, StorageError> {
        let guard = self.tracks.lock().map_err(poisoned)?;
        let mut tracks: Vec<SavedTrack> = guard.rows.values().cloned().collect();
        tracks.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        tracks.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(tracks)
    }

    async fn delete_track(&self, id: TrackId) -> Result<(), StorageError> {
        let mut guard = self.tracks.lock().map_err(poisoned)?;
        guard.rows.remove(&id).map(|_| ()).ok_or(StorageError::NotFound)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
    pub tracks: Arc<dyn TrackRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let tracks: Arc<dyn TrackRepository> = Arc::new(repo);
        Self { progress, tracks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use memo_core::time::fixed_now;

    fn draft(title: &str, offset_secs: i64) -> TrackDraft {
        TrackDraft {
            title: title.to_owned(),
            description: "desc".to_owned(),
            topic: "Biology".to_owned(),
            notes: String::new(),
            style: "pop".to_owned(),
            concepts: vec!["glucose".to_owned()],
            audio_url: "https://cdn.example.com/a.mp3".to_owned(),
            created_at: fixed_now() + Duration::seconds(offset_secs),
        }
    }

    #[tokio::test]
    async fn progress_upsert_replaces_previous_summary() {
        let repo = InMemoryRepository::new();
        let session = SessionId::random();

        let first = PracticeProgress::new(1, 3, fixed_now()).unwrap();
        repo.upsert_progress(session, &first).await.unwrap();
        let second = PracticeProgress::new(2, 3, fixed_now() + Duration::minutes(1)).unwrap();
        repo.upsert_progress(session, &second).await.unwrap();

        let stored = repo.get_progress(session).await.unwrap().unwrap();
        assert_eq!(stored.completed_blanks(), 2);
        assert_eq!(repo.list_progress(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_progress_is_none() {
        let repo = InMemoryRepository::new();
        assert!(repo.get_progress(SessionId::random()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn tracks_list_newest_first_and_delete() {
        let repo = InMemoryRepository::new();
        let older = repo.insert_track(&draft("older", 0)).await.unwrap();
        let newer = repo.insert_track(&draft("newer", 60)).await.unwrap();

        let listed = repo.list_tracks(10).await.unwrap();
        assert_eq!(listed[0].id(), newer.id());
        assert_eq!(listed[1].id(), older.id());

        repo.delete_track(older.id()).await.unwrap();
        assert!(repo.get_track(older.id()).await.unwrap().is_none());
        assert!(matches!(
            repo.delete_track(older.id()).await,
            Err(StorageError::NotFound)
        ));
    }
}

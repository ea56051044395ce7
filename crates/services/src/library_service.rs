use std::sync::Arc;

use memo_core::model::{PracticeBundle, SavedTrack, SongRequest, TrackDraft, TrackError, TrackId};
use storage::repository::TrackRepository;

use crate::Clock;
use crate::error::LibraryError;

/// Saved songs the learner can come back to.
#[derive(Clone)]
pub struct LibraryService {
    clock: Clock,
    tracks: Arc<dyn TrackRepository>,
}

impl LibraryService {
    #[must_use]
    pub fn new(clock: Clock, tracks: Arc<dyn TrackRepository>) -> Self {
        Self { clock, tracks }
    }

    /// Save a generated song under the request that produced it.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::Track` if the audio URL is blank.
    /// Returns `LibraryError::Storage` if persistence fails.
    pub async fn save(
        &self,
        request: &SongRequest,
        audio_url: &str,
    ) -> Result<SavedTrack, LibraryError> {
        let draft = TrackDraft::from_request(request, audio_url, self.clock.now())?;
        Ok(self.tracks.insert_track(&draft).await?)
    }

    /// Save a bundle returned by the generation service.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::Track` if the bundle has no audio.
    /// Returns `LibraryError::Storage` if persistence fails.
    pub async fn save_bundle(
        &self,
        request: &SongRequest,
        bundle: &PracticeBundle,
    ) -> Result<SavedTrack, LibraryError> {
        let audio_url = bundle.audio_url.as_deref().ok_or(TrackError::MissingAudio)?;
        self.save(request, audio_url).await
    }

    /// Newest tracks first, up to `limit`.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::Storage` if repository access fails.
    pub async fn list(&self, limit: u32) -> Result<Vec<SavedTrack>, LibraryError> {
        Ok(self.tracks.list_tracks(limit).await?)
    }

    /// Returns `Ok(None)` when the track does not exist.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::Storage` if repository access fails.
    pub async fn get(&self, id: TrackId) -> Result<Option<SavedTrack>, LibraryError> {
        Ok(self.tracks.get_track(id).await?)
    }

    /// # Errors
    ///
    /// Returns `LibraryError::Storage` if the track is missing or the
    /// repository fails.
    pub async fn delete(&self, id: TrackId) -> Result<(), LibraryError> {
        Ok(self.tracks.delete_track(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use memo_core::model::SongRequestDraft;
    use memo_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, StorageError};

    fn request(notes: &str) -> SongRequest {
        let mut draft = SongRequestDraft::new("Biology", "pop");
        draft.notes = notes.to_owned();
        draft.validate().unwrap()
    }

    #[tokio::test]
    async fn saves_and_lists_newest_first() {
        let repo = Arc::new(InMemoryRepository::new());
        let mut clock = Clock::fixed(fixed_now());
        let first = LibraryService::new(clock, repo.clone())
            .save(&request("cells"), "https://cdn.example.com/1.mp3")
            .await
            .unwrap();
        clock.advance(Duration::minutes(5));
        let library = LibraryService::new(clock, repo);
        let second = library
            .save(&request(""), "https://cdn.example.com/2.mp3")
            .await
            .unwrap();

        assert_eq!(second.title(), "pop memo mix");
        assert_eq!(second.description(), "Biology");
        assert_eq!(first.description(), "cells");

        let listed = library.list(10).await.unwrap();
        let ids: Vec<TrackId> = listed.iter().map(SavedTrack::id).collect();
        assert_eq!(ids, vec![second.id(), first.id()]);
    }

    #[tokio::test]
    async fn bundle_without_audio_is_rejected() {
        let library = LibraryService::new(Clock::fixed(fixed_now()), Arc::new(InMemoryRepository::new()));
        let err = library
            .save_bundle(&request(""), &PracticeBundle::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::Track(TrackError::MissingAudio)));
    }

    #[tokio::test]
    async fn delete_missing_track_reports_not_found() {
        let library = LibraryService::new(Clock::fixed(fixed_now()), Arc::new(InMemoryRepository::new()));
        let saved = library
            .save(&request(""), "https://cdn.example.com/1.mp3")
            .await
            .unwrap();
        library.delete(saved.id()).await.unwrap();
        assert!(library.get(saved.id()).await.unwrap().is_none());
        assert!(matches!(
            library.delete(saved.id()).await,
            Err(LibraryError::Storage(StorageError::NotFound))
        ));
    }
}

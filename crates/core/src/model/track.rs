use chrono::{DateTime, Utc};
use thiserror::Error;

use super::ids::TrackId;
use super::request::SongRequest;

const DESCRIPTION_LIMIT: usize = 140;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TrackError {
    #[error("track title cannot be empty")]
    EmptyTitle,
    #[error("track has no audio source")]
    MissingAudio,
}

/// Collapse whitespace and cap the text at 140 characters.
#[must_use]
pub fn summarize_notes(notes: &str) -> String {
    let clean = notes.split_whitespace().collect::<Vec<_>>().join(" ");
    if clean.chars().count() <= DESCRIPTION_LIMIT {
        return clean;
    }
    let mut cut: String = clean.chars().take(DESCRIPTION_LIMIT - 3).collect();
    cut.push('…');
    cut
}

/// Track built from a generation request, not yet saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDraft {
    pub title: String,
    pub description: String,
    pub topic: String,
    pub notes: String,
    pub style: String,
    pub concepts: Vec<String>,
    pub audio_url: String,
    pub created_at: DateTime<Utc>,
}

impl TrackDraft {
    /// # Errors
    ///
    /// Returns `TrackError::MissingAudio` if `audio_url` is blank.
    pub fn from_request(
        request: &SongRequest,
        audio_url: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, TrackError> {
        let audio_url = audio_url.into().trim().to_owned();
        if audio_url.is_empty() {
            return Err(TrackError::MissingAudio);
        }
        let source = if request.notes().is_empty() {
            request.topic()
        } else {
            request.notes()
        };
        Ok(Self {
            title: format!("{} memo mix", request.style()),
            description: summarize_notes(source),
            topic: request.topic().to_owned(),
            notes: request.notes().to_owned(),
            style: request.style().to_owned(),
            concepts: request.concepts().to_vec(),
            audio_url,
            created_at,
        })
    }

    /// Check the fields a saved track must carry.
    ///
    /// # Errors
    ///
    /// Returns `TrackError` if the draft lost its title or audio.
    pub fn validate(&self) -> Result<(), TrackError> {
        if self.title.trim().is_empty() {
            return Err(TrackError::EmptyTitle);
        }
        if self.audio_url.trim().is_empty() {
            return Err(TrackError::MissingAudio);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `TrackError` if the draft lost its title or audio.
    pub fn into_track(self, id: TrackId) -> Result<SavedTrack, TrackError> {
        self.validate()?;
        Ok(SavedTrack { id, draft: self })
    }
}

/// A track in the learner's local library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedTrack {
    id: TrackId,
    draft: TrackDraft,
}

impl SavedTrack {
    #[must_use]
    pub fn id(&self) -> TrackId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.draft.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.draft.description
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.draft.topic
    }

    #[must_use]
    pub fn notes(&self) -> &str {
        &self.draft.notes
    }

    #[must_use]
    pub fn style(&self) -> &str {
        &self.draft.style
    }

    #[must_use]
    pub fn concepts(&self) -> &[String] {
        &self.draft.concepts
    }

    #[must_use]
    pub fn audio_url(&self) -> &str {
        &self.draft.audio_url
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.draft.created_at
    }
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::blank::{BlankError, BlankRecord, BlankSet};
use super::ids::SessionId;
use super::lyrics::{LyricsError, PracticedLyrics};

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum BundleError {
    #[error(transparent)]
    Blank(#[from] BlankError),
    #[error(transparent)]
    Lyrics(#[from] LyricsError),
}

/// Generated song session as returned by the generation service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PracticeBundle {
    #[serde(default)]
    pub session_id: Option<SessionId>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub concepts: Vec<String>,
    #[serde(default)]
    pub music_genre: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub lyrics: Vec<String>,
    #[serde(default)]
    pub practiced_lyrics: Vec<String>,
    #[serde(default)]
    pub blanks: Option<Vec<BlankRecord>>,
    #[serde(default)]
    pub audio_url: Option<String>,
}

/// Validated, immutable input for one practice attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct PracticeMaterial {
    pub lyrics: PracticedLyrics,
    pub blanks: BlankSet,
}

impl PracticeBundle {
    /// Validate the bundle into session material.
    ///
    /// The practice sheet falls back to the full lyrics when the service did
    /// not send a separate `practiced_lyrics` array.
    ///
    /// # Errors
    ///
    /// Returns `BundleError` when the blank list is missing or malformed, or
    /// when the two lyric arrays disagree on length.
    pub fn into_material(self) -> Result<PracticeMaterial, BundleError> {
        let lines = if self.practiced_lyrics.is_empty() {
            self.lyrics
        } else {
            if !self.lyrics.is_empty() && self.lyrics.len() != self.practiced_lyrics.len() {
                return Err(LyricsError::LengthMismatch {
                    lyrics: self.lyrics.len(),
                    practiced: self.practiced_lyrics.len(),
                }
                .into());
            }
            self.practiced_lyrics
        };

        let records = self.blanks.ok_or(BlankError::MissingBlanks)?;
        let blanks = BlankSet::from_records(records, lines.len())?;

        Ok(PracticeMaterial {
            lyrics: PracticedLyrics::new(lines),
            blanks,
        })
    }
}

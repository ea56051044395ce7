use thiserror::Error;

use crate::model::{
    BlankError, BundleError, LyricsError, ProgressError, SettingsError, SongRequestError, TrackError,
};

/// Umbrella error for callers that do not care which domain rule failed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Blank(#[from] BlankError),
    #[error(transparent)]
    Bundle(#[from] BundleError),
    #[error(transparent)]
    Lyrics(#[from] LyricsError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Track(#[from] TrackError),
    #[error(transparent)]
    SongRequest(#[from] SongRequestError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

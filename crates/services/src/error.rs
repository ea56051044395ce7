//! Shared error types for the services crate.

use thiserror::Error;

use memo_core::model::{BundleError, SettingsError, TrackError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

use crate::practice::{PlaybackError, PracticePhase};

/// Errors emitted by `PracticeSession`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PracticeError {
    #[error("practice material is malformed: {0}")]
    Construction(#[from] BundleError),
    #[error("audio playback is unavailable: {0}")]
    PlaybackUnavailable(#[from] PlaybackError),
    #[error("cannot {action} while {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: PracticePhase,
    },
}

/// A progress summary that could not be saved. Logged, never retried.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PersistenceError {
    #[error("progress writer has shut down")]
    WriterClosed,
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Remote(#[from] GenerationError),
}

/// Errors emitted by `GenerationClient`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerationError {
    #[error("song generation is not configured")]
    Disabled,
    #[error("song generation request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by `LibraryService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LibraryError {
    #[error(transparent)]
    Track(#[from] TrackError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while reading `ServicesConfig`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("invalid lead-in {value:?}: expected a finite number of seconds >= 0")]
    InvalidLeadIn { value: String },
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

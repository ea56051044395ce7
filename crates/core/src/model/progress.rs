use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("completed blanks ({completed}) exceed total blanks ({total})")]
    CompletedExceedsTotal { completed: u32, total: u32 },

    #[error("completion rate {rate} does not match {completed}/{total}")]
    RateMismatch { rate: f64, completed: u32, total: u32 },

    #[error("too many blanks for a progress summary: {len}")]
    TooManyBlanks { len: usize },
}

/// Persisted summary of a practice attempt on one generated song.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeProgress {
    completed_blanks: u32,
    total_blanks: u32,
    completion_rate: f64,
    last_practiced_at: DateTime<Utc>,
}

fn rate(completed: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        f64::from(completed) / f64::from(total)
    }
}

impl PracticeProgress {
    /// Build a summary, deriving the completion rate.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::CompletedExceedsTotal` if `completed > total`.
    pub fn new(
        completed_blanks: u32,
        total_blanks: u32,
        last_practiced_at: DateTime<Utc>,
    ) -> Result<Self, ProgressError> {
        if completed_blanks > total_blanks {
            return Err(ProgressError::CompletedExceedsTotal {
                completed: completed_blanks,
                total: total_blanks,
            });
        }
        Ok(Self {
            completed_blanks,
            total_blanks,
            completion_rate: rate(completed_blanks, total_blanks),
            last_practiced_at,
        })
    }

    /// Build a summary from in-memory counters.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::TooManyBlanks` if a count does not fit in `u32`,
    /// or `CompletedExceedsTotal` if the counters are inconsistent.
    pub fn from_counts(
        completed: usize,
        total: usize,
        last_practiced_at: DateTime<Utc>,
    ) -> Result<Self, ProgressError> {
        let total_blanks =
            u32::try_from(total).map_err(|_| ProgressError::TooManyBlanks { len: total })?;
        let completed_blanks =
            u32::try_from(completed).map_err(|_| ProgressError::TooManyBlanks { len: completed })?;
        Self::new(completed_blanks, total_blanks, last_practiced_at)
    }

    /// Rehydrate a summary from storage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the counts are inconsistent or the stored
    /// rate does not match them.
    pub fn from_persisted(
        completed_blanks: u32,
        total_blanks: u32,
        completion_rate: f64,
        last_practiced_at: DateTime<Utc>,
    ) -> Result<Self, ProgressError> {
        let progress = Self::new(completed_blanks, total_blanks, last_practiced_at)?;
        if (progress.completion_rate - completion_rate).abs() > 1e-6 {
            return Err(ProgressError::RateMismatch {
                rate: completion_rate,
                completed: completed_blanks,
                total: total_blanks,
            });
        }
        Ok(progress)
    }

    #[must_use]
    pub fn completed_blanks(&self) -> u32 {
        self.completed_blanks
    }

    #[must_use]
    pub fn total_blanks(&self) -> u32 {
        self.total_blanks
    }

    /// Fraction in `[0, 1]`; zero when the song has no blanks.
    #[must_use]
    pub fn completion_rate(&self) -> f64 {
        self.completion_rate
    }

    #[must_use]
    pub fn last_practiced_at(&self) -> DateTime<Utc> {
        self.last_practiced_at
    }
}

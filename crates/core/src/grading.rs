//! Answer grading for fill-in-the-blank practice.
//!
//! Grading is exact: both sides are trimmed and compared case-insensitively.
//! There is no partial credit and no fuzzy matching.

use serde::{Deserialize, Serialize};

/// Returns true when `submitted` matches `expected` after trimming, ignoring case.
#[must_use]
pub fn is_correct(submitted: &str, expected: &str) -> bool {
    let submitted = submitted.trim();
    let expected = expected.trim();
    if submitted.is_empty() {
        return false;
    }
    submitted == expected || submitted.to_lowercase() == expected.to_lowercase()
}

/// Latest answer recorded for one blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub submitted_text: String,
    pub is_correct: bool,
}

impl AnswerRecord {
    #[must_use]
    pub fn grade(submitted: &str, expected: &str) -> Self {
        Self {
            submitted_text: submitted.trim().to_owned(),
            is_correct: is_correct(submitted, expected),
        }
    }

    /// Record for a blank the learner never got to answer.
    #[must_use]
    pub fn unanswered() -> Self {
        Self {
            submitted_text: String::new(),
            is_correct: false,
        }
    }

    #[must_use]
    pub fn is_unanswered(&self) -> bool {
        self.submitted_text.is_empty()
    }
}

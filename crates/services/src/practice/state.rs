use std::collections::{HashMap, HashSet};
use std::fmt;

use memo_core::grading::AnswerRecord;
use memo_core::model::BlankKey;
use serde::Serialize;

/// Where a practice attempt is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PracticePhase {
    Idle,
    Playing,
    AwaitingInput,
    Graded,
    Complete,
}

impl fmt::Display for PracticePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PracticePhase::Idle => "idle",
            PracticePhase::Playing => "playing",
            PracticePhase::AwaitingInput => "awaiting input",
            PracticePhase::Graded => "graded",
            PracticePhase::Complete => "complete",
        };
        f.write_str(label)
    }
}

/// Mutable state of one attempt. Only `PracticeSession` writes to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub(crate) current_blank_index: usize,
    pub(crate) completed_count: usize,
    pub(crate) is_playing: bool,
    pub(crate) is_awaiting_input: bool,
    pub(crate) answers: HashMap<BlankKey, AnswerRecord>,
    pub(crate) counted: HashSet<BlankKey>,
    pub(crate) audio_ended: bool,
}

impl SessionState {
    #[must_use]
    pub fn current_blank_index(&self) -> usize {
        self.current_blank_index
    }

    /// Blanks answered correctly at least once.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.completed_count
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    #[must_use]
    pub fn is_awaiting_input(&self) -> bool {
        self.is_awaiting_input
    }

    #[must_use]
    pub fn answer(&self, key: BlankKey) -> Option<&AnswerRecord> {
        self.answers.get(&key)
    }

    #[must_use]
    pub fn answers(&self) -> &HashMap<BlankKey, AnswerRecord> {
        &self.answers
    }

    /// Number of blanks that have a grading result, forced or submitted.
    #[must_use]
    pub fn graded_count(&self) -> usize {
        self.answers.len()
    }

    /// Records `answer` for `key`. Returns true when this is the first
    /// correct answer for the blank.
    pub(crate) fn record(&mut self, key: BlankKey, answer: AnswerRecord) -> bool {
        let newly_correct = answer.is_correct && self.counted.insert(key);
        if newly_correct {
            self.completed_count += 1;
        }
        self.answers.insert(key, answer);
        newly_correct
    }
}

/// Read-only view of a session for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PracticeSnapshot {
    pub phase: PracticePhase,
    pub current_blank_index: usize,
    pub completed_count: usize,
    pub graded_count: usize,
    pub total_blanks: usize,
    pub is_playing: bool,
    pub is_awaiting_input: bool,
}

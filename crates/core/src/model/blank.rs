use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use super::ids::BlankKey;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum BlankError {
    #[error("blank list is missing from the practice data")]
    MissingBlanks,

    #[error("blank #{index} is missing `{field}`")]
    MissingField { index: usize, field: &'static str },

    #[error("blank #{index} has an empty answer word")]
    EmptyWord { index: usize },

    #[error("blank #{index} has an invalid start time: {value}")]
    InvalidStartTime { index: usize, value: f64 },

    #[error("blank #{index} has a negative `{field}`: {value}")]
    NegativeIndex {
        index: usize,
        field: &'static str,
        value: i64,
    },

    #[error("blank #{index} points at line {line_index} but the lyrics only have {line_count} lines")]
    LineOutOfRange {
        index: usize,
        line_index: usize,
        line_count: usize,
    },

    #[error("two blanks share the slot {key}")]
    DuplicateSlot { key: BlankKey },
}

/// Wire shape of one blank as produced by the generation service.
///
/// Every field is optional here so a missing field surfaces as a
/// `BlankError` instead of an opaque deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlankRecord {
    #[serde(default)]
    pub original_word: Option<String>,
    #[serde(default)]
    pub start_time: Option<f64>,
    #[serde(default)]
    pub line_index: Option<i64>,
    #[serde(default)]
    pub word_position: Option<i64>,
}

impl BlankRecord {
    #[must_use]
    pub fn new(
        original_word: impl Into<String>,
        start_time: f64,
        line_index: usize,
        word_position: usize,
    ) -> Self {
        Self {
            original_word: Some(original_word.into()),
            start_time: Some(start_time),
            line_index: i64::try_from(line_index).ok(),
            word_position: i64::try_from(word_position).ok(),
        }
    }
}

/// A validated fill-in-the-blank cue.
#[derive(Debug, Clone, PartialEq)]
pub struct Blank {
    original_word: String,
    start_time: f64,
    key: BlankKey,
}

impl Blank {
    #[must_use]
    pub fn original_word(&self) -> &str {
        &self.original_word
    }

    /// Seconds into the track at which the word is sung.
    #[must_use]
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    #[must_use]
    pub fn key(&self) -> BlankKey {
        self.key
    }

    #[must_use]
    pub fn line_index(&self) -> usize {
        self.key.line_index
    }

    #[must_use]
    pub fn word_position(&self) -> usize {
        self.key.word_position
    }

    /// Playback position at which the session should pause for this blank.
    #[must_use]
    pub fn cue_time(&self, lead_in: f64) -> f64 {
        self.start_time - lead_in
    }

    fn from_record(index: usize, record: BlankRecord, line_count: usize) -> Result<Self, BlankError> {
        let word = record.original_word.ok_or(BlankError::MissingField {
            index,
            field: "original_word",
        })?;
        let word = word.trim();
        if word.is_empty() {
            return Err(BlankError::EmptyWord { index });
        }

        let start_time = record.start_time.ok_or(BlankError::MissingField {
            index,
            field: "start_time",
        })?;
        if !start_time.is_finite() || start_time < 0.0 {
            return Err(BlankError::InvalidStartTime {
                index,
                value: start_time,
            });
        }

        let line_index = non_negative(index, "line_index", record.line_index)?;
        let word_position = non_negative(index, "word_position", record.word_position)?;
        if line_index >= line_count {
            return Err(BlankError::LineOutOfRange {
                index,
                line_index,
                line_count,
            });
        }

        Ok(Self {
            original_word: word.to_owned(),
            start_time,
            key: BlankKey::new(line_index, word_position),
        })
    }
}

fn non_negative(index: usize, field: &'static str, value: Option<i64>) -> Result<usize, BlankError> {
    let value = value.ok_or(BlankError::MissingField { index, field })?;
    usize::try_from(value).map_err(|_| BlankError::NegativeIndex {
        index,
        field,
        value,
    })
}

/// Blanks ordered by `start_time`, ties kept in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlankSet {
    blanks: Vec<Blank>,
}

impl BlankSet {
    /// Validate raw records against a lyric sheet with `line_count` lines and
    /// sort them into cue order.
    ///
    /// # Errors
    ///
    /// Returns the first `BlankError` found; records are checked in input order.
    pub fn from_records(records: Vec<BlankRecord>, line_count: usize) -> Result<Self, BlankError> {
        let mut blanks = Vec::with_capacity(records.len());
        let mut seen = HashSet::with_capacity(records.len());

        for (index, record) in records.into_iter().enumerate() {
            let blank = Blank::from_record(index, record, line_count)?;
            if !seen.insert(blank.key) {
                return Err(BlankError::DuplicateSlot { key: blank.key });
            }
            blanks.push(blank);
        }

        // `sort_by` is stable, so equal start times keep their input order.
        blanks.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

        Ok(Self { blanks })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blanks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blanks.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Blank> {
        self.blanks.get(index)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Blank] {
        &self.blanks
    }

    pub fn iter(&self) -> impl Iterator<Item = &Blank> {
        self.blanks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_by_start_time_and_keeps_ties_stable() {
        let records = vec![
            BlankRecord::new("third", 5.0, 2, 0),
            BlankRecord::new("first", 1.0, 0, 0),
            BlankRecord::new("tie-a", 3.0, 1, 0),
            BlankRecord::new("tie-b", 3.0, 1, 1),
        ];
        let set = BlankSet::from_records(records, 3).unwrap();

        let words: Vec<_> = set.iter().map(Blank::original_word).collect();
        assert_eq!(words, vec!["first", "tie-a", "tie-b", "third"]);
        assert!(
            set.as_slice()
                .windows(2)
                .all(|pair| pair[0].start_time() <= pair[1].start_time())
        );
    }

    #[test]
    fn empty_list_is_valid() {
        let set = BlankSet::from_records(Vec::new(), 0).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn missing_field_is_reported_with_index() {
        let mut record = BlankRecord::new("energy", 9.5, 0, 1);
        record.start_time = None;
        let err = BlankSet::from_records(vec![BlankRecord::new("a", 1.0, 0, 0), record], 1)
            .unwrap_err();
        assert_eq!(
            err,
            BlankError::MissingField {
                index: 1,
                field: "start_time"
            }
        );
    }

    #[test]
    fn rejects_duplicate_slots() {
        let records = vec![
            BlankRecord::new("one", 1.0, 0, 2),
            BlankRecord::new("two", 2.0, 0, 2),
        ];
        let err = BlankSet::from_records(records, 1).unwrap_err();
        assert_eq!(
            err,
            BlankError::DuplicateSlot {
                key: BlankKey::new(0, 2)
            }
        );
    }

    #[test]
    fn rejects_bad_numbers() {
        let nan = BlankSet::from_records(vec![BlankRecord::new("x", f64::NAN, 0, 0)], 1);
        assert!(matches!(nan, Err(BlankError::InvalidStartTime { index: 0, .. })));

        let mut negative = BlankRecord::new("x", 1.0, 0, 0);
        negative.word_position = Some(-1);
        let err = BlankSet::from_records(vec![negative], 1).unwrap_err();
        assert!(matches!(err, BlankError::NegativeIndex { field: "word_position", .. }));

        let out_of_range = BlankSet::from_records(vec![BlankRecord::new("x", 1.0, 4, 0)], 2);
        assert!(matches!(out_of_range, Err(BlankError::LineOutOfRange { line_index: 4, .. })));
    }

    #[test]
    fn blank_word_is_rejected() {
        let err = BlankSet::from_records(vec![BlankRecord::new("   ", 1.0, 0, 0)], 1).unwrap_err();
        assert_eq!(err, BlankError::EmptyWord { index: 0 });
    }

    #[test]
    fn cue_time_subtracts_lead_in() {
        let set = BlankSet::from_records(vec![BlankRecord::new("mitochondria", 4.0, 0, 2)], 1)
            .unwrap();
        let cue = set.get(0).unwrap().cue_time(0.2);
        assert!((cue - 3.8).abs() < 1e-9);
    }
}

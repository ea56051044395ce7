use serde::Serialize;
use thiserror::Error;

/// Select value meaning "use the free-text field instead".
pub const OTHER: &str = "Other";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SongRequestError {
    #[error("a topic is required")]
    MissingTopic,
    #[error("a custom topic is required when `Other` is selected")]
    MissingCustomTopic,
    #[error("a music style is required")]
    MissingStyle,
    #[error("a custom style is required when `Other` is selected")]
    MissingCustomStyle,
}

/// Raw form input for a song generation request.
#[derive(Debug, Clone, Default)]
pub struct SongRequestDraft {
    pub topic: String,
    pub custom_topic: String,
    pub style: String,
    pub custom_style: String,
    pub notes: String,
    pub concepts: Vec<String>,
}

/// Validated generation request, serialized as the service payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SongRequest {
    #[serde(rename = "subject")]
    topic: String,
    concepts: Vec<String>,
    #[serde(rename = "music_genre")]
    style: String,
    notes: String,
}

fn pick(selected: &str, custom: &str) -> Option<Result<String, ()>> {
    let selected = selected.trim();
    if selected.is_empty() {
        return None;
    }
    if selected == OTHER {
        let custom = custom.trim();
        return Some(if custom.is_empty() {
            Err(())
        } else {
            Ok(custom.to_owned())
        });
    }
    Some(Ok(selected.to_owned()))
}

impl SongRequestDraft {
    #[must_use]
    pub fn new(topic: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            style: style.into(),
            ..Self::default()
        }
    }

    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns `SongRequestError` for a missing topic/style, or a missing
    /// free-text value when `Other` is selected.
    pub fn validate(self) -> Result<SongRequest, SongRequestError> {
        let topic = pick(&self.topic, &self.custom_topic)
            .ok_or(SongRequestError::MissingTopic)?
            .map_err(|()| SongRequestError::MissingCustomTopic)?;
        let style = pick(&self.style, &self.custom_style)
            .ok_or(SongRequestError::MissingStyle)?
            .map_err(|()| SongRequestError::MissingCustomStyle)?;

        let mut concepts = ConceptList::new();
        for concept in self.concepts {
            concepts.add(&concept);
        }

        Ok(SongRequest {
            topic,
            concepts: concepts.into_vec(),
            style,
            notes: self.notes.trim().to_owned(),
        })
    }
}

impl SongRequest {
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub fn style(&self) -> &str {
        &self.style
    }

    #[must_use]
    pub fn notes(&self) -> &str {
        &self.notes
    }

    #[must_use]
    pub fn concepts(&self) -> &[String] {
        &self.concepts
    }
}

/// Concept cues the learner wants the song to cover.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConceptList {
    items: Vec<String>,
}

impl ConceptList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a trimmed concept. Returns false for blanks and case-insensitive duplicates.
    pub fn add(&mut self, concept: &str) -> bool {
        let concept = concept.trim();
        if concept.is_empty() {
            return false;
        }
        let lowered = concept.to_lowercase();
        if self.items.iter().any(|c| c.to_lowercase() == lowered) {
            return false;
        }
        self.items.push(concept.to_owned());
        true
    }

    pub fn remove(&mut self, index: usize) -> Option<String> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.items
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.items
    }
}

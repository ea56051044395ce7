use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LyricsError {
    #[error("lyrics have {lyrics} lines but the practice sheet has {practiced}")]
    LengthMismatch { lyrics: usize, practiced: usize },
}

/// Returns true when a whitespace-separated token stands in for a hidden word.
///
/// Placeholders are runs of at least two underscores, optionally wrapped in
/// punctuation (`____,` or `(____)`).
#[must_use]
pub fn is_placeholder(token: &str) -> bool {
    placeholder_span(token).is_some()
}

fn placeholder_span(token: &str) -> Option<(usize, usize)> {
    let start = token.find('_')?;
    let len = token[start..].chars().take_while(|c| *c == '_').count();
    if len < 2 {
        return None;
    }
    let end = start + len;
    let only_punctuation = token[..start]
        .chars()
        .chain(token[end..].chars())
        .all(|c| c.is_ascii_punctuation() && c != '_');
    only_punctuation.then_some((start, end))
}

/// Lyric sheet shown during practice, with placeholders where blanks sit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PracticedLyrics {
    lines: Vec<String>,
}

impl PracticedLyrics {
    #[must_use]
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Lines `0..=last_line`, clamped to the sheet.
    #[must_use]
    pub fn visible_through(&self, last_line: usize) -> &[String] {
        let end = last_line.saturating_add(1).min(self.lines.len());
        &self.lines[..end]
    }

    /// Render a line with the given `(word_position, word)` pairs filled in.
    ///
    /// A pair is only applied when the token at that position is a
    /// placeholder; surrounding punctuation is preserved.
    #[must_use]
    pub fn render_line(&self, index: usize, revealed: &[(usize, &str)]) -> Option<String> {
        let line = self.lines.get(index)?;
        if revealed.is_empty() {
            return Some(line.clone());
        }

        let rendered: Vec<String> = line
            .split_whitespace()
            .enumerate()
            .map(|(position, token)| {
                let fill = revealed
                    .iter()
                    .find(|(pos, _)| *pos == position)
                    .map(|(_, word)| *word);
                match (fill, placeholder_span(token)) {
                    (Some(word), Some((start, end))) => {
                        format!("{}{}{}", &token[..start], word, &token[end..])
                    }
                    _ => token.to_owned(),
                }
            })
            .collect();
        Some(rendered.join(" "))
    }
}

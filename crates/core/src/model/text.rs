use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TextError {
    #[error("text must not be empty")]
    Empty,
}

/// Question or answer text: trimmed and never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuizText(String);

impl QuizText {
    /// Trims the input and rejects it if nothing is left.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` for empty or whitespace-only input.
    pub fn parse(s: impl Into<String>) -> Result<Self, TextError> {
        let s = s.into();
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        if trimmed.len() == s.len() {
            return Ok(Self(s));
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compares two texts ignoring case and surrounding whitespace.
    #[must_use]
    pub fn matches(&self, other: &str) -> bool {
        self.0.to_lowercase() == other.trim().to_lowercase()
    }
}

impl fmt::Display for QuizText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

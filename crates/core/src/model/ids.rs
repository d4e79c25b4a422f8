use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable identifier for a Quiz.
///
/// Assigned by the store on creation and never reused, so deleting one quiz
/// never renumbers another.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuizId(u64);

impl QuizId {
    /// Creates a new `QuizId`
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying u64 value
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Returns the id following this one.
    #[must_use]
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Debug for QuizId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuizId({})", self.0)
    }
}

impl fmt::Display for QuizId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type for parsing ID from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    raw: String,
}

impl ParseIdError {
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse QuizId from {:?}", self.raw)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for QuizId {
    type Err = ParseIdError;

    /// The whole string must be a non-negative integer; `"3abc"` is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(QuizId::new).map_err(|_| ParseIdError {
            raw: s.to_string(),
        })
    }
}

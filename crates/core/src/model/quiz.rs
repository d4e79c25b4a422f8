use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::QuizId;
use crate::model::text::{QuizText, TextError};

//
// ─── QUIZ TYPES ────────────────────────────────────────────────────────────────
//

/// Unvalidated question/answer pair as typed by a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizDraft {
    pub question: String,
    pub answer: String,
}

impl QuizDraft {
    #[must_use]
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }

    /// Trim and check both texts.
    ///
    /// # Errors
    ///
    /// Returns `QuizValidationError` naming the first empty field.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedQuiz, QuizValidationError> {
        let question = QuizText::parse(self.question).map_err(QuizValidationError::Question)?;
        let answer = QuizText::parse(self.answer).map_err(QuizValidationError::Answer)?;
        Ok(ValidatedQuiz {
            question,
            answer,
            created_at: now,
        })
    }
}

/// A quiz that passed validation but has no id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuiz {
    pub question: QuizText,
    pub answer: QuizText,
    pub created_at: DateTime<Utc>,
}

impl ValidatedQuiz {
    #[must_use]
    pub fn assign_id(self, id: QuizId) -> Quiz {
        Quiz {
            id,
            question: self.question,
            answer: self.answer,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    id: QuizId,
    question: QuizText,
    answer: QuizText,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Quiz {
    /// Rebuild a quiz from stored fields, re-checking the texts.
    ///
    /// # Errors
    ///
    /// Returns `QuizValidationError` if the stored question or answer is blank.
    pub fn from_persisted(
        id: QuizId,
        question: impl Into<String>,
        answer: impl Into<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, QuizValidationError> {
        Ok(Self {
            id,
            question: QuizText::parse(question).map_err(QuizValidationError::Question)?,
            answer: QuizText::parse(answer).map_err(QuizValidationError::Answer)?,
            created_at,
            updated_at,
        })
    }

    /// Returns a copy carrying the draft's texts, keeping id and creation time.
    ///
    /// # Errors
    ///
    /// Returns `QuizValidationError` if the draft is invalid; `self` is untouched.
    pub fn revise(&self, draft: QuizDraft, now: DateTime<Utc>) -> Result<Self, QuizValidationError> {
        let validated = draft.validate(now)?;
        Ok(Self {
            id: self.id,
            question: validated.question,
            answer: validated.answer,
            created_at: self.created_at,
            updated_at: now,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuizId {
        self.id
    }

    #[must_use]
    pub fn question(&self) -> &QuizText {
        &self.question
    }

    #[must_use]
    pub fn answer(&self) -> &QuizText {
        &self.answer
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Whether `reply` matches the stored answer, ignoring case and padding.
    #[must_use]
    pub fn is_correct(&self, reply: &str) -> bool {
        self.answer.matches(reply)
    }
}

//
// ─── QUIZ VALIDATION ERRORS ────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuizValidationError {
    #[error("invalid question: {0}")]
    Question(#[source] TextError),

    #[error("invalid answer: {0}")]
    Answer(#[source] TextError),
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

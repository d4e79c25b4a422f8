//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{QuizId, QuizValidationError};
use storage::repository::StorageError;

/// Coarse classification of every failure a command can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingParameter,
    NotANumber,
    NotFound,
    ValidationError,
    PersistenceError,
}

/// Errors emitted by `QuizService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServiceError {
    #[error("there is no quiz with id={0}")]
    NotFound(QuizId),
    #[error(transparent)]
    Validation(#[from] QuizValidationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl QuizServiceError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::ValidationError,
            Self::Storage(_) => ErrorKind::PersistenceError,
        }
    }
}

/// Errors emitted while running a session command.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("missing <id> parameter")]
    MissingParameter,
    #[error("the <id> parameter is not a number: {raw:?}")]
    NotANumber { raw: String },
    #[error(transparent)]
    Quiz(#[from] QuizServiceError),
}

impl SessionError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingParameter => ErrorKind::MissingParameter,
            Self::NotANumber { .. } => ErrorKind::NotANumber,
            Self::Quiz(err) => err.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::TextError;

    #[test]
    fn kinds_follow_the_taxonomy() {
        assert_eq!(SessionError::MissingParameter.kind(), ErrorKind::MissingParameter);
        assert_eq!(
            SessionError::NotANumber { raw: "x".into() }.kind(),
            ErrorKind::NotANumber
        );
        assert_eq!(
            SessionError::from(QuizServiceError::NotFound(QuizId::new(3))).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            SessionError::from(QuizServiceError::from(QuizValidationError::Answer(
                TextError::Empty
            )))
            .kind(),
            ErrorKind::ValidationError
        );
        assert_eq!(
            SessionError::from(QuizServiceError::from(StorageError::Connection(
                "gone".into()
            )))
            .kind(),
            ErrorKind::PersistenceError
        );
    }

    #[test]
    fn not_found_message_names_the_id() {
        let err = QuizServiceError::NotFound(QuizId::new(12));
        assert_eq!(err.to_string(), "there is no quiz with id=12");
    }
}

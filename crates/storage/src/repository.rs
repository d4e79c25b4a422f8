use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{Quiz, QuizId, ValidatedQuiz};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::table::QuizTable;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persisted shape for a quiz that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuizRecord {
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

impl NewQuizRecord {
    #[must_use]
    pub fn from_validated(quiz: &ValidatedQuiz) -> Self {
        Self {
            question: quiz.question.as_str().to_owned(),
            answer: quiz.answer.as_str().to_owned(),
            created_at: quiz.created_at,
        }
    }

    /// Convert the record into a domain `Quiz` carrying the given id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the texts fail validation.
    pub fn into_quiz(self, id: QuizId) -> Result<Quiz, StorageError> {
        Quiz::from_persisted(
            id,
            self.question,
            self.answer,
            self.created_at,
            self.created_at,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

/// Repository contract for the quiz collection.
///
/// Implementations must apply each mutation atomically: callers either see the
/// collection before the mutation or after it has been durably written.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// All quizzes in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn list_quizzes(&self) -> Result<Vec<Quiz>, StorageError>;

    /// Fetch a quiz by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures; a missing quiz is `Ok(None)`.
    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError>;

    /// Assign the next id to the record and persist it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the quiz cannot be stored. Nothing is kept on failure.
    async fn insert_new_quiz(&self, quiz: NewQuizRecord) -> Result<Quiz, StorageError>;

    /// Replace the stored quiz with the same id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the id is absent, or other storage errors.
    async fn update_quiz(&self, quiz: &Quiz) -> Result<(), StorageError>;

    /// Remove a quiz. Remaining ids are left as they are.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the id is absent, or other storage errors.
    async fn delete_quiz(&self, id: QuizId) -> Result<(), StorageError>;

    /// Store `quizzes` in a single write if the backing store was just created.
    ///
    /// Returns whether anything was written.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the seed cannot be persisted.
    async fn seed_if_new(&self, quizzes: Vec<NewQuizRecord>) -> Result<bool, StorageError>;
}

#[derive(Debug)]
struct MemoryState {
    table: QuizTable,
    fresh: bool,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                table: QuizTable::new(),
                fresh: true,
            })),
        }
    }

    fn with_state<T>(
        &self,
        f: impl FnOnce(&mut MemoryState) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        f(&mut guard)
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn list_quizzes(&self) -> Result<Vec<Quiz>, StorageError> {
        self.with_state(|state| Ok(state.table.list()))
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError> {
        self.with_state(|state| Ok(state.table.get(id)))
    }

    async fn insert_new_quiz(&self, quiz: NewQuizRecord) -> Result<Quiz, StorageError> {
        self.with_state(|state| {
            state.fresh = false;
            state.table.insert(quiz)
        })
    }

    async fn update_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        self.with_state(|state| state.table.update(quiz))
    }

    async fn delete_quiz(&self, id: QuizId) -> Result<(), StorageError> {
        self.with_state(|state| state.table.remove(id))
    }

    async fn seed_if_new(&self, quizzes: Vec<NewQuizRecord>) -> Result<bool, StorageError> {
        self.with_state(|state| {
            if !state.fresh {
                return Ok(false);
            }
            let mut next = state.table.clone();
            for quiz in quizzes {
                next.insert(quiz)?;
            }
            state.table = next;
            state.fresh = false;
            Ok(true)
        })
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub quizzes: Arc<dyn QuizRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let quizzes: Arc<dyn QuizRepository> = Arc::new(InMemoryRepository::new());
        Self { quizzes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::time::fixed_now;

    fn record(question: &str, answer: &str) -> NewQuizRecord {
        NewQuizRecord {
            question: question.into(),
            answer: answer.into(),
            created_at: fixed_now(),
        }
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids() {
        let repo = InMemoryRepository::new();
        let first = repo.insert_new_quiz(record("Q1", "A1")).await.unwrap();
        let second = repo.insert_new_quiz(record("Q2", "A2")).await.unwrap();

        assert_eq!(first.id(), QuizId::new(1));
        assert_eq!(second.id(), QuizId::new(2));
        assert_eq!(repo.list_quizzes().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn deleted_ids_are_not_reused() {
        let repo = InMemoryRepository::new();
        let first = repo.insert_new_quiz(record("Q1", "A1")).await.unwrap();
        repo.delete_quiz(first.id()).await.unwrap();

        let next = repo.insert_new_quiz(record("Q2", "A2")).await.unwrap();
        assert_eq!(next.id(), QuizId::new(2));
        assert!(repo.get_quiz(first.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo.delete_quiz(QuizId::new(3)).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn seed_only_applies_to_fresh_store() {
        let repo = InMemoryRepository::new();
        assert!(repo.seed_if_new(vec![record("Q", "A")]).await.unwrap());
        assert!(!repo.seed_if_new(vec![record("Q", "A")]).await.unwrap());
        assert_eq!(repo.list_quizzes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn seed_is_skipped_after_first_insert() {
        let repo = InMemoryRepository::new();
        repo.insert_new_quiz(record("Mine", "Mine")).await.unwrap();
        assert!(!repo.seed_if_new(vec![record("Q", "A")]).await.unwrap());
    }

    #[test]
    fn record_with_blank_text_is_rejected() {
        let err = record(" ", "A").into_quiz(QuizId::new(1)).unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}

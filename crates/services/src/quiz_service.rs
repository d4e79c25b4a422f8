use std::sync::Arc;

use log::info;
use quiz_core::model::{Quiz, QuizDraft, QuizId, default_quizzes};
use storage::repository::{NewQuizRecord, QuizRepository, StorageError};

use crate::Clock;
use crate::error::QuizServiceError;

/// The shared quiz store: validation, id lookup and persistence.
///
/// One instance is shared by every session; the repository behind it
/// serializes mutations.
#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    quizzes: Arc<dyn QuizRepository>,
}

fn not_found(id: QuizId) -> impl FnOnce(StorageError) -> QuizServiceError {
    move |err| match err {
        StorageError::NotFound => QuizServiceError::NotFound(id),
        other => QuizServiceError::Storage(other),
    }
}

impl QuizService {
    #[must_use]
    pub fn new(clock: Clock, quizzes: Arc<dyn QuizRepository>) -> Self {
        Self { clock, quizzes }
    }

    /// Write the default quizzes if the backing store was just created.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if the seed cannot be persisted.
    pub async fn ensure_seeded(&self) -> Result<bool, QuizServiceError> {
        let now = self.clock.now();
        let records = default_quizzes()
            .into_iter()
            .map(|draft| draft.validate(now).map(|q| NewQuizRecord::from_validated(&q)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.quizzes.seed_if_new(records).await?)
    }

    /// All quizzes in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if repository access fails.
    pub async fn list(&self) -> Result<Vec<Quiz>, QuizServiceError> {
        Ok(self.quizzes.list_quizzes().await?)
    }

    /// Number of quizzes currently stored.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if repository access fails.
    pub async fn count(&self) -> Result<usize, QuizServiceError> {
        Ok(self.list().await?.len())
    }

    /// Fetch one quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::NotFound` if no quiz has that id.
    pub async fn get(&self, id: QuizId) -> Result<Quiz, QuizServiceError> {
        self.quizzes
            .get_quiz(id)
            .await?
            .ok_or(QuizServiceError::NotFound(id))
    }

    /// Validate and store a new quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Validation` if the question or answer is blank,
    /// `QuizServiceError::Storage` if persistence fails. Nothing is stored on error.
    pub async fn create(&self, draft: QuizDraft) -> Result<Quiz, QuizServiceError> {
        let validated = draft.validate(self.clock.now())?;
        let quiz = self
            .quizzes
            .insert_new_quiz(NewQuizRecord::from_validated(&validated))
            .await?;
        info!("created quiz {}", quiz.id());
        Ok(quiz)
    }

    /// Replace the texts of an existing quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::NotFound` if the id is absent (including when
    /// another session deleted it first), `QuizServiceError::Validation` for
    /// blank texts, `QuizServiceError::Storage` if persistence fails.
    pub async fn update(&self, id: QuizId, draft: QuizDraft) -> Result<Quiz, QuizServiceError> {
        let current = self.get(id).await?;
        let revised = current.revise(draft, self.clock.now())?;
        self.quizzes
            .update_quiz(&revised)
            .await
            .map_err(not_found(id))?;
        info!("updated quiz {id}");
        Ok(revised)
    }

    /// Remove a quiz; other ids are unaffected.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::NotFound` if the id is absent,
    /// `QuizServiceError::Storage` if persistence fails.
    pub async fn delete(&self, id: QuizId) -> Result<(), QuizServiceError> {
        self.quizzes.delete_quiz(id).await.map_err(not_found(id))?;
        info!("deleted quiz {id}");
        Ok(())
    }
}

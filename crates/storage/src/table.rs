use quiz_core::model::{Quiz, QuizId};

use crate::repository::{NewQuizRecord, StorageError};

/// Ordered quiz collection plus the id counter, shared by the in-process backends.
#[derive(Debug, Clone)]
pub(crate) struct QuizTable {
    next_id: QuizId,
    quizzes: Vec<Quiz>,
}

impl QuizTable {
    pub(crate) fn new() -> Self {
        Self {
            next_id: QuizId::new(1),
            quizzes: Vec::new(),
        }
    }

    /// Rebuild a table from stored parts.
    ///
    /// The counter is raised past the highest stored id so a hand-edited file
    /// can never make the store hand out an id twice.
    pub(crate) fn from_parts(next_id: QuizId, quizzes: Vec<Quiz>) -> Result<Self, StorageError> {
        let mut seen = std::collections::HashSet::with_capacity(quizzes.len());
        let mut next = next_id.max(QuizId::new(1));
        for quiz in &quizzes {
            if !seen.insert(quiz.id()) {
                return Err(StorageError::Serialization(format!(
                    "duplicate quiz id {}",
                    quiz.id()
                )));
            }
            if quiz.id() >= next {
                next = quiz.id().next();
            }
        }
        Ok(Self {
            next_id: next,
            quizzes,
        })
    }

    pub(crate) fn next_id(&self) -> QuizId {
        self.next_id
    }

    pub(crate) fn quizzes(&self) -> &[Quiz] {
        &self.quizzes
    }

    pub(crate) fn list(&self) -> Vec<Quiz> {
        self.quizzes.clone()
    }

    pub(crate) fn get(&self, id: QuizId) -> Option<Quiz> {
        self.quizzes.iter().find(|q| q.id() == id).cloned()
    }

    pub(crate) fn insert(&mut self, record: NewQuizRecord) -> Result<Quiz, StorageError> {
        let id = self.next_id;
        if id.next() == id {
            return Err(StorageError::Conflict("quiz id space exhausted".into()));
        }
        let quiz = record.into_quiz(id)?;
        self.next_id = id.next();
        self.quizzes.push(quiz.clone());
        Ok(quiz)
    }

    pub(crate) fn update(&mut self, quiz: &Quiz) -> Result<(), StorageError> {
        let slot = self
            .quizzes
            .iter_mut()
            .find(|q| q.id() == quiz.id())
            .ok_or(StorageError::NotFound)?;
        *slot = quiz.clone();
        Ok(())
    }

    pub(crate) fn remove(&mut self, id: QuizId) -> Result<(), StorageError> {
        let idx = self
            .quizzes
            .iter()
            .position(|q| q.id() == id)
            .ok_or(StorageError::NotFound)?;
        self.quizzes.remove(idx);
        Ok(())
    }
}

use std::sync::atomic::Ordering;

use quiz_core::model::{Quiz, QuizId};

use super::SqliteRepository;
use super::mapping::{map_quiz_row, quiz_id_from_i64, quiz_id_to_i64};
use crate::repository::{NewQuizRecord, QuizRepository, StorageError};

fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

async fn insert_record<'e, E>(executor: E, quiz: NewQuizRecord) -> Result<Quiz, StorageError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let res = sqlx::query(
        r"
        INSERT INTO quizzes (question, answer, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?3)
        ",
    )
    .bind(quiz.question.clone())
    .bind(quiz.answer.clone())
    .bind(quiz.created_at)
    .execute(executor)
    .await
    .map_err(conn)?;

    let id = quiz_id_from_i64(res.last_insert_rowid())?;
    quiz.into_quiz(id)
}

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn list_quizzes(&self) -> Result<Vec<Quiz>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, question, answer, created_at, updated_at
            FROM quizzes
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_quiz_row).collect()
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError> {
        let Some(raw_id) = quiz_id_to_i64(id) else {
            return Ok(None);
        };
        let row = sqlx::query(
            r"
            SELECT id, question, answer, created_at, updated_at
            FROM quizzes WHERE id = ?1
            ",
        )
        .bind(raw_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_quiz_row).transpose()
    }

    async fn insert_new_quiz(&self, quiz: NewQuizRecord) -> Result<Quiz, StorageError> {
        let inserted = insert_record(&self.pool, quiz).await?;
        self.fresh.store(false, Ordering::SeqCst);
        Ok(inserted)
    }

    async fn update_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        let raw_id = quiz_id_to_i64(quiz.id()).ok_or(StorageError::NotFound)?;
        let res = sqlx::query(
            r"
            UPDATE quizzes
            SET question = ?2, answer = ?3, updated_at = ?4
            WHERE id = ?1
            ",
        )
        .bind(raw_id)
        .bind(quiz.question().as_str())
        .bind(quiz.answer().as_str())
        .bind(quiz.updated_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_quiz(&self, id: QuizId) -> Result<(), StorageError> {
        let raw_id = quiz_id_to_i64(id).ok_or(StorageError::NotFound)?;
        let res = sqlx::query("DELETE FROM quizzes WHERE id = ?1")
            .bind(raw_id)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn seed_if_new(&self, quizzes: Vec<NewQuizRecord>) -> Result<bool, StorageError> {
        if !self.fresh.load(Ordering::SeqCst) {
            return Ok(false);
        }

        let mut tx = self.pool.begin().await.map_err(conn)?;
        for quiz in quizzes {
            insert_record(&mut *tx, quiz).await?;
        }
        tx.commit().await.map_err(conn)?;

        self.fresh.store(false, Ordering::SeqCst);
        Ok(true)
    }
}

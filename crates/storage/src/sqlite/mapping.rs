use chrono::{DateTime, Utc};
use quiz_core::model::{Quiz, QuizId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn quiz_id_from_i64(v: i64) -> Result<QuizId, StorageError> {
    u64::try_from(v)
        .map(QuizId::new)
        .map_err(|_| StorageError::Serialization("quiz_id sign overflow".into()))
}

/// Column value for `id`, or `None` for ids above `i64::MAX`, which no row can have.
pub(crate) fn quiz_id_to_i64(id: QuizId) -> Option<i64> {
    i64::try_from(id.value()).ok()
}

pub(crate) fn map_quiz_row(row: &SqliteRow) -> Result<Quiz, StorageError> {
    let id = quiz_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(ser)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(ser)?;

    Quiz::from_persisted(
        id,
        row.try_get::<String, _>("question").map_err(ser)?,
        row.try_get::<String, _>("answer").map_err(ser)?,
        created_at,
        updated_at,
    )
    .map_err(ser)
}

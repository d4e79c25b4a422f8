use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the schema migrations.
///
/// Returns `true` when the quiz table was created by this call, i.e. the
/// database is brand new and should be seeded.
pub async fn run_migrations(pool: &SqlitePool) -> Result<bool, SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if is_applied(pool, 1).await? {
        return Ok(false);
    }

    // Version 1: quizzes. AUTOINCREMENT keeps deleted ids from being handed out again.
    let mut tx = pool.begin().await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS quizzes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                question TEXT NOT NULL CHECK (length(trim(question)) > 0),
                answer TEXT NOT NULL CHECK (length(trim(answer)) > 0),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            INSERT INTO schema_migrations (version, applied_at)
            VALUES (?1, ?2)
            ON CONFLICT(version) DO NOTHING
        ",
    )
    .bind(1_i64)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(true)
}

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use log::info;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{QuizRepository, Storage};

mod mapping;
mod migrate;
mod quiz_repo;

/// Quiz repository on `SQLite`; every mutation is a single statement or transaction.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
    fresh: Arc<AtomicBool>,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// Connect to `SQLite` using the given URL.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established or if
    /// the connection pragmas fail during setup.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA journal_mode = WAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        Ok(Self {
            pool,
            fresh: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Create tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        if migrate::run_migrations(&self.pool).await? {
            info!("created quiz schema");
            self.fresh.store(true, std::sync::atomic::Ordering::SeqCst);
        }
        Ok(())
    }
}

impl Storage {
    /// Build a `Storage` backed by `SQLite`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        let quizzes: Arc<dyn QuizRepository> = Arc::new(repo);
        Ok(Self { quizzes })
    }
}

//! Quiz store backed by a single JSON file.
//!
//! The whole collection is rewritten on every mutation. Writes go to a temp
//! file in the same directory which is then renamed over the target, so a
//! reader of the file sees either the old or the new collection.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use quiz_core::model::{Quiz, QuizId};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::repository::{NewQuizRecord, QuizRepository, Storage, StorageError};
use crate::table::QuizTable;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

//
// ─── FILE FORMAT ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize, Deserialize)]
struct QuizDocument {
    next_id: QuizId,
    quizzes: Vec<QuizRow>,
}

#[derive(Debug, Serialize, Deserialize)]
struct QuizRow {
    id: QuizId,
    question: String,
    answer: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Flat array written by older versions: ids are the 1-based positions.
#[derive(Debug, Deserialize)]
struct LegacyRow {
    question: String,
    answer: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredFile {
    Current(QuizDocument),
    Legacy(Vec<LegacyRow>),
}

impl QuizDocument {
    fn from_table(table: &QuizTable) -> Self {
        Self {
            next_id: table.next_id(),
            quizzes: table
                .quizzes()
                .iter()
                .map(|quiz| QuizRow {
                    id: quiz.id(),
                    question: quiz.question().as_str().to_owned(),
                    answer: quiz.answer().as_str().to_owned(),
                    created_at: quiz.created_at(),
                    updated_at: quiz.updated_at(),
                })
                .collect(),
        }
    }

    fn into_table(self) -> Result<QuizTable, StorageError> {
        let quizzes = self
            .quizzes
            .into_iter()
            .map(|row| {
                Quiz::from_persisted(
                    row.id,
                    row.question,
                    row.answer,
                    row.created_at,
                    row.updated_at,
                )
                .map_err(|e| ser(format!("quiz {}: {e}", row.id)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        QuizTable::from_parts(self.next_id, quizzes)
    }
}

fn legacy_into_table(rows: Vec<LegacyRow>, now: DateTime<Utc>) -> Result<QuizTable, StorageError> {
    let mut quizzes = Vec::with_capacity(rows.len());
    let mut id = QuizId::new(1);
    for row in rows {
        let quiz = Quiz::from_persisted(id, row.question, row.answer, now, now)
            .map_err(|e| ser(format!("entry {id}: {e}")))?;
        quizzes.push(quiz);
        id = id.next();
    }
    QuizTable::from_parts(id, quizzes)
}

fn parse_file(bytes: &[u8], now: DateTime<Utc>) -> Result<QuizTable, StorageError> {
    match serde_json::from_slice::<StoredFile>(bytes).map_err(ser)? {
        StoredFile::Current(doc) => doc.into_table(),
        StoredFile::Legacy(rows) => legacy_into_table(rows, now),
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StorageError::Io(e.error))?;
    Ok(())
}

//
// ─── REPOSITORY ────────────────────────────────────────────────────────────────
//

#[derive(Debug)]
struct FileState {
    table: QuizTable,
    fresh: bool,
}

/// Quiz repository persisted as one JSON document.
///
/// Reads share the lock. A mutation holds the write lock while it builds the
/// next table, writes it and only then swaps it in, so a failed write leaves
/// the in-memory collection exactly as it was.
#[derive(Debug)]
pub struct JsonFileRepository {
    path: PathBuf,
    state: RwLock<FileState>,
}

impl JsonFileRepository {
    /// Load the collection from `path`.
    ///
    /// A missing file yields an empty, fresh store (see
    /// [`QuizRepository::seed_if_new`]); nothing is written until the first
    /// mutation.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the file exists but cannot be
    /// parsed, and `StorageError::Io` if it cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let (table, fresh) = match std::fs::read(&path) {
            Ok(bytes) => {
                let table = parse_file(&bytes, Utc::now())?;
                info!(
                    "loaded {} quizzes from {}",
                    table.quizzes().len(),
                    path.display()
                );
                (table, false)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!("{} does not exist yet, starting empty", path.display());
                (QuizTable::new(), true)
            }
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path,
            state: RwLock::new(FileState { table, fresh }),
        })
    }

    async fn persist(&self, table: &QuizTable) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(&QuizDocument::from_table(table)).map_err(ser)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &bytes))
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?
    }

    /// Apply `mutate` to a copy of the table, write it, then commit it.
    async fn commit<T>(
        &self,
        mutate: impl FnOnce(&mut QuizTable) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let mut state = self.state.write().await;
        let mut next = state.table.clone();
        let out = mutate(&mut next)?;
        if let Err(err) = self.persist(&next).await {
            warn!("writing {} failed, mutation discarded: {err}", self.path.display());
            return Err(err);
        }
        state.table = next;
        state.fresh = false;
        debug!(
            "wrote {} quizzes to {}",
            state.table.quizzes().len(),
            self.path.display()
        );
        Ok(out)
    }
}

impl Storage {
    /// Build a `Storage` backed by the JSON file at `path`.
    ///
    /// # Errors
    ///
    /// Returns the error from [`JsonFileRepository::open`].
    pub fn json_file(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let quizzes: Arc<dyn QuizRepository> = Arc::new(JsonFileRepository::open(path)?);
        Ok(Self { quizzes })
    }
}

#[async_trait]
impl QuizRepository for JsonFileRepository {
    async fn list_quizzes(&self) -> Result<Vec<Quiz>, StorageError> {
        Ok(self.state.read().await.table.list())
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError> {
        Ok(self.state.read().await.table.get(id))
    }

    async fn insert_new_quiz(&self, quiz: NewQuizRecord) -> Result<Quiz, StorageError> {
        self.commit(|table| table.insert(quiz)).await
    }

    async fn update_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        self.commit(|table| table.update(quiz)).await
    }

    async fn delete_quiz(&self, id: QuizId) -> Result<(), StorageError> {
        self.commit(|table| table.remove(id)).await
    }

    async fn seed_if_new(&self, quizzes: Vec<NewQuizRecord>) -> Result<bool, StorageError> {
        if !self.state.read().await.fresh {
            return Ok(false);
        }
        let seeded = self
            .commit(|table| {
                if !table.quizzes().is_empty() {
                    return Ok(false);
                }
                for quiz in quizzes {
                    table.insert(quiz)?;
                }
                Ok(true)
            })
            .await?;
        if seeded {
            info!("seeded {} with default quizzes", self.path.display());
        }
        Ok(seeded)
    }
}

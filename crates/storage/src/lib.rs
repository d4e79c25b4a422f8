#![forbid(unsafe_code)]

pub mod json_file;
pub mod repository;
pub mod sqlite;
mod table;

pub use json_file::JsonFileRepository;
pub use repository::{InMemoryRepository, NewQuizRecord, QuizRepository, Storage, StorageError};

/// Storage seams for habits and completion logs
///
/// The engine only talks to storage through the two traits below. The log
/// store is the source of truth; the habit store holds the cached streak
/// fields derived from it. `SqliteStorage` is the bundled implementation.

pub mod sqlite;
pub mod migrations;

// Re-export the main storage types
pub use sqlite::*;

use async_trait::async_trait;
use thiserror::Error;
use crate::domain::{CompletionLog, Habit, HabitId, LogId, OwnerId, StreakResult};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database query error: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Habit not found: {habit_id}")]
    HabitNotFound { habit_id: String },

    #[error("Corrupt {column} value in stored row: {value}")]
    Corrupt { column: &'static str, value: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Migration error: {0}")]
    Migration(String),
}

/// Read source and append/remove sink for completion logs
#[async_trait]
pub trait CompletionLogStore: Send + Sync {
    /// All logs for one habit of one owner, in no particular order
    ///
    /// Several logs may fall on the same day.
    async fn fetch_logs(
        &self,
        habit_id: &HabitId,
        owner_id: &OwnerId,
    ) -> Result<Vec<CompletionLog>, StorageError>;

    /// Store a new log
    async fn append_log(&self, log: &CompletionLog) -> Result<(), StorageError>;

    /// Delete logs by id, returning how many existed
    async fn remove_logs(&self, log_ids: &[LogId]) -> Result<usize, StorageError>;
}

/// Habit records and their cached streak fields
#[async_trait]
pub trait HabitStore: Send + Sync {
    async fn create_habit(&self, habit: &Habit) -> Result<(), StorageError>;

    async fn get_habit(&self, habit_id: &HabitId) -> Result<Habit, StorageError>;

    /// Habits of one owner, oldest first
    async fn list_habits(&self, owner_id: &OwnerId) -> Result<Vec<Habit>, StorageError>;

    /// Overwrite the cached streak fields of a habit
    async fn persist_streaks(
        &self,
        habit_id: &HabitId,
        streaks: &StreakResult,
    ) -> Result<(), StorageError>;
}

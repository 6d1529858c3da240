/// SQLite implementation of the storage traits
///
/// This module provides the concrete SQLite implementation for storing
/// habits and completion logs. It handles all SQL queries and data conversion.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, params_from_iter, Connection, Row};
use tokio::sync::Mutex;

use crate::domain::{CompletionLog, DayKey, Habit, HabitId, LogId, OwnerId, StreakResult};
use crate::storage::{migrations, CompletionLogStore, HabitStore, StorageError};

const HABIT_COLUMNS: &str = "id, owner_id, name, description, target_days, current_streak, \
                             longest_streak, last_completed, created_at";

const LOG_COLUMNS: &str = "id, habit_id, owner_id, completed_at, note";

/// SQLite-based storage implementation
///
/// The connection sits behind an async mutex so a single store can be shared
/// between tasks.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open (or create) the database file and bring its schema up to date
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db_path = db_path.as_ref();
        let conn = Connection::open(db_path)
            .map_err(|e| StorageError::Connection(format!("Failed to open database: {}", e)))?;

        let storage = Self::from_connection(conn)?;
        tracing::info!("SQLite storage initialized at: {:?}", db_path);
        Ok(storage)
    }

    /// A private database that lives as long as this value
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Connection(format!("Failed to open in-memory database: {}", e)))?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self, StorageError> {
        conn.execute("PRAGMA foreign_keys = ON", [])
            .map_err(|e| StorageError::Connection(format!("Failed to enable foreign keys: {}", e)))?;

        migrations::initialize_database(&mut conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn timestamp_to_sql(ts: &DateTime<Utc>) -> String {
    // Fixed-width so that text ordering matches time ordering
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn corrupt(index: usize, column: &'static str, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        index,
        rusqlite::types::Type::Text,
        Box::new(StorageError::Corrupt {
            column,
            value: value.to_string(),
        }),
    )
}

fn parse_timestamp_column(index: usize, column: &'static str, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| corrupt(index, column, raw))
}

fn habit_from_row(row: &Row<'_>) -> rusqlite::Result<Habit> {
    let id_str: String = row.get(0)?;
    let id = HabitId::from_string(&id_str).map_err(|_| corrupt(0, "habits.id", &id_str))?;

    let target_json: String = row.get(4)?;
    let target_days: Vec<u8> =
        serde_json::from_str(&target_json).map_err(|_| corrupt(4, "habits.target_days", &target_json))?;

    let last_completed: Option<String> = row.get(7)?;
    let last_completed = match last_completed {
        Some(raw) => Some(DayKey::parse(&raw).map_err(|_| corrupt(7, "habits.last_completed", &raw))?),
        None => None,
    };

    let created_at_str: String = row.get(8)?;
    let created_at = parse_timestamp_column(8, "habits.created_at", &created_at_str)?;

    Ok(Habit::from_existing(
        id,
        OwnerId(row.get(1)?),
        row.get(2)?, // name
        row.get(3)?, // description
        target_days,
        row.get(5)?, // current_streak
        row.get(6)?, // longest_streak
        last_completed,
        created_at,
    ))
}

fn log_from_row(row: &Row<'_>) -> rusqlite::Result<CompletionLog> {
    let id_str: String = row.get(0)?;
    let id = LogId::from_string(&id_str).map_err(|_| corrupt(0, "completion_logs.id", &id_str))?;

    let habit_id_str: String = row.get(1)?;
    let habit_id =
        HabitId::from_string(&habit_id_str).map_err(|_| corrupt(1, "completion_logs.habit_id", &habit_id_str))?;

    let completed_at_str: String = row.get(3)?;
    let completed_at = parse_timestamp_column(3, "completion_logs.completed_at", &completed_at_str)?;

    Ok(CompletionLog::from_existing(
        id,
        habit_id,
        OwnerId(row.get(2)?),
        completed_at,
        row.get(4)?, // note
    ))
}

#[async_trait]
impl HabitStore for SqliteStorage {
    async fn create_habit(&self, habit: &Habit) -> Result<(), StorageError> {
        let target_json = serde_json::to_string(&habit.target_days)?;
        let conn = self.conn.lock().await;

        conn.execute(
            "INSERT INTO habits (
                id, owner_id, name, description, target_days,
                current_streak, longest_streak, last_completed, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                habit.id.to_string(),
                habit.owner_id.as_str(),
                habit.name,
                habit.description,
                target_json,
                habit.current_streak,
                habit.longest_streak,
                habit.last_completed.map(|d| d.to_string()),
                timestamp_to_sql(&habit.created_at),
            ],
        )?;

        tracing::debug!("Created habit: {} ({})", habit.name, habit.id);
        Ok(())
    }

    async fn get_habit(&self, habit_id: &HabitId) -> Result<Habit, StorageError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM habits WHERE id = ?1", HABIT_COLUMNS))?;

        match stmt.query_row(params![habit_id.to_string()], habit_from_row) {
            Ok(habit) => Ok(habit),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(StorageError::HabitNotFound {
                habit_id: habit_id.to_string(),
            }),
            Err(e) => Err(StorageError::Query(e)),
        }
    }

    async fn list_habits(&self, owner_id: &OwnerId) -> Result<Vec<Habit>, StorageError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM habits WHERE owner_id = ?1 ORDER BY created_at ASC, id ASC",
            HABIT_COLUMNS
        ))?;

        let habits = stmt
            .query_map(params![owner_id.as_str()], habit_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(habits)
    }

    async fn persist_streaks(
        &self,
        habit_id: &HabitId,
        streaks: &StreakResult,
    ) -> Result<(), StorageError> {
        let conn = self.conn.lock().await;
        let rows_affected = conn.execute(
            "UPDATE habits SET
                current_streak = ?2,
                longest_streak = ?3,
                last_completed = ?4
             WHERE id = ?1",
            params![
                habit_id.to_string(),
                streaks.current_streak,
                streaks.longest_streak,
                streaks.last_completed.map(|d| d.to_string()),
            ],
        )?;

        if rows_affected == 0 {
            return Err(StorageError::HabitNotFound {
                habit_id: habit_id.to_string(),
            });
        }

        tracing::debug!(
            "Persisted streaks for habit {}: current={} longest={}",
            habit_id,
            streaks.current_streak,
            streaks.longest_streak
        );
        Ok(())
    }
}

#[async_trait]
impl CompletionLogStore for SqliteStorage {
    async fn fetch_logs(
        &self,
        habit_id: &HabitId,
        owner_id: &OwnerId,
    ) -> Result<Vec<CompletionLog>, StorageError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM completion_logs WHERE habit_id = ?1 AND owner_id = ?2",
            LOG_COLUMNS
        ))?;

        let logs = stmt
            .query_map(params![habit_id.to_string(), owner_id.as_str()], log_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(logs)
    }

    async fn append_log(&self, log: &CompletionLog) -> Result<(), StorageError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO completion_logs (id, habit_id, owner_id, completed_at, note)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                log.id.to_string(),
                log.habit_id.to_string(),
                log.owner_id.as_str(),
                timestamp_to_sql(&log.completed_at),
                log.note,
            ],
        )?;

        tracing::debug!("Appended completion log {} for habit {}", log.id, log.habit_id);
        Ok(())
    }

    async fn remove_logs(&self, log_ids: &[LogId]) -> Result<usize, StorageError> {
        if log_ids.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn.lock().await;
        let placeholders = vec!["?"; log_ids.len()].join(", ");
        let tx = conn.transaction()?;
        let removed = tx.execute(
            &format!("DELETE FROM completion_logs WHERE id IN ({})", placeholders),
            params_from_iter(log_ids.iter().map(|id| id.to_string())),
        )?;
        tx.commit()?;

        tracing::debug!("Removed {} of {} completion logs", removed, log_ids.len());
        Ok(removed)
    }
}

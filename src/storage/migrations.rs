/// Schema migrations for the SQLite store
///
/// Each migration is applied at most once, in order, inside a single
/// transaction together with the version bump.

use rusqlite::{Connection, OptionalExtension, Transaction};
use crate::storage::StorageError;

type Migration = fn(&Transaction<'_>) -> Result<(), StorageError>;

/// Ordered migrations; entry `i` upgrades the schema to version `i + 1`
const MIGRATIONS: &[Migration] = &[create_habits_and_logs];

/// Highest schema version this build understands
pub fn latest_version() -> i32 {
    MIGRATIONS.len() as i32
}

/// Bring the schema of `conn` up to `latest_version`
///
/// Databases written by a newer build are refused rather than touched.
pub fn initialize_database(conn: &mut Connection) -> Result<(), StorageError> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)")?;

    let found = stored_version(conn)?;
    let latest = latest_version();

    if found > latest {
        return Err(StorageError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            found, latest
        )));
    }
    if found == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (index, migration) in MIGRATIONS.iter().enumerate().skip(found as usize) {
        migration(&tx)?;
        tracing::info!("Applied schema migration v{}", index + 1);
    }
    tx.execute("DELETE FROM schema_version", [])?;
    tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [latest])?;
    tx.commit()?;

    Ok(())
}

/// Recorded schema version, 0 for a fresh database
fn stored_version(conn: &Connection) -> Result<i32, StorageError> {
    let version = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get::<_, Option<i32>>(0))
        .optional()?
        .flatten();
    Ok(version.unwrap_or(0))
}

/// v1: habits with cached streak fields, and completion logs
///
/// Logs carry no per-day uniqueness; several completions on one day are
/// separate rows.
fn create_habits_and_logs(tx: &Transaction<'_>) -> Result<(), StorageError> {
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS habits (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            target_days TEXT NOT NULL,
            current_streak INTEGER NOT NULL DEFAULT 0,
            longest_streak INTEGER NOT NULL DEFAULT 0,
            last_completed TEXT,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS completion_logs (
            id TEXT PRIMARY KEY,
            habit_id TEXT NOT NULL REFERENCES habits (id),
            owner_id TEXT NOT NULL,
            completed_at TEXT NOT NULL,
            note TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_completion_logs_habit_owner
            ON completion_logs (habit_id, owner_id, completed_at);
        CREATE INDEX IF NOT EXISTS idx_habits_owner
            ON habits (owner_id, created_at);",
    )?;
    Ok(())
}

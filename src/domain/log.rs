/// CompletionLog entity
///
/// One log says "this habit was completed at this instant". Logs are never
/// edited; undoing a completion deletes them.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::domain::{DayKey, DayNormalizer, DomainError, HabitId, LogId, OwnerId};

/// A record of completing a habit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionLog {
    pub id: LogId,
    pub habit_id: HabitId,
    pub owner_id: OwnerId,
    /// The instant the completion happened
    pub completed_at: DateTime<Utc>,
    /// User's notes about this completion
    pub note: Option<String>,
}

impl CompletionLog {
    /// Create a new log with validation
    pub fn new(
        habit_id: HabitId,
        owner_id: OwnerId,
        completed_at: DateTime<Utc>,
        note: Option<String>,
    ) -> Result<Self, DomainError> {
        Self::validate_note(&note)?;

        Ok(Self {
            id: LogId::new(),
            habit_id,
            owner_id,
            completed_at,
            note: note.filter(|n| !n.trim().is_empty()),
        })
    }

    /// Create a log from existing data (used when loading from database)
    pub fn from_existing(
        id: LogId,
        habit_id: HabitId,
        owner_id: OwnerId,
        completed_at: DateTime<Utc>,
        note: Option<String>,
    ) -> Self {
        Self {
            id,
            habit_id,
            owner_id,
            completed_at,
            note,
        }
    }

    /// The day this completion counts towards
    pub fn day(&self, normalizer: &DayNormalizer) -> DayKey {
        normalizer.day_key(self.completed_at)
    }

    fn validate_note(note: &Option<String>) -> Result<(), DomainError> {
        if let Some(text) = note {
            if text.chars().count() > 500 {
                return Err(DomainError::Validation {
                    message: "Notes cannot be longer than 500 characters".to_string()
                });
            }
        }
        Ok(())
    }
}

/// Normalize every log to its day key, keeping duplicates
pub fn day_keys(logs: &[CompletionLog], normalizer: &DayNormalizer) -> Vec<DayKey> {
    logs.iter().map(|log| log.day(normalizer)).collect()
}

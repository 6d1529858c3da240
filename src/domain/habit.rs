/// Habit entity and related functionality
///
/// This module defines the Habit struct that represents something a user wants
/// to do on certain weekdays, along with the cached streak fields the toggle
/// coordinator keeps in sync with the completion log.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::domain::{DayKey, DomainError, HabitId, OwnerId, StreakResult};

/// A habit a user wants to perform regularly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    /// Unique identifier for this habit
    pub id: HabitId,
    /// The user this habit belongs to
    pub owner_id: OwnerId,
    /// Display name (e.g., "Morning Run", "Read for 30min")
    pub name: String,
    pub description: String,
    /// Weekdays the habit targets, 0 = Sunday through 6 = Saturday
    pub target_days: Vec<u8>,
    /// Cached length of the live streak
    pub current_streak: u32,
    /// Cached best streak in the log history
    pub longest_streak: u32,
    /// Most recent completed day, if any
    pub last_completed: Option<DayKey>,
    /// When this habit was created
    pub created_at: DateTime<Utc>,
}

impl Habit {
    /// Create a new habit with validation
    ///
    /// New habits start with zeroed streak fields; only the toggle coordinator
    /// changes them afterwards.
    pub fn new(
        owner_id: OwnerId,
        name: String,
        description: String,
        target_days: Vec<u8>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        Self::validate_name(&name)?;
        Self::validate_description(&description)?;
        let target_days = Self::normalize_target_days(target_days)?;

        Ok(Self {
            id: HabitId::new(),
            owner_id,
            name: name.trim().to_string(),
            description,
            target_days,
            current_streak: 0,
            longest_streak: 0,
            last_completed: None,
            created_at,
        })
    }

    /// Create a habit from existing data (used when loading from database)
    ///
    /// This constructor assumes data is already validated.
    #[allow(clippy::too_many_arguments)]
    pub fn from_existing(
        id: HabitId,
        owner_id: OwnerId,
        name: String,
        description: String,
        target_days: Vec<u8>,
        current_streak: u32,
        longest_streak: u32,
        last_completed: Option<DayKey>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id,
            name,
            description,
            target_days,
            current_streak,
            longest_streak,
            last_completed,
            created_at,
        }
    }

    /// Whether the habit targets the weekday of `day`
    pub fn is_scheduled_for(&self, day: DayKey) -> bool {
        self.target_days.contains(&day.weekday_index())
    }

    /// The cached streak fields as a result value
    pub fn streaks(&self) -> StreakResult {
        StreakResult {
            current_streak: self.current_streak,
            longest_streak: self.longest_streak,
            last_completed: self.last_completed,
        }
    }

    // Validation helper methods

    fn validate_name(name: &str) -> Result<(), DomainError> {
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(DomainError::InvalidHabitName(
                "Habit name cannot be empty".to_string()
            ));
        }

        if trimmed.chars().count() > 100 {
            return Err(DomainError::InvalidHabitName(
                "Habit name cannot be longer than 100 characters".to_string()
            ));
        }

        Ok(())
    }

    fn validate_description(description: &str) -> Result<(), DomainError> {
        if description.chars().count() > 500 {
            return Err(DomainError::Validation {
                message: "Description cannot be longer than 500 characters".to_string()
            });
        }
        Ok(())
    }

    /// Sort and dedupe target days, rejecting anything outside 0-6
    fn normalize_target_days(mut days: Vec<u8>) -> Result<Vec<u8>, DomainError> {
        if let Some(bad) = days.iter().find(|d| **d > 6) {
            return Err(DomainError::InvalidTargetDays(format!(
                "weekday {} is outside 0-6",
                bad
            )));
        }
        days.sort_unstable();
        days.dedup();
        if days.is_empty() {
            return Err(DomainError::InvalidTargetDays(
                "at least one weekday must be targeted".to_string()
            ));
        }
        Ok(days)
    }
}

/// The habits whose target days include `day`
pub fn habits_scheduled_for(habits: &[Habit], day: DayKey) -> Vec<&Habit> {
    habits.iter().filter(|h| h.is_scheduled_for(day)).collect()
}

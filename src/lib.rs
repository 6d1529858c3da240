/// Public library interface for the habit streak engine
///
/// This module exports the domain types, the storage seams, the analytics
/// engine and the `HabitTracker` facade that ties them to one clock and one
/// day normalizer.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::future::try_join_all;
use thiserror::Error;

// Internal modules
mod domain;
mod storage;
mod analytics;
mod config;
mod coordinator;

// Re-export public modules and types
pub use domain::*;
pub use storage::{CompletionLogStore, HabitStore, SqliteStorage, StorageError};
pub use analytics::{
    bucketize, completion_rate, completion_rate_with_precision, round_rate, AnalyticsEngine, CompletionBucket,
    HabitReport, HabitReportRow, ReportRange, DEFAULT_RATE_DECIMALS, MAX_RATE_DECIMALS,
};
pub use config::EngineConfig;
pub use coordinator::{DayState, ToggleCoordinator, ToggleOutcome};

/// Errors surfaced to callers of the engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed timestamps, dates, windows or habit fields
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] DomainError),

    /// A read or write against the store failed
    #[error("Store unavailable: {0}")]
    StoreUnavailable(StorageError),

    #[error("Habit not found: {habit_id}")]
    HabitNotFound { habit_id: String },
}

impl From<StorageError> for EngineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::HabitNotFound { habit_id } => EngineError::HabitNotFound { habit_id },
            other => EngineError::StoreUnavailable(other),
        }
    }
}

/// Habit tracking facade
///
/// Every operation derives "today" from the injected clock and normalizes
/// days with the same normalizer, so results within one tracker are
/// consistent and reproducible under a fixed clock.
pub struct HabitTracker<S = SqliteStorage> {
    storage: Arc<S>,
    coordinator: ToggleCoordinator<S>,
    analytics: AnalyticsEngine,
    clock: Arc<dyn Clock>,
    normalizer: DayNormalizer,
}

impl HabitTracker<SqliteStorage> {
    /// Open a tracker backed by the SQLite database at `db_path`
    ///
    /// The schema is created or migrated if needed.
    pub async fn open(
        db_path: impl AsRef<Path>,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        normalizer: DayNormalizer,
    ) -> Result<Self, EngineError> {
        tracing::info!("Initializing habit tracker with database: {:?}", db_path.as_ref());
        config.validate()?;
        let storage = SqliteStorage::new(db_path)?;
        Ok(Self::new(Arc::new(storage), config, clock, normalizer))
    }
}

impl<S> HabitTracker<S>
where
    S: CompletionLogStore + HabitStore,
{
    pub fn new(storage: Arc<S>, config: EngineConfig, clock: Arc<dyn Clock>, normalizer: DayNormalizer) -> Self {
        let analytics = AnalyticsEngine::new(config);
        let coordinator = ToggleCoordinator::new(storage.clone(), analytics.calculator(), clock.clone(), normalizer);

        Self {
            storage,
            coordinator,
            analytics,
            clock,
            normalizer,
        }
    }

    /// Get a reference to the storage layer (useful for testing)
    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn analytics(&self) -> &AnalyticsEngine {
        &self.analytics
    }

    pub fn coordinator(&self) -> &ToggleCoordinator<S> {
        &self.coordinator
    }

    pub fn normalizer(&self) -> &DayNormalizer {
        &self.normalizer
    }

    /// Today according to the tracker's clock
    pub fn today(&self) -> DayKey {
        self.normalizer.today(self.clock.as_ref())
    }

    /// Validate and store a new habit created now
    pub async fn create_habit(
        &self,
        owner_id: &OwnerId,
        name: String,
        description: String,
        target_days: Vec<u8>,
    ) -> Result<Habit, EngineError> {
        let habit = Habit::new(owner_id.clone(), name, description, target_days, self.clock.now())?;
        self.storage.create_habit(&habit).await?;
        tracing::info!("Created habit {} ({}) for {}", habit.name, habit.id, owner_id);
        Ok(habit)
    }

    pub async fn habits(&self, owner_id: &OwnerId) -> Result<Vec<Habit>, EngineError> {
        Ok(self.storage.list_habits(owner_id).await?)
    }

    /// Habits whose target days include today
    pub async fn habits_due_today(&self, owner_id: &OwnerId) -> Result<Vec<Habit>, EngineError> {
        let today = self.today();
        let habits = self.habits(owner_id).await?;
        Ok(habits_scheduled_for(&habits, today).into_iter().cloned().collect())
    }

    /// Toggle the day containing `at`, or now if `at` is omitted
    pub async fn toggle(
        &self,
        habit_id: &HabitId,
        owner_id: &OwnerId,
        at: Option<DateTime<Utc>>,
        note: Option<String>,
    ) -> Result<ToggleOutcome, EngineError> {
        let at = at.unwrap_or_else(|| self.clock.now());
        self.coordinator.toggle(habit_id, owner_id, at, note).await
    }

    /// Toggle a calendar day
    ///
    /// Today is logged at the current instant; other days at their local noon.
    pub async fn toggle_day(
        &self,
        habit_id: &HabitId,
        owner_id: &OwnerId,
        day: DayKey,
        note: Option<String>,
    ) -> Result<ToggleOutcome, EngineError> {
        let at = if day == self.today() {
            self.clock.now()
        } else {
            self.normalizer.start_of_day(day) + Duration::hours(12)
        };
        self.coordinator.toggle(habit_id, owner_id, at, note).await
    }

    pub async fn is_completed(&self, habit_id: &HabitId, owner_id: &OwnerId, day: DayKey) -> Result<bool, EngineError> {
        self.coordinator.is_completed(habit_id, owner_id, day).await
    }

    /// Streaks recomputed from the log set, repairing the cache if needed
    pub async fn streaks(&self, habit_id: &HabitId, owner_id: &OwnerId) -> Result<StreakResult, EngineError> {
        self.coordinator.streaks(habit_id, owner_id).await
    }

    pub async fn reconcile(&self, habit_id: &HabitId, owner_id: &OwnerId) -> Result<StreakResult, EngineError> {
        self.coordinator.reconcile(habit_id, owner_id).await
    }

    /// Raw daily completion counts for one habit
    pub async fn chart(
        &self,
        habit_id: &HabitId,
        owner_id: &OwnerId,
        window_start: DayKey,
        window_end: DayKey,
    ) -> Result<Vec<CompletionBucket>, EngineError> {
        let logs = self.owned_logs(habit_id, owner_id).await?;
        Ok(self.analytics.chart(&logs, window_start, window_end, &self.normalizer)?)
    }

    /// Completion rate over the trailing `window_size_days` ending today
    pub async fn completion_rate(
        &self,
        habit_id: &HabitId,
        owner_id: &OwnerId,
        window_size_days: i64,
    ) -> Result<f64, EngineError> {
        let logs = self.owned_logs(habit_id, owner_id).await?;
        Ok(self
            .analytics
            .completion_rate(&logs, window_size_days, self.today(), &self.normalizer)?)
    }

    /// Report over every habit of `owner_id`
    pub async fn report(&self, owner_id: &OwnerId, range: ReportRange) -> Result<HabitReport, EngineError> {
        let habits = self.habits(owner_id).await?;
        let logs = try_join_all(
            habits
                .iter()
                .map(|habit| self.storage.fetch_logs(&habit.id, owner_id)),
        )
        .await?;

        let pairs: Vec<(Habit, Vec<CompletionLog>)> = habits.into_iter().zip(logs).collect();
        tracing::debug!("Building {} report over {} habits for {}", range, pairs.len(), owner_id);
        Ok(self
            .analytics
            .build_report(range, self.today(), &self.normalizer, &pairs)?)
    }

    async fn owned_logs(&self, habit_id: &HabitId, owner_id: &OwnerId) -> Result<Vec<CompletionLog>, EngineError> {
        let habit = self.storage.get_habit(habit_id).await?;
        if habit.owner_id != *owner_id {
            return Err(EngineError::HabitNotFound {
                habit_id: habit_id.to_string(),
            });
        }
        Ok(self.storage.fetch_logs(habit_id, owner_id).await?)
    }
}

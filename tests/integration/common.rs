/// Shared fixtures for integration tests
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use habit_streaks::*;

pub const NOW: &str = "2024-06-15T20:00:00Z";

pub fn owner() -> OwnerId {
    OwnerId::new("user-1")
}

pub fn at(s: &str) -> chrono::DateTime<chrono::Utc> {
    parse_timestamp(s).expect("valid timestamp")
}

pub fn day(s: &str) -> DayKey {
    DayKey::parse(s).expect("valid day")
}

pub fn fixed_clock(now: &str) -> Arc<dyn Clock> {
    Arc::new(FixedClock(at(now)))
}

/// Tracker over the given store with a fixed clock and UTC days
pub fn tracker_with<S>(store: Arc<S>, now: &str) -> HabitTracker<S>
where
    S: CompletionLogStore + HabitStore,
{
    HabitTracker::new(store, EngineConfig::default(), fixed_clock(now), DayNormalizer::utc())
}

pub fn memory_tracker(now: &str) -> HabitTracker<SqliteStorage> {
    let store = SqliteStorage::in_memory().expect("Failed to create in-memory storage");
    tracker_with(Arc::new(store), now)
}

pub async fn daily_habit<S>(tracker: &HabitTracker<S>, name: &str) -> Habit
where
    S: CompletionLogStore + HabitStore,
{
    tracker
        .create_habit(&owner(), name.to_string(), String::new(), vec![0, 1, 2, 3, 4, 5, 6])
        .await
        .expect("Failed to create habit")
}

/// SQLite store whose writes can be made to fail on demand
pub struct FlakyStore {
    inner: SqliteStorage,
    pub fail_streak_writes: AtomicBool,
    pub fail_log_writes: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteStorage::in_memory().expect("Failed to create in-memory storage"),
            fail_streak_writes: AtomicBool::new(false),
            fail_log_writes: AtomicBool::new(false),
        }
    }

    pub fn set_fail_streak_writes(&self, fail: bool) {
        self.fail_streak_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_log_writes(&self, fail: bool) {
        self.fail_log_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CompletionLogStore for FlakyStore {
    async fn fetch_logs(&self, habit_id: &HabitId, owner_id: &OwnerId) -> Result<Vec<CompletionLog>, StorageError> {
        self.inner.fetch_logs(habit_id, owner_id).await
    }

    async fn append_log(&self, log: &CompletionLog) -> Result<(), StorageError> {
        if self.fail_log_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("log write rejected".to_string()));
        }
        self.inner.append_log(log).await
    }

    async fn remove_logs(&self, log_ids: &[LogId]) -> Result<usize, StorageError> {
        if self.fail_log_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("log write rejected".to_string()));
        }
        self.inner.remove_logs(log_ids).await
    }
}

#[async_trait]
impl HabitStore for FlakyStore {
    async fn create_habit(&self, habit: &Habit) -> Result<(), StorageError> {
        self.inner.create_habit(habit).await
    }

    async fn get_habit(&self, habit_id: &HabitId) -> Result<Habit, StorageError> {
        self.inner.get_habit(habit_id).await
    }

    async fn list_habits(&self, owner_id: &OwnerId) -> Result<Vec<Habit>, StorageError> {
        self.inner.list_habits(owner_id).await
    }

    async fn persist_streaks(&self, habit_id: &HabitId, streaks: &StreakResult) -> Result<(), StorageError> {
        if self.fail_streak_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("streak write rejected".to_string()));
        }
        self.inner.persist_streaks(habit_id, streaks).await
    }
}

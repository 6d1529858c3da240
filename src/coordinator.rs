/// Toggle coordination
///
/// Marking a habit done or undone for a day touches two records: the
/// completion log (source of truth) and the cached streak fields on the habit.
/// The coordinator serializes those writes per habit and always recomputes
/// streaks from the full log set read back from the store.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{
    day_keys, Clock, CompletionLog, DayKey, DayNormalizer, DomainError, Habit, HabitId, LogId, OwnerId, StreakCalculator,
    StreakResult,
};
use crate::storage::{CompletionLogStore, HabitStore};
use crate::EngineError;

/// Completion state of one habit on one day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayState {
    Incomplete,
    Completed,
}

/// What a toggle did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleOutcome {
    pub habit_id: HabitId,
    pub day: DayKey,
    /// State of the day after the toggle
    pub state: DayState,
    /// Streaks recomputed after the toggle, as persisted
    pub streaks: StreakResult,
}

pub struct ToggleCoordinator<S> {
    store: Arc<S>,
    calculator: StreakCalculator,
    clock: Arc<dyn Clock>,
    normalizer: DayNormalizer,
    /// One lock per habit, created on first use
    locks: Mutex<HashMap<HabitId, Arc<Mutex<()>>>>,
    /// Habits whose streak write failed after their log changed
    stale: Mutex<HashSet<HabitId>>,
}

impl<S> ToggleCoordinator<S>
where
    S: CompletionLogStore + HabitStore,
{
    pub fn new(
        store: Arc<S>,
        calculator: StreakCalculator,
        clock: Arc<dyn Clock>,
        normalizer: DayNormalizer,
    ) -> Self {
        Self {
            store,
            calculator,
            clock,
            normalizer,
            locks: Mutex::new(HashMap::new()),
            stale: Mutex::new(HashSet::new()),
        }
    }

    /// Flip the state of the day containing `at`
    ///
    /// Incomplete days get a new log at `at`; completed days lose every log
    /// that falls on them. Either way the habit's streak fields are then
    /// recomputed from the store and persisted before this returns. Days
    /// after today are rejected.
    pub async fn toggle(
        &self,
        habit_id: &HabitId,
        owner_id: &OwnerId,
        at: DateTime<Utc>,
        note: Option<String>,
    ) -> Result<ToggleOutcome, EngineError> {
        let day = self.normalizer.day_key(at);
        let today = self.normalizer.today(self.clock.as_ref());
        if day > today {
            return Err(DomainError::InvalidDate(format!("cannot toggle {}, which is after today ({})", day, today)).into());
        }

        let lock = self.habit_lock(habit_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.toggle_locked(habit_id, owner_id, day, at, note).await
        };
        self.release_lock(habit_id, lock).await;
        result
    }

    async fn toggle_locked(
        &self,
        habit_id: &HabitId,
        owner_id: &OwnerId,
        day: DayKey,
        at: DateTime<Utc>,
        note: Option<String>,
    ) -> Result<ToggleOutcome, EngineError> {
        self.owned_habit(habit_id, owner_id).await?;
        let logs = self.store.fetch_logs(habit_id, owner_id).await?;
        let on_day: Vec<LogId> = logs
            .iter()
            .filter(|log| log.day(&self.normalizer) == day)
            .map(|log| log.id.clone())
            .collect();

        let state = if on_day.is_empty() {
            let log = CompletionLog::new(habit_id.clone(), owner_id.clone(), at, note)?;
            self.store.append_log(&log).await?;
            DayState::Completed
        } else {
            let removed = self.store.remove_logs(&on_day).await?;
            debug!("Removed {} logs of habit {} on {}", removed, habit_id, day);
            DayState::Incomplete
        };

        let streaks = self.recompute(habit_id, owner_id).await?;
        self.persist(habit_id, &streaks).await?;

        info!(
            "Toggled habit {} on {} to {:?}: current={} longest={}",
            habit_id, day, state, streaks.current_streak, streaks.longest_streak
        );

        Ok(ToggleOutcome {
            habit_id: habit_id.clone(),
            day,
            state,
            streaks,
        })
    }

    /// Whether at least one log falls on `day`
    pub async fn is_completed(
        &self,
        habit_id: &HabitId,
        owner_id: &OwnerId,
        day: DayKey,
    ) -> Result<bool, EngineError> {
        self.owned_habit(habit_id, owner_id).await?;
        let logs = self.store.fetch_logs(habit_id, owner_id).await?;
        Ok(logs.iter().any(|log| log.day(&self.normalizer) == day))
    }

    /// Current streaks, recomputed from the log set
    ///
    /// The cached fields are rewritten when they disagree with the
    /// recomputation or when an earlier streak write failed.
    pub async fn streaks(&self, habit_id: &HabitId, owner_id: &OwnerId) -> Result<StreakResult, EngineError> {
        let lock = self.habit_lock(habit_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.streaks_locked(habit_id, owner_id).await
        };
        self.release_lock(habit_id, lock).await;
        result
    }

    async fn streaks_locked(&self, habit_id: &HabitId, owner_id: &OwnerId) -> Result<StreakResult, EngineError> {
        let habit = self.owned_habit(habit_id, owner_id).await?;
        let streaks = self.recompute(habit_id, owner_id).await?;

        let was_stale = self.is_stale(habit_id).await;
        if was_stale || habit.streaks() != streaks {
            debug!("Reconciling cached streaks of habit {} (stale={})", habit_id, was_stale);
            self.persist(habit_id, &streaks).await?;
        }

        Ok(streaks)
    }

    /// Unconditionally recompute and persist streaks from the log set
    pub async fn reconcile(&self, habit_id: &HabitId, owner_id: &OwnerId) -> Result<StreakResult, EngineError> {
        let lock = self.habit_lock(habit_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.reconcile_locked(habit_id, owner_id).await
        };
        self.release_lock(habit_id, lock).await;
        result
    }

    async fn reconcile_locked(&self, habit_id: &HabitId, owner_id: &OwnerId) -> Result<StreakResult, EngineError> {
        self.owned_habit(habit_id, owner_id).await?;
        let streaks = self.recompute(habit_id, owner_id).await?;
        self.persist(habit_id, &streaks).await?;
        info!("Reconciled streaks of habit {}", habit_id);
        Ok(streaks)
    }

    /// Whether the habit's cached streaks may disagree with its logs
    pub async fn is_stale(&self, habit_id: &HabitId) -> bool {
        self.stale.lock().await.contains(habit_id)
    }

    async fn habit_lock(&self, habit_id: &HabitId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(habit_id.clone()).or_default().clone()
    }

    /// Drop our handle and forget the habit's lock once nobody else holds it
    ///
    /// Handles are only cloned out of the map under the map lock, so a count
    /// of one seen here means no task is waiting on or holding the lock.
    async fn release_lock(&self, habit_id: &HabitId, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        drop(lock);
        if locks.get(habit_id).is_some_and(|held| Arc::strong_count(held) == 1) {
            locks.remove(habit_id);
        }
    }

    /// Number of habits with a live lock entry
    pub async fn active_locks(&self) -> usize {
        self.locks.lock().await.len()
    }

    /// Load a habit, hiding habits of other owners
    async fn owned_habit(&self, habit_id: &HabitId, owner_id: &OwnerId) -> Result<Habit, EngineError> {
        let habit = self.store.get_habit(habit_id).await?;
        if habit.owner_id != *owner_id {
            return Err(EngineError::HabitNotFound {
                habit_id: habit_id.to_string(),
            });
        }
        Ok(habit)
    }

    async fn recompute(&self, habit_id: &HabitId, owner_id: &OwnerId) -> Result<StreakResult, EngineError> {
        let logs = self.store.fetch_logs(habit_id, owner_id).await?;
        let today = self.normalizer.today(self.clock.as_ref());
        Ok(self.calculator.compute(day_keys(&logs, &self.normalizer), today))
    }

    async fn persist(&self, habit_id: &HabitId, streaks: &StreakResult) -> Result<(), EngineError> {
        match self.store.persist_streaks(habit_id, streaks).await {
            Ok(()) => {
                self.stale.lock().await.remove(habit_id);
                Ok(())
            }
            Err(e) => {
                warn!("Streak write for habit {} failed, marking stale: {}", habit_id, e);
                self.stale.lock().await.insert(habit_id.clone());
                Err(e.into())
            }
        }
    }
}

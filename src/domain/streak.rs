/// Streak calculation
///
/// Streaks are always derived from scratch from the full set of completed
/// days. Nothing here is incremental, so recomputing after any log append or
/// delete yields the same answer as if the history had been built that way.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use crate::domain::{days_between, DayKey};

/// When a streak whose last completion was yesterday still counts as current
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakPolicy {
    /// A completion yesterday keeps the streak alive while today is still open
    #[default]
    AllowIncompleteToday,
    /// Only a completion today keeps the streak alive
    RequireToday,
}

impl StreakPolicy {
    fn is_alive(&self, most_recent: DayKey, today: DayKey) -> bool {
        let lag = days_between(today, most_recent);
        match self {
            StreakPolicy::AllowIncompleteToday => lag == 0 || lag == 1,
            StreakPolicy::RequireToday => lag == 0,
        }
    }
}

/// Calculated streak information for a habit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreakResult {
    /// Length of the run that is still alive relative to today
    pub current_streak: u32,
    /// Longest run anywhere in the history
    pub longest_streak: u32,
    /// Most recent completed day considered
    pub last_completed: Option<DayKey>,
}

/// Computes current and longest streaks from completed days
#[derive(Debug, Clone, Copy, Default)]
pub struct StreakCalculator {
    policy: StreakPolicy,
}

impl StreakCalculator {
    pub fn new(policy: StreakPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> StreakPolicy {
        self.policy
    }

    /// Compute streaks for one habit
    ///
    /// `day_keys` may contain duplicates and come in any order. Days after
    /// `today` are ignored.
    pub fn compute<I>(&self, day_keys: I, today: DayKey) -> StreakResult
    where
        I: IntoIterator<Item = DayKey>,
    {
        let distinct: BTreeSet<DayKey> = day_keys
            .into_iter()
            .filter(|day| *day <= today)
            .collect();

        // Newest first
        let mut days = distinct.into_iter().rev();
        let Some(most_recent) = days.next() else {
            return StreakResult::default();
        };

        let mut run = 1u32;
        let mut longest = 0u32;
        let mut first_segment: Option<u32> = None;
        let mut previous = most_recent;

        for day in days {
            if days_between(previous, day) == 1 {
                run += 1;
            } else {
                first_segment.get_or_insert(run);
                longest = longest.max(run);
                run = 1;
            }
            previous = day;
        }

        let first_segment = first_segment.unwrap_or(run);
        let longest = longest.max(run);
        let current = if self.policy.is_alive(most_recent, today) {
            first_segment
        } else {
            0
        };

        StreakResult {
            current_streak: current,
            longest_streak: longest,
            last_completed: Some(most_recent),
        }
    }
}

/// Per-habit reports over a named date range

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::analytics::{AnalyticsEngine, CompletionBucket};
use crate::domain::{day_keys, days_between, CompletionLog, DayKey, DayNormalizer, DomainError, Habit, HabitId};

/// Date ranges offered by reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportRange {
    /// The seven days ending today
    LastWeek,
    /// The thirty days ending today
    LastMonth,
    /// Sunday through Saturday of the week containing today
    CalendarWeek,
}

impl ReportRange {
    /// Inclusive `(start, end)` of the range relative to `today`
    pub fn window(&self, today: DayKey) -> (DayKey, DayKey) {
        match self {
            ReportRange::LastWeek => (today.offset(-6), today),
            ReportRange::LastMonth => (today.offset(-29), today),
            ReportRange::CalendarWeek => {
                let sunday = today.offset(-i64::from(today.weekday_index()));
                (sunday, sunday.offset(6))
            }
        }
    }
}

impl FromStr for ReportRange {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "week" | "last-week" | "last_week" => Ok(ReportRange::LastWeek),
            "month" | "last-month" | "last_month" => Ok(ReportRange::LastMonth),
            "calendar-week" | "calendar_week" => Ok(ReportRange::CalendarWeek),
            other => Err(DomainError::Validation {
                message: format!("unknown report range '{}' (expected week, month or calendar-week)", other),
            }),
        }
    }
}

impl fmt::Display for ReportRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReportRange::LastWeek => "week",
            ReportRange::LastMonth => "month",
            ReportRange::CalendarWeek => "calendar-week",
        };
        f.write_str(name)
    }
}

/// One habit's line in a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitReportRow {
    pub habit_id: HabitId,
    pub name: String,
    /// Distinct days with a completion inside the range
    pub completed_days: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    /// Percent of days in the range with a completion
    pub completion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitReport {
    pub range: ReportRange,
    pub start: DayKey,
    pub end: DayKey,
    pub habits: Vec<HabitReportRow>,
    /// Completions per day summed over every habit in the report
    pub chart: Vec<CompletionBucket>,
}

impl AnalyticsEngine {
    /// Build a report from habits paired with their full log history
    ///
    /// Streaks are recomputed from the logs rather than read from the cached
    /// habit fields.
    pub fn build_report(
        &self,
        range: ReportRange,
        today: DayKey,
        normalizer: &DayNormalizer,
        habits: &[(Habit, Vec<CompletionLog>)],
    ) -> Result<HabitReport, DomainError> {
        let (start, end) = range.window(today);
        let window_size = days_between(end, start) + 1;

        let mut rows = Vec::with_capacity(habits.len());
        let mut all_days = Vec::new();

        for (habit, logs) in habits {
            let days = day_keys(logs, normalizer);
            let streaks = self.calculator().compute(days.iter().copied(), today);
            let completed_days = days
                .iter()
                .filter(|day| **day >= start && **day <= end)
                .collect::<BTreeSet<_>>()
                .len() as u32;

            rows.push(HabitReportRow {
                habit_id: habit.id.clone(),
                name: habit.name.clone(),
                completed_days,
                current_streak: streaks.current_streak,
                longest_streak: streaks.longest_streak,
                completion_rate: self.completion_rate(logs, window_size, end, normalizer)?,
            });
            all_days.extend(days);
        }

        let chart = super::bucketize(all_days, start, end)?;

        Ok(HabitReport {
            range,
            start,
            end,
            habits: rows,
            chart,
        })
    }
}

/// Completion aggregation and reporting
///
/// This module turns day keys into chart buckets and completion-rate
/// percentages, and hosts the analytics engine that combines those with the
/// streak calculator for reports.

pub mod report;

pub use report::*;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::domain::{
    day_keys, days_between, CompletionLog, DayKey, DayNormalizer, DomainError, StreakCalculator, StreakResult,
};

/// Decimal places used when no configuration says otherwise
pub const DEFAULT_RATE_DECIMALS: u32 = 2;

/// Finest rounding an `f64` percentage can carry meaningfully
pub const MAX_RATE_DECIMALS: u32 = 10;

/// Number of completion events on one day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionBucket {
    pub day: DayKey,
    pub count: u32,
}

/// Raw completion counts for every day from `window_start` to `window_end`
///
/// Buckets come back oldest first with no gaps. Same-day events are counted
/// individually; events outside the window are ignored.
pub fn bucketize<I>(
    day_keys: I,
    window_start: DayKey,
    window_end: DayKey,
) -> Result<Vec<CompletionBucket>, DomainError>
where
    I: IntoIterator<Item = DayKey>,
{
    if window_start > window_end {
        return Err(DomainError::InvalidWindow(format!(
            "window starts on {} after it ends on {}",
            window_start, window_end
        )));
    }

    let len = days_between(window_end, window_start) + 1;
    let mut buckets: Vec<CompletionBucket> = (0..len)
        .map(|offset| CompletionBucket {
            day: window_start.offset(offset),
            count: 0,
        })
        .collect();

    for day in day_keys {
        if day < window_start || day > window_end {
            continue;
        }
        let index = days_between(day, window_start) as usize;
        buckets[index].count += 1;
    }

    Ok(buckets)
}

/// Percentage of the trailing `window_size_days` ending at `window_end` with
/// at least one completion, rounded to two decimals
pub fn completion_rate<I>(day_keys: I, window_size_days: i64, window_end: DayKey) -> Result<f64, DomainError>
where
    I: IntoIterator<Item = DayKey>,
{
    completion_rate_with_precision(day_keys, window_size_days, window_end, DEFAULT_RATE_DECIMALS)
}

/// `completion_rate` with an explicit number of decimal places
pub fn completion_rate_with_precision<I>(
    day_keys: I,
    window_size_days: i64,
    window_end: DayKey,
    decimals: u32,
) -> Result<f64, DomainError>
where
    I: IntoIterator<Item = DayKey>,
{
    if window_size_days <= 0 {
        return Err(DomainError::InvalidWindow(format!(
            "window size must be at least one day, got {}",
            window_size_days
        )));
    }

    // Windows reaching past the calendar start clamp to it; no day precedes it
    let window_start = window_end.offset(-(window_size_days - 1));
    let distinct: BTreeSet<DayKey> = day_keys
        .into_iter()
        .filter(|day| *day >= window_start && *day <= window_end)
        .collect();

    let rate = distinct.len() as f64 / window_size_days as f64 * 100.0;
    Ok(round_rate(rate, decimals))
}

/// Round half away from zero to `decimals` places, at most `MAX_RATE_DECIMALS`
pub fn round_rate(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals.min(MAX_RATE_DECIMALS) as i32);
    (value * factor).round() / factor
}

/// Analytics engine for processing habit data
///
/// Holds the engine configuration so every computation applies the same
/// streak policy and rounding.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsEngine {
    config: EngineConfig,
}

impl AnalyticsEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn calculator(&self) -> StreakCalculator {
        StreakCalculator::new(self.config.streak_policy)
    }

    /// Streaks for one habit's logs
    pub fn streaks(&self, logs: &[CompletionLog], today: DayKey, normalizer: &DayNormalizer) -> StreakResult {
        self.calculator().compute(day_keys(logs, normalizer), today)
    }

    /// Chart buckets for logs from any number of habits
    pub fn chart(
        &self,
        logs: &[CompletionLog],
        window_start: DayKey,
        window_end: DayKey,
        normalizer: &DayNormalizer,
    ) -> Result<Vec<CompletionBucket>, DomainError> {
        bucketize(day_keys(logs, normalizer), window_start, window_end)
    }

    /// Completion rate for one habit's logs using the configured precision
    pub fn completion_rate(
        &self,
        logs: &[CompletionLog],
        window_size_days: i64,
        window_end: DayKey,
        normalizer: &DayNormalizer,
    ) -> Result<f64, DomainError> {
        completion_rate_with_precision(
            day_keys(logs, normalizer),
            window_size_days,
            window_end,
            self.config.rate_decimals,
        )
    }
}

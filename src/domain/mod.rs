/// Domain module containing core business logic and data types
///
/// This module defines the core entities (Habit, CompletionLog), the day
/// normalization rules every computation shares, and the streak calculator.

pub mod clock;
pub mod day;
pub mod habit;
pub mod log;
pub mod streak;
pub mod types;

// Re-export public types for easy access
pub use clock::*;
pub use day::*;
pub use habit::*;
pub use log::*;
pub use streak::*;
pub use types::*;

use thiserror::Error;

/// Errors that can occur during domain operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid habit name: {0}")]
    InvalidHabitName(String),

    #[error("Invalid target days: {0}")]
    InvalidTargetDays(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid window: {0}")]
    InvalidWindow(String),
}

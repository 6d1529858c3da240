/// Basic unit tests to verify core functionality
use habit_streaks::*;
use tempfile::NamedTempFile;

#[cfg(test)]
mod basic_unit_tests {
    use super::*;

    #[test]
    fn test_habit_creation() {
        let habit = Habit::new(
            OwnerId::new("user-1"),
            "Test Habit".to_string(),
            "A test habit".to_string(),
            vec![1, 2, 3],
            chrono::Utc::now(),
        );

        assert!(habit.is_ok());
        let habit = habit.unwrap();
        assert_eq!(habit.name, "Test Habit");
        assert_eq!(habit.streaks(), StreakResult::default());
    }

    #[test]
    fn test_completion_log_creation() {
        let habit_id = HabitId::new();
        let at = parse_timestamp("2024-03-01T22:10:00+01:00").unwrap();

        let log = CompletionLog::new(habit_id.clone(), OwnerId::new("user-1"), at, Some("Great work!".to_string()));

        assert!(log.is_ok());
        let log = log.unwrap();
        assert_eq!(log.habit_id, habit_id);
        assert_eq!(log.day(&DayNormalizer::utc()), DayKey::parse("2024-03-01").unwrap());
    }

    #[test]
    fn test_invalid_input_maps_to_engine_error() {
        let err: EngineError = DayKey::parse("03/01/2024").unwrap_err().into();
        assert!(matches!(err, EngineError::InvalidInput(DomainError::InvalidDate(_))));

        let err: EngineError = StorageError::HabitNotFound { habit_id: "x".to_string() }.into();
        assert!(matches!(err, EngineError::HabitNotFound { .. }));

        let err: EngineError = StorageError::Unavailable("down".to_string()).into();
        assert!(matches!(err, EngineError::StoreUnavailable(_)));
    }

    #[test]
    fn test_storage_creation() {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let storage = SqliteStorage::new(temp_file.path());
        tokio_test::assert_ok!(storage);
    }

    #[test]
    fn test_analytics_engine_uses_config() {
        let analytics = AnalyticsEngine::new(EngineConfig {
            streak_policy: StreakPolicy::RequireToday,
            rate_decimals: 1,
        });
        assert_eq!(analytics.calculator().policy(), StreakPolicy::RequireToday);
        assert_eq!(analytics.config().rate_decimals, 1);
    }
}

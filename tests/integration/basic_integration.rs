/// Basic integration tests
use std::sync::Arc;

use habit_streaks::*;
use tempfile::NamedTempFile;

use crate::common::*;

#[cfg(test)]
mod basic_integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_tracker_basic_workflow() {
        let tracker = memory_tracker(NOW);
        let habit = daily_habit(&tracker, "Read").await;

        for ts in ["2024-06-13T08:00:00Z", "2024-06-14T08:00:00Z", "2024-06-15T08:00:00Z"] {
            let outcome = tracker.toggle(&habit.id, &owner(), Some(at(ts)), None).await.unwrap();
            assert_eq!(outcome.state, DayState::Completed);
        }

        let streaks = tracker.streaks(&habit.id, &owner()).await.unwrap();
        assert_eq!(streaks.current_streak, 3);
        assert_eq!(streaks.longest_streak, 3);
        assert_eq!(streaks.last_completed, Some(day("2024-06-15")));

        let rate = tracker.completion_rate(&habit.id, &owner(), 7).await.unwrap();
        assert_eq!(rate, 42.86);

        let chart = tracker
            .chart(&habit.id, &owner(), day("2024-06-12"), day("2024-06-15"))
            .await
            .unwrap();
        let counts: Vec<u32> = chart.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![0, 1, 1, 1]);
    }

    #[tokio::test]
    async fn test_toggle_day_and_is_completed() {
        let tracker = memory_tracker(NOW);
        let habit = daily_habit(&tracker, "Walk").await;

        let yesterday = day("2024-06-14");
        tracker.toggle_day(&habit.id, &owner(), yesterday, Some("late".to_string())).await.unwrap();

        assert!(tracker.is_completed(&habit.id, &owner(), yesterday).await.unwrap());
        assert!(!tracker.is_completed(&habit.id, &owner(), tracker.today()).await.unwrap());

        // Yesterday still keeps the streak alive before today is done
        let streaks = tracker.streaks(&habit.id, &owner()).await.unwrap();
        assert_eq!(streaks.current_streak, 1);
    }

    #[tokio::test]
    async fn test_database_persistence() {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let db_path = temp_file.path().to_path_buf();

        let habit_id = {
            let tracker = HabitTracker::open(&db_path, EngineConfig::default(), fixed_clock(NOW), DayNormalizer::utc())
                .await
                .expect("Failed to open first tracker");
            let habit = daily_habit(&tracker, "Journal").await;
            tracker.toggle(&habit.id, &owner(), None, None).await.unwrap();
            habit.id
        };

        let tracker = HabitTracker::open(&db_path, EngineConfig::default(), fixed_clock(NOW), DayNormalizer::utc())
            .await
            .expect("Failed to open second tracker");

        let habits = tracker.habits(&owner()).await.unwrap();
        assert_eq!(habits.len(), 1);
        assert_eq!(habits[0].id, habit_id);
        assert_eq!(habits[0].current_streak, 1);
        assert!(tracker.is_completed(&habit_id, &owner(), tracker.today()).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_and_foreign_habits_are_not_found() {
        let tracker = memory_tracker(NOW);
        let habit = daily_habit(&tracker, "Meditate").await;

        let missing = tracker.streaks(&HabitId::new(), &owner()).await;
        assert!(matches!(missing, Err(EngineError::HabitNotFound { .. })));

        let foreign = tracker.completion_rate(&habit.id, &OwnerId::new("someone-else"), 7).await;
        assert!(matches!(foreign, Err(EngineError::HabitNotFound { .. })));
    }

    #[tokio::test]
    async fn test_invalid_windows_are_rejected() {
        let tracker = memory_tracker(NOW);
        let habit = daily_habit(&tracker, "Run").await;

        let rate = tracker.completion_rate(&habit.id, &owner(), 0).await;
        assert!(matches!(rate, Err(EngineError::InvalidInput(DomainError::InvalidWindow(_)))));

        let chart = tracker
            .chart(&habit.id, &owner(), day("2024-06-15"), day("2024-06-10"))
            .await;
        assert!(matches!(chart, Err(EngineError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_huge_rate_window_is_defined() {
        let tracker = memory_tracker(NOW);
        let habit = daily_habit(&tracker, "Stretch").await;
        tracker.toggle(&habit.id, &owner(), None, None).await.unwrap();

        let rate = tokio_test::assert_ok!(tracker.completion_rate(&habit.id, &owner(), 100_000_000).await);
        assert_eq!(rate, 0.0);
        let rate = tokio_test::assert_ok!(tracker.completion_rate(&habit.id, &owner(), i64::MAX).await);
        assert_eq!(rate, 0.0);
    }

    #[tokio::test]
    async fn test_open_rejects_excessive_rate_precision() {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let config = EngineConfig {
            rate_decimals: MAX_RATE_DECIMALS + 40,
            ..EngineConfig::default()
        };

        let result = HabitTracker::open(temp_file.path(), config, fixed_clock(NOW), DayNormalizer::utc()).await;
        assert!(matches!(result, Err(EngineError::InvalidInput(DomainError::Validation { .. }))));
    }

    #[tokio::test]
    async fn test_habits_due_today() {
        // 2024-06-15 is a Saturday
        let tracker = memory_tracker(NOW);
        let weekend = tracker
            .create_habit(&owner(), "Long run".to_string(), String::new(), vec![0, 6])
            .await
            .unwrap();
        tracker
            .create_habit(&owner(), "Standup".to_string(), String::new(), vec![1, 2, 3, 4, 5])
            .await
            .unwrap();

        let due = tracker.habits_due_today(&owner()).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, weekend.id);
    }

    #[tokio::test]
    async fn test_weekly_report() {
        let tracker = memory_tracker(NOW);
        let read = daily_habit(&tracker, "Read").await;
        let write = daily_habit(&tracker, "Write").await;

        for ts in ["2024-06-14T08:00:00Z", "2024-06-15T08:00:00Z"] {
            tracker.toggle(&read.id, &owner(), Some(at(ts)), None).await.unwrap();
        }
        tracker.toggle(&write.id, &owner(), Some(at("2024-06-15T09:00:00Z")), None).await.unwrap();

        let report = tracker.report(&owner(), ReportRange::LastWeek).await.unwrap();
        assert_eq!(report.start, day("2024-06-09"));
        assert_eq!(report.end, day("2024-06-15"));
        assert_eq!(report.habits.len(), 2);
        assert_eq!(report.chart.len(), 7);
        assert_eq!(report.chart.last().map(|b| b.count), Some(2));

        let read_row = report.habits.iter().find(|row| row.habit_id == read.id).unwrap();
        assert_eq!(read_row.completed_days, 2);
        assert_eq!(read_row.current_streak, 2);
        assert_eq!(read_row.completion_rate, 28.57);
    }

    #[tokio::test]
    async fn test_storage_is_shareable() {
        let store = Arc::new(SqliteStorage::in_memory().expect("Failed to create storage"));
        let tracker = tracker_with(store.clone(), NOW);
        let habit = daily_habit(&tracker, "Stretch").await;

        let fetched = tokio_test::assert_ok!(store.get_habit(&habit.id).await);
        assert_eq!(fetched.name, "Stretch");
    }
}

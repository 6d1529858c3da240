/// Command line entry point for the habit streak engine
///
/// Sets up logging, parses command line arguments and runs one command
/// against the SQLite-backed tracker. Results are printed as JSON on stdout;
/// logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use habit_streaks::{
    parse_timestamp, Clock, DayKey, DayNormalizer, EngineConfig, HabitId, HabitTracker, OwnerId, ReportRange, StreakPolicy,
    SystemClock,
};

/// Get the default database path with robust fallback strategy
fn get_default_database_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
    // Try various locations in order of preference
    let potential_paths = [
        dirs::home_dir().map(|mut p| {
            p.push(".habit_streaks");
            p
        }),
        dirs::data_dir().map(|mut p| {
            p.push("habit_streaks");
            p
        }),
        dirs::config_dir().map(|mut p| {
            p.push("habit_streaks");
            p
        }),
        std::env::current_dir().ok().map(|mut p| {
            p.push(".habit_streaks");
            p
        }),
    ];

    for potential_path in potential_paths.iter().flatten() {
        if std::fs::create_dir_all(potential_path).is_ok() {
            // Test if we can write to this directory
            let test_file = potential_path.join(".test_write");
            if std::fs::write(&test_file, "test").is_ok() {
                let _ = std::fs::remove_file(&test_file);
                return Ok(potential_path.join("habits.db"));
            }
        }
    }

    // Ultimate fallback: use a temporary directory
    let mut temp_path = std::env::temp_dir();
    temp_path.push("habit_streaks");
    std::fs::create_dir_all(&temp_path)?;
    temp_path.push("habits.db");

    tracing::warn!("Using temporary directory for database: {}", temp_path.display());
    Ok(temp_path)
}

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    /// If not provided, uses a default location in the user's home directory
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Owner whose habits are read and written
    #[arg(long, global = true, default_value = "local")]
    owner: String,

    /// Only a completion today keeps the current streak alive
    #[arg(long, global = true)]
    require_today: bool,

    /// Split days at UTC midnight instead of local midnight
    #[arg(long, global = true)]
    utc: bool,

    /// Decimal places kept on completion rates (0 to 10)
    #[arg(
        long,
        global = true,
        default_value_t = habit_streaks::DEFAULT_RATE_DECIMALS,
        value_parser = clap::value_parser!(u32).range(0..=i64::from(habit_streaks::MAX_RATE_DECIMALS))
    )]
    rate_decimals: u32,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable verbose output (implies debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a habit
    Add {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Target weekdays, 0 = Sunday
        #[arg(long, value_delimiter = ',', default_values_t = [0u8, 1, 2, 3, 4, 5, 6])]
        days: Vec<u8>,
    },
    /// List habits, optionally only those due today
    List {
        #[arg(long)]
        today: bool,
    },
    /// Mark a day done, or undo it if it is already done
    Toggle {
        habit: String,
        /// Day to toggle (YYYY-MM-DD), defaults to today
        #[arg(long, conflicts_with = "at")]
        date: Option<String>,
        /// Exact completion instant (RFC 3339)
        #[arg(long)]
        at: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },
    /// Current and longest streak of a habit
    Status { habit: String },
    /// Daily completion counts of a habit
    Chart {
        habit: String,
        /// First day (YYYY-MM-DD), defaults to six days before --to
        #[arg(long)]
        from: Option<String>,
        /// Last day (YYYY-MM-DD), defaults to today
        #[arg(long)]
        to: Option<String>,
    },
    /// Completion rate of a habit over the trailing window ending today
    Rate {
        habit: String,
        #[arg(long, default_value_t = 7, allow_negative_numbers = true)]
        days: i64,
    },
    /// Report over all habits
    Report {
        /// week, month or calendar-week
        #[arg(long, default_value = "week")]
        range: ReportRange,
    },
    /// Recompute cached streaks from the completion log
    Reconcile { habit: String },
}

fn parse_habit_id(raw: &str) -> Result<HabitId, Box<dyn std::error::Error>> {
    HabitId::from_string(raw.trim()).map_err(|e| format!("invalid habit id '{}': {}", raw, e).into())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Set up logging based on command line flags
    let log_level = if args.verbose {
        "debug"
    } else if args.debug {
        "info"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!("habit_streaks={}", log_level))
        .with_writer(std::io::stderr) // Send logs to stderr, not stdout
        .init();

    let db_path = match args.database {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            path
        }
        None => get_default_database_path()?,
    };

    info!("Using database at: {}", db_path.display());

    let config = EngineConfig {
        streak_policy: if args.require_today {
            StreakPolicy::RequireToday
        } else {
            StreakPolicy::AllowIncompleteToday
        },
        rate_decimals: args.rate_decimals,
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let normalizer = if args.utc {
        DayNormalizer::utc()
    } else {
        DayNormalizer::local_at(clock.now())
    };

    let tracker = HabitTracker::open(&db_path, config, clock, normalizer).await?;
    let owner = OwnerId::new(args.owner);

    match args.command {
        Command::Add { name, description, days } => {
            let habit = tracker.create_habit(&owner, name, description, days).await?;
            print_json(&habit)?;
        }
        Command::List { today } => {
            let habits = if today {
                tracker.habits_due_today(&owner).await?
            } else {
                tracker.habits(&owner).await?
            };
            print_json(&habits)?;
        }
        Command::Toggle { habit, date, at, note } => {
            let habit_id = parse_habit_id(&habit)?;
            let outcome = match (date, at) {
                (Some(date), _) => tracker.toggle_day(&habit_id, &owner, DayKey::parse(&date)?, note).await?,
                (None, Some(at)) => tracker.toggle(&habit_id, &owner, Some(parse_timestamp(&at)?), note).await?,
                (None, None) => tracker.toggle(&habit_id, &owner, None, note).await?,
            };
            print_json(&outcome)?;
        }
        Command::Status { habit } => {
            let streaks = tracker.streaks(&parse_habit_id(&habit)?, &owner).await?;
            print_json(&streaks)?;
        }
        Command::Chart { habit, from, to } => {
            let end = match to {
                Some(raw) => DayKey::parse(&raw)?,
                None => tracker.today(),
            };
            let start = match from {
                Some(raw) => DayKey::parse(&raw)?,
                None => end.offset(-6),
            };
            let buckets = tracker.chart(&parse_habit_id(&habit)?, &owner, start, end).await?;
            print_json(&buckets)?;
        }
        Command::Rate { habit, days } => {
            let rate = tracker.completion_rate(&parse_habit_id(&habit)?, &owner, days).await?;
            print_json(&serde_json::json!({ "window_days": days, "completion_rate": rate }))?;
        }
        Command::Report { range } => {
            let report = tracker.report(&owner, range).await?;
            print_json(&report)?;
        }
        Command::Reconcile { habit } => {
            let streaks = tracker.reconcile(&parse_habit_id(&habit)?, &owner).await?;
            print_json(&streaks)?;
        }
    }

    Ok(())
}

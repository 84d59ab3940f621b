//! studycal - study plan and achievement calendar
//!
//! Wires together:
//! - Configuration loading
//! - Store initialization
//! - The study engine
//! - Command dispatch and output

mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use studycal_config::load_config_or_default;
use studycal_core::{
    month_bounds, parse_date, parse_date_range, validate_plan,
    validate_record_minutes, week_bounds, year_bounds, CoreEvent, StudyEngine,
};
use studycal_store::{SqliteStore, Store};
use studycal_util::{
    default_config_path, is_mock_time_active, MonotonicInstant, SnapshotId, StudycalError, DATABASE_FILENAME,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::output::{describe_event, Output, Status};

/// studycal - Track planned and actual study time
#[derive(Parser, Debug)]
#[command(name = "studycal")]
#[command(about = "Study plan and achievement calendar", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/studycal/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set STUDYCAL_DATA_DIR env var)
    #[arg(short, long, env = "STUDYCAL_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Set the plan for a date
    Plan {
        date: String,
        hours: i64,
        #[arg(default_value_t = 0)]
        minutes: i64,
    },
    /// Remove the plan for a date
    Unplan { date: String },
    /// Add study time to a date
    Record { date: String, minutes: i64 },
    /// Replace the recorded study time for a date
    Edit { date: String, minutes: i64 },
    /// Remove the recorded study time for a date
    Unrecord { date: String },
    /// Achievement for one date
    Day { date: String },
    /// Achievement for the Monday-to-Sunday week containing a date
    Week { date: String },
    /// Achievement for the month containing a date
    Month { date: String },
    /// Achievement for the year containing a date
    Year { date: String },
    /// Achievement for an inclusive date range
    Range { from: String, to: String },
    /// Change history for one date, oldest first
    History { date: String },
    /// Clear the change history for one date
    ClearHistory { date: String },
    /// Full change log, newest first
    Log {
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Manage backups
    #[command(subcommand)]
    Backup(BackupCommand),
    /// Restore a backup; undo stays available for a while
    Restore { id: String },
    /// Undo the last restore
    Undo,
    /// Keep the restored data and close the undo window
    Dismiss,
    /// Show backup and restore status
    Status,
    /// Wait for the undo window to close, reporting when it does
    Watch,
}

#[derive(Subcommand, Debug)]
enum BackupCommand {
    /// List backups, newest first
    List,
    /// Take a backup now
    Create {
        #[arg(long)]
        note: Option<String>,
    },
    /// Delete one backup
    Delete { id: String },
    /// Delete every backup
    DeleteAll,
}

/// Open the engine on the configured store
fn open_engine(args: &Args) -> Result<StudyEngine> {
    let mut settings = load_config_or_default(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    if let Some(data_dir) = &args.data_dir {
        settings.data_dir = data_dir.clone();
    }

    std::fs::create_dir_all(&settings.data_dir).with_context(|| {
        format!("Failed to create data directory {:?}", settings.data_dir)
    })?;

    let db_path = settings.data_dir.join(DATABASE_FILENAME);
    let store: Arc<dyn Store> = Arc::new(
        SqliteStore::open(&db_path)
            .with_context(|| format!("Failed to open database {:?}", db_path))?,
    );
    info!(db_path = %db_path.display(), "Store initialized");

    Ok(StudyEngine::open(settings, store))
}

fn run(args: &Args, engine: &mut StudyEngine, out: &Output) -> Result<()> {
    let now = studycal_util::now();
    let now_mono = MonotonicInstant::now();

    match &args.command {
        Command::Plan {
            date,
            hours,
            minutes,
        } => {
            let date = parse_date(date)?;
            let total = validate_plan(*hours, *minutes)?;
            out.events(&engine.set_plan(date, total, now))
        }
        Command::Unplan { date } => out.events(&engine.delete_plan(parse_date(date)?, now)),
        Command::Record { date, minutes } => {
            let date = parse_date(date)?;
            let minutes = validate_record_minutes(*minutes)?;
            out.events(&engine.add_record(date, minutes, now))
        }
        Command::Edit { date, minutes } => {
            let date = parse_date(date)?;
            let minutes = validate_record_minutes(*minutes)?;
            out.events(&engine.set_record(date, minutes, now))
        }
        Command::Unrecord { date } => out.events(&engine.delete_record(parse_date(date)?, now)),
        Command::Day { date } => {
            let result = engine.daily(parse_date(date)?);
            out.day(&result, &engine.color_for(result.achievement_rate))
        }
        Command::Week { date } => {
            let date = parse_date(date)?;
            let stats = engine.weekly(date);
            out.range("week", &week_bounds(date), &stats, &engine.color_for(stats.achievement_rate))
        }
        Command::Month { date } => {
            let date = parse_date(date)?;
            let stats = engine.monthly(date);
            out.range("month", &month_bounds(date), &stats, &engine.color_for(stats.achievement_rate))
        }
        Command::Year { date } => {
            let date = parse_date(date)?;
            let stats = engine.yearly(date);
            out.range("year", &year_bounds(date), &stats, &engine.color_for(stats.achievement_rate))
        }
        Command::Range { from, to } => {
            let range = parse_date_range(from, to)?;
            let stats = engine.custom(&range);
            out.range("range", &range, &stats, &engine.color_for(stats.achievement_rate))
        }
        Command::History { date } => out.log(&engine.history(parse_date(date)?)),
        Command::ClearHistory { date } => {
            out.events(&engine.clear_history(parse_date(date)?, now))
        }
        Command::Log { limit } => {
            let log = engine.log();
            let shown = limit.map_or(log.len(), |n| n.min(log.len()));
            out.log(&log[..shown])
        }
        Command::Backup(command) => run_backup(command, engine, out, now),
        Command::Restore { id } => {
            let id = SnapshotId::from(id.as_str());
            if engine.backup(&id).is_none() {
                return Err(StudycalError::BackupNotFound(id.to_string()).into());
            }
            out.events(&engine.restore(&id, now, now_mono))
        }
        Command::Undo => {
            let events = engine.undo_restore(now);
            if events.is_empty() {
                return Err(StudycalError::NoActiveRestore.into());
            }
            out.events(&events)
        }
        Command::Dismiss => {
            let events = engine.dismiss_restore(now);
            if events.is_empty() {
                return Err(StudycalError::NoActiveRestore.into());
            }
            out.events(&events)
        }
        Command::Status => out.status(&Status {
            backups: engine.backups().len(),
            max_backups: engine.settings().max_backups,
            store_healthy: engine.store_healthy(),
            restore: engine.restore_context(now),
            remaining: engine.restore_remaining(now_mono),
            integrity: engine.integrity(),
            mock_time: is_mock_time_active(),
        }),
        Command::Watch => Ok(()),
    }
}

fn run_backup(
    command: &BackupCommand,
    engine: &mut StudyEngine,
    out: &Output,
    now: chrono::DateTime<chrono::Local>,
) -> Result<()> {
    match command {
        BackupCommand::List => out.backups(engine.backups()),
        BackupCommand::Create { note } => out.events(&engine.backup_now(note.clone(), now)),
        BackupCommand::Delete { id } => {
            let id = SnapshotId::from(id.as_str());
            if engine.backup(&id).is_none() {
                return Err(StudycalError::BackupNotFound(id.to_string()).into());
            }
            out.events(&engine.delete_backup(&id))
        }
        BackupCommand::DeleteAll => out.events(&engine.delete_all_backups()),
    }
}

/// Tick the engine until the undo window closes or Ctrl-C arrives
async fn watch(engine: &mut StudyEngine, out: &Output) -> Result<()> {
    if engine.restore_context(studycal_util::now()).is_none() {
        println!("No undo window open");
        return Ok(());
    }

    let tick_interval = Duration::from_millis(250);
    let mut tick_timer = tokio::time::interval(tick_interval);

    info!("Watching undo window");

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                info!("Received Ctrl-C, stopping watch");
                break;
            }

            _ = tick_timer.tick() => {
                let now_mono = MonotonicInstant::now();
                if engine.sync_restore(studycal_util::now(), now_mono)
                    && engine.restore_remaining(now_mono).is_none()
                {
                    println!("Undo window closed by another command");
                    break;
                }

                let events: Vec<CoreEvent> = engine.tick(now_mono);
                if !events.is_empty() {
                    for event in &events {
                        debug!(event = %describe_event(event), "Core event");
                    }
                    out.events(&events)?;
                }

                // The monotonic timer decides expiry, not the wall clock
                if engine.restore_remaining(now_mono).is_none() {
                    break;
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for command output
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    debug!(version = env!("CARGO_PKG_VERSION"), "studycal starting");

    let out = Output::new(args.json);
    let mut engine = open_engine(&args)?;

    let result = match args.command {
        Command::Watch => watch(&mut engine, &out).await,
        _ => run(&args, &mut engine, &out),
    };

    engine.flush();
    result
}

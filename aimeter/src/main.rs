//! aimeter - usage meter for AI chat websites
//!
//! Reads and resets the per-day records kept by the background host, and
//! runs that host (`aimeter run`).
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/aimeter/usage.db (~/.local/share/aimeter/usage.db)
//! - Logs: $XDG_STATE_HOME/aimeter/aimeter.YYYY-MM-DD.log (~/.local/state/aimeter/)
//! - Config: $XDG_CONFIG_HOME/aimeter/config.toml (~/.config/aimeter/config.toml)

mod host;

use aimeter_core::aggregate::{most_used_site, week_summary};
use aimeter_core::format::format_duration;
use aimeter_core::{
    parse_day_key, today_key, Config, DailyAggregate, DailyStore, SqliteStore, TrackedSite,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::Level;

#[derive(Parser)]
#[command(name = "aimeter")]
#[command(about = "Track time and questions on AI chat websites")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show today's usage
    Today {
        /// Print the raw record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show usage for one day (YYYY-MM-DD)
    Show {
        date: String,
        /// Print the raw record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the current week, Sunday to Saturday
    Week {
        /// Print the week as JSON
        #[arg(long)]
        json: bool,
    },
    /// Reset a day's usage to zero (defaults to today)
    Reset { date: Option<String> },
    /// Run the background host, reading browser events from stdin
    Run {
        /// Print today's record on every change
        #[arg(long)]
        follow: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;

    // The long-running host also reports warnings on stderr
    let _log_guard = match args.command {
        Command::Run { .. } => {
            aimeter_core::logging::init_with_stderr(&config.logging, Level::WARN)
        }
        _ => aimeter_core::logging::init(&config.logging),
    }
    .context("failed to initialize logging")?;

    let store = open_store(&config)?;

    match args.command {
        Command::Today { json } => show_day(&store, &today_key(), json),
        Command::Show { date, json } => {
            parse_day_key(&date).with_context(|| format!("invalid date: {date}"))?;
            show_day(&store, &date, json)
        }
        Command::Week { json } => show_week(&store, json),
        Command::Reset { date } => {
            let key = date.unwrap_or_else(today_key);
            parse_day_key(&key).with_context(|| format!("invalid date: {key}"))?;
            store
                .reset(&key)
                .with_context(|| format!("failed to reset {key}"))?;
            println!("Reset {key}");
            Ok(())
        }
        Command::Run { follow } => {
            let runtime =
                tokio::runtime::Runtime::new().context("failed to start async runtime")?;
            let result = runtime.block_on(host::run(store, &config, follow));
            // A pending stdin read must not hold up exit
            runtime.shutdown_background();
            result
        }
    }
}

fn open_store(config: &Config) -> Result<Arc<DailyStore>> {
    let db_path = config.resolved_database_path();
    tracing::info!(path = %db_path.display(), "Opening database");

    let kv = SqliteStore::open(&db_path).context("failed to open database")?;
    kv.migrate().context("failed to run database migrations")?;

    Ok(Arc::new(DailyStore::new(Arc::new(kv))))
}

fn show_day(store: &DailyStore, key: &str, json: bool) -> Result<()> {
    let record = store
        .get_or_init(key)
        .with_context(|| format!("failed to read {key}"))?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&record).context("failed to serialize record")?
        );
        return Ok(());
    }

    print_record(&record);
    Ok(())
}

fn print_record(record: &DailyAggregate) {
    println!("{}", record.date);
    for site in TrackedSite::ALL {
        let usage = record.site(site);
        println!(
            "  {:<8} {:>8}  {} question(s)",
            site.display_name(),
            format_duration(usage.time),
            usage.questions
        );
    }
    println!(
        "  {:<8} {:>8}  {} question(s)",
        "Total",
        format_duration(record.total.time),
        record.total.questions
    );

    match most_used_site(record) {
        Some(site) => println!("Most used: {}", site.display_name()),
        None => println!("Most used: -"),
    }
}

fn show_week(store: &DailyStore, json: bool) -> Result<()> {
    let today = chrono::Local::now().date_naive();
    let week = week_summary(store, today).context("failed to read week")?;

    if json {
        let days: Vec<_> = week
            .iter()
            .map(|day| {
                serde_json::json!({
                    "date": day.key,
                    "weekday": day.weekday.to_string(),
                    "time": day.total.time,
                    "questions": day.total.questions,
                    "is_future": day.is_future,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&days).context("failed to serialize week")?
        );
        return Ok(());
    }

    for day in &week {
        if day.is_future {
            println!("{} {}        -", day.weekday, day.key);
        } else {
            println!(
                "{} {} {:>8}  {} question(s)",
                day.weekday,
                day.key,
                format_duration(day.total.time),
                day.total.questions
            );
        }
    }
    Ok(())
}

// ==========================================
// Cadet Roster - Command line entry
// ==========================================
// Thin shell over AppState: every subcommand maps onto one API call
// and prints its result as JSON.
// ==========================================

use anyhow::Context;
use cadet_roster::app::{get_default_db_path, AppState};
use cadet_roster::domain::{ExamScores, ImportArtifact, ImportRequest, PersonKind};
use cadet_roster::logging;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "cadet-roster")]
#[command(about = "Cadet roster, attendance reconciliation and grade composition")]
#[command(version)]
struct Cli {
    /// SQLite database file (default: user data directory)
    #[arg(long, env = "CADET_ROSTER_DB_PATH")]
    db: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a file or share link
    Import {
        #[command(subcommand)]
        kind: ImportCommand,
    },

    /// Training-day administration
    Day {
        #[command(subcommand)]
        action: DayCommand,
    },

    /// List a registry
    Roster {
        #[arg(long, default_value = "cadet")]
        registry: PersonKind,
    },

    /// Recompute and show a cadet's grade
    Grade { cadet_id: String },

    /// Replace a cadet's exam scores
    Scores {
        cadet_id: String,
        #[arg(long)]
        prelim: f64,
        #[arg(long)]
        midterm: f64,
        #[arg(long = "final")]
        final_exam: f64,
    },

    /// Recent import batches
    Batches {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Read or override settings
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ImportCommand {
    /// Create or update registry entries
    Roster {
        /// Local path or http(s) share link
        source: String,
        #[arg(long, default_value = "cadet")]
        registry: PersonKind,
    },
    /// Mark attendance for one training day
    Attendance {
        source: String,
        #[arg(long)]
        day: String,
        #[arg(long, default_value = "cadet")]
        registry: PersonKind,
        /// Rows without a status count as present
        #[arg(long)]
        assume_present: Option<bool>,
    },
    /// Append merit/demerit lines
    Ledger { source: String },
}

#[derive(Subcommand)]
enum DayCommand {
    Add {
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
    },
    List,
    /// Delete a day and its attendance; affected cadets are regraded
    Delete { day_id: String },
}

#[derive(Subcommand)]
enum ConfigCommand {
    List,
    Set { key: String, value: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.json_logs {
        logging::init_json();
    } else {
        logging::init();
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let db_path = cli.db.unwrap_or_else(get_default_db_path);
    tracing::info!(version = cadet_roster::VERSION, db_path = %db_path, "starting");
    let state = AppState::new(db_path).await.map_err(anyhow::Error::msg)?;

    match cli.command {
        Commands::Import { kind } => {
            let (source, request) = match kind {
                ImportCommand::Roster { source, registry } => {
                    (source, ImportRequest::roster(registry))
                }
                ImportCommand::Attendance {
                    source,
                    day,
                    registry,
                    assume_present,
                } => {
                    let mut request = ImportRequest::attendance(registry, &day);
                    request.assume_present = assume_present;
                    (source, request)
                }
                ImportCommand::Ledger { source } => (source, ImportRequest::ledger()),
            };
            let result = if is_link(&source) {
                state
                    .import_api
                    .run_import(ImportArtifact::Url(source), request)
                    .await?
            } else {
                state
                    .import_api
                    .run_import_file(&PathBuf::from(&source), request)
                    .await?
            };
            for line in result.error_report() {
                eprintln!("{}", line);
            }
            print_json(&result)
        }
        Commands::Day { action } => match action {
            DayCommand::Add {
                date,
                title,
                description,
            } => {
                let day = state
                    .roster_api
                    .create_training_day(date, &title, description.as_deref())
                    .await?;
                print_json(&day)
            }
            DayCommand::List => print_json(&state.roster_api.list_training_days().await?),
            DayCommand::Delete { day_id } => {
                print_json(&state.roster_api.delete_training_day(&day_id).await?)
            }
        },
        Commands::Roster { registry } => print_json(&state.roster_api.list_roster(registry).await?),
        Commands::Grade { cadet_id } => {
            state.grade_api.compute_grade(&cadet_id).await?;
            print_json(&state.grade_api.get_grade_report(&cadet_id).await?)
        }
        Commands::Scores {
            cadet_id,
            prelim,
            midterm,
            final_exam,
        } => {
            let snapshot = state
                .grade_api
                .update_exam_scores(&cadet_id, ExamScores::new(prelim, midterm, final_exam))
                .await?;
            print_json(&snapshot)
        }
        Commands::Batches { limit } => print_json(&state.import_api.recent_batches(limit).await?),
        Commands::Config { action } => match action {
            ConfigCommand::List => print_json(&state.config_api.list_configs()?),
            ConfigCommand::Set { key, value } => {
                state.config_api.update_config(&key, &value).await?;
                println!("{} updated", key);
                Ok(())
            }
        },
    }
}

fn is_link(source: &str) -> bool {
    let lower = source.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{}", text);
    Ok(())
}

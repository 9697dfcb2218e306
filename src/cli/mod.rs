//! Command-line interface for daybook
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;

use crate::config::{default_data_dir, Config, DATA_DIR_ENV};
use crate::database::Database;
use crate::error::Result;
use crate::output::OutputOptions;

mod day;
mod init;
mod journal;
mod task;
mod transfer;

/// daybook - day-by-day task journal
///
/// Records what you worked on each day, the status each task had on that
/// day, and keeps every task's current status in step.
#[derive(Parser, Debug)]
#[command(name = "daybook")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding the persisted registers and daybook.toml
    #[arg(long, global = true, env = DATA_DIR_ENV)]
    pub data_dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the data directory and a default daybook.toml
    Init,

    /// Day notes and the tasks worked on each day
    #[command(subcommand)]
    Day(DayCommands),

    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Record a task's status, note or summary on a day
    Log {
        /// Day (YYYY-MM-DD)
        day: String,

        /// Task id
        task_id: u32,

        /// Status on that day
        #[arg(long)]
        status: Option<String>,

        /// Note for the task on that day
        #[arg(long)]
        note: Option<String>,

        /// End-of-day summary
        #[arg(long, conflicts_with = "clear_summary")]
        summary: Option<String>,

        /// Remove the end-of-day summary
        #[arg(long)]
        clear_summary: bool,
    },

    /// Remove a task from a day, or every task from a day
    Unlog {
        /// Day (YYYY-MM-DD)
        day: String,

        /// Task id (all tasks of the day when omitted)
        task_id: Option<u32>,
    },

    /// Export every register as one JSON document
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace everything with the contents of an export file
    Import {
        /// Export file to read
        file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum DayCommands {
    /// Show a day with its tasks
    Show {
        /// Day (YYYY-MM-DD)
        day: String,
    },

    /// Create or update a day
    Set {
        /// Day (YYYY-MM-DD)
        day: String,

        /// Day note
        #[arg(long)]
        note: Option<String>,

        /// Comma-separated task ids worked on that day
        #[arg(long, value_delimiter = ',')]
        tasks: Option<Vec<u32>>,
    },

    /// List recorded days
    List,

    /// Delete a day and its day tasks
    Rm {
        /// Day (YYYY-MM-DD)
        day: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task
    Add {
        /// Task name
        name: String,

        /// Task note
        #[arg(long)]
        note: Option<String>,

        /// Initial status
        #[arg(long)]
        status: Option<String>,
    },

    /// Update a task
    Set {
        /// Task id
        id: u32,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        note: Option<String>,

        #[arg(long)]
        status: Option<String>,

        /// Manual sort position (lower sorts first)
        #[arg(long, allow_hyphen_values = true)]
        sort_index: Option<i64>,
    },

    /// Show a task with its day-by-day history
    Show {
        /// Task id
        id: u32,
    },

    /// List unfinished tasks
    List {
        /// List finished tasks instead
        #[arg(long, conflicts_with = "all")]
        finished: bool,

        /// List every task
        #[arg(long)]
        all: bool,
    },

    /// Delete a task everywhere
    Rm {
        /// Task id
        id: u32,
    },

    /// Show a task's status, globally or as of a day
    Status {
        /// Task id
        id: u32,

        /// Resolve the status as of this day
        #[arg(long)]
        day: Option<String>,
    },
}

/// `--data-dir` / `DAYBOOK_DATA_DIR`, else the platform data directory.
pub(crate) fn resolve_data_dir(data_dir: Option<PathBuf>) -> Result<PathBuf> {
    match data_dir {
        Some(dir) => Ok(dir),
        None => default_data_dir(),
    }
}

/// Loaded database plus the settings it was opened with.
pub(crate) struct Session {
    pub config: Config,
    pub db: Database,
}

impl Session {
    pub(crate) async fn open(data_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = resolve_data_dir(data_dir)?;
        debug!(dir = %data_dir.display(), "opening session");
        let config = Config::load_from_dir(&data_dir)?;
        let db = Database::open(&data_dir, &config).await?;
        Ok(Self { config, db })
    }

    pub(crate) async fn save(&self) -> Result<()> {
        self.db.save_all().await
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.dispatch())
    }

    async fn dispatch(self) -> Result<()> {
        let output = OutputOptions {
            json: self.json,
            quiet: self.quiet,
        };
        let data_dir = self.data_dir;

        match self.command {
            Commands::Init => init::run(init::InitOptions { data_dir, output }).await,
            Commands::Day(cmd) => match cmd {
                DayCommands::Show { day } => {
                    day::run_show(day::ShowOptions { day, data_dir, output }).await
                }
                DayCommands::Set { day, note, tasks } => {
                    day::run_set(day::SetOptions {
                        day,
                        note,
                        tasks,
                        data_dir,
                        output,
                    })
                    .await
                }
                DayCommands::List => day::run_list(day::ListOptions { data_dir, output }).await,
                DayCommands::Rm { day } => {
                    day::run_rm(day::RmOptions { day, data_dir, output }).await
                }
            },
            Commands::Task(cmd) => match cmd {
                TaskCommands::Add { name, note, status } => {
                    task::run_add(task::AddOptions {
                        name,
                        note,
                        status,
                        data_dir,
                        output,
                    })
                    .await
                }
                TaskCommands::Set {
                    id,
                    name,
                    note,
                    status,
                    sort_index,
                } => {
                    task::run_set(task::SetOptions {
                        id,
                        name,
                        note,
                        status,
                        sort_index,
                        data_dir,
                        output,
                    })
                    .await
                }
                TaskCommands::Show { id } => {
                    task::run_show(task::ShowOptions { id, data_dir, output }).await
                }
                TaskCommands::List { finished, all } => {
                    task::run_list(task::ListOptions {
                        finished,
                        all,
                        data_dir,
                        output,
                    })
                    .await
                }
                TaskCommands::Rm { id } => {
                    task::run_rm(task::RmOptions { id, data_dir, output }).await
                }
                TaskCommands::Status { id, day } => {
                    task::run_status(task::StatusOptions {
                        id,
                        day,
                        data_dir,
                        output,
                    })
                    .await
                }
            },
            Commands::Log {
                day,
                task_id,
                status,
                note,
                summary,
                clear_summary,
            } => {
                journal::run_log(journal::LogOptions {
                    day,
                    task_id,
                    status,
                    note,
                    summary,
                    clear_summary,
                    data_dir,
                    output,
                })
                .await
            }
            Commands::Unlog { day, task_id } => {
                journal::run_unlog(journal::UnlogOptions {
                    day,
                    task_id,
                    data_dir,
                    output,
                })
                .await
            }
            Commands::Export { output: file } => {
                transfer::run_export(transfer::ExportOptions {
                    file,
                    data_dir,
                    output,
                })
                .await
            }
            Commands::Import { file } => {
                transfer::run_import(transfer::ImportOptions {
                    file,
                    data_dir,
                    output,
                })
                .await
            }
        }
    }
}

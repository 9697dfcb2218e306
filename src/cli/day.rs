//! daybook day command implementation
//!
//! Provides day show/set/list/rm.

use std::path::PathBuf;

use serde::Serialize;

use super::Session;
use crate::error::{Error, Result};
use crate::model::{validate_day_name, Day, DayUpdate, TaskId, TaskStatus};
use crate::output::{emit_success, HumanOutput, OutputOptions};

/// Options for `daybook day show`
pub struct ShowOptions {
    pub day: String,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

/// Options for `daybook day set`
pub struct SetOptions {
    pub day: String,
    pub note: Option<String>,
    pub tasks: Option<Vec<TaskId>>,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

/// Options for `daybook day list`
pub struct ListOptions {
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

/// Options for `daybook day rm`
pub struct RmOptions {
    pub day: String,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

#[derive(Serialize)]
struct DayEntry {
    task_id: TaskId,
    name: String,
    status: TaskStatus,
    note: String,
    summary: Option<String>,
}

#[derive(Serialize)]
struct DayReport {
    name: String,
    note: String,
    tasks: Vec<DayEntry>,
}

#[derive(Serialize)]
struct DaySummary {
    name: String,
    note: String,
    task_count: usize,
}

#[derive(Serialize)]
struct RmReport {
    day: String,
    removed: bool,
}

fn day_report(session: &Session, day: &Day) -> DayReport {
    let tasks = session
        .db
        .day_tasks_for_day(&day.name)
        .into_iter()
        .map(|day_task| DayEntry {
            task_id: day_task.task_id,
            name: session
                .db
                .get_task_info(day_task.task_id)
                .map(|task| task.name.clone())
                .unwrap_or_default(),
            status: day_task.status,
            note: day_task.note.clone(),
            summary: day_task.summary.clone(),
        })
        .collect();
    DayReport {
        name: day.name.clone(),
        note: day.note.clone(),
        tasks,
    }
}

fn day_human(report: &DayReport) -> HumanOutput {
    let mut human = HumanOutput::new(format!("Day {}", report.name));
    if !report.note.is_empty() {
        human.push_summary("note", report.note.clone());
    }
    human.push_summary("tasks", report.tasks.len().to_string());
    for entry in &report.tasks {
        let mut line = format!("#{} {} [{}]", entry.task_id, entry.name, entry.status);
        if !entry.note.is_empty() {
            line.push_str(&format!(" {}", entry.note));
        }
        if let Some(summary) = &entry.summary {
            line.push_str(&format!(" (summary: {summary})"));
        }
        human.push_detail(line);
    }
    human
}

pub async fn run_show(options: ShowOptions) -> Result<()> {
    validate_day_name(&options.day)?;
    let session = Session::open(options.data_dir).await?;
    let day = session
        .db
        .get_day_info(&options.day)
        .ok_or_else(|| Error::DayNotFound(options.day.clone()))?;

    let report = day_report(&session, &day);
    emit_success(options.output, "day show", &report, Some(&day_human(&report)))
}

pub async fn run_set(options: SetOptions) -> Result<()> {
    let mut session = Session::open(options.data_dir).await?;
    let day = session.db.set_day_info(
        &options.day,
        DayUpdate {
            note: options.note,
            tasks: options.tasks,
        },
    )?;
    session.save().await?;

    let report = day_report(&session, &day);
    emit_success(options.output, "day set", &report, Some(&day_human(&report)))
}

pub async fn run_list(options: ListOptions) -> Result<()> {
    let session = Session::open(options.data_dir).await?;
    let days: Vec<DaySummary> = session
        .db
        .get_all_day_info()
        .iter()
        .map(|day| DaySummary {
            name: day.name.clone(),
            note: day.note.clone(),
            task_count: day.tasks.len(),
        })
        .collect();

    let mut human = HumanOutput::new(format!("{} day(s)", days.len()));
    for day in &days {
        let mut line = format!("{} ({} task(s))", day.name, day.task_count);
        if !day.note.is_empty() {
            line.push_str(&format!(" {}", day.note));
        }
        human.push_detail(line);
    }

    emit_success(options.output, "day list", &days, Some(&human))
}

pub async fn run_rm(options: RmOptions) -> Result<()> {
    validate_day_name(&options.day)?;
    let mut session = Session::open(options.data_dir).await?;
    let removed = session.db.delete_day(&options.day);
    if removed {
        session.save().await?;
    }

    let report = RmReport {
        day: options.day.clone(),
        removed,
    };
    let mut human = HumanOutput::new(format!("day rm: {}", options.day));
    if !removed {
        human.push_warning("nothing recorded for that day");
    }
    emit_success(options.output, "day rm", &report, Some(&human))
}

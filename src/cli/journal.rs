//! daybook log/unlog command implementation
//!
//! `log` writes one day task; `unlog` removes one or all of a day's tasks.

use std::path::PathBuf;

use serde::Serialize;

use super::Session;
use crate::database::DayTaskFilter;
use crate::error::Result;
use crate::model::{validate_day_name, DayTaskId, DayTaskUpdate, TaskId, TaskStatus};
use crate::output::{emit_success, HumanOutput, OutputOptions};

/// Options for `daybook log`
pub struct LogOptions {
    pub day: String,
    pub task_id: TaskId,
    pub status: Option<String>,
    pub note: Option<String>,
    pub summary: Option<String>,
    pub clear_summary: bool,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

/// Options for `daybook unlog`
pub struct UnlogOptions {
    pub day: String,
    pub task_id: Option<TaskId>,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

#[derive(Serialize)]
struct LogReport {
    day: String,
    task_id: TaskId,
    status: TaskStatus,
    note: String,
    summary: Option<String>,
    task_status: Option<TaskStatus>,
}

#[derive(Serialize)]
struct UnlogReport {
    day: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_id: Option<TaskId>,
    removed: usize,
}

pub async fn run_log(options: LogOptions) -> Result<()> {
    let status: Option<TaskStatus> = options.status.map(|raw| raw.parse()).transpose()?;
    let summary = if options.clear_summary {
        Some(None)
    } else {
        options.summary.map(Some)
    };

    let mut session = Session::open(options.data_dir).await?;
    let id = DayTaskId::new(options.day, options.task_id);
    let day_task = session.db.set_day_task_info(
        &id,
        DayTaskUpdate {
            status,
            note: options.note,
            summary,
        },
    )?;
    session.save().await?;

    let task_status = session.db.get_task_status(id.task_id);
    let report = LogReport {
        day: day_task.day_name.clone(),
        task_id: day_task.task_id,
        status: day_task.status,
        note: day_task.note.clone(),
        summary: day_task.summary.clone(),
        task_status,
    };

    let mut human = HumanOutput::new(format!("log {}: #{}", report.day, report.task_id));
    human.push_summary("status", report.status.to_string());
    if !report.note.is_empty() {
        human.push_summary("note", report.note.clone());
    }
    if let Some(summary) = &report.summary {
        human.push_summary("summary", summary.clone());
    }
    if let Some(task_status) = task_status.filter(|current| *current != report.status) {
        human.push_warning(format!(
            "task stays {task_status}: a later day records it"
        ));
    }
    emit_success(options.output, "log", &report, Some(&human))
}

pub async fn run_unlog(options: UnlogOptions) -> Result<()> {
    validate_day_name(&options.day)?;
    let mut session = Session::open(options.data_dir).await?;
    let filter = match options.task_id {
        Some(task_id) => DayTaskFilter::Exact(DayTaskId::new(options.day.clone(), task_id)),
        None => DayTaskFilter::Day(options.day.clone()),
    };
    let removed = session.db.delete_day_task(filter);
    if removed > 0 {
        session.save().await?;
    }

    let mut human = HumanOutput::new(format!("unlog {}", options.day));
    human.push_summary("removed", removed.to_string());
    let report = UnlogReport {
        day: options.day,
        task_id: options.task_id,
        removed,
    };
    emit_success(options.output, "unlog", &report, Some(&human))
}

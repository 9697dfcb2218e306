//! daybook task command implementation
//!
//! Provides task add/set/show/list/rm/status.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use super::Session;
use crate::error::{Error, Result};
use crate::model::{validate_day_name, DayTask, Task, TaskId, TaskStatus, TaskUpdate};
use crate::output::{emit_success, HumanOutput, OutputOptions};

/// Options for `daybook task add`
pub struct AddOptions {
    pub name: String,
    pub note: Option<String>,
    pub status: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

/// Options for `daybook task set`
pub struct SetOptions {
    pub id: TaskId,
    pub name: Option<String>,
    pub note: Option<String>,
    pub status: Option<String>,
    pub sort_index: Option<i64>,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

/// Options for `daybook task show`
pub struct ShowOptions {
    pub id: TaskId,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

/// Options for `daybook task list`
pub struct ListOptions {
    pub finished: bool,
    pub all: bool,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

/// Options for `daybook task rm`
pub struct RmOptions {
    pub id: TaskId,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

/// Options for `daybook task status`
pub struct StatusOptions {
    pub id: TaskId,
    pub day: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

#[derive(Serialize)]
struct ShowReport<'a> {
    task: &'a Task,
    history: Vec<&'a DayTask>,
}

#[derive(Serialize)]
struct RmReport {
    id: TaskId,
    removed: bool,
}

#[derive(Serialize)]
struct StatusReport {
    id: TaskId,
    #[serde(skip_serializing_if = "Option::is_none")]
    day: Option<String>,
    status: Option<TaskStatus>,
}

fn parse_status(raw: Option<String>) -> Result<Option<TaskStatus>> {
    raw.map(|raw| raw.parse()).transpose()
}

fn task_line(task: &Task) -> String {
    format!("#{} {} [{}]", task.id, task.name, task.status)
}

fn task_human(header: String, task: &Task) -> HumanOutput {
    let mut human = HumanOutput::new(header);
    human.push_summary("name", task.name.clone());
    human.push_summary("status", task.status.to_string());
    if !task.note.is_empty() {
        human.push_summary("note", task.note.clone());
    }
    human
}

fn require_task(session: &Session, id: TaskId) -> Result<Arc<Task>> {
    session.db.get_task_info(id).ok_or(Error::TaskNotFound(id))
}

pub async fn run_add(options: AddOptions) -> Result<()> {
    let status = parse_status(options.status)?;
    let mut session = Session::open(options.data_dir).await?;
    let task = session.db.add_task(TaskUpdate {
        name: Some(options.name),
        note: options.note,
        status,
        sort_index: None,
    });
    session.save().await?;

    let human = task_human(format!("task add: #{}", task.id), &task);
    emit_success(options.output, "task add", task.as_ref(), Some(&human))
}

pub async fn run_set(options: SetOptions) -> Result<()> {
    let status = parse_status(options.status)?;
    let mut session = Session::open(options.data_dir).await?;
    require_task(&session, options.id)?;

    let task = session.db.set_task_info(
        options.id,
        TaskUpdate {
            name: options.name,
            note: options.note,
            status,
            sort_index: options.sort_index,
        },
    )?;
    session.save().await?;

    let human = task_human(format!("task set: #{}", task.id), &task);
    emit_success(options.output, "task set", task.as_ref(), Some(&human))
}

pub async fn run_show(options: ShowOptions) -> Result<()> {
    let session = Session::open(options.data_dir).await?;
    let task = require_task(&session, options.id)?;
    let history = session.db.day_tasks_for_task(options.id);

    let report = ShowReport {
        task: &task,
        history: history.iter().map(Arc::as_ref).collect(),
    };
    let mut human = task_human(format!("Task #{}", task.id), &task);
    human.push_summary("sort index", task.sort_index.to_string());
    for day_task in &history {
        let mut line = format!("{} [{}]", day_task.day_name, day_task.status);
        if !day_task.note.is_empty() {
            line.push_str(&format!(" {}", day_task.note));
        }
        human.push_detail(line);
    }
    emit_success(options.output, "task show", &report, Some(&human))
}

pub async fn run_list(options: ListOptions) -> Result<()> {
    let session = Session::open(options.data_dir).await?;
    let (label, tasks) = if options.all {
        let mut tasks = session.db.unfinished_tasks();
        tasks.extend(session.db.finished_tasks());
        ("task(s)", tasks)
    } else if options.finished {
        ("finished task(s)", session.db.finished_tasks())
    } else {
        ("open task(s)", session.db.unfinished_tasks())
    };

    let report: Vec<&Task> = tasks.iter().map(Arc::as_ref).collect();
    let mut human = HumanOutput::new(format!("{} {label}", tasks.len()));
    for task in &tasks {
        human.push_detail(task_line(task));
    }
    emit_success(options.output, "task list", &report, Some(&human))
}

pub async fn run_rm(options: RmOptions) -> Result<()> {
    let mut session = Session::open(options.data_dir).await?;
    let removed = session.db.delete_task(options.id);
    if removed {
        session.save().await?;
    }

    let report = RmReport {
        id: options.id,
        removed,
    };
    let mut human = HumanOutput::new(format!("task rm: #{}", options.id));
    if !removed {
        human.push_warning("no such task");
    }
    emit_success(options.output, "task rm", &report, Some(&human))
}

pub async fn run_status(options: StatusOptions) -> Result<()> {
    if let Some(day) = &options.day {
        validate_day_name(day)?;
    }
    let session = Session::open(options.data_dir).await?;
    require_task(&session, options.id)?;

    let status = match &options.day {
        Some(day) => session.db.get_task_status_for_day(options.id, day),
        None => session.db.get_task_status(options.id),
    };

    let header = match (&options.day, status) {
        (Some(day), Some(status)) => format!("#{} on {day}: {status}", options.id),
        (Some(day), None) => format!("#{} had not started on {day}", options.id),
        (None, Some(status)) => format!("#{}: {status}", options.id),
        (None, None) => format!("#{}: unknown", options.id),
    };
    let report = StatusReport {
        id: options.id,
        day: options.day,
        status,
    };
    emit_success(
        options.output,
        "task status",
        &report,
        Some(&HumanOutput::new(header)),
    )
}

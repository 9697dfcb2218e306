//! Entity types for days, tasks, day tasks and templates.
//!
//! Persisted field names are camelCase (`sortIndex`, `dayName`, `taskId`) so
//! registers written by older releases keep loading.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub type TaskId = u32;
pub type TemplateId = u32;

/// Canonical day-name format.
pub const DAY_NAME_FORMAT: &str = "%Y-%m-%d";

/// Status of a task, globally or on a given day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    InReview,
    ReadyToTest,
    ApprovedToDeploy,
    Completed,
    WillNotDo,
    Investigating,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 8] = [
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::InReview,
        TaskStatus::ReadyToTest,
        TaskStatus::ApprovedToDeploy,
        TaskStatus::Completed,
        TaskStatus::WillNotDo,
        TaskStatus::Investigating,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::InReview => "in-review",
            TaskStatus::ReadyToTest => "ready-to-test",
            TaskStatus::ApprovedToDeploy => "approved-to-deploy",
            TaskStatus::Completed => "completed",
            TaskStatus::WillNotDo => "will-not-do",
            TaskStatus::Investigating => "investigating",
        }
    }

    /// Finished tasks are listed apart from the unfinished ones.
    pub fn is_finished(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::WillNotDo)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                let allowed: Vec<&str> = TaskStatus::ALL.iter().map(TaskStatus::as_str).collect();
                Error::InvalidArgument(format!(
                    "unknown status '{trimmed}' (expected one of: {})",
                    allowed.join(", ")
                ))
            })
    }
}

/// A calendar day with a note and the ordered list of tasks worked on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Day {
    pub name: String,
    pub note: String,
    pub tasks: Vec<TaskId>,
}

impl Day {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            note: String::new(),
            tasks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub note: String,
    pub status: TaskStatus,
    #[serde(rename = "sortIndex")]
    pub sort_index: i64,
}

impl Task {
    /// Defaults for a new task; older tasks sort first among un-reordered ones.
    pub fn new(id: TaskId) -> Self {
        Self {
            id,
            name: String::new(),
            note: String::new(),
            status: TaskStatus::default(),
            sort_index: default_sort_index(id),
        }
    }
}

pub fn default_sort_index(id: TaskId) -> i64 {
    -i64::from(id)
}

/// What was true about a task on a given day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayTask {
    pub day_name: String,
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub note: String,
    pub summary: Option<String>,
}

impl DayTask {
    pub fn new(id: &DayTaskId) -> Self {
        Self {
            day_name: id.day_name.clone(),
            task_id: id.task_id,
            status: TaskStatus::default(),
            note: String::new(),
            summary: None,
        }
    }

    pub fn id(&self) -> DayTaskId {
        DayTaskId::new(self.day_name.clone(), self.task_id)
    }
}

/// Composite identity of a [`DayTask`], stored as `"{day_name}_{task_id}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayTaskId {
    pub day_name: String,
    pub task_id: TaskId,
}

impl DayTaskId {
    pub fn new(day_name: impl Into<String>, task_id: TaskId) -> Self {
        Self {
            day_name: day_name.into(),
            task_id,
        }
    }

    pub fn encode(&self) -> String {
        format!("{}_{}", self.day_name, self.task_id)
    }

    /// Split on the last `_`; the day part is not validated here.
    pub fn decode(key: &str) -> Option<Self> {
        let (day_name, task_id) = key.rsplit_once('_')?;
        let task_id = task_id.parse().ok()?;
        Some(Self::new(day_name, task_id))
    }
}

impl fmt::Display for DayTaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Reusable note snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    pub note: String,
}

impl Template {
    pub fn new(id: TemplateId) -> Self {
        Self {
            id,
            name: String::new(),
            note: String::new(),
        }
    }
}

// =============================================================================
// Partial updates
// =============================================================================
//
// Identity fields are not part of any update, so a merge can never move an
// entity to another key. Unset fields keep the base value.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayUpdate {
    pub note: Option<String>,
    pub tasks: Option<Vec<TaskId>>,
}

impl DayUpdate {
    pub fn merge_into(self, mut day: Day) -> Day {
        if let Some(note) = self.note {
            day.note = note;
        }
        if let Some(tasks) = self.tasks {
            day.tasks = tasks;
        }
        day
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub name: Option<String>,
    pub note: Option<String>,
    pub status: Option<TaskStatus>,
    pub sort_index: Option<i64>,
}

impl TaskUpdate {
    pub fn merge_into(self, mut task: Task) -> Task {
        if let Some(name) = self.name {
            task.name = name;
        }
        if let Some(note) = self.note {
            task.note = note;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(sort_index) = self.sort_index {
            task.sort_index = sort_index;
        }
        task
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayTaskUpdate {
    pub status: Option<TaskStatus>,
    pub note: Option<String>,
    /// `Some(None)` clears the summary.
    pub summary: Option<Option<String>>,
}

impl DayTaskUpdate {
    pub fn merge_into(self, mut day_task: DayTask) -> DayTask {
        if let Some(status) = self.status {
            day_task.status = status;
        }
        if let Some(note) = self.note {
            day_task.note = note;
        }
        if let Some(summary) = self.summary {
            day_task.summary = summary;
        }
        day_task
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateUpdate {
    pub name: Option<String>,
    pub note: Option<String>,
}

impl TemplateUpdate {
    pub fn merge_into(self, mut template: Template) -> Template {
        if let Some(name) = self.name {
            template.name = name;
        }
        if let Some(note) = self.note {
            template.note = note;
        }
        template
    }
}

// =============================================================================
// Day names
// =============================================================================

/// Whether `name` is a real calendar date in canonical `YYYY-MM-DD` form.
pub fn is_day_name(name: &str) -> bool {
    if name.len() != 10 {
        return false;
    }
    NaiveDate::parse_from_str(name, DAY_NAME_FORMAT)
        .map(|date| date.format(DAY_NAME_FORMAT).to_string() == name)
        .unwrap_or(false)
}

pub fn validate_day_name(name: &str) -> Result<()> {
    if is_day_name(name) {
        Ok(())
    } else {
        Err(Error::InvalidDayName(name.to_string()))
    }
}

pub fn validate_task_id(id: TaskId) -> Result<()> {
    if id == 0 {
        return Err(Error::InvalidArgument(
            "task id must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

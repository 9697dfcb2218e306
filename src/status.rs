//! Effective task status, globally and as of a given day.
//!
//! Day names compare chronologically as plain strings because the format is
//! fixed-width `YYYY-MM-DD`.

use std::sync::Arc;

use crate::database::Database;
use crate::model::{DayTask, Task, TaskId, TaskStatus};
use crate::store::Store;

/// Every day task recorded for `task_id`, oldest day first.
pub fn task_history(day_tasks: &Store<String, DayTask>, task_id: TaskId) -> Vec<Arc<DayTask>> {
    let mut history: Vec<Arc<DayTask>> = day_tasks
        .values()
        .into_iter()
        .filter(|day_task| day_task.task_id == task_id)
        .collect();
    history.sort_by(|a, b| a.day_name.cmp(&b.day_name));
    history
}

/// Whether `task_id` has a day task on a day strictly after `day_name`.
pub fn has_later_day_task(
    day_tasks: &Store<String, DayTask>,
    task_id: TaskId,
    day_name: &str,
) -> bool {
    day_tasks
        .values()
        .iter()
        .any(|day_task| day_task.task_id == task_id && day_task.day_name.as_str() > day_name)
}

/// Resolve the status of `task` on `day_name` from its sorted `history`.
///
/// `None` means the task did not exist yet on that day.
pub fn task_status_for_day(
    task: Option<&Task>,
    history: &[Arc<DayTask>],
    day_name: &str,
) -> Option<TaskStatus> {
    let task = task?;
    let Some(last) = history.last() else {
        return Some(task.status);
    };
    if let Some(exact) = history.iter().find(|day_task| day_task.day_name == day_name) {
        return Some(exact.status);
    }
    if day_name > last.day_name.as_str() {
        return Some(task.status);
    }
    history
        .iter()
        .rev()
        .find(|day_task| day_task.day_name.as_str() < day_name)
        .map(|day_task| day_task.status)
}

impl Database {
    pub fn get_task_status(&self, task_id: TaskId) -> Option<TaskStatus> {
        self.tasks.get(&task_id).map(|task| task.status)
    }

    pub fn get_task_status_for_day(&self, task_id: TaskId, day_name: &str) -> Option<TaskStatus> {
        let task = self.tasks.get(&task_id);
        let history = task_history(&self.day_tasks, task_id);
        task_status_for_day(task.as_deref(), &history, day_name)
    }
}

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use super::{write_if_changed, Database};
use crate::error::Result;
use crate::model::{
    validate_day_name, validate_task_id, Day, DayTask, DayTaskId, DayTaskUpdate, Task, TaskId,
};
use crate::status::has_later_day_task;

/// Which day tasks a delete applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayTaskFilter {
    Exact(DayTaskId),
    Day(String),
    Task(TaskId),
}

impl DayTaskFilter {
    pub fn matches(&self, day_task: &DayTask) -> bool {
        match self {
            DayTaskFilter::Exact(id) => {
                day_task.day_name == id.day_name && day_task.task_id == id.task_id
            }
            DayTaskFilter::Day(day_name) => day_task.day_name == *day_name,
            DayTaskFilter::Task(task_id) => day_task.task_id == *task_id,
        }
    }
}

impl From<DayTaskId> for DayTaskFilter {
    fn from(id: DayTaskId) -> Self {
        DayTaskFilter::Exact(id)
    }
}

impl Database {
    pub fn get_day_task_info(&self, id: &DayTaskId) -> Option<Arc<DayTask>> {
        self.day_tasks.get(&id.encode())
    }

    pub fn get_all_day_task_info(&self) -> Vec<Arc<DayTask>> {
        self.day_tasks.values()
    }

    /// Day tasks of one day, in the order the day lists its tasks.
    pub fn day_tasks_for_day(&self, day_name: &str) -> Vec<Arc<DayTask>> {
        let Some(day) = self.days.get(&day_name.to_string()) else {
            return Vec::new();
        };
        day.tasks
            .iter()
            .filter_map(|task_id| self.get_day_task_info(&DayTaskId::new(day_name, *task_id)))
            .collect()
    }

    /// Day tasks of one task, oldest day first.
    pub fn day_tasks_for_task(&self, task_id: TaskId) -> Vec<Arc<DayTask>> {
        crate::status::task_history(&self.day_tasks, task_id)
    }

    /// Merge `update` over the stored day task (or defaults) and keep the day
    /// and task in step with it.
    ///
    /// The day gains the task id if it is not listed yet. A missing task is
    /// created with this status; an existing one takes this status unless a
    /// later day already records the task.
    pub fn set_day_task_info(
        &mut self,
        id: &DayTaskId,
        update: DayTaskUpdate,
    ) -> Result<Arc<DayTask>> {
        validate_day_name(&id.day_name)?;
        validate_task_id(id.task_id)?;

        let key = id.encode();
        let base = self
            .day_tasks
            .get(&key)
            .map(|existing| (*existing).clone())
            .unwrap_or_else(|| DayTask::new(id));
        let day_task = write_if_changed(&mut self.day_tasks, key, update.merge_into(base));

        match self.days.get(&id.day_name) {
            None => {
                let mut day = Day::new(id.day_name.clone());
                day.tasks.push(id.task_id);
                self.days.set(id.day_name.clone(), day);
            }
            Some(day) if !day.tasks.contains(&id.task_id) => {
                let mut day = (*day).clone();
                day.tasks.push(id.task_id);
                self.days.set(id.day_name.clone(), day);
            }
            Some(_) => {}
        }

        match self.tasks.get(&id.task_id) {
            None => {
                let mut task = Task::new(id.task_id);
                task.status = day_task.status;
                self.observe_task_id(id.task_id);
                self.tasks.set(id.task_id, task);
            }
            Some(task) => {
                if !has_later_day_task(&self.day_tasks, id.task_id, &id.day_name) {
                    let mut task = (*task).clone();
                    task.status = day_task.status;
                    write_if_changed(&mut self.tasks, id.task_id, task);
                }
            }
        }

        Ok(day_task)
    }

    /// Delete every day task matching `filter` and drop the ids from their
    /// days, writing each affected day once. Returns how many were deleted.
    pub fn delete_day_task(&mut self, filter: impl Into<DayTaskFilter>) -> usize {
        let filter = filter.into();
        let matched: Vec<(String, Arc<DayTask>)> = match &filter {
            DayTaskFilter::Exact(id) => {
                let key = id.encode();
                self.day_tasks
                    .get(&key)
                    .map(|day_task| vec![(key, day_task)])
                    .unwrap_or_default()
            }
            _ => self
                .day_tasks
                .entries()
                .into_iter()
                .filter(|(_, day_task)| filter.matches(day_task))
                .collect(),
        };
        if matched.is_empty() {
            return 0;
        }

        let mut by_day: BTreeMap<String, Vec<TaskId>> = BTreeMap::new();
        for (_, day_task) in &matched {
            by_day
                .entry(day_task.day_name.clone())
                .or_default()
                .push(day_task.task_id);
        }
        let removed = self
            .day_tasks
            .delete_many(matched.into_iter().map(|(key, _)| key));

        let rewritten: Vec<(String, Arc<Day>)> = by_day
            .into_iter()
            .filter_map(|(day_name, dropped)| {
                let day = self.days.get(&day_name)?;
                if !day.tasks.iter().any(|id| dropped.contains(id)) {
                    return None;
                }
                let mut day = (*day).clone();
                day.tasks.retain(|id| !dropped.contains(id));
                Some((day_name, Arc::new(day)))
            })
            .collect();
        debug!(removed, days = rewritten.len(), "deleted day tasks");
        self.days.set_many(rewritten);

        removed
    }
}

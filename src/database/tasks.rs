use std::sync::Arc;

use tracing::debug;

use super::{write_if_changed, Database};
use crate::error::Result;
use crate::model::{validate_task_id, Day, Task, TaskId, TaskUpdate};

impl Database {
    pub fn get_task_info(&self, id: TaskId) -> Option<Arc<Task>> {
        self.tasks.get(&id)
    }

    pub fn get_all_task_info(&self) -> Vec<Arc<Task>> {
        self.tasks.values()
    }

    /// Create a task under the next unused id.
    pub fn add_task(&mut self, update: TaskUpdate) -> Arc<Task> {
        let id = self.next_task_id();
        let task = Arc::new(update.merge_into(Task::new(id)));
        self.tasks.set(id, Arc::clone(&task));
        debug!(task = id, "added task");
        task
    }

    /// Merge `update` over the stored task, or over defaults when `id` is new.
    pub fn set_task_info(&mut self, id: TaskId, update: TaskUpdate) -> Result<Arc<Task>> {
        validate_task_id(id)?;
        let base = self
            .tasks
            .get(&id)
            .map(|existing| (*existing).clone())
            .unwrap_or_else(|| Task::new(id));
        self.observe_task_id(id);
        Ok(write_if_changed(&mut self.tasks, id, update.merge_into(base)))
    }

    /// Remove a task, its day tasks and its id from every day. Days left with
    /// no tasks are kept. Returns whether anything was removed.
    pub fn delete_task(&mut self, id: TaskId) -> bool {
        let removed_task = self.tasks.delete(&id);

        let keys: Vec<String> = self
            .day_tasks
            .entries()
            .into_iter()
            .filter(|(_, day_task)| day_task.task_id == id)
            .map(|(key, _)| key)
            .collect();
        let removed_day_tasks = self.day_tasks.delete_many(keys);

        let rewritten: Vec<(String, Arc<Day>)> = self
            .days
            .values()
            .into_iter()
            .filter(|day| day.tasks.contains(&id))
            .map(|day| {
                let mut day = (*day).clone();
                day.tasks.retain(|task_id| *task_id != id);
                (day.name.clone(), Arc::new(day))
            })
            .collect();
        let rewritten_days = self.days.set_many(rewritten);

        let removed = removed_task || removed_day_tasks > 0 || rewritten_days > 0;
        if removed {
            debug!(
                task = id,
                day_tasks = removed_day_tasks,
                days = rewritten_days,
                "deleted task"
            );
        }
        removed
    }

    /// Tasks not yet completed or dropped, in manual sort order.
    pub fn unfinished_tasks(&self) -> Vec<Arc<Task>> {
        self.sorted_tasks(|task| !task.status.is_finished())
    }

    /// Completed and will-not-do tasks, in manual sort order.
    pub fn finished_tasks(&self) -> Vec<Arc<Task>> {
        self.sorted_tasks(|task| task.status.is_finished())
    }

    fn sorted_tasks(&self, keep: impl Fn(&Task) -> bool) -> Vec<Arc<Task>> {
        let mut tasks: Vec<Arc<Task>> = self
            .tasks
            .values()
            .into_iter()
            .filter(|task| keep(task))
            .collect();
        tasks.sort_by_key(|task| (task.sort_index, task.id));
        tasks
    }
}

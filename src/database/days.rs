use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use super::{write_if_changed, Database};
use crate::error::Result;
use crate::model::{validate_day_name, validate_task_id, Day, DayTask, DayTaskId, DayUpdate, Task};

impl Database {
    pub fn get_day_info(&self, name: &str) -> Option<Arc<Day>> {
        self.days.get(&name.to_string())
    }

    /// All days, oldest first.
    pub fn get_all_day_info(&self) -> Vec<Arc<Day>> {
        let mut days = self.days.values();
        days.sort_by(|a, b| a.name.cmp(&b.name));
        days
    }

    /// Merge `update` over the stored day (or a new one).
    ///
    /// Task ids newly listed get a day task seeded with the task's status as of
    /// this day; ids dropped from the list lose their day task. A listed id with
    /// no task yet gets a default task.
    pub fn set_day_info(&mut self, name: &str, update: DayUpdate) -> Result<Arc<Day>> {
        validate_day_name(name)?;
        if let Some(tasks) = &update.tasks {
            for id in tasks {
                validate_task_id(*id)?;
            }
        }

        let existing = self.days.get(&name.to_string());
        let previous: Vec<u32> = existing
            .as_ref()
            .map(|day| day.tasks.clone())
            .unwrap_or_default();
        let base = existing
            .as_deref()
            .cloned()
            .unwrap_or_else(|| Day::new(name));

        let mut merged = update.merge_into(base);
        let mut seen = HashSet::new();
        merged.tasks.retain(|id| seen.insert(*id));

        let day = write_if_changed(&mut self.days, name.to_string(), merged);

        let dropped: Vec<String> = previous
            .iter()
            .filter(|id| !day.tasks.contains(id))
            .map(|id| DayTaskId::new(name, *id).encode())
            .collect();
        if !dropped.is_empty() {
            debug!(day = name, count = dropped.len(), "dropping day tasks no longer listed");
            self.day_tasks.delete_many(dropped);
        }

        let mut created = Vec::new();
        let mut missing_tasks = Vec::new();
        for &task_id in &day.tasks {
            let id = DayTaskId::new(name, task_id);
            let key = id.encode();
            if self.day_tasks.contains_key(&key) {
                continue;
            }
            let mut day_task = DayTask::new(&id);
            if let Some(status) = self.get_task_status_for_day(task_id, name) {
                day_task.status = status;
            }
            if !self.tasks.contains_key(&task_id) {
                missing_tasks.push((task_id, Arc::new(Task::new(task_id))));
            }
            created.push((key, Arc::new(day_task)));
        }
        self.day_tasks.set_many(created);
        for (task_id, _) in &missing_tasks {
            self.observe_task_id(*task_id);
        }
        self.tasks.set_many(missing_tasks);

        Ok(day)
    }

    /// Remove a day and every day task recorded on it. Tasks are kept.
    /// Returns whether anything was removed.
    pub fn delete_day(&mut self, name: &str) -> bool {
        let removed_day = self.days.delete(&name.to_string());
        let keys: Vec<String> = self
            .day_tasks
            .entries()
            .into_iter()
            .filter(|(_, day_task)| day_task.day_name == name)
            .map(|(key, _)| key)
            .collect();
        let removed_day_tasks = self.day_tasks.delete_many(keys);

        if removed_day || removed_day_tasks > 0 {
            debug!(day = name, day_tasks = removed_day_tasks, "deleted day");
        }
        removed_day || removed_day_tasks > 0
    }
}

#[cfg(test)]
mod tests {
    use crate::database::test_support::assert_consistent;
    use crate::database::Database;
    use crate::error::Error;
    use crate::model::{DayTaskId, DayTaskUpdate, DayUpdate, TaskStatus, TaskUpdate};
    use crate::store::StoreEventKind;
    use std::sync::{Arc, Mutex};

    fn tasks(ids: &[u32]) -> DayUpdate {
        DayUpdate {
            tasks: Some(ids.to_vec()),
            ..DayUpdate::default()
        }
    }

    #[test]
    fn rejects_malformed_day_names() {
        let mut db = Database::in_memory();
        let err = db.set_day_info("2023/11/01", DayUpdate::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidDayName(_)));
        assert!(db.days().is_empty());
    }

    #[test]
    fn note_update_keeps_task_list() {
        let mut db = Database::in_memory();
        db.set_day_info("2023-11-01", tasks(&[1, 2])).unwrap();
        let day = db
            .set_day_info(
                "2023-11-01",
                DayUpdate {
                    note: Some("retro".to_string()),
                    ..DayUpdate::default()
                },
            )
            .unwrap();

        assert_eq!(day.tasks, vec![1, 2]);
        assert_eq!(day.note, "retro");
        assert_consistent(&db);
    }

    #[test]
    fn listed_tasks_get_day_tasks_seeded_from_history() {
        let mut db = Database::in_memory();
        db.set_day_task_info(
            &DayTaskId::new("2023-11-01", 1),
            DayTaskUpdate {
                status: Some(TaskStatus::InReview),
                ..DayTaskUpdate::default()
            },
        )
        .unwrap();

        db.set_day_info("2023-11-02", tasks(&[1, 5])).unwrap();

        let carried = db
            .get_day_task_info(&DayTaskId::new("2023-11-02", 1))
            .unwrap();
        assert_eq!(carried.status, TaskStatus::InReview);
        let fresh = db
            .get_day_task_info(&DayTaskId::new("2023-11-02", 5))
            .unwrap();
        assert_eq!(fresh.status, TaskStatus::Todo);
        assert!(db.get_task_info(5).is_some());
        assert_consistent(&db);
    }

    #[test]
    fn duplicate_ids_are_collapsed() {
        let mut db = Database::in_memory();
        let day = db.set_day_info("2023-11-01", tasks(&[3, 1, 3])).unwrap();
        assert_eq!(day.tasks, vec![3, 1]);
        assert_eq!(db.day_tasks().len(), 2);
    }

    #[test]
    fn unlisting_a_task_drops_its_day_task() {
        let mut db = Database::in_memory();
        db.set_day_info("2023-11-01", tasks(&[1, 2, 3])).unwrap();
        db.set_day_info("2023-11-01", tasks(&[3, 1])).unwrap();

        assert!(db
            .get_day_task_info(&DayTaskId::new("2023-11-01", 2))
            .is_none());
        assert!(db.get_task_info(2).is_some());
        assert_consistent(&db);
    }

    #[test]
    fn delete_day_cascades_to_day_tasks_only() {
        let mut db = Database::in_memory();
        db.set_day_info("2023-11-01", tasks(&[1, 2])).unwrap();
        db.set_day_info("2023-11-02", tasks(&[1])).unwrap();

        assert!(db.delete_day("2023-11-01"));

        assert!(db.get_day_info("2023-11-01").is_none());
        assert_eq!(db.day_tasks().len(), 1);
        assert!(db.get_task_info(1).is_some());
        assert!(db.get_task_info(2).is_some());
        assert_consistent(&db);
    }

    #[test]
    fn deleting_a_missing_day_is_silent() {
        let mut db = Database::in_memory();
        db.add_task(TaskUpdate::default());
        let events: Arc<Mutex<usize>> = Arc::default();
        let counter = Arc::clone(&events);
        let _sub = db.subscribe_days(
            |_| true,
            move |event| {
                assert_eq!(event.kind, StoreEventKind::Delete);
                *counter.lock().unwrap() += 1;
            },
        );

        assert!(!db.delete_day("2023-11-01"));
        assert!(!db.delete_day("not a day"));
        assert_eq!(*events.lock().unwrap(), 0);
    }

    #[test]
    fn days_are_listed_chronologically() {
        let mut db = Database::in_memory();
        db.set_day_info("2023-11-03", DayUpdate::default()).unwrap();
        db.set_day_info("2023-10-30", DayUpdate::default()).unwrap();
        let names: Vec<String> = db
            .get_all_day_info()
            .iter()
            .map(|day| day.name.clone())
            .collect();
        assert_eq!(names, vec!["2023-10-30", "2023-11-03"]);
    }
}

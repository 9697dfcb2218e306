//! Application root: one observable store per entity type.
//!
//! `Database` owns the stores and the persistence gateway. Every public write
//! goes through the entity operations in the submodules, which keep
//! Day ↔ DayTask ↔ Task cross-references consistent inside the same call:
//!
//! - `t ∈ day.tasks` iff a DayTask `(day.name, t)` exists
//! - deleting a day removes its day tasks, never the tasks
//! - deleting a task removes its day tasks and its id from every day
//!
//! Readers observe changes through the `subscribe_*` methods; the integrity
//! rules never run as listeners.

mod day_tasks;
mod days;
mod tasks;
mod templates;

pub use day_tasks::DayTaskFilter;

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::model::{Day, DayTask, Task, TaskId, Template, TemplateId};
use crate::persistence::{FileMedium, Gateway, MemoryMedium, RegisterSource, RegisterSpec};
use crate::schema;
use crate::store::{StoreEvent, Store, Subscription};

/// Storage keys of the persisted registers.
pub const DAYS_KEY: &str = "days";
pub const TASKS_KEY: &str = "tasks";
pub const DAY_TASKS_KEY: &str = "day-tasks";
pub const TEMPLATES_KEY: &str = "templates";
pub const IMAGES_KEY: &str = "images";

pub(crate) fn day_spec() -> RegisterSpec<String, Day> {
    RegisterSpec {
        storage_key: DAYS_KEY,
        parse_key: schema::day_key,
        chain: schema::day_chain(),
        key_of: Some(|day: &Day| day.name.clone()),
    }
}

pub(crate) fn task_spec() -> RegisterSpec<TaskId, Task> {
    RegisterSpec {
        storage_key: TASKS_KEY,
        parse_key: schema::id_key,
        chain: schema::task_chain(),
        key_of: Some(|task: &Task| task.id),
    }
}

pub(crate) fn day_task_spec() -> RegisterSpec<String, DayTask> {
    RegisterSpec {
        storage_key: DAY_TASKS_KEY,
        parse_key: schema::day_task_key,
        chain: schema::day_task_chain(),
        key_of: Some(|day_task: &DayTask| day_task.id().encode()),
    }
}

pub(crate) fn template_spec() -> RegisterSpec<TemplateId, Template> {
    RegisterSpec {
        storage_key: TEMPLATES_KEY,
        parse_key: schema::id_key,
        chain: schema::template_chain(),
        key_of: Some(|template: &Template| template.id),
    }
}

pub(crate) fn image_spec() -> RegisterSpec<String, String> {
    RegisterSpec {
        storage_key: IMAGES_KEY,
        parse_key: schema::image_key,
        chain: schema::image_chain(),
        key_of: None,
    }
}

#[derive(Debug)]
pub struct Database {
    pub(crate) days: Store<String, Day>,
    pub(crate) tasks: Store<TaskId, Task>,
    pub(crate) day_tasks: Store<String, DayTask>,
    pub(crate) templates: Store<TemplateId, Template>,
    pub(crate) images: Store<String, String>,
    pub(crate) gateway: Gateway,
    /// Highest task id ever handed out or seen; ids are never reused.
    last_task_id: TaskId,
    last_template_id: TemplateId,
}

impl Database {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            days: Store::new(),
            tasks: Store::new(),
            day_tasks: Store::new(),
            templates: Store::new(),
            images: Store::new(),
            gateway,
            last_task_id: 0,
            last_template_id: 0,
        }
    }

    /// Empty database backed by an in-process medium.
    pub fn in_memory() -> Self {
        Self::new(Gateway::new(Arc::new(MemoryMedium::new())))
    }

    /// Open the file-backed database in `data_dir` and load every register.
    pub async fn open(data_dir: &Path, config: &Config) -> Result<Self> {
        let medium = FileMedium::new(data_dir);
        let gateway = Gateway::new(Arc::new(medium)).with_pretty(config.storage.pretty);
        let mut db = Self::new(gateway);
        db.load_all().await?;
        info!(dir = %data_dir.display(), "opened database");
        Ok(db)
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    // =========================================================================
    // Read-only store access
    // =========================================================================

    pub fn days(&self) -> &Store<String, Day> {
        &self.days
    }

    pub fn tasks(&self) -> &Store<TaskId, Task> {
        &self.tasks
    }

    pub fn day_tasks(&self) -> &Store<String, DayTask> {
        &self.day_tasks
    }

    pub fn templates(&self) -> &Store<TemplateId, Template> {
        &self.templates
    }

    pub fn images(&self) -> &Store<String, String> {
        &self.images
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    pub fn subscribe_days<F, C>(&mut self, filter: F, callback: C) -> Subscription
    where
        F: Fn(&String) -> bool + Send + Sync + 'static,
        C: Fn(&StoreEvent<String, Day>) + Send + Sync + 'static,
    {
        self.days.subscribe(filter, callback)
    }

    pub fn subscribe_tasks<F, C>(&mut self, filter: F, callback: C) -> Subscription
    where
        F: Fn(&TaskId) -> bool + Send + Sync + 'static,
        C: Fn(&StoreEvent<TaskId, Task>) + Send + Sync + 'static,
    {
        self.tasks.subscribe(filter, callback)
    }

    pub fn subscribe_day_tasks<F, C>(&mut self, filter: F, callback: C) -> Subscription
    where
        F: Fn(&String) -> bool + Send + Sync + 'static,
        C: Fn(&StoreEvent<String, DayTask>) + Send + Sync + 'static,
    {
        self.day_tasks.subscribe(filter, callback)
    }

    pub fn subscribe_templates<F, C>(&mut self, filter: F, callback: C) -> Subscription
    where
        F: Fn(&TemplateId) -> bool + Send + Sync + 'static,
        C: Fn(&StoreEvent<TemplateId, Template>) + Send + Sync + 'static,
    {
        self.templates.subscribe(filter, callback)
    }

    /// Follow a single day, the way a day view tracks the record it shows.
    pub fn use_day_info<C>(&mut self, name: &str, callback: C) -> Subscription
    where
        C: Fn(&StoreEvent<String, Day>) + Send + Sync + 'static,
    {
        let name = name.to_string();
        self.days.subscribe(move |key| *key == name, callback)
    }

    /// Follow a single task.
    pub fn use_task_info<C>(&mut self, id: TaskId, callback: C) -> Subscription
    where
        C: Fn(&StoreEvent<TaskId, Task>) + Send + Sync + 'static,
    {
        self.tasks.subscribe(move |key| *key == id, callback)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Persist every register.
    pub async fn save_all(&self) -> Result<()> {
        self.gateway.save(DAYS_KEY, &self.days.entries()).await?;
        self.gateway.save(TASKS_KEY, &self.tasks.entries()).await?;
        self.gateway
            .save(DAY_TASKS_KEY, &self.day_tasks.entries())
            .await?;
        self.gateway
            .save(TEMPLATES_KEY, &self.templates.entries())
            .await?;
        self.gateway.save(IMAGES_KEY, &self.images.entries()).await?;
        Ok(())
    }

    /// Replace every register with its last persisted state. A register with
    /// nothing persisted becomes empty.
    pub async fn load_all(&mut self) -> Result<()> {
        let gateway = self.gateway.clone();
        if !gateway
            .load_register(&mut self.days, &day_spec(), RegisterSource::Medium)
            .await?
        {
            self.days.clear();
        }
        if !gateway
            .load_register(&mut self.tasks, &task_spec(), RegisterSource::Medium)
            .await?
        {
            self.tasks.clear();
        }
        if !gateway
            .load_register(&mut self.day_tasks, &day_task_spec(), RegisterSource::Medium)
            .await?
        {
            self.day_tasks.clear();
        }
        if !gateway
            .load_register(&mut self.templates, &template_spec(), RegisterSource::Medium)
            .await?
        {
            self.templates.clear();
        }
        if !gateway
            .load_register(&mut self.images, &image_spec(), RegisterSource::Medium)
            .await?
        {
            self.images.clear();
        }
        self.sync_id_counters();
        Ok(())
    }

    // =========================================================================
    // Id allocation
    // =========================================================================

    pub(crate) fn next_task_id(&mut self) -> TaskId {
        self.sync_id_counters();
        self.last_task_id += 1;
        self.last_task_id
    }

    pub(crate) fn observe_task_id(&mut self, id: TaskId) {
        self.last_task_id = self.last_task_id.max(id);
    }

    pub(crate) fn next_template_id(&mut self) -> TemplateId {
        self.sync_id_counters();
        self.last_template_id += 1;
        self.last_template_id
    }

    pub(crate) fn observe_template_id(&mut self, id: TemplateId) {
        self.last_template_id = self.last_template_id.max(id);
    }

    pub(crate) fn sync_id_counters(&mut self) {
        let max_task = self.tasks.keys().into_iter().max().unwrap_or(0);
        self.observe_task_id(max_task);
        let max_template = self.templates.keys().into_iter().max().unwrap_or(0);
        self.observe_template_id(max_template);
    }
}

/// Write `value` unless the stored entry already holds an equal value.
pub(crate) fn write_if_changed<K, V>(store: &mut Store<K, V>, key: K, value: V) -> Arc<V>
where
    K: Eq + std::hash::Hash + Clone,
    V: PartialEq,
{
    if let Some(existing) = store.get(&key) {
        if *existing == value {
            return existing;
        }
    }
    let value = Arc::new(value);
    store.set(key, Arc::clone(&value));
    value
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::model::DayTaskId;

    /// Panics if any day/day-task cross reference is broken.
    pub fn assert_consistent(db: &Database) {
        for day in db.days.values() {
            for task_id in &day.tasks {
                let key = DayTaskId::new(day.name.clone(), *task_id).encode();
                assert!(
                    db.day_tasks.contains_key(&key),
                    "day {} lists task {} without a day task",
                    day.name,
                    task_id
                );
            }
        }
        for day_task in db.day_tasks.values() {
            let day = db
                .days
                .get(&day_task.day_name)
                .unwrap_or_else(|| panic!("day task {} has no day", day_task.id()));
            assert!(
                day.tasks.contains(&day_task.task_id),
                "day {} does not list task {}",
                day.name,
                day_task.task_id
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DayTaskId, DayTaskUpdate, TaskStatus, TaskUpdate};

    #[tokio::test]
    async fn save_then_load_round_trips_every_register() {
        let mut db = Database::in_memory();
        db.set_day_task_info(
            &DayTaskId::new("2023-11-01", 1),
            DayTaskUpdate {
                status: Some(TaskStatus::InProgress),
                note: Some("pairing".to_string()),
                ..DayTaskUpdate::default()
            },
        )
        .unwrap();
        db.add_task(TaskUpdate {
            name: Some("Review".to_string()),
            ..TaskUpdate::default()
        });
        db.add_template(Default::default());
        db.save_all().await.unwrap();

        let mut fresh = Database::new(db.gateway().clone());
        fresh.load_all().await.unwrap();

        assert_eq!(fresh.days.entries().len(), db.days.entries().len());
        for (key, value) in db.tasks.entries() {
            assert_eq!(*fresh.tasks.get(&key).unwrap(), *value);
        }
        for (key, value) in db.day_tasks.entries() {
            assert_eq!(*fresh.day_tasks.get(&key).unwrap(), *value);
        }
        assert_eq!(fresh.templates.len(), 1);
        test_support::assert_consistent(&fresh);
    }

    #[tokio::test]
    async fn task_ids_are_never_reused() {
        let mut db = Database::in_memory();
        let first = db.add_task(TaskUpdate::default());
        let second = db.add_task(TaskUpdate::default());
        db.delete_task(second.id);
        let third = db.add_task(TaskUpdate::default());

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(third.id, 3);
    }

    #[tokio::test]
    async fn load_all_clears_registers_missing_from_the_medium() {
        let mut db = Database::in_memory();
        db.add_task(TaskUpdate::default());

        db.load_all().await.unwrap();
        assert!(db.tasks.is_empty());
    }

    #[test]
    fn use_task_info_only_sees_its_task() {
        use std::sync::Mutex;

        let mut db = Database::in_memory();
        let seen: Arc<Mutex<usize>> = Arc::default();
        let counter = Arc::clone(&seen);
        let _subscription = db.use_task_info(2, move |event| {
            *counter.lock().unwrap() += event.changes.len();
        });

        db.add_task(TaskUpdate::default());
        db.add_task(TaskUpdate::default());
        db.set_task_info(
            2,
            TaskUpdate {
                name: Some("renamed".to_string()),
                ..TaskUpdate::default()
            },
        )
        .unwrap();

        assert_eq!(*seen.lock().unwrap(), 2);
    }
}

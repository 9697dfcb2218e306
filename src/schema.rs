//! Persisted shapes of every entity type, past and present.
//!
//! Current validators accept extra keys; historical validators only accept
//! their exact key set so that newer data is never mistaken for an older
//! version and re-upgraded.

use serde_json::{json, Map, Value};

use crate::migration::MigrationChain;
use crate::model::{is_day_name, DayTaskId, TaskStatus};

/// Read-only view over a persisted JSON object.
struct Shape<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> Shape<'a> {
    fn of(value: &'a Value) -> Option<Self> {
        value.as_object().map(|map| Shape { map })
    }

    fn string(&self, key: &str) -> bool {
        self.map.get(key).is_some_and(Value::is_string)
    }

    fn nullable_string(&self, key: &str) -> bool {
        self.map
            .get(key)
            .is_some_and(|value| value.is_null() || value.is_string())
    }

    fn integer(&self, key: &str) -> bool {
        self.map.get(key).is_some_and(|value| value.as_i64().is_some())
    }

    fn id(&self, key: &str) -> bool {
        self.map.get(key).is_some_and(is_positive_id)
    }

    fn id_list(&self, key: &str) -> bool {
        self.map
            .get(key)
            .and_then(Value::as_array)
            .is_some_and(|items| items.iter().all(is_positive_id))
    }

    fn status(&self, key: &str) -> bool {
        self.map.get(key).and_then(Value::as_str).is_some_and(|raw| {
            TaskStatus::ALL
                .iter()
                .any(|status| status.as_str() == raw)
        })
    }

    fn day_name(&self, key: &str) -> bool {
        self.map
            .get(key)
            .and_then(Value::as_str)
            .is_some_and(is_day_name)
    }

    /// No keys beyond `allowed`.
    fn only(&self, allowed: &[&str]) -> bool {
        self.map.keys().all(|key| allowed.contains(&key.as_str()))
    }
}

fn is_positive_id(value: &Value) -> bool {
    value
        .as_u64()
        .is_some_and(|id| id > 0 && id <= u64::from(u32::MAX))
}

fn with_field(mut value: Value, key: &str, field: Value) -> Value {
    if let Some(map) = value.as_object_mut() {
        map.insert(key.to_string(), field);
    }
    value
}

// =============================================================================
// Register keys
// =============================================================================

pub fn day_key(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|name| is_day_name(name))
        .map(str::to_string)
}

pub fn id_key(value: &Value) -> Option<u32> {
    if !is_positive_id(value) {
        return None;
    }
    value.as_u64().and_then(|id| u32::try_from(id).ok())
}

pub fn day_task_key(value: &Value) -> Option<String> {
    let raw = value.as_str()?;
    let id = DayTaskId::decode(raw)?;
    (is_day_name(&id.day_name) && id.task_id > 0).then(|| raw.to_string())
}

pub fn image_key(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

// =============================================================================
// Day
// =============================================================================

fn day_current(value: &Value) -> bool {
    Shape::of(value)
        .is_some_and(|day| day.day_name("name") && day.string("note") && day.id_list("tasks"))
}

fn day_v1(value: &Value) -> bool {
    Shape::of(value).is_some_and(|day| {
        day.only(&["name", "note"]) && day.day_name("name") && day.string("note")
    })
}

fn day_v1_to_v2(value: Value) -> Value {
    with_field(value, "tasks", json!([]))
}

pub fn day_chain() -> MigrationChain {
    MigrationChain::new("day", day_current).step(1, day_v1, day_v1_to_v2)
}

// =============================================================================
// Task
// =============================================================================

fn task_current(value: &Value) -> bool {
    Shape::of(value).is_some_and(|task| {
        task.id("id")
            && task.string("name")
            && task.string("note")
            && task.status("status")
            && task.integer("sortIndex")
    })
}

fn task_v1(value: &Value) -> bool {
    Shape::of(value).is_some_and(|task| {
        task.only(&["id", "name", "status"])
            && task.id("id")
            && task.string("name")
            && task.status("status")
    })
}

fn task_v1_to_v2(value: Value) -> Value {
    with_field(value, "note", json!(""))
}

fn task_v2(value: &Value) -> bool {
    Shape::of(value).is_some_and(|task| {
        task.only(&["id", "name", "status", "note"])
            && task.id("id")
            && task.string("name")
            && task.string("note")
            && task.status("status")
    })
}

fn task_v2_to_v3(value: Value) -> Value {
    let sort_index = value
        .get("id")
        .and_then(Value::as_i64)
        .map_or(0, |id| -id);
    with_field(value, "sortIndex", json!(sort_index))
}

pub fn task_chain() -> MigrationChain {
    MigrationChain::new("task", task_current)
        .step(1, task_v1, task_v1_to_v2)
        .step(2, task_v2, task_v2_to_v3)
}

// =============================================================================
// DayTask
// =============================================================================

fn day_task_current(value: &Value) -> bool {
    Shape::of(value).is_some_and(|day_task| {
        day_task.day_name("dayName")
            && day_task.id("taskId")
            && day_task.status("status")
            && day_task.string("note")
            && day_task.nullable_string("summary")
    })
}

fn day_task_v1(value: &Value) -> bool {
    Shape::of(value).is_some_and(|day_task| {
        day_task.only(&["dayName", "taskId", "status", "note"])
            && day_task.day_name("dayName")
            && day_task.id("taskId")
            && day_task.status("status")
            && day_task.string("note")
    })
}

fn day_task_v1_to_v2(value: Value) -> Value {
    with_field(value, "summary", Value::Null)
}

pub fn day_task_chain() -> MigrationChain {
    MigrationChain::new("day task", day_task_current).step(1, day_task_v1, day_task_v1_to_v2)
}

// =============================================================================
// Template
// =============================================================================

fn template_current(value: &Value) -> bool {
    Shape::of(value).is_some_and(|template| {
        template.id("id") && template.string("name") && template.string("note")
    })
}

fn template_v1(value: &Value) -> bool {
    Shape::of(value).is_some_and(|template| {
        template.only(&["id", "name", "content"])
            && template.id("id")
            && template.string("name")
            && template.string("content")
    })
}

fn template_v1_to_v2(mut value: Value) -> Value {
    let content = value
        .as_object_mut()
        .and_then(|map| map.remove("content"))
        .unwrap_or_else(|| json!(""));
    with_field(value, "note", content)
}

pub fn template_chain() -> MigrationChain {
    MigrationChain::new("template", template_current).step(1, template_v1, template_v1_to_v2)
}

// =============================================================================
// Images
// =============================================================================

fn image_current(value: &Value) -> bool {
    value.is_string()
}

/// Images are opaque data URLs with no history.
pub fn image_chain() -> MigrationChain {
    MigrationChain::new("image", image_current)
}

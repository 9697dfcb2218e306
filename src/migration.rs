//! Schema migration engine
//!
//! Each entity type owns a [`MigrationChain`]: a validator for the current
//! persisted shape plus the list of every historical shape, oldest first, each
//! with the step that lifts it one version up.
//!
//! Adding a field is two lines in [`crate::schema`]: register the previous
//! shape as a historical version and give it a step that fills the default.

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};

/// Predicate over a raw persisted value.
pub type Validator = fn(&Value) -> bool;

/// Lifts a value of version N to (possibly partial) version N+1.
pub type UpgradeStep = fn(Value) -> Value;

/// One historical persisted shape.
#[derive(Clone, Copy)]
pub struct HistoricalSchema {
    pub version: u32,
    pub validate: Validator,
    pub upgrade: Option<UpgradeStep>,
}

#[derive(Clone)]
pub struct MigrationChain {
    entity: &'static str,
    current: Validator,
    history: Vec<HistoricalSchema>,
}

impl fmt::Debug for HistoricalSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoricalSchema")
            .field("version", &self.version)
            .field("has_upgrade", &self.upgrade.is_some())
            .finish()
    }
}

impl fmt::Debug for MigrationChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationChain")
            .field("entity", &self.entity)
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}

impl MigrationChain {
    pub fn new(entity: &'static str, current: Validator) -> Self {
        Self {
            entity,
            current,
            history: Vec::new(),
        }
    }

    /// Register a historical shape together with its upgrade step.
    pub fn step(mut self, version: u32, validate: Validator, upgrade: UpgradeStep) -> Self {
        self.history.push(HistoricalSchema {
            version,
            validate,
            upgrade: Some(upgrade),
        });
        self
    }

    /// Register a recognised historical shape that has no upgrade step yet.
    pub fn shape(mut self, version: u32, validate: Validator) -> Self {
        self.history.push(HistoricalSchema {
            version,
            validate,
            upgrade: None,
        });
        self
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    /// Version number of the current shape (one past the newest historical one).
    pub fn current_version(&self) -> u32 {
        self.history
            .iter()
            .map(|schema| schema.version)
            .max()
            .map_or(1, |newest| newest + 1)
    }

    pub fn is_current(&self, value: &Value) -> bool {
        (self.current)(value)
    }

    /// First historical shape accepting `value`, scanning oldest first.
    pub fn detect(&self, value: &Value) -> Option<&HistoricalSchema> {
        self.history.iter().find(|schema| (schema.validate)(value))
    }

    /// Bring `value` to the current shape.
    ///
    /// A value matching no known shape is an [`Error::UnrecognisedSchema`]. A
    /// value that stops matching anything midway, or reaches a version without
    /// an upgrade step, is an [`Error::IncompleteMigration`].
    pub fn upgrade(&self, value: Value) -> Result<Value> {
        let mut value = value;
        let mut applied: Option<u32> = None;

        loop {
            if self.is_current(&value) {
                return Ok(value);
            }

            let Some(schema) = self.detect(&value) else {
                return Err(match applied {
                    None => Error::UnrecognisedSchema {
                        entity: self.entity,
                        value,
                    },
                    Some(version) => Error::IncompleteMigration {
                        entity: self.entity,
                        version,
                    },
                });
            };

            // Each step must move strictly forward, so a chain can never cycle.
            let moved_forward = applied.map_or(true, |previous| schema.version > previous);
            let Some(upgrade) = schema.upgrade.filter(|_| moved_forward) else {
                return Err(Error::IncompleteMigration {
                    entity: self.entity,
                    version: schema.version,
                });
            };

            debug!(
                entity = self.entity,
                from = schema.version,
                to = schema.version + 1,
                "upgrading persisted value"
            );
            value = upgrade(value);
            applied = Some(schema.version);
        }
    }

    /// Upgrade then deserialize into the entity type.
    pub fn upgrade_into<T: DeserializeOwned>(&self, value: Value) -> Result<T> {
        let current = self.upgrade(value)?;
        Ok(serde_json::from_value(current)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn has(value: &Value, key: &str) -> bool {
        value.get(key).is_some()
    }

    fn current(value: &Value) -> bool {
        has(value, "a") && has(value, "b") && has(value, "c")
    }

    fn v1(value: &Value) -> bool {
        has(value, "a") && !has(value, "b")
    }

    fn v2(value: &Value) -> bool {
        has(value, "a") && has(value, "b") && !has(value, "c")
    }

    fn add_b(mut value: Value) -> Value {
        value["b"] = json!(0);
        value
    }

    fn add_c(mut value: Value) -> Value {
        value["c"] = json!("x");
        value
    }

    fn drop_everything(_: Value) -> Value {
        json!({ "unrelated": true })
    }

    #[test]
    fn current_values_pass_through_unchanged() {
        let chain = MigrationChain::new("demo", current).step(1, v1, add_b);
        let value = json!({ "a": 1, "b": 2, "c": "keep" });
        assert_eq!(chain.upgrade(value.clone()).unwrap(), value);
    }

    #[test]
    fn upgrades_walk_the_whole_chain() {
        let chain = MigrationChain::new("demo", current)
            .step(1, v1, add_b)
            .step(2, v2, add_c);

        assert_eq!(chain.current_version(), 3);
        assert_eq!(
            chain.upgrade(json!({ "a": 1 })).unwrap(),
            json!({ "a": 1, "b": 0, "c": "x" })
        );
    }

    #[test]
    fn unknown_shapes_are_unrecognised() {
        let chain = MigrationChain::new("demo", current).step(1, v1, add_b);
        let err = chain.upgrade(json!({ "z": 1 })).unwrap_err();
        assert!(matches!(err, Error::UnrecognisedSchema { entity: "demo", .. }));
    }

    #[test]
    fn missing_step_is_an_incomplete_chain() {
        let chain = MigrationChain::new("demo", current)
            .step(1, v1, add_b)
            .shape(2, v2);
        let err = chain.upgrade(json!({ "a": 1 })).unwrap_err();
        assert!(matches!(
            err,
            Error::IncompleteMigration {
                entity: "demo",
                version: 2
            }
        ));
    }

    #[test]
    fn step_landing_nowhere_is_an_incomplete_chain() {
        let chain = MigrationChain::new("demo", current).step(1, v1, drop_everything);
        let err = chain.upgrade(json!({ "a": 1 })).unwrap_err();
        assert!(matches!(
            err,
            Error::IncompleteMigration {
                entity: "demo",
                version: 1
            }
        ));
    }

    #[test]
    fn step_that_does_not_advance_is_rejected() {
        // v1 step leaves the value at v1 forever.
        let chain = MigrationChain::new("demo", current).step(1, v1, |value| value);
        assert!(matches!(
            chain.upgrade(json!({ "a": 1 })),
            Err(Error::IncompleteMigration { version: 1, .. })
        ));
    }
}

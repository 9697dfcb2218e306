//! Error types for daybook
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, malformed day name, unknown entity)
//! - 4: Operation failed (storage, serialisation, migration)

use thiserror::Error;

/// Exit codes for the daybook CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for daybook operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid day name '{0}' (expected YYYY-MM-DD)")]
    InvalidDayName(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Day not found: {0}")]
    DayNotFound(String),

    #[error("Task not found: {0}")]
    TaskNotFound(u32),

    #[error("Template not found: {0}")]
    TemplateNotFound(u32),

    // Operation failures (exit code 4)
    #[error("No recognised {entity} schema for value: {value}")]
    UnrecognisedSchema {
        entity: &'static str,
        value: serde_json::Value,
    },

    #[error("Incomplete {entity} migration chain: no upgrade step from version {version}")]
    IncompleteMigration { entity: &'static str, version: u32 },

    #[error("Malformed register '{key}': {reason}")]
    MalformedRegister { key: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::InvalidDayName(_)
            | Error::InvalidArgument(_)
            | Error::InvalidConfig(_)
            | Error::DayNotFound(_)
            | Error::TaskNotFound(_)
            | Error::TemplateNotFound(_) => exit_codes::USER_ERROR,

            // Operation failures
            Error::UnrecognisedSchema { .. }
            | Error::IncompleteMigration { .. }
            | Error::MalformedRegister { .. }
            | Error::Storage(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlSerialize(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for the JSON error envelope, when the variant has any.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::UnrecognisedSchema { entity, value } => Some(serde_json::json!({
                "entity": entity,
                "value": value,
            })),
            Error::IncompleteMigration { entity, version } => Some(serde_json::json!({
                "entity": entity,
                "version": version,
            })),
            Error::MalformedRegister { key, reason } => Some(serde_json::json!({
                "key": key,
                "reason": reason,
            })),
            _ => None,
        }
    }
}

/// Result type alias for daybook operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_errors_map_to_user_exit_code() {
        assert_eq!(
            Error::InvalidDayName("2024-13-01".to_string()).exit_code(),
            exit_codes::USER_ERROR
        );
        assert_eq!(Error::TaskNotFound(7).exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn migration_errors_carry_details() {
        let err = Error::IncompleteMigration {
            entity: "task",
            version: 2,
        };
        assert_eq!(err.exit_code(), exit_codes::OPERATION_FAILED);
        let details = err.details().unwrap();
        assert_eq!(details["entity"], "task");
        assert_eq!(details["version"], 2);
    }
}

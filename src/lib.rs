//! daybook - Day-by-day Task Journal Library
//!
//! This library provides the core of the daybook CLI: an in-memory relational
//! store of days, tasks and per-day task records, persisted as versioned JSON
//! registers.
//!
//! # Core Concepts
//!
//! - **Day**: a calendar date with a note and the ordered tasks worked on
//! - **Task**: a unit of work with a canonical status and a manual sort position
//! - **DayTask**: a task's status, note and summary on one day
//! - **Observable Store**: keyed collection emitting one batched event per write
//! - **Migration chain**: historical shapes that lift old registers on load
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `daybook.toml`
//! - `error`: Error types and result aliases
//! - `store`: Observable store, listeners and subscriptions
//! - `migration`: Schema migration engine
//! - `schema`: Historical and current shapes of every entity
//! - `model`: Entity types, partial updates and day-name validation
//! - `persistence`: Storage media and the register gateway
//! - `database`: Application root and relational integrity rules
//! - `status`: Task status resolution over day history
//! - `transfer`: Export and transactional import
//! - `output`: Human and JSON command output

pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod migration;
pub mod model;
pub mod output;
pub mod persistence;
pub mod schema;
pub mod status;
pub mod store;
pub mod transfer;

pub use database::Database;
pub use error::{Error, Result};

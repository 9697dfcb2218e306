//! daybook init command implementation
//!
//! Creates the data directory and a default `daybook.toml`.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::resolve_data_dir;
use crate::config::{Config, CONFIG_FILE};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};

/// Options for `daybook init`
pub struct InitOptions {
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

#[derive(Serialize)]
struct InitReport {
    data_dir: PathBuf,
    created: InitCreated,
}

#[derive(Serialize)]
struct InitCreated {
    data_dir: bool,
    config: bool,
}

pub async fn run(options: InitOptions) -> Result<()> {
    let data_dir = resolve_data_dir(options.data_dir)?;

    let created_dir = !data_dir.exists();
    tokio::fs::create_dir_all(&data_dir).await?;
    let created_config = ensure_config(&data_dir)?;

    let report = InitReport {
        data_dir: data_dir.clone(),
        created: InitCreated {
            data_dir: created_dir,
            config: created_config,
        },
    };

    let mut created_items = Vec::new();
    if created_dir {
        created_items.push(format!("{}/", data_dir.display()));
    }
    if created_config {
        created_items.push(CONFIG_FILE.to_string());
    }

    let header = if created_items.is_empty() {
        "init: nothing to do".to_string()
    } else {
        "init: initialized data directory".to_string()
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("data dir", data_dir.display().to_string());
    human.push_summary(
        "created",
        if created_items.is_empty() {
            "none".to_string()
        } else {
            created_items.join(", ")
        },
    );

    emit_success(options.output, "init", &report, Some(&human))
}

/// An existing config file is left as it is.
fn ensure_config(data_dir: &Path) -> Result<bool> {
    let config_path = data_dir.join(CONFIG_FILE);
    if config_path.exists() {
        if !config_path.is_file() {
            return Err(Error::InvalidConfig(format!(
                "{} exists but is not a file",
                config_path.display()
            )));
        }
        return Ok(false);
    }

    Config::default().save(&config_path)?;
    Ok(true)
}

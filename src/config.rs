//! Configuration loading and management
//!
//! Handles parsing of the `daybook.toml` file kept in the data directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;

/// File name of the configuration inside the data directory.
pub const CONFIG_FILE: &str = "daybook.toml";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "DAYBOOK_DATA_DIR";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Persisted register settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Export file settings
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Pretty-print register files
    #[serde(default)]
    pub pretty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Pretty-print export documents
    #[serde(default = "default_true")]
    pub pretty: bool,

    /// Carry the images register in exports
    #[serde(default = "default_true")]
    pub include_images: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            pretty: default_true(),
            include_images: default_true(),
        }
    }
}

impl Config {
    /// Load configuration from a `daybook.toml` file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|err| crate::error::Error::InvalidConfig(format!("{}: {err}", path.display())))
    }

    /// Load configuration from the data directory, or return defaults when
    /// there is no file.
    pub fn load_from_dir(data_dir: &Path) -> crate::error::Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Platform data directory for daybook.
pub fn default_data_dir() -> crate::error::Result<PathBuf> {
    ProjectDirs::from("", "", "daybook")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            crate::error::Error::InvalidConfig(format!(
                "no home directory found; pass --data-dir or set {DATA_DIR_ENV}"
            ))
        })
}

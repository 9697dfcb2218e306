#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// Throwaway data directory for one test.
pub struct TestData {
    dir: TempDir,
}

impl TestData {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn register_path(&self, key: &str) -> PathBuf {
        self.dir.path().join(format!("{key}.json"))
    }

    pub fn write_register(&self, key: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.register_path(key);
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn read_register(&self, key: &str) -> Result<Value, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(self.register_path(key))?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join("daybook.toml");
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// `daybook` pointed at this data directory.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("daybook").expect("binary");
        cmd.env("DAYBOOK_DATA_DIR", self.dir.path());
        cmd.env_remove("RUST_LOG");
        cmd
    }

    /// Run with `--json` and return the parsed envelope of a successful command.
    pub fn json(&self, args: &[&str]) -> Result<Value, Box<dyn std::error::Error>> {
        let output = self.cmd().arg("--json").args(args).output()?;
        if !output.status.success() {
            return Err(format!(
                "daybook {args:?} failed: {}",
                String::from_utf8_lossy(&output.stdout)
            )
            .into());
        }
        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

//! Persistence gateway
//!
//! Registers are persisted as a JSON array of `[key, value]` pairs under a
//! string storage key. The medium behind the gateway is swappable: a directory
//! of JSON files for the CLI, an in-process map for tests.
//!
//! ```text
//! <data-dir>/
//!   days.json         # [["2023-11-01", {...}], ...]
//!   tasks.json        # [[1, {...}], ...]
//!   day-tasks.json    # [["2023-11-01_1", {...}], ...]
//!   templates.json
//!   images.json
//! ```

use std::collections::HashMap;
use std::hash::Hash;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::migration::MigrationChain;
use crate::store::Store;

/// Key/value medium holding serialised registers.
#[async_trait]
pub trait StorageMedium: Send + Sync {
    /// `Ok(None)` when nothing was ever written under `key`.
    async fn read(&self, key: &str) -> Result<Option<String>>;
    async fn write(&self, key: &str, payload: String) -> Result<()>;
}

/// One `<key>.json` file per storage key.
#[derive(Debug, Clone)]
pub struct FileMedium {
    dir: PathBuf,
}

impl FileMedium {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl StorageMedium for FileMedium {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::Io(err)),
        }
    }

    /// Write to a temp file then rename, so readers never see a partial register.
    async fn write(&self, key: &str, payload: String) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(key);
        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, payload.as_bytes()).await?;
        tokio::fs::rename(&temp_path, &path).await?;
        Ok(())
    }
}

/// In-process medium.
#[derive(Debug, Default)]
pub struct MemoryMedium {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw payload stored under `key`, for inspection in tests.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.lock().ok().and_then(|entries| entries.get(key).cloned())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| Error::Storage("memory medium lock poisoned".to_string()))
    }
}

#[async_trait]
impl StorageMedium for MemoryMedium {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn write(&self, key: &str, payload: String) -> Result<()> {
        self.lock()?.insert(key.to_string(), payload);
        Ok(())
    }}

/// Where [`Gateway::load_register`] takes its entries from.
#[derive(Debug, Clone)]
pub enum RegisterSource<'a> {
    /// The gateway's storage medium.
    Medium,
    /// A serialised register already in hand (e.g. read from an export file).
    Serialized(&'a str),
    /// An already parsed register.
    Value(Value),
}

/// How one register's keys and values are checked on load.
#[derive(Clone)]
pub struct RegisterSpec<K, V> {
    pub storage_key: &'static str,
    pub parse_key: fn(&Value) -> Option<K>,
    pub chain: MigrationChain,
    /// Key a value must be stored under, for values that carry their own identity.
    pub key_of: Option<fn(&V) -> K>,
}

impl<K, V> std::fmt::Debug for RegisterSpec<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterSpec")
            .field("storage_key", &self.storage_key)
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct Gateway {
    medium: Arc<dyn StorageMedium>,
    pretty: bool,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("pretty", &self.pretty)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    pub fn new(medium: Arc<dyn StorageMedium>) -> Self {
        Self {
            medium,
            pretty: false,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn medium(&self) -> &Arc<dyn StorageMedium> {
        &self.medium
    }

    /// Serialise a register's full entry list under `key`.
    pub async fn save<K, V>(&self, key: &str, entries: &[(K, Arc<V>)]) -> Result<()>
    where
        K: Serialize,
        V: Serialize,
    {
        let pairs: Vec<(&K, &V)> = entries
            .iter()
            .map(|(key, value)| (key, value.as_ref()))
            .collect();
        let payload = if self.pretty {
            serde_json::to_string_pretty(&pairs)?
        } else {
            serde_json::to_string(&pairs)?
        };
        self.medium.write(key, payload).await?;
        debug!(key, entries = entries.len(), "saved register");
        Ok(())
    }

    /// Read and parse the register under `key`; `Ok(None)` when nothing was persisted.
    pub async fn load(&self, key: &str) -> Result<Option<Vec<(Value, Value)>>> {
        let Some(payload) = self.medium.read(key).await? else {
            debug!(key, "no persisted register");
            return Ok(None);
        };
        parse_serialized(key, &payload).map(Some)
    }

    /// Fetch raw entries, check each key, migrate each value, then replace the
    /// store's contents with one `clear` and one bulk `set`.
    ///
    /// Returns `Ok(false)` without touching the store when the medium has no
    /// register for this key. Any failure leaves the store untouched.
    pub async fn load_register<K, V>(
        &self,
        store: &mut Store<K, V>,
        spec: &RegisterSpec<K, V>,
        source: RegisterSource<'_>,
    ) -> Result<bool>
    where
        K: Eq + Hash + Clone,
        V: DeserializeOwned,
    {
        let raw = match source {
            RegisterSource::Medium => match self.load(spec.storage_key).await? {
                Some(raw) => raw,
                None => return Ok(false),
            },
            RegisterSource::Serialized(payload) => parse_serialized(spec.storage_key, payload)?,
            RegisterSource::Value(value) => parse_register(spec.storage_key, value)?,
        };

        let mut entries: Vec<(K, Arc<V>)> = Vec::with_capacity(raw.len());
        for (raw_key, raw_value) in raw {
            let key = (spec.parse_key)(&raw_key).ok_or_else(|| Error::MalformedRegister {
                key: spec.storage_key.to_string(),
                reason: format!("invalid entry key {raw_key}"),
            })?;
            let value: V = spec.chain.upgrade_into(raw_value)?;
            if let Some(key_of) = spec.key_of {
                if key_of(&value) != key {
                    return Err(Error::MalformedRegister {
                        key: spec.storage_key.to_string(),
                        reason: format!("entry key {raw_key} does not match its value"),
                    });
                }
            }
            entries.push((key, Arc::new(value)));
        }

        let count = entries.len();
        store.clear();
        store.set_many(entries);
        debug!(key = spec.storage_key, entries = count, "loaded register");
        Ok(true)
    }
}

fn parse_serialized(key: &str, payload: &str) -> Result<Vec<(Value, Value)>> {
    let value: Value = serde_json::from_str(payload)?;
    parse_register(key, value)
}

/// Check the outer `[[key, value], ...]` shape of a register.
pub fn parse_register(key: &str, value: Value) -> Result<Vec<(Value, Value)>> {
    let malformed = |reason: String| Error::MalformedRegister {
        key: key.to_string(),
        reason,
    };

    let Value::Array(items) = value else {
        return Err(malformed(
            "expected an array of [key, value] pairs".to_string(),
        ));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Array(pair) if pair.len() == 2 => {
                let mut pair = pair.into_iter();
                match (pair.next(), pair.next()) {
                    (Some(entry_key), Some(entry_value)) => Ok((entry_key, entry_value)),
                    _ => Err(malformed(format!("entry {index} is not a [key, value] pair"))),
                }
            }
            _ => Err(malformed(format!("entry {index} is not a [key, value] pair"))),
        })
        .collect()
}

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use snafu::ResultExt;

use crate::error::{IoSnafu, Result};

/// String-keyed persistence the engine writes through to. Values are JSON
/// text; the engine does the parsing so corrupt values can be recovered.
///
/// `save` reports failure as `false` (quota exceeded, read-only media, ...).
/// The engine never retries on its own.
pub trait KeyValueStore {
    fn load(&self, key: &str) -> Option<String>;
    fn save(&mut self, key: &str, value: &str) -> bool;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &mut S {
    fn load(&self, key: &str) -> Option<String> {
        (**self).load(key)
    }

    fn save(&mut self, key: &str, value: &str) -> bool {
        (**self).save(key, value)
    }
}

/// Keys under which the review table and the daily deck are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageKeys {
    pub review_states: String,
    pub deck_date: String,
    pub deck_ids: String,
    pub completed_ids: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            review_states: "spacedRepetitionCards".to_string(),
            deck_date: "dailyDeckDate".to_string(),
            deck_ids: "dailyDeckIds".to_string(),
            completed_ids: "dailyStudiedIds".to_string(),
        }
    }
}

/// Reads and parses `key`. Absent and unparseable values both come back as
/// `None`; the latter is logged.
pub(crate) fn load_json<T: DeserializeOwned>(store: &impl KeyValueStore, key: &str) -> Option<T> {
    let raw = store.load(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("discarding malformed value under `{key}`: {err}");
            None
        }
    }
}

pub(crate) fn save_json<T: Serialize + ?Sized>(
    store: &mut impl KeyValueStore,
    key: &str,
    value: &T,
) -> bool {
    let raw = match serde_json::to_string(value) {
        Ok(raw) => raw,
        Err(err) => {
            warn!("could not serialize value for `{key}`: {err}");
            return false;
        }
    };
    let saved = store.save(key, &raw);
    if !saved {
        warn!("store rejected write to `{key}` ({} bytes)", raw.len());
    }
    saved
}

/// In-process store, optionally bounded by a byte quota the way browser
/// storage is.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes that would push the total size of keys and values past
    /// `bytes` are rejected.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            quota: Some(bytes),
        }
    }

    /// Stores a raw value without any quota check, e.g. to seed a fixture.
    pub fn insert_raw(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn used_bytes_without(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn save(&mut self, key: &str, value: &str) -> bool {
        if let Some(quota) = self.quota {
            if self.used_bytes_without(key) + key.len() + value.len() > quota {
                return false;
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        true
    }
}

/// One JSON file per key inside a directory. Keys are percent-encoded into
/// file names, so distinct keys never share a file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Opens (creating if needed) the directory backing the store.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).context(IoSnafu { path: dir.clone() })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", urlencoding::encode(key)))
    }
}

impl KeyValueStore for JsonFileStore {
    fn load(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(raw) => Some(raw),
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => {
                warn!("failed to read {}: {err}", path.display());
                None
            }
        }
    }

    fn save(&mut self, key: &str, value: &str) -> bool {
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        let written = fs::write(&staging, value).and_then(|_| fs::rename(&staging, &path));
        match written {
            Ok(()) => true,
            Err(err) => {
                warn!("failed to write {}: {err}", path.display());
                false
            }
        }
    }
}

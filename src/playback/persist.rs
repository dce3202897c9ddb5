//! Key/value persistence of the playback snapshot and the volume.
//!
//! Values are JSON documents keyed by short names. Writes replace the value
//! wholesale; a missing key reads as `None`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::library::Track;

pub const STATE_KEY: &str = "audio_state";
pub const VOLUME_KEY: &str = "player_volume";
pub const VOLUME_BACKUP_KEY: &str = "player_volume_backup";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid key {0:?}")]
    InvalidKey(String),
}

pub trait StateStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// The persisted form of the playback state.
///
/// `current_index` is `-1` when no queue entry is current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub current_track: Option<Track>,
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub current_time: f64,
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default = "unset_index")]
    pub current_index: i64,
}

fn unset_index() -> i64 {
    -1
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            current_track: None,
            is_playing: false,
            current_time: 0.0,
            tracks: Vec::new(),
            current_index: unset_index(),
        }
    }
}

impl PersistedState {
    pub fn index(&self) -> Option<usize> {
        usize::try_from(self.current_index)
            .ok()
            .filter(|&i| i < self.tracks.len())
    }

    pub fn encode_index(index: Option<usize>) -> i64 {
        index
            .and_then(|i| i64::try_from(i).ok())
            .unwrap_or_else(unset_index)
    }
}

/// Read the snapshot, treating a corrupt document like a missing one.
pub fn load_state(store: &dyn StateStore) -> Option<PersistedState> {
    let raw = match store.get(STATE_KEY) {
        Ok(raw) => raw?,
        Err(e) => {
            log::warn!("could not read playback state: {}", e);
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(state) => Some(state),
        Err(e) => {
            log::warn!("discarding unreadable playback state: {}", e);
            None
        }
    }
}

pub fn save_state(store: &dyn StateStore, state: &PersistedState) {
    let body = match serde_json::to_string(state) {
        Ok(body) => body,
        Err(e) => {
            log::error!("could not encode playback state: {}", e);
            return;
        }
    };
    if let Err(e) = store.set(STATE_KEY, &body) {
        log::warn!("could not persist playback state: {}", e);
    }
}

/// One `<key>.json` file per key inside a directory.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

fn io_err(path: &Path, source: io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl StateStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(&path, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir).map_err(|e| io_err(&self.dir, e))?;
        // Write next to the target and rename so readers never see half a file.
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        fs::write(&tmp, value).map_err(|e| io_err(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(&path, e)),
        }
    }
}

/// In-process store. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

//! Learner snapshot persistence on a local key-value store.
//!
//! Load and save failures are logged here and never reach the caller as
//! errors.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{info, warn};

use crate::model::LearnerState;

pub const SNAPSHOT_KEY: &str = "learner_state";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid snapshot key `{0}`")]
    InvalidKey(String),
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, SnapshotError>;
    fn put(&self, key: &str, value: &str) -> Result<(), SnapshotError>;
}

/// One `<key>.json` file per key under `dir`.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, SnapshotError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(SnapshotError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, SnapshotError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<(), SnapshotError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;
        // Replaced atomically: temp file, then rename.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, SnapshotError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), SnapshotError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

pub struct SnapshotStore<S> {
    store: S,
}

impl<S: KeyValueStore> SnapshotStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    pub fn load(&self) -> Option<LearnerState> {
        match self.try_load() {
            Ok(state) => state,
            Err(err) => {
                warn!(error = %err, key = SNAPSHOT_KEY, "failed to load learner snapshot");
                None
            }
        }
    }

    pub fn save(&self, state: &LearnerState) -> bool {
        match self.try_save(state) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, key = SNAPSHOT_KEY, user_id = %state.user_id, "failed to save learner snapshot");
                false
            }
        }
    }

    fn try_load(&self) -> Result<Option<LearnerState>, SnapshotError> {
        let Some(raw) = self.store.get(SNAPSHOT_KEY)? else {
            return Ok(None);
        };
        let state: LearnerState = serde_json::from_str(&raw)?;
        info!(user_id = %state.user_id, skills = state.skill_state.len(), "learner snapshot loaded");
        Ok(Some(state))
    }

    fn try_save(&self, state: &LearnerState) -> Result<(), SnapshotError> {
        let raw = serde_json::to_string(state)?;
        self.store.put(SNAPSHOT_KEY, &raw)
    }
}

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const VIEW_STATE_KEY: &str = "view-state";
pub const PREFERENCES_KEY: &str = "preferences";

/// Key-value facility the view state survives suspension through
pub trait StateStorage {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// One JSON file per key under a directory
#[derive(Debug, Clone)]
pub struct FileStateStorage {
    dir: PathBuf,
}

impl FileStateStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<data dir>/git-lanes`, falling back to `~/.git-lanes`
    pub fn default_dir() -> PathBuf {
        if let Some(data_dir) = dirs::data_dir() {
            data_dir.join("git-lanes")
        } else if let Some(home) = dirs::home_dir() {
            home.join(".git-lanes")
        } else {
            PathBuf::from(".git-lanes")
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StateStorage for FileStateStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(content))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        write_atomic(&self.path(key), value.as_bytes())
    }
}

/// Write to a temp file in the same directory, then rename over the target
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("no parent dir for {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStateStorage {
    values: HashMap<String, String>,
}

impl MemoryStateStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStorage for MemoryStateStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Read and decode a stored value. Missing or unreadable values yield None.
pub fn load_json<T: DeserializeOwned>(storage: &dyn StateStorage, key: &str) -> Option<T> {
    let raw = match storage.get(key) {
        Ok(raw) => raw?,
        Err(e) => {
            warn!("unable to read stored {key}: {e:#}");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("discarding stored {key}: {e}");
            None
        }
    }
}

pub fn save_json<T: Serialize>(storage: &mut dyn StateStorage, key: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string(value).with_context(|| format!("Failed to encode {key}"))?;
    storage.set(key, &json)
}

// ── Preferences ──

/// Process-wide choices the user made in dialogs. Loaded once at startup and
/// handed to whatever needs them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    /// Skip the confirmation before checking out a commit (detached HEAD)
    pub always_accept_checkout_commit: bool,
    /// Push tags without first checking which remotes contain the commit
    pub push_tag_skip_remote_check: bool,
    pub issue_linking_hint_dismissed: bool,
}

impl UserPreferences {
    pub fn load(storage: &dyn StateStorage) -> Self {
        load_json(storage, PREFERENCES_KEY).unwrap_or_default()
    }

    pub fn save(&self, storage: &mut dyn StateStorage) -> Result<()> {
        save_json(storage, PREFERENCES_KEY, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_round_trips() {
        let mut storage = MemoryStateStorage::new();
        assert_eq!(storage.get("k").unwrap(), None);
        storage.set("k", "v").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn file_storage_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let mut storage = FileStateStorage::new(tmp.path().join("nested/state"));
        storage.set(VIEW_STATE_KEY, "{}").unwrap();
        assert!(storage.dir().join("view-state.json").exists());
        assert_eq!(storage.get(VIEW_STATE_KEY).unwrap().as_deref(), Some("{}"));
        assert_eq!(storage.get("missing").unwrap(), None);
    }

    #[test]
    fn corrupt_value_is_discarded() {
        let mut storage = MemoryStateStorage::new();
        storage.set(PREFERENCES_KEY, "{not json").unwrap();
        assert_eq!(UserPreferences::load(&storage), UserPreferences::default());
    }

    #[test]
    fn preferences_persist() {
        let tmp = tempfile::tempdir().unwrap();
        let mut storage = FileStateStorage::new(tmp.path());
        let prefs = UserPreferences {
            always_accept_checkout_commit: true,
            ..Default::default()
        };
        prefs.save(&mut storage).unwrap();
        assert_eq!(UserPreferences::load(&storage), prefs);
    }

    #[test]
    fn missing_preference_fields_default() {
        let mut storage = MemoryStateStorage::new();
        storage.set(PREFERENCES_KEY, r#"{"push_tag_skip_remote_check":true}"#).unwrap();
        let prefs = UserPreferences::load(&storage);
        assert!(prefs.push_tag_skip_remote_check);
        assert!(!prefs.always_accept_checkout_commit);
    }
}

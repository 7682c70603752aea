//! Client-side key/value storage
//!
//! Session data (auth token, cached profile) goes through a typed
//! [`SessionStorage`] that is handed to whoever needs it, rather than being
//! read from a global. The raw string store underneath is pluggable.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CycleError;

/// Untyped string store
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, CycleError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), CycleError>;
    fn remove(&mut self, key: &str) -> Result<(), CycleError>;
}

/// Store held in process memory
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, CycleError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), CycleError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), CycleError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON object file
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, CycleError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let json = fs::read_to_string(&self.path)?;
        if json.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&json).map_err(|e| {
            CycleError::Storage(format!("{} is not a JSON object of strings: {}", self.path.display(), e))
        })
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), CycleError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(entries)?)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, CycleError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), CycleError> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)?;
        debug!(key, path = %self.path.display(), "stored value");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), CycleError> {
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
            debug!(key, path = %self.path.display(), "removed value");
        }
        Ok(())
    }
}

/// A named storage slot with a fixed value type
pub trait StorageKey {
    const NAME: &'static str;
    type Value: Serialize + DeserializeOwned;
}

/// Bearer token for the system of record
pub struct AuthToken;

impl StorageKey for AuthToken {
    const NAME: &'static str = "token";
    type Value = String;
}

/// Profile of the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Last profile fetched from the backend
pub struct CachedProfile;

impl StorageKey for CachedProfile {
    const NAME: &'static str = "profile";
    type Value = UserProfile;
}

/// Typed view over a [`KeyValueStore`]
pub struct SessionStorage<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> SessionStorage<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Read a slot.
    ///
    /// A value that no longer decodes is logged and reported as absent.
    pub fn get<K: StorageKey>(&self, _key: K) -> Result<Option<K::Value>, CycleError> {
        let Some(raw) = self.store.get(K::NAME)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key = K::NAME, error = %e, "discarding undecodable stored value");
                Ok(None)
            }
        }
    }

    pub fn set<K: StorageKey>(&mut self, _key: K, value: &K::Value) -> Result<(), CycleError> {
        let raw = serde_json::to_string(value)?;
        self.store.set(K::NAME, &raw)
    }

    pub fn remove<K: StorageKey>(&mut self, _key: K) -> Result<(), CycleError> {
        self.store.remove(K::NAME)
    }

    /// Drop every session slot, as on sign-out
    pub fn clear(&mut self) -> Result<(), CycleError> {
        self.store.remove(AuthToken::NAME)?;
        self.store.remove(CachedProfile::NAME)
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn profile() -> UserProfile {
        UserProfile {
            id: "u-1".to_string(),
            full_name: "Lan Nguyen".to_string(),
            email: Some("lan@example.com".to_string()),
        }
    }

    #[test]
    fn test_session_storage_typed_roundtrip() {
        let mut session = SessionStorage::new(MemoryStore::new());
        assert_eq!(session.get(AuthToken).unwrap(), None);

        session.set(AuthToken, &"abc123".to_string()).unwrap();
        session.set(CachedProfile, &profile()).unwrap();

        assert_eq!(session.get(AuthToken).unwrap(), Some("abc123".to_string()));
        assert_eq!(session.get(CachedProfile).unwrap(), Some(profile()));

        session.remove(AuthToken).unwrap();
        assert_eq!(session.get(AuthToken).unwrap(), None);
        assert!(session.get(CachedProfile).unwrap().is_some());
    }

    #[test]
    fn test_undecodable_value_reads_as_absent() {
        let mut store = MemoryStore::new();
        store.set(CachedProfile::NAME, "{not json").unwrap();

        let session = SessionStorage::new(store);
        assert_eq!(session.get(CachedProfile).unwrap(), None);
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut session = SessionStorage::new(FileStore::new(&path));
        session.set(AuthToken, &"tok".to_string()).unwrap();
        session.set(CachedProfile, &profile()).unwrap();

        let reopened = SessionStorage::new(FileStore::new(&path));
        assert_eq!(reopened.get(AuthToken).unwrap(), Some("tok".to_string()));

        let mut reopened = reopened;
        reopened.clear().unwrap();
        let store = reopened.into_inner();
        assert_eq!(store.get(AuthToken::NAME).unwrap(), None);
        assert_eq!(store.get(CachedProfile::NAME).unwrap(), None);
    }

    #[test]
    fn test_file_store_rejects_non_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "[1, 2]").unwrap();

        let store = FileStore::new(&path);
        assert!(matches!(store.get("token"), Err(CycleError::Storage(_))));
    }
}

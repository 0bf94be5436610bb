//! Key-value persistence for the signed-in session.
//!
//! The store is injected wherever it is needed so tests can swap the
//! file-backed store for [`MemoryStore`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::errors::{RegistryError, Result};

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&self, key: &str, value: Value) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Keeps every entry in a single JSON object on disk, rewritten on each change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, Value>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = fs::read(&self.path)?;
        if raw.is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_slice(&raw).map_err(|err| RegistryError::CorruptStore {
            path: self.path.clone(),
            detail: err.to_string(),
        })
    }

    fn persist(&self, entries: &BTreeMap<String, Value>) -> Result<()> {
        let body = serde_json::to_vec_pretty(entries)?;
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, body)?;
        fs::rename(staging, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let _guard = self.lock.lock();
        Ok(self.load()?.remove(key))
    }

    #[instrument(skip(self, value), fields(path = %self.path.display()))]
    fn set(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self.lock.lock();
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value);
        self.persist(&entries)
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

/// Typed access to the `token` and `user` entries.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn save_token(&self, token: &str) -> Result<()> {
        debug!("persisting session token");
        self.store.set(TOKEN_KEY, Value::String(token.to_string()))
    }

    pub fn token(&self) -> Result<Option<String>> {
        Ok(self
            .store
            .get(TOKEN_KEY)?
            .and_then(|value| value.as_str().map(str::to_string)))
    }

    pub fn save_user(&self, user: Value) -> Result<()> {
        debug!("persisting session user");
        self.store.set(USER_KEY, user)
    }

    pub fn user(&self) -> Result<Option<Value>> {
        self.store.get(USER_KEY)
    }

    pub fn clear(&self) -> Result<()> {
        self.store.remove(TOKEN_KEY)?;
        self.store.remove(USER_KEY)
    }
}

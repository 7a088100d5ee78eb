//! Persistence Boundary
//!
//! Stores never touch storage themselves. The facade calls the pure
//! `load_*` / `save_*` / `clear_*` functions here against whatever
//! [`KeyValueStorage`] the front end provides.
//!
//! Every key holds `{"state": ..., "version": 0}` so values written by
//! older front ends stay readable.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use super::session::Session;
use crate::error::{ClientError, ClientResult};
use crate::models::{Group, GroupId, NotificationCounts};

pub const AUTH_KEY: &str = "auth-storage";
pub const CHAT_KEY: &str = "chat-storage";
pub const NOTIFICATION_KEY: &str = "notification-storage";

const ALL_KEYS: [&str; 3] = [AUTH_KEY, CHAT_KEY, NOTIFICATION_KEY];
const STATE_VERSION: u32 = 0;

/// String key-value backend
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> ClientResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> ClientResult<()>;
    fn remove(&self, key: &str) -> ClientResult<()>;
}

#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        Ok(self
            .entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }
}

/// One JSON file per key under a directory
#[cfg(not(target_arch = "wasm32"))]
pub struct FileStorage {
    dir: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileStorage {
    pub fn new(dir: impl Into<std::path::PathBuf>) -> ClientResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| ClientError::Storage(format!("{}: {}", dir.display(), e)))?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> std::path::PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ClientError::Storage(e.to_string())),
        }
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        // Write then rename so a crash never leaves half a file
        let tmp = self.dir.join(format!("{}.json.tmp", key));
        std::fs::write(&tmp, value).map_err(|e| ClientError::Storage(e.to_string()))?;
        std::fs::rename(&tmp, self.path(key)).map_err(|e| ClientError::Storage(e.to_string()))
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        match std::fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClientError::Storage(e.to_string())),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    state: T,
    #[serde(default)]
    version: u32,
}

/// Persisted slice of the groups/chat state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSnapshot {
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub current_group_id: Option<GroupId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CountsSnapshot {
    #[serde(default)]
    unread_count: u32,
    #[serde(default)]
    total_count: u32,
}

fn load<T: DeserializeOwned>(storage: &dyn KeyValueStorage, key: &str) -> Option<T> {
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(key, error = %e, "Failed to read persisted state");
            return None;
        }
    };

    match serde_json::from_str::<Envelope<T>>(&raw) {
        Ok(envelope) => Some(envelope.state),
        Err(e) => {
            tracing::warn!(key, error = %e, "Discarding unreadable persisted state");
            None
        }
    }
}

fn save<T: Serialize>(storage: &dyn KeyValueStorage, key: &str, state: &T) -> ClientResult<()> {
    let raw = serde_json::to_string(&Envelope {
        state,
        version: STATE_VERSION,
    })?;
    storage.set(key, &raw)
}

pub fn load_session(storage: &dyn KeyValueStorage) -> Option<Session> {
    load::<Session>(storage, AUTH_KEY).filter(|s| !s.is_authenticated || s.token.is_some())
}

pub fn save_session(storage: &dyn KeyValueStorage, session: &Session) -> ClientResult<()> {
    save(storage, AUTH_KEY, session)
}

pub fn clear_session(storage: &dyn KeyValueStorage) -> ClientResult<()> {
    storage.remove(AUTH_KEY)
}

pub fn load_chat(storage: &dyn KeyValueStorage) -> Option<ChatSnapshot> {
    load(storage, CHAT_KEY)
}

pub fn save_chat(storage: &dyn KeyValueStorage, snapshot: &ChatSnapshot) -> ClientResult<()> {
    save(storage, CHAT_KEY, snapshot)
}

pub fn clear_chat(storage: &dyn KeyValueStorage) -> ClientResult<()> {
    storage.remove(CHAT_KEY)
}

pub fn load_counts(storage: &dyn KeyValueStorage) -> Option<NotificationCounts> {
    load::<CountsSnapshot>(storage, NOTIFICATION_KEY).map(|c| NotificationCounts {
        unread_count: c.unread_count,
        total_count: c.total_count,
    })
}

pub fn save_counts(storage: &dyn KeyValueStorage, counts: NotificationCounts) -> ClientResult<()> {
    let snapshot = CountsSnapshot {
        unread_count: counts.unread_count,
        total_count: counts.total_count,
    };
    save(storage, NOTIFICATION_KEY, &snapshot)
}

pub fn clear_counts(storage: &dyn KeyValueStorage) -> ClientResult<()> {
    storage.remove(NOTIFICATION_KEY)
}

/// Remove every namespaced key; keeps going past individual failures
pub fn clear_all(storage: &dyn KeyValueStorage) -> ClientResult<()> {
    let mut first_error = None;
    for key in ALL_KEYS {
        if let Err(e) = storage.remove(key) {
            tracing::warn!(key, error = %e, "Failed to clear persisted state");
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

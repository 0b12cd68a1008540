//! Key-value seam between the movie store and the storage medium.
//!
//! The store only ever addresses three fixed keys, each holding one JSON
//! blob. [`KeyValueStore`] is implemented by the LMDB backend
//! ([`crate::local_db_state::AppDbState`]) and by [`MemoryStore`], the
//! in-memory stand-in used by tests and by hosts that do not persist.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, PoisonError};

use crate::app_response::AppResponse;

/// The fixed keys managed by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    UserProfile,
    FavoriteMovies,
    Notifications,
}

impl StorageKey {
    pub const ALL: [StorageKey; 3] = [
        StorageKey::UserProfile,
        StorageKey::FavoriteMovies,
        StorageKey::Notifications,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::UserProfile => "user_profile",
            StorageKey::FavoriteMovies => "favorite_movies",
            StorageKey::Notifications => "notifications",
        }
    }
}

impl Display for StorageKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Independent get/set/remove per key. No operation spans two keys
/// atomically, including [`KeyValueStore::multi_remove`].
pub trait KeyValueStore: Send + Sync {
    /// Raw JSON stored under `key`, `None` when unset.
    fn get(&self, key: StorageKey) -> Result<Option<String>, AppResponse>;

    fn set(&self, key: StorageKey, value: &str) -> Result<(), AppResponse>;

    /// Removing an unset key is not an error.
    fn remove(&self, key: StorageKey) -> Result<(), AppResponse>;

    fn multi_remove(&self, keys: &[StorageKey]) -> Result<(), AppResponse> {
        for key in keys {
            self.remove(*key)?;
        }
        Ok(())
    }
}

/// Volatile [`KeyValueStore`] backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<StorageKey, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a raw value, bypassing serialization. Handy for loading records
    /// written by an older release.
    pub fn with_raw(self, key: StorageKey, raw: impl Into<String>) -> Self {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, raw.into());
        self
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: StorageKey) -> Result<Option<String>, AppResponse> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(&key).cloned())
    }

    fn set(&self, key: StorageKey, value: &str) -> Result<(), AppResponse> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: StorageKey) -> Result<(), AppResponse> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(&key);
        Ok(())
    }
}

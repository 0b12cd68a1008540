//! LMDB-backed storage for the three movie-shelf records.
//!
//! One environment directory (`<name>.lmdb`) holds one unnamed database.
//! Each [`StorageKey`] maps to a single JSON blob, and every write commits
//! its own read-write transaction, so a record is either fully replaced or
//! left untouched. There is no transaction spanning two keys.

use std::fs;
use std::path::{Path, PathBuf};

use lmdb::{Database, DatabaseFlags, Environment, Transaction, WriteFlags};
use log::{debug, info, warn};

use crate::app_response::AppResponse;
use crate::key_value::{KeyValueStore, StorageKey};
use crate::store_config::StoreConfig;

pub struct AppDbState {
    env: Environment,
    db: Database,
    path: PathBuf,
}

impl AppDbState {
    /// Opens (or creates) the environment described by `config`.
    pub fn init(config: &StoreConfig) -> Result<Self, AppResponse> {
        config.validate()?;
        let path = PathBuf::from(config.lmdb_dir());

        fs::create_dir_all(&path).map_err(|e| {
            AppResponse::DatabaseError(format!("Cannot create {}: {e}", path.display()))
        })?;

        let env = Environment::new()
            .set_max_dbs(1)
            .set_map_size(config.map_size)
            .open(&path)?;
        let db = env.create_db(None, DatabaseFlags::empty())?;

        info!("Opened LMDB environment at {}", path.display());
        Ok(AppDbState { env, db, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes committed data to disk. The environment itself is released
    /// when the state is dropped.
    pub fn close_database(&self) -> Result<(), AppResponse> {
        self.env.sync(true)?;
        info!("LMDB environment at {} synced for close", self.path.display());
        Ok(())
    }
}

impl KeyValueStore for AppDbState {
    fn get(&self, key: StorageKey) -> Result<Option<String>, AppResponse> {
        let txn = self.env.begin_ro_txn()?;
        let value = match txn.get(self.db, &key.as_str()) {
            Ok(bytes) => {
                let json = std::str::from_utf8(bytes).map_err(|e| {
                    AppResponse::SerializationError(format!("Invalid UTF-8 under '{key}': {e}"))
                })?;
                Some(json.to_string())
            }
            Err(lmdb::Error::NotFound) => None,
            Err(e) => return Err(AppResponse::from(e)),
        };
        txn.abort();
        debug!("Read '{}' ({})", key, if value.is_some() { "hit" } else { "miss" });
        Ok(value)
    }

    fn set(&self, key: StorageKey, value: &str) -> Result<(), AppResponse> {
        let mut txn = self.env.begin_rw_txn()?;
        txn.put(self.db, &key.as_str(), &value, WriteFlags::empty())?;
        txn.commit()?;
        debug!("Wrote '{}' ({} bytes)", key, value.len());
        Ok(())
    }

    fn remove(&self, key: StorageKey) -> Result<(), AppResponse> {
        let mut txn = self.env.begin_rw_txn()?;
        match txn.del(self.db, &key.as_str(), None) {
            Ok(()) => {}
            Err(lmdb::Error::NotFound) => debug!("Remove of unset key '{}'", key),
            Err(e) => {
                warn!("Failed to remove '{}': {e}", key);
                return Err(AppResponse::from(e));
            }
        }
        txn.commit()?;
        Ok(())
    }

    fn multi_remove(&self, keys: &[StorageKey]) -> Result<(), AppResponse> {
        let mut txn = self.env.begin_rw_txn()?;
        for key in keys {
            match txn.del(self.db, &key.as_str(), None) {
                Ok(()) | Err(lmdb::Error::NotFound) => {}
                Err(e) => return Err(AppResponse::from(e)),
            }
        }
        txn.commit()?;
        debug!("Removed {} key(s)", keys.len());
        Ok(())
    }
}

//! Store configuration passed by the host when opening the database.

use serde::{Deserialize, Serialize};

use crate::app_response::AppResponse;

const DEFAULT_NAME: &str = "movie_shelf";
const DEFAULT_MAP_SIZE: usize = 10 * 1024 * 1024;
const DEFAULT_PROFILE_NAME: &str = "Movie fan";

/// Every field is optional in JSON; `{}` yields [`StoreConfig::default`].
///
/// ```json
/// { "name": "/data/user/0/app/files/shelf", "mapSize": 10485760, "defaultProfileName": "Movie fan" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    /// Path stem of the database; the LMDB directory is `<name>.lmdb`.
    pub name: String,
    /// LMDB map size in bytes.
    pub map_size: usize,
    /// Name given to a profile synthesized on empty storage.
    pub default_profile_name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            name: DEFAULT_NAME.to_string(),
            map_size: DEFAULT_MAP_SIZE,
            default_profile_name: DEFAULT_PROFILE_NAME.to_string(),
        }
    }
}

impl StoreConfig {
    pub fn named(name: impl Into<String>) -> Self {
        StoreConfig {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, AppResponse> {
        let config: StoreConfig = if json.trim().is_empty() {
            StoreConfig::default()
        } else {
            serde_json::from_str(json)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppResponse> {
        if self.name.trim().is_empty() {
            return Err(AppResponse::ValidationError("Database name cannot be empty".to_string()));
        }
        if self.map_size == 0 {
            return Err(AppResponse::ValidationError("Map size must be greater than zero".to_string()));
        }
        if self.default_profile_name.trim().is_empty() {
            return Err(AppResponse::ValidationError("Default profile name cannot be empty".to_string()));
        }
        Ok(())
    }

    pub fn lmdb_dir(&self) -> String {
        format!("{}.lmdb", self.name)
    }
}

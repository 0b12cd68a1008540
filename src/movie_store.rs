//! Persistence rules for the profile, the favorite list and the notification log.
//!
//! [`MovieStore`] owns a [`KeyValueStore`] and is the only authority over
//! the three records; anything the host displays is a snapshot re-read from
//! here. Storage failures never leave this module: they are logged, passed
//! to the optional [`ErrorObserver`], and replaced by a safe default
//! (`None`, an empty list, `false`). Only validation and permission
//! problems are returned to the caller, and those are raised before any
//! write happens. Edits that start from the stored profile or favorite list
//! refuse to run when that record cannot be read, so a default is never
//! written over existing data.
//!
//! Read-modify-write sequences (log append, favorite toggle, profile edits)
//! hold a store-wide lock so two callers sharing one store cannot lose each
//! other's updates. Different keys are still written by separate commits.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::app_response::AppResponse;
use crate::key_value::{KeyValueStore, StorageKey};
use crate::movie_model::{
    name_avatar_url, AvatarChoice, AvatarKind, DeleteOptions, LocalAlert, Movie, NotificationKind,
    StoredProfile, UserNotification, UserProfile,
};
use crate::notifier::Notifier;
use crate::store_config::StoreConfig;

/// A storage failure swallowed by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreFailure {
    pub operation: &'static str,
    pub key: StorageKey,
    pub error: AppResponse,
}

pub type ErrorObserver = Arc<dyn Fn(&StoreFailure) + Send + Sync>;

/// Result of [`MovieStore::toggle_favorite`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteToggle {
    pub movie_id: String,
    /// Membership after the toggle.
    pub is_favorite: bool,
    pub notification: UserNotification,
    /// Alert requested from the platform, `None` when notifications are off.
    pub alert: Option<LocalAlert>,
    /// Whether the platform accepted the alert request.
    pub alert_scheduled: bool,
}

pub struct MovieStore<S: KeyValueStore> {
    backend: S,
    default_profile_name: String,
    observer: Option<ErrorObserver>,
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore> MovieStore<S> {
    pub fn new(backend: S) -> Self {
        Self::with_config(backend, &StoreConfig::default())
    }

    pub fn with_config(backend: S, config: &StoreConfig) -> Self {
        MovieStore {
            backend,
            default_profile_name: config.default_profile_name.clone(),
            observer: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Installs a hook called for every swallowed storage failure. Default
    /// behavior is unchanged.
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&StoreFailure) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn default_profile(&self) -> UserProfile {
        UserProfile::default_named(&self.default_profile_name)
    }

    // ----- plumbing -----

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn report(&self, operation: &'static str, key: StorageKey, error: AppResponse) {
        warn!("Error {operation} ('{key}'): {error}");
        if let Some(observer) = &self.observer {
            observer(&StoreFailure { operation, key, error });
        }
    }

    fn read_json<T: DeserializeOwned>(&self, key: StorageKey) -> Result<Option<T>, AppResponse> {
        match self.backend.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn write_json<T: Serialize + ?Sized>(&self, key: StorageKey, value: &T) -> Result<(), AppResponse> {
        let json = serde_json::to_string(value)?;
        self.backend.set(key, &json)
    }

    fn read_list<T: DeserializeOwned>(&self, operation: &'static str, key: StorageKey) -> Vec<T> {
        match self.read_json::<Vec<T>>(key) {
            Ok(list) => list.unwrap_or_default(),
            Err(e) => {
                self.report(operation, key, e);
                Vec::new()
            }
        }
    }

    fn persist_profile(&self, operation: &'static str, profile: &UserProfile) {
        if let Err(e) = self.write_json(StorageKey::UserProfile, profile) {
            self.report(operation, StorageKey::UserProfile, e);
        }
    }

    /// Loads the profile, synthesizing or migrating it as needed. Caller
    /// holds the lock.
    fn load_profile(&self) -> Option<UserProfile> {
        let stored = match self.read_json::<StoredProfile>(StorageKey::UserProfile) {
            Ok(stored) => stored,
            Err(e) => {
                self.report("getting user profile", StorageKey::UserProfile, e);
                return None;
            }
        };

        match stored {
            None => {
                let profile = self.default_profile();
                info!("No stored profile; synthesized default for '{}'", profile.name);
                self.persist_profile("saving default profile", &profile);
                Some(profile)
            }
            Some(stored) => {
                let (profile, migrated) = stored.upgrade();
                if migrated {
                    info!("Backfilled missing profile fields");
                    self.persist_profile("saving migrated profile", &profile);
                }
                Some(profile)
            }
        }
    }

    fn append_notification(&self, entry: UserNotification) {
        let mut log: Vec<UserNotification> = self.read_list("getting notifications", StorageKey::Notifications);
        log.push(entry);
        if let Err(e) = self.write_json(StorageKey::Notifications, &log) {
            self.report("saving notification", StorageKey::Notifications, e);
        }
    }

    // ----- profile -----

    /// The stored profile. On empty storage a default profile is created and
    /// persisted; `None` only when storage cannot be read.
    pub fn user_profile(&self) -> Option<UserProfile> {
        let _guard = self.lock();
        self.load_profile()
    }

    /// Overwrites the profile record unconditionally.
    pub fn save_user_profile(&self, profile: &UserProfile) {
        let _guard = self.lock();
        self.persist_profile("saving user profile", profile);
    }

    /// Renames the user. A name-generated avatar follows the new name; any
    /// other avatar is kept.
    pub fn rename_user(&self, name: &str) -> Result<UserProfile, AppResponse> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppResponse::ValidationError("Name cannot be empty".to_string()));
        }

        let _guard = self.lock();
        let current = self.load_profile().ok_or_else(profile_unavailable)?;
        let avatar_url = match current.avatar_kind() {
            AvatarKind::NameGenerated => name_avatar_url(name),
            _ => current.avatar_url,
        };
        let profile = UserProfile {
            name: name.to_string(),
            notifications_enabled: current.notifications_enabled,
            avatar_url,
        };
        self.persist_profile("saving user profile", &profile);
        Ok(profile)
    }

    pub fn set_avatar(&self, choice: &AvatarChoice) -> Result<UserProfile, AppResponse> {
        choice.validate()?;

        let _guard = self.lock();
        let mut profile = self.load_profile().ok_or_else(profile_unavailable)?;
        profile.avatar_url = choice.resolve(&profile.name)?;
        self.persist_profile("saving avatar", &profile);
        Ok(profile)
    }

    /// Notification preference; `false` when the profile cannot be read.
    pub fn notifications_enabled(&self) -> bool {
        let _guard = self.lock();
        self.load_profile().is_some_and(|p| p.notifications_enabled)
    }

    pub fn set_notifications_enabled(&self, enabled: bool) {
        let _guard = self.lock();
        if let Some(mut profile) = self.load_profile() {
            profile.notifications_enabled = enabled;
            self.persist_profile("saving notifications setting", &profile);
        }
    }

    /// Switches notifications, refusing to turn them on without a granted
    /// platform permission.
    pub fn enable_notifications(&self, enabled: bool, permission_granted: bool) -> Result<(), AppResponse> {
        if enabled && !permission_granted {
            return Err(AppResponse::PermissionDenied(
                "Allow notifications in the device settings to turn them on".to_string(),
            ));
        }
        self.set_notifications_enabled(enabled);
        Ok(())
    }

    // ----- favorites -----

    pub fn favorite_movies(&self) -> Vec<String> {
        self.read_list("getting favorite movies", StorageKey::FavoriteMovies)
    }

    /// Overwrites the whole favorite list.
    pub fn save_favorite_movies(&self, ids: &[String]) {
        let _guard = self.lock();
        if let Err(e) = self.write_json(StorageKey::FavoriteMovies, ids) {
            self.report("saving favorite movies", StorageKey::FavoriteMovies, e);
        }
    }

    pub fn is_favorite(&self, movie_id: &str) -> bool {
        self.favorite_movies().iter().any(|id| id == movie_id)
    }

    /// Flips the favorite state of `movie`, records the change in the
    /// notification log and, when the user allows it, asks `notifier` for an
    /// immediate alert.
    ///
    /// Returns `None` without writing anything when the current favorite list
    /// cannot be read, so an unreadable list is never replaced by a fresh one.
    /// Also `None` when the updated list cannot be written: the stored
    /// membership is unchanged, so no log entry or alert is produced.
    /// A failed alert request is logged and reported through
    /// [`FavoriteToggle::alert_scheduled`] only.
    pub fn toggle_favorite(&self, movie: &Movie, notifier: &dyn Notifier) -> Option<FavoriteToggle> {
        let guard = self.lock();

        let mut favorites = match self.read_json::<Vec<String>>(StorageKey::FavoriteMovies) {
            Ok(list) => list.unwrap_or_default(),
            Err(e) => {
                self.report("toggling favorite", StorageKey::FavoriteMovies, e);
                return None;
            }
        };

        let was_favorite = favorites.contains(&movie.id);
        if was_favorite {
            favorites.retain(|id| id != &movie.id);
        } else {
            favorites.push(movie.id.clone());
        }
        if let Err(e) = self.write_json(StorageKey::FavoriteMovies, &favorites) {
            self.report("toggling favorite", StorageKey::FavoriteMovies, e);
            return None;
        }

        let kind = if was_favorite {
            NotificationKind::RemoveFavorite
        } else {
            NotificationKind::AddFavorite
        };
        let notification = UserNotification::now(kind, movie);
        self.append_notification(notification.clone());

        let alerts_on = self.load_profile().is_some_and(|p| p.notifications_enabled);
        drop(guard);

        debug!("Toggled favorite '{}' -> {}", movie.id, !was_favorite);

        let alert = alerts_on.then(|| LocalAlert::for_favorite_change(kind, movie));
        let alert_scheduled = match &alert {
            Some(alert) => match notifier.schedule(alert) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Failed to schedule notification for '{}': {e}", movie.id);
                    false
                }
            },
            None => false,
        };

        Some(FavoriteToggle {
            movie_id: movie.id.clone(),
            is_favorite: !was_favorite,
            notification,
            alert,
            alert_scheduled,
        })
    }

    // ----- notification log -----

    /// Appends one entry (read, push, write back the whole log).
    pub fn save_notification(&self, entry: UserNotification) {
        let _guard = self.lock();
        self.append_notification(entry);
    }

    pub fn notifications(&self) -> Vec<UserNotification> {
        self.read_list("getting notifications", StorageKey::Notifications)
    }

    pub fn clear_notifications(&self) {
        let _guard = self.lock();
        if let Err(e) = self.backend.remove(StorageKey::Notifications) {
            self.report("clearing notifications", StorageKey::Notifications, e);
        }
    }

    // ----- wipes -----

    /// Removes the records selected by `options`. A removed profile is
    /// replaced by a fresh default right away.
    ///
    /// Returns `true` when favorites were removed and views built from them
    /// are stale.
    pub fn delete_profile(&self, options: DeleteOptions) -> bool {
        let keys: Vec<StorageKey> = [
            (options.delete_settings, StorageKey::UserProfile),
            (options.delete_favorites, StorageKey::FavoriteMovies),
            (options.delete_notifications, StorageKey::Notifications),
        ]
        .into_iter()
        .filter_map(|(selected, key)| selected.then_some(key))
        .collect();

        if keys.is_empty() {
            return false;
        }

        let _guard = self.lock();
        if let Err(e) = self.backend.multi_remove(&keys) {
            self.report("deleting profile data", keys[0], e);
        }
        info!("Deleted profile data: {:?}", keys);

        if options.delete_settings {
            let profile = self.default_profile();
            self.persist_profile("saving default profile", &profile);
        }

        options.delete_favorites
    }

    /// Removes every record the store manages. The next profile read
    /// synthesizes a default.
    pub fn clear_all_data(&self) {
        let _guard = self.lock();
        match self.backend.multi_remove(&StorageKey::ALL) {
            Ok(()) => info!("All data cleared successfully"),
            Err(e) => self.report("clearing all data", StorageKey::UserProfile, e),
        }
    }
}

fn profile_unavailable() -> AppResponse {
    AppResponse::DatabaseError("User profile is unavailable".to_string())
}

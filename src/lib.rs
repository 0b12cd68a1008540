//! # Movie Shelf Core
//!
//! On-device storage core for a movie catalog app, designed for FFI
//! integration with Flutter and other cross-platform hosts. The host renders
//! the UI; this library owns the data: a built-in movie catalog, the user's
//! favorite list, an advisory notification log and the user profile, all
//! persisted in LMDB (Lightning Memory-Mapped Database).
//!
//! ## Features
//!
//! - **LMDB-based storage**: one JSON record per fixed key, each write in its own committed transaction
//! - **Catalog queries**: case-insensitive title search with tag intersection, favorites sorted by title or premiere
//! - **Favorite toggle**: flips membership, appends to the notification log and requests a local alert
//! - **Never throws at the host**: storage failures are logged and degrade to safe defaults
//! - **Safe error handling**: No `unwrap()` calls in production code
//!
//! ## Quick Start
//!
//! ```no_run
//! use movie_shelf_core::{create_store, toggle_favorite, get_favorite_movies, free_response};
//! use std::ffi::CString;
//!
//! let config = CString::new(r#"{"name":"shelf"}"#).unwrap();
//! let shelf = create_store(config.as_ptr());
//!
//! let movie_id = CString::new("1").unwrap();
//! let result = toggle_favorite(shelf, movie_id.as_ptr());
//! free_response(result as *mut _);
//!
//! let favorites = get_favorite_movies(shelf);
//! free_response(favorites as *mut _);
//! ```
//!
//! ## FFI Functions
//!
//! Every function below except [`create_store`], [`close_store`] and
//! [`free_response`] returns a JSON-encoded [`AppResponse`] that the caller
//! releases with [`free_response`]:
//!
//! - [`create_store`] / [`close_store`] - Open and release a store handle
//! - [`register_notifier`] - Install the platform local-notification callback
//! - [`get_catalog`], [`get_all_tags`], [`filter_movies`] - Catalog queries
//! - [`get_user_profile`], [`save_user_profile`], [`rename_user`], [`set_avatar`] - Profile
//! - [`get_notifications_enabled`], [`enable_notifications`] - Notification preference
//! - [`get_favorite_movies`], [`get_favorite_view`], [`toggle_favorite`] - Favorites
//! - [`get_notifications`], [`get_recent_notifications`], [`clear_notifications`] - Notification log
//! - [`delete_profile`], [`clear_all_data`] - Wipes

pub mod app_response;
pub mod catalog;
pub mod key_value;
pub mod local_db_state;
pub mod movie_model;
pub mod movie_store;
pub mod notifier;
pub mod store_config;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use log::{info, warn};

pub use crate::app_response::AppResponse;
use crate::catalog::Catalog;
use crate::local_db_state::AppDbState;
use crate::movie_model::{AvatarChoice, DeleteOptions, MovieQuery, SortKey, UserProfile};
use crate::movie_store::MovieStore;
use crate::notifier::{CallbackNotifier, LogNotifier, Notifier, NotifyCallback};
use crate::store_config::StoreConfig;

/// State behind the opaque pointer handed to the host.
pub struct ShelfHandle {
    store: MovieStore<AppDbState>,
    catalog: Catalog,
    notifier: Box<dyn Notifier>,
}

impl ShelfHandle {
    pub fn open(config: &StoreConfig) -> Result<Self, AppResponse> {
        let backend = AppDbState::init(config)?;
        Ok(ShelfHandle {
            store: MovieStore::with_config(backend, config),
            catalog: Catalog::builtin(),
            notifier: Box::new(LogNotifier),
        })
    }

    pub fn store(&self) -> &MovieStore<AppDbState> {
        &self.store
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

/// Opens the store described by a JSON [`StoreConfig`].
///
/// A null pointer or an empty string selects the default configuration.
/// Missing fields take their defaults, so `{"name":"/data/app/shelf"}` is
/// enough to relocate the database.
///
/// # Returns
///
/// A pointer to the [`ShelfHandle`] on success, or a null pointer when the
/// configuration is invalid or the LMDB environment cannot be opened. The
/// handle must be released with [`close_store`].
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use movie_shelf_core::{create_store, close_store};
///
/// let config = CString::new(r#"{"name":"test_shelf","mapSize":1048576}"#).unwrap();
/// let shelf = create_store(config.as_ptr());
/// if !shelf.is_null() {
///     close_store(shelf);
/// }
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_store(config_json: *const c_char) -> *mut ShelfHandle {
    let config = if config_json.is_null() {
        StoreConfig::default()
    } else {
        let raw = match unsafe { CStr::from_ptr(config_json).to_str() } {
            Ok(s) => s,
            Err(e) => {
                warn!("Invalid UTF-8 in config parameter: {e}");
                return std::ptr::null_mut();
            }
        };
        match StoreConfig::from_json(raw) {
            Ok(config) => config,
            Err(e) => {
                warn!("Rejected store configuration: {e}");
                return std::ptr::null_mut();
            }
        }
    };

    info!("Attempting to open store at: {}", config.lmdb_dir());

    match ShelfHandle::open(&config) {
        Ok(handle) => {
            info!("✅ Store initialized successfully");
            Box::into_raw(Box::new(handle))
        }
        Err(e) => {
            warn!("❌ Failed to initialize store: {e}");
            warn!("Attempted path: {}", config.lmdb_dir());
            std::ptr::null_mut()
        }
    }
}

/// Flushes the database and frees the handle.
///
/// The pointer is invalid after this call, whatever the result.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn close_store(state: *mut ShelfHandle) -> *const c_char {
    if state.is_null() {
        let error = AppResponse::BadRequest("Null state pointer passed to close_store".to_string());
        return response_to_c_string(&error);
    }

    let handle = unsafe { Box::from_raw(state) };
    let response = match handle.store.backend().close_database() {
        Ok(()) => AppResponse::success("Store closed successfully"),
        Err(e) => e,
    };
    drop(handle);
    response_to_c_string(&response)
}

/// Releases a string returned by any other function of this library.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_response(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }
    drop(unsafe { CString::from_raw(ptr) });
}

/// Installs the platform scheduler used for favorite alerts. Passing a null
/// callback goes back to logging alerts only.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn register_notifier(state: *mut ShelfHandle, callback: Option<NotifyCallback>) -> *const c_char {
    let handle = match unsafe { state.as_mut() } {
        Some(h) => h,
        None => return null_state("register_notifier"),
    };

    handle.notifier = match callback {
        Some(cb) => Box::new(CallbackNotifier::new(cb)),
        None => Box::new(LogNotifier),
    };
    response_to_c_string(&AppResponse::success("Notifier registered"))
}

/// Every movie in the catalog, in catalog order.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_catalog(state: *mut ShelfHandle) -> *const c_char {
    with_handle(state, "get_catalog", |h| AppResponse::ok_json(h.catalog.movies()))
}

/// Sorted, de-duplicated tag labels for the filter chips.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_all_tags(state: *mut ShelfHandle) -> *const c_char {
    with_handle(state, "get_all_tags", |h| AppResponse::ok_json(&catalog::all_tags(&h.catalog)))
}

/// Filters the catalog with a JSON [`MovieQuery`]: `{"search":"dune","tags":["Sci-Fi"]}`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn filter_movies(state: *mut ShelfHandle, query_json: *const c_char) -> *const c_char {
    with_handle(state, "filter_movies", |h| {
        let query: MovieQuery = match parse_json_arg(query_json, "query") {
            Ok(q) => q,
            Err(e) => return e,
        };
        AppResponse::ok_json(&catalog::query_movies(&h.catalog, &query))
    })
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_user_profile(state: *mut ShelfHandle) -> *const c_char {
    with_handle(state, "get_user_profile", |h| match h.store.user_profile() {
        Some(profile) => AppResponse::ok_json(&profile),
        None => AppResponse::DatabaseError("User profile is unavailable".to_string()),
    })
}

/// Overwrites the profile with a JSON [`UserProfile`]. An empty name is
/// rejected before anything is written.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn save_user_profile(state: *mut ShelfHandle, json_ptr: *const c_char) -> *const c_char {
    with_handle(state, "save_user_profile", |h| {
        let profile: UserProfile = match parse_json_arg(json_ptr, "profile") {
            Ok(p) => p,
            Err(e) => return e,
        };
        if let Err(e) = profile.validate() {
            return e;
        }
        h.store.save_user_profile(&profile);
        AppResponse::ok_json(&profile)
    })
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn rename_user(state: *mut ShelfHandle, name: *const c_char) -> *const c_char {
    with_handle(state, "rename_user", |h| {
        let name = match c_ptr_to_string(name, "name") {
            Ok(n) => n,
            Err(e) => return e,
        };
        match h.store.rename_user(&name) {
            Ok(profile) => AppResponse::ok_json(&profile),
            Err(e) => e,
        }
    })
}

/// Applies a JSON [`AvatarChoice`]: `{"kind":"bundled","value":3}`,
/// `{"kind":"custom","value":"file:///..."}` or `{"kind":"name_generated"}`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn set_avatar(state: *mut ShelfHandle, choice_json: *const c_char) -> *const c_char {
    with_handle(state, "set_avatar", |h| {
        let choice: AvatarChoice = match parse_json_arg(choice_json, "avatar choice") {
            Ok(c) => c,
            Err(e) => return e,
        };
        match h.store.set_avatar(&choice) {
            Ok(profile) => AppResponse::ok_json(&profile),
            Err(e) => e,
        }
    })
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_notifications_enabled(state: *mut ShelfHandle) -> *const c_char {
    with_handle(state, "get_notifications_enabled", |h| {
        AppResponse::ok_json(&h.store.notifications_enabled())
    })
}

/// Turns notifications on or off. Turning them on requires the host to
/// report a granted platform permission.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn enable_notifications(
    state: *mut ShelfHandle,
    enabled: bool,
    permission_granted: bool,
) -> *const c_char {
    with_handle(state, "enable_notifications", |h| {
        match h.store.enable_notifications(enabled, permission_granted) {
            Ok(()) => AppResponse::ok_json(&enabled),
            Err(e) => e,
        }
    })
}

/// Favorite movie ids in insertion order.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_favorite_movies(state: *mut ShelfHandle) -> *const c_char {
    with_handle(state, "get_favorite_movies", |h| AppResponse::ok_json(&h.store.favorite_movies()))
}

/// Favorite movies resolved against the catalog and sorted by `"title"` or
/// `"date"`. A null sort key means `"title"`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_favorite_view(state: *mut ShelfHandle, sort_key: *const c_char) -> *const c_char {
    with_handle(state, "get_favorite_view", |h| {
        let key = if sort_key.is_null() {
            SortKey::default()
        } else {
            let raw = match c_ptr_to_string(sort_key, "sort key") {
                Ok(s) => s,
                Err(e) => return e,
            };
            match SortKey::parse(&raw) {
                Some(k) => k,
                None => return AppResponse::BadRequest(format!("Unknown sort key: {raw}")),
            }
        };
        let ids = h.store.favorite_movies();
        AppResponse::ok_json(&catalog::favorite_movies(&h.catalog, &ids, key))
    })
}

/// Flips the favorite state of a catalog movie.
///
/// Returns the [`movie_store::FavoriteToggle`] as JSON; unknown ids are
/// `NotFound` and write nothing. `DatabaseError` when the favorite list
/// cannot be read or saved.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn toggle_favorite(state: *mut ShelfHandle, movie_id: *const c_char) -> *const c_char {
    with_handle(state, "toggle_favorite", |h| {
        let id = match c_ptr_to_string(movie_id, "movie id") {
            Ok(id) => id,
            Err(e) => return e,
        };
        let movie = match h.catalog.find(&id) {
            Some(m) => m,
            None => return AppResponse::NotFound(format!("No movie found with id: {id}")),
        };
        match h.store.toggle_favorite(movie, h.notifier.as_ref()) {
            Some(outcome) => AppResponse::ok_json(&outcome),
            None => AppResponse::DatabaseError("Favorite list could not be updated".to_string()),
        }
    })
}

/// Notification log in insertion order.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_notifications(state: *mut ShelfHandle) -> *const c_char {
    with_handle(state, "get_notifications", |h| AppResponse::ok_json(&h.store.notifications()))
}

/// Notification log, newest entry first.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_recent_notifications(state: *mut ShelfHandle) -> *const c_char {
    with_handle(state, "get_recent_notifications", |h| {
        AppResponse::ok_json(&catalog::recent_first(h.store.notifications()))
    })
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn clear_notifications(state: *mut ShelfHandle) -> *const c_char {
    with_handle(state, "clear_notifications", |h| {
        h.store.clear_notifications();
        AppResponse::success("Notifications cleared")
    })
}

/// Selective wipe driven by a JSON [`DeleteOptions`]:
/// `{"deleteNotifications":true,"deleteSettings":false,"deleteFavorites":true}`.
///
/// The `Ok` payload is `true` when favorites were removed and the host must
/// reload any favorites view.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn delete_profile(state: *mut ShelfHandle, options_json: *const c_char) -> *const c_char {
    with_handle(state, "delete_profile", |h| {
        let options: DeleteOptions = match parse_json_arg(options_json, "delete options") {
            Ok(o) => o,
            Err(e) => return e,
        };
        AppResponse::ok_json(&h.store.delete_profile(options))
    })
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn clear_all_data(state: *mut ShelfHandle) -> *const c_char {
    with_handle(state, "clear_all_data", |h| {
        h.store.clear_all_data();
        AppResponse::success("All data cleared successfully")
    })
}

fn null_state(function: &str) -> *const c_char {
    let error = AppResponse::BadRequest(format!("Null state pointer passed to {function}"));
    response_to_c_string(&error)
}

/// Runs `f` against the handle behind `state` and converts its response to a
/// C string, answering `BadRequest` for a null handle.
fn with_handle<F>(state: *mut ShelfHandle, function: &str, f: F) -> *const c_char
where
    F: FnOnce(&ShelfHandle) -> AppResponse,
{
    match unsafe { state.as_ref() } {
        Some(handle) => response_to_c_string(&f(handle)),
        None => null_state(function),
    }
}

/// Converts an [`AppResponse`] to a C-compatible string.
///
/// Returns a null pointer if serialization or C string creation fails.
fn response_to_c_string(response: &AppResponse) -> *const c_char {
    let json = match serde_json::to_string(response) {
        Ok(j) => j,
        Err(e) => {
            warn!("Error serializing response: {e}");
            return std::ptr::null();
        }
    };

    match CString::new(json) {
        Ok(c_str) => c_str.into_raw(),
        Err(e) => {
            warn!("Error creating CString: {e}");
            std::ptr::null()
        }
    }
}

/// Converts a C string pointer to a Rust `String`, mapping null pointers and
/// invalid UTF-8 to `BadRequest`.
fn c_ptr_to_string(ptr: *const c_char, field_name: &str) -> Result<String, AppResponse> {
    if ptr.is_null() {
        return Err(AppResponse::BadRequest(format!("Null {field_name} pointer")));
    }

    match unsafe { CStr::from_ptr(ptr).to_str() } {
        Ok(s) => Ok(s.to_string()),
        Err(e) => Err(AppResponse::BadRequest(format!("Invalid UTF-8 in {field_name}: {e}"))),
    }
}

fn parse_json_arg<T: serde::de::DeserializeOwned>(ptr: *const c_char, field_name: &str) -> Result<T, AppResponse> {
    let raw = c_ptr_to_string(ptr, field_name)?;
    serde_json::from_str(&raw)
        .map_err(|e| AppResponse::SerializationError(format!("Invalid JSON in {field_name}: {e}")))
}

//! Data model definitions for the movie shelf.
//!
//! Three kinds of records live here: the immutable [`Movie`] entries of the
//! catalog, the records persisted by the store ([`UserProfile`] and
//! [`UserNotification`]), and the small request/option types the host sends
//! across the FFI boundary ([`MovieQuery`], [`SortKey`], [`DeleteOptions`],
//! [`AvatarChoice`]).
//!
//! Field names follow the persisted JSON layout (`camelCase`), so a record
//! written by this crate reads the same as one written by an earlier host
//! release.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::app_response::AppResponse;

const NAME_AVATAR_HOST: &str = "ui-avatars.com";
const BUNDLED_AVATAR_PREFIX: &str = "asset://avatars/";

/// Number of avatars shipped with the application bundle.
pub const BUNDLED_AVATAR_COUNT: usize = 7;

/// A catalog entry. Defined at build time and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: String,
    pub title: String,
    /// Poster URI.
    pub image: String,
    /// Genre labels. Order only matters for display.
    pub tags: Vec<String>,
    pub description: String,
    /// ISO-8601 premiere date, usually `YYYY-MM-DD`.
    pub release_date: String,
}

impl Movie {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Parses [`Movie::release_date`] as a calendar date.
    ///
    /// Accepts a bare `YYYY-MM-DD` date or a full RFC 3339 timestamp; the
    /// latter is reduced to its UTC date. Returns `None` for anything else.
    pub fn premiere(&self) -> Option<NaiveDate> {
        let raw = self.release_date.trim();
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(date);
        }
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc).date_naive())
    }
}

/// The singleton user-identity record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    pub notifications_enabled: bool,
    /// Remote URI, bundled asset reference or a device-local picked image.
    pub avatar_url: String,
}

impl UserProfile {
    /// Profile synthesized when storage holds none: notifications on and a
    /// name-derived avatar.
    pub fn default_named(name: &str) -> Self {
        UserProfile {
            name: name.to_string(),
            notifications_enabled: true,
            avatar_url: name_avatar_url(name),
        }
    }

    pub fn validate(&self) -> Result<(), AppResponse> {
        if self.name.trim().is_empty() {
            return Err(AppResponse::ValidationError("Name cannot be empty".to_string()));
        }
        Ok(())
    }

    pub fn avatar_kind(&self) -> AvatarKind {
        AvatarKind::classify(&self.avatar_url)
    }
}

/// Profile as it may appear on disk. Older records predate the
/// notification flag and the avatar field, and some hosts stored a bundled
/// avatar as its numeric asset index instead of a URL.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredProfile {
    pub name: String,
    #[serde(default)]
    pub notifications_enabled: Option<bool>,
    #[serde(default)]
    pub avatar_url: Option<serde_json::Value>,
}

impl StoredProfile {
    /// Fills missing fields. The flag is `true` when any backfill happened
    /// and the record has to be written back.
    pub fn upgrade(self) -> (UserProfile, bool) {
        let mut migrated = false;

        let notifications_enabled = self.notifications_enabled.unwrap_or_else(|| {
            migrated = true;
            true
        });

        let avatar_url = match self.avatar_url {
            Some(serde_json::Value::String(url)) if !url.is_empty() => url,
            Some(serde_json::Value::Number(index)) => {
                migrated = true;
                index
                    .as_u64()
                    .and_then(|i| usize::try_from(i).ok())
                    .and_then(bundled_avatar_url)
                    .unwrap_or_else(|| name_avatar_url(&self.name))
            }
            _ => {
                migrated = true;
                name_avatar_url(&self.name)
            }
        };

        let profile = UserProfile {
            name: self.name,
            notifications_enabled,
            avatar_url,
        };
        (profile, migrated)
    }
}

/// Avatar derived from the user's name by the ui-avatars service.
pub fn name_avatar_url(name: &str) -> String {
    format!(
        "https://{NAME_AVATAR_HOST}/api/?name={}&background=random",
        urlencoding::encode(name)
    )
}

/// Asset reference of a bundled avatar, `None` when the index is out of range.
pub fn bundled_avatar_url(index: usize) -> Option<String> {
    (index < BUNDLED_AVATAR_COUNT).then(|| format!("{BUNDLED_AVATAR_PREFIX}avatar-{index}.png"))
}

/// Where an avatar URL points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvatarKind {
    NameGenerated,
    Bundled,
    LocalFile,
    Remote,
}

impl AvatarKind {
    pub fn classify(url: &str) -> Self {
        if url.contains(NAME_AVATAR_HOST) {
            AvatarKind::NameGenerated
        } else if url.starts_with(BUNDLED_AVATAR_PREFIX) {
            AvatarKind::Bundled
        } else if url.starts_with("http://") || url.starts_with("https://") {
            AvatarKind::Remote
        } else {
            AvatarKind::LocalFile
        }
    }
}

/// Avatar selection made on the profile screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AvatarChoice {
    /// Back to the avatar generated from the current name.
    NameGenerated,
    /// One of the bundled avatars, by index.
    Bundled(usize),
    /// Image picked from the device library.
    Custom(String),
}

impl AvatarChoice {
    /// Rejects out-of-range bundled indices and empty picked URIs.
    pub fn validate(&self) -> Result<(), AppResponse> {
        self.resolve("").map(|_| ())
    }

    /// Resolves the choice to the URL to persist for a user called `name`.
    pub fn resolve(&self, name: &str) -> Result<String, AppResponse> {
        match self {
            AvatarChoice::NameGenerated => Ok(name_avatar_url(name)),
            AvatarChoice::Bundled(index) => bundled_avatar_url(*index).ok_or_else(|| {
                AppResponse::ValidationError(format!(
                    "Avatar index {index} is out of range (0..{BUNDLED_AVATAR_COUNT})"
                ))
            }),
            AvatarChoice::Custom(uri) if uri.trim().is_empty() => {
                Err(AppResponse::ValidationError("Picked image URI is empty".to_string()))
            }
            AvatarChoice::Custom(uri) => Ok(uri.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AddFavorite,
    RemoveFavorite,
    CalendarEventCreated,
}

/// Advisory log entry recorded on every favorite change.
///
/// `movie_id` and `movie_title` are copies taken at event time. The `id` is
/// the millisecond timestamp rendered as a string, so two entries created in
/// the same millisecond share an id; nothing keys or deduplicates on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNotification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub movie_id: String,
    pub movie_title: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl UserNotification {
    pub fn new(kind: NotificationKind, movie: &Movie, timestamp: i64) -> Self {
        UserNotification {
            id: timestamp.to_string(),
            kind,
            movie_id: movie.id.clone(),
            movie_title: movie.title.clone(),
            timestamp,
        }
    }

    pub fn now(kind: NotificationKind, movie: &Movie) -> Self {
        Self::new(kind, movie, Utc::now().timestamp_millis())
    }
}

/// Content of a local, immediately delivered platform notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalAlert {
    pub title: String,
    pub body: String,
}

impl LocalAlert {
    pub fn for_favorite_change(kind: NotificationKind, movie: &Movie) -> Self {
        let (title, verb) = match kind {
            NotificationKind::AddFavorite => ("Movie added to favorites", "added to"),
            NotificationKind::RemoveFavorite => ("Movie removed from favorites", "removed from"),
            NotificationKind::CalendarEventCreated => ("Premiere added to calendar", "added to"),
        };
        let body = match kind {
            NotificationKind::CalendarEventCreated => {
                format!("{} premiere was {verb} your calendar", movie.title)
            }
            _ => format!("{} was {verb} your favorite movies", movie.title),
        };
        LocalAlert {
            title: title.to_string(),
            body,
        }
    }
}

/// Ordering of the favorites list on the profile screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Title, ascending.
    #[default]
    Title,
    /// Release date, most recent premiere first.
    Date,
}

impl SortKey {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "title" => Some(SortKey::Title),
            "date" => Some(SortKey::Date),
            _ => None,
        }
    }
}

/// Search box text plus the selected tag chips.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Switches for the selective profile wipe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOptions {
    #[serde(default)]
    pub delete_notifications: bool,
    #[serde(default)]
    pub delete_settings: bool,
    #[serde(default)]
    pub delete_favorites: bool,
}

impl DeleteOptions {
    pub fn notifications_only() -> Self {
        DeleteOptions {
            delete_notifications: true,
            ..Default::default()
        }
    }

    pub fn everything() -> Self {
        DeleteOptions {
            delete_notifications: true,
            delete_settings: true,
            delete_favorites: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(date: &str) -> Movie {
        Movie {
            id: "m1".to_string(),
            title: "Arrival".to_string(),
            image: String::new(),
            tags: vec!["Sci-Fi".to_string()],
            description: String::new(),
            release_date: date.to_string(),
        }
    }

    #[test]
    fn premiere_accepts_plain_and_rfc3339_dates() {
        let expected = NaiveDate::from_ymd_opt(2016, 11, 11);
        assert_eq!(movie("2016-11-11").premiere(), expected);
        assert_eq!(movie("2016-11-11T20:00:00Z").premiere(), expected);
        assert_eq!(movie("soon").premiere(), None);
    }

    #[test]
    fn name_avatar_is_url_encoded() {
        let url = name_avatar_url("Jan Novák");
        assert_eq!(url, "https://ui-avatars.com/api/?name=Jan%20Nov%C3%A1k&background=random");
        assert_eq!(AvatarKind::classify(&url), AvatarKind::NameGenerated);
    }

    #[test]
    fn avatar_classification() {
        assert_eq!(AvatarKind::classify("asset://avatars/avatar-2.png"), AvatarKind::Bundled);
        assert_eq!(AvatarKind::classify("file:///data/picked.jpg"), AvatarKind::LocalFile);
        assert_eq!(AvatarKind::classify("https://cdn.example.com/me.png"), AvatarKind::Remote);
    }

    #[test]
    fn bundled_avatar_choice_is_bounds_checked() {
        assert_eq!(
            AvatarChoice::Bundled(6).resolve("x"),
            Ok("asset://avatars/avatar-6.png".to_string())
        );
        assert!(matches!(
            AvatarChoice::Bundled(BUNDLED_AVATAR_COUNT).resolve("x"),
            Err(AppResponse::ValidationError(_))
        ));
        assert!(matches!(
            AvatarChoice::Custom("  ".to_string()).resolve("x"),
            Err(AppResponse::ValidationError(_))
        ));
    }

    #[test]
    fn stored_profile_without_flag_is_backfilled() {
        let stored: StoredProfile = serde_json::from_str(r#"{"name":"Eva"}"#).unwrap();
        let (profile, migrated) = stored.upgrade();
        assert!(migrated);
        assert!(profile.notifications_enabled);
        assert_eq!(profile.avatar_url, name_avatar_url("Eva"));

        let stored: StoredProfile = serde_json::from_str(
            r#"{"name":"Eva","notificationsEnabled":false,"avatarUrl":"asset://avatars/avatar-1.png"}"#,
        )
        .unwrap();
        let (profile, migrated) = stored.upgrade();
        assert!(!migrated);
        assert!(!profile.notifications_enabled);
    }

    #[test]
    fn stored_profile_with_numeric_avatar_is_repaired() {
        let stored: StoredProfile =
            serde_json::from_str(r#"{"name":"Eva","notificationsEnabled":false,"avatarUrl":3}"#).unwrap();
        let (profile, migrated) = stored.upgrade();
        assert!(migrated);
        assert!(!profile.notifications_enabled);
        assert_eq!(profile.avatar_url, "asset://avatars/avatar-3.png");

        // Out of range, negative and non-scalar values fall back to the name avatar.
        for raw in ["42", "-1", "{}", "null", "\"\""] {
            let json = format!(r#"{{"name":"Eva","avatarUrl":{raw}}}"#);
            let stored: StoredProfile = serde_json::from_str(&json).unwrap();
            let (profile, migrated) = stored.upgrade();
            assert!(migrated, "{raw}");
            assert_eq!(profile.avatar_url, name_avatar_url("Eva"), "{raw}");
        }
    }

    #[test]
    fn notification_serializes_with_persisted_field_names() {
        let entry = UserNotification::new(NotificationKind::AddFavorite, &movie("2016-11-11"), 1_700_000_000_000);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "add_favorite");
        assert_eq!(json["movieId"], "m1");
        assert_eq!(json["movieTitle"], "Arrival");
        assert_eq!(json["id"], "1700000000000");
    }

    #[test]
    fn delete_options_accept_partial_json() {
        let opts: DeleteOptions = serde_json::from_str(r#"{"deleteSettings":true}"#).unwrap();
        assert!(opts.delete_settings);
        assert!(!opts.delete_favorites);
        assert!(!opts.delete_notifications);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::KuttiError;

/// One entity instance as returned by the API: field name to JSON value.
pub type Record = Map<String, Value>;

pub type RecordId = i64;

/// Reads the stable identifier of a record, accepting numeric strings.
pub fn record_id(record: &Record) -> Option<RecordId> {
    match record.get("id")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// String form of a value as used by search, column filters and CSV export.
///
/// Nulls become the empty string. Nested arrays and objects are rendered
/// as compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Field value of a record, missing fields read as the empty string.
pub fn field_text(record: &Record, key: &str) -> String {
    record.get(key).map(display_value).unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Children,
    News,
    Missions,
    Users,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Children,
        EntityKind::News,
        EntityKind::Missions,
        EntityKind::Users,
    ];

    /// Path segment of the REST collection.
    pub fn endpoint(&self) -> &'static str {
        match self {
            EntityKind::Children => "children",
            EntityKind::News => "news",
            EntityKind::Missions => "missions",
            EntityKind::Users => "users",
        }
    }

    /// Tag used by the translation cache.
    pub fn translation_tag(&self) -> &'static str {
        match self {
            EntityKind::Users => "user",
            other => other.endpoint(),
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            EntityKind::Children => "Children",
            EntityKind::News => "News",
            EntityKind::Missions => "Missions",
            EntityKind::Users => "Users",
        }
    }

    /// One record of the kind, as in "Child created".
    pub fn singular(&self) -> &'static str {
        match self {
            EntityKind::Children => "Child",
            EntityKind::News => "News",
            EntityKind::Missions => "Mission",
            EntityKind::Users => "User",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

impl FromStr for EntityKind {
    type Err = KuttiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "children" | "child" | "c" => Ok(EntityKind::Children),
            "news" | "n" => Ok(EntityKind::News),
            "missions" | "mission" | "m" => Ok(EntityKind::Missions),
            "users" | "user" | "u" => Ok(EntityKind::Users),
            other => Err(KuttiError::Validation(format!(
                "Unknown entity '{}' (expected children, news, missions or users)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin,
    #[serde(
        rename = "referent",
        alias = "local_referent",
        alias = "localReferent"
    )]
    LocalReferent,
    #[serde(rename = "sponsor")]
    Sponsor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::LocalReferent => "referent",
            Role::Sponsor => "sponsor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: RecordId,
    pub username: String,
    pub role: Role,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub ui_language: Option<String>,
    #[serde(flatten)]
    pub extra: Record,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user: User,
    pub started_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user: User) -> Self {
        Self {
            id: Uuid::new_v4(),
            user,
            started_at: Utc::now(),
        }
    }

    pub fn role(&self) -> Role {
        self.user.role
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "webm", "mkv", "m4v"];

impl MediaKind {
    pub fn from_filename(name: &str) -> Self {
        let ext = name.rsplit('.').next().unwrap_or_default().to_lowercase();
        if name.contains('.') && VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Video
        } else {
            MediaKind::Photo
        }
    }

    /// Reads a stored type: `video` or a `video/*` mime type is a video,
    /// anything else a photo.
    pub fn from_type(raw: &str) -> Self {
        let raw = raw.trim().to_ascii_lowercase();
        if raw == "video" || raw.starts_with("video/") {
            MediaKind::Video
        } else {
            MediaKind::Photo
        }
    }
}

impl<'de> Deserialize<'de> for MediaKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(MediaKind::from_type(&raw))
    }
}

/// One attached photo or video of a record.
///
/// Records come back from the API with `media_path`/`media_type`; forms
/// submit `path`/`type`. Both spellings are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    #[serde(alias = "media_path")]
    pub path: String,
    #[serde(rename = "type", alias = "media_type", default = "default_media_kind")]
    pub kind: MediaKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(rename = "originalName", default)]
    pub original_name: Option<String>,
}

fn default_media_kind() -> MediaKind {
    MediaKind::Photo
}

/// Response of `POST /upload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub filename: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_id_accepts_numbers_and_numeric_strings() {
        let a = json!({"id": 7}).as_object().unwrap().clone();
        let b = json!({"id": " 12 "}).as_object().unwrap().clone();
        let c = json!({"name": "x"}).as_object().unwrap().clone();
        assert_eq!(record_id(&a), Some(7));
        assert_eq!(record_id(&b), Some(12));
        assert_eq!(record_id(&c), None);
    }

    #[test]
    fn display_value_flattens_scalars() {
        assert_eq!(display_value(&Value::Null), "");
        assert_eq!(display_value(&json!("Maria")), "Maria");
        assert_eq!(display_value(&json!(5)), "5");
        assert_eq!(display_value(&json!(true)), "true");
    }

    #[test]
    fn role_accepts_legacy_spellings() {
        let r: Role = serde_json::from_str("\"localReferent\"").unwrap();
        assert_eq!(r, Role::LocalReferent);
        let r: Role = serde_json::from_str("\"local_referent\"").unwrap();
        assert_eq!(r, Role::LocalReferent);
        assert_eq!(serde_json::to_string(&Role::LocalReferent).unwrap(), "\"referent\"");
    }

    #[test]
    fn user_keeps_unknown_fields() {
        let user: User = serde_json::from_value(json!({
            "id": 1,
            "username": "anna",
            "role": "admin",
            "phone": "555"
        }))
        .unwrap();
        assert_eq!(user.extra.get("phone"), Some(&json!("555")));
        assert_eq!(user.display_name(), "anna");
    }

    #[test]
    fn entity_kind_parses_aliases() {
        assert_eq!("Child".parse::<EntityKind>().unwrap(), EntityKind::Children);
        assert_eq!("users".parse::<EntityKind>().unwrap(), EntityKind::Users);
        assert!("sponsors".parse::<EntityKind>().is_err());
        assert_eq!(EntityKind::Users.translation_tag(), "user");
    }

    #[test]
    fn media_kind_from_extension() {
        assert_eq!(MediaKind::from_filename("clip.MP4"), MediaKind::Video);
        assert_eq!(MediaKind::from_filename("photo.jpg"), MediaKind::Photo);
        assert_eq!(MediaKind::from_filename("mp4"), MediaKind::Photo);
    }

    #[test]
    fn media_item_reads_the_api_spelling() {
        let item: MediaItem = serde_json::from_value(json!({
            "media_path": "anu.mp4",
            "media_type": "video/mp4",
            "description": "dance",
            "media_order": 0
        }))
        .unwrap();
        assert_eq!(item.path, "anu.mp4");
        assert_eq!(item.kind, MediaKind::Video);
        let back = serde_json::to_value(&item).unwrap();
        assert_eq!(back["path"], "anu.mp4");
        assert_eq!(back["type"], "video");

        let item: MediaItem = serde_json::from_value(json!({"path": "x.png"})).unwrap();
        assert_eq!(item.kind, MediaKind::Photo);
    }
}

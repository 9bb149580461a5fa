use chrono::{DateTime, Utc};
use mongodb::bson::{doc, Document};
use serde::{Deserialize, Serialize};

use super::{forbid_blank, timestamp, Entity, Patch};

/// Fixed identifier of the one settings document.
pub const SETTINGS_ID: &str = "settings";

pub const DEFAULT_USER_NAME: &str = "CRM User";

pub const DEFAULT_SECTORS: &[&str] = &[
    "Technology",
    "Healthcare",
    "Finance",
    "Manufacturing",
    "Retail",
    "Education",
    "Energy",
];

pub const DEFAULT_ACTIVITY_TYPES: &[&str] = &["call", "email", "visit", "meeting"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_name: String,
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub user_avatar: String,
    #[serde(default)]
    pub sectors: Vec<String>,
    #[serde(default)]
    pub activity_types: Vec<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Entity for Settings {
    const COLLECTION: &'static str = "settings";
    const LABEL: &'static str = "Settings";
    const ROOM: &'static str = "settings";
    const EVENT: &'static str = "settings";
    const LOWERCASE: &'static [&'static str] = &["user_email"];
}

impl Settings {
    /// Fields a freshly created settings document starts with.
    pub fn defaults(now: DateTime<Utc>) -> Document {
        let stamp = timestamp::format(&now);
        doc! {
            "user_name": DEFAULT_USER_NAME,
            "user_email": "",
            "user_avatar": "",
            "sectors": DEFAULT_SECTORS,
            "activity_types": DEFAULT_ACTIVITY_TYPES,
            "created_at": stamp.clone(),
            "updated_at": stamp,
        }
    }

    /// Defaults minus whatever the caller is about to `$set`, so both halves of an
    /// upsert stay disjoint.
    pub fn defaults_without(now: DateTime<Utc>, set: &Document) -> Document {
        Self::defaults(now)
            .into_iter()
            .filter(|(key, _)| !set.contains_key(key))
            .collect()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sectors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_types: Option<Vec<String>>,
}

impl Patch for SettingsPatch {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        forbid_blank(&mut errors, "user_name", self.user_name.as_deref());
        errors
    }
}

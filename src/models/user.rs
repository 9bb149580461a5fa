use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{timestamp, Entity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    /// bcrypt hash; never leaves the server.
    pub password: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

fn default_role() -> String {
    "user".to_string()
}

impl Entity for User {
    const COLLECTION: &'static str = "users";
    const LABEL: &'static str = "User";
    const ROOM: &'static str = "users";
    const EVENT: &'static str = "user";
    const LOWERCASE: &'static [&'static str] = &["email"];
}

/// Compact identity returned alongside issued tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar: String,
}

/// Full account view without the credential hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub role: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            avatar: self.avatar.clone(),
        }
    }

    pub fn profile(self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name,
            email: self.email,
            avatar: self.avatar,
            role: self.role,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

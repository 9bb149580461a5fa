use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{check, new_id, require, required, timestamp, Entity};
use crate::db::Filter;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    #[default]
    Info,
    Success,
    Warning,
    Error,
    Reminder,
}

impl NotificationType {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationType::Info => "info",
            NotificationType::Success => "success",
            NotificationType::Warning => "warning",
            NotificationType::Error => "error",
            NotificationType::Reminder => "reminder",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    /// How long a notification of this priority stays active when no explicit
    /// expiry is given. `None` means it never lapses.
    pub fn default_lifetime(self) -> Option<Duration> {
        match self {
            Priority::Low => Some(Duration::days(7)),
            Priority::Medium => Some(Duration::days(30)),
            Priority::High | Priority::Urgent => None,
        }
    }
}

/// The record a notification points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "entity_id", rename_all = "lowercase")]
pub enum RelatedEntity {
    Contact(String),
    Company(String),
    Opportunity(String),
    Activity(String),
    Lead(String),
    Expense(String),
}

impl RelatedEntity {
    pub fn collection(&self) -> &'static str {
        match self {
            RelatedEntity::Contact(_) => "contacts",
            RelatedEntity::Company(_) => "companies",
            RelatedEntity::Opportunity(_) => "opportunities",
            RelatedEntity::Activity(_) => "activities",
            RelatedEntity::Lead(_) => "leads",
            RelatedEntity::Expense(_) => "expenses",
        }
    }

    pub fn entity_id(&self) -> &str {
        match self {
            RelatedEntity::Contact(id)
            | RelatedEntity::Company(id)
            | RelatedEntity::Opportunity(id)
            | RelatedEntity::Activity(id)
            | RelatedEntity::Lead(id)
            | RelatedEntity::Expense(id) => id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: NotificationType,
    #[serde(default)]
    pub priority: Priority,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_entity: Option<RelatedEntity>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Entity for Notification {
    const COLLECTION: &'static str = "notifications";
    const LABEL: &'static str = "Notification";
    const ROOM: &'static str = "notifications";
    const EVENT: &'static str = "notification";
    const VERBATIM: &'static [&'static str] = &["message"];
}

impl Notification {
    /// Room that carries one user's notifications.
    pub fn room_for(user_id: &str) -> String {
        format!("user-{user_id}")
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    /// Notifications with no expiry, or one still in the future.
    pub fn active_filter(now: DateTime<Utc>) -> Filter {
        Filter::Or(vec![
            Filter::exists("expires_at", false),
            Filter::gt("expires_at", timestamp::format(&now)),
        ])
    }
}

#[derive(Debug, Deserialize)]
pub struct NewNotification {
    pub title: Option<String>,
    pub message: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<NotificationType>,
    pub priority: Option<Priority>,
    pub user_id: Option<String>,
    pub related_entity: Option<RelatedEntity>,
    #[serde(default, with = "timestamp::option")]
    pub expires_at: Option<DateTime<Utc>>,
    pub metadata: Option<serde_json::Value>,
}

impl NewNotification {
    /// Builds the notification, addressing it to `requester` when no recipient is named.
    pub fn into_notification(
        self,
        requester: &str,
        now: DateTime<Utc>,
    ) -> Result<Notification, ApiError> {
        let mut errors = Vec::new();
        require(&mut errors, "title", self.title.as_deref());
        require(&mut errors, "message", self.message.as_deref());
        check(errors)?;

        let priority = self.priority.unwrap_or_default();
        let expires_at = self
            .expires_at
            .or_else(|| priority.default_lifetime().map(|lifetime| now + lifetime));
        Ok(Notification {
            id: new_id(),
            title: required(self.title),
            message: required(self.message),
            kind: self.kind.unwrap_or_default(),
            priority,
            user_id: self.user_id.unwrap_or_else(|| requester.to_string()),
            related_entity: self.related_entity,
            is_read: false,
            read_at: None,
            expires_at,
            metadata: self.metadata,
            created_at: now,
            updated_at: now,
        })
    }
}

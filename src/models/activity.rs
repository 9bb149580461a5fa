use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    check, forbid_blank, new_id, require, require_value, required, timestamp, Draft, Entity, Patch,
    Reference,
};
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Call,
    Email,
    Meeting,
    Visit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    #[serde(with = "timestamp")]
    pub start_time: DateTime<Utc>,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: ActivityStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opportunity_id: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Entity for Activity {
    const COLLECTION: &'static str = "activities";
    const LABEL: &'static str = "Activity";
    const ROOM: &'static str = "activities";
    const EVENT: &'static str = "activity";
    const REFERENCES: &'static [Reference] = &[
        Reference {
            field: "contact_id",
            collection: "contacts",
            select: &["first_name", "last_name"],
        },
        Reference {
            field: "company_id",
            collection: "companies",
            select: &["name"],
        },
        Reference {
            field: "opportunity_id",
            collection: "opportunities",
            select: &["title"],
        },
    ];
}

fn check_order(
    errors: &mut Vec<String>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
) {
    if let (Some(start), Some(end)) = (start_time, end_time) {
        if end < start {
            errors.push("end_time cannot be before start_time".to_string());
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewActivity {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<ActivityType>,
    #[serde(default, with = "timestamp::option")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub end_time: Option<DateTime<Utc>>,
    pub status: Option<ActivityStatus>,
    pub contact_id: Option<String>,
    pub company_id: Option<String>,
    pub opportunity_id: Option<String>,
}

impl NewActivity {
    pub fn into_activity(self) -> Result<Activity, ApiError> {
        let mut errors = Vec::new();
        require(&mut errors, "title", self.title.as_deref());
        require_value(&mut errors, "type", &self.kind);
        require_value(&mut errors, "start_time", &self.start_time);
        check_order(&mut errors, self.start_time, self.end_time);
        check(errors)?;

        let now = Utc::now();
        Ok(Activity {
            id: new_id(),
            title: required(self.title),
            description: self.description,
            kind: self.kind.unwrap_or(ActivityType::Call),
            start_time: self.start_time.unwrap_or_default(),
            end_time: self.end_time,
            status: self.status.unwrap_or_default(),
            contact_id: self.contact_id,
            company_id: self.company_id,
            opportunity_id: self.opportunity_id,
            created_at: now,
            updated_at: now,
        })
    }
}

impl Draft for NewActivity {
    type Entity = Activity;

    fn build(self) -> Result<Activity, ApiError> {
        self.into_activity()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ActivityPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ActivityType>,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ActivityStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opportunity_id: Option<String>,
}

impl Patch for ActivityPatch {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        forbid_blank(&mut errors, "title", self.title.as_deref());
        check_order(&mut errors, self.start_time, self.end_time);
        errors
    }
}

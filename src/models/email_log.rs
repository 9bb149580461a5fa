use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    check, forbid_blank, new_id, require, required, timestamp, Draft, Entity, Patch, Reference,
};
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailType {
    #[default]
    Sent,
    Received,
    Draft,
}

impl EmailType {
    pub fn as_str(self) -> &'static str {
        match self {
            EmailType::Sent => "sent",
            EmailType::Received => "received",
            EmailType::Draft => "draft",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailStatus {
    #[default]
    Sent,
    Delivered,
    Opened,
    Clicked,
    Bounced,
    Failed,
}

impl EmailStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EmailStatus::Sent => "sent",
            EmailStatus::Delivered => "delivered",
            EmailStatus::Opened => "opened",
            EmailStatus::Clicked => "clicked",
            EmailStatus::Bounced => "bounced",
            EmailStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailLog {
    #[serde(rename = "_id")]
    pub id: String,
    pub subject: String,
    pub body: String,
    pub from: String,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default)]
    pub bcc: Vec<String>,
    #[serde(rename = "type", default)]
    pub kind: EmailType,
    #[serde(default)]
    pub status: EmailStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opportunity_id: Option<String>,
    #[serde(with = "timestamp")]
    pub sent_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub opened_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub clicked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Entity for EmailLog {
    const COLLECTION: &'static str = "email_logs";
    const LABEL: &'static str = "Email log";
    const ROOM: &'static str = "emails";
    const EVENT: &'static str = "email";
    const REFERENCES: &'static [Reference] = &[
        Reference {
            field: "contact_id",
            collection: "contacts",
            select: &["first_name", "last_name", "email"],
        },
        Reference {
            field: "company_id",
            collection: "companies",
            select: &["name"],
        },
        Reference {
            field: "lead_id",
            collection: "leads",
            select: &["name", "email"],
        },
        Reference {
            field: "opportunity_id",
            collection: "opportunities",
            select: &["title"],
        },
    ];
    const LOWERCASE: &'static [&'static str] = &["from", "to", "cc", "bcc"];
    const VERBATIM: &'static [&'static str] = &["body"];
}

#[derive(Debug, Deserialize)]
pub struct NewEmailLog {
    pub subject: Option<String>,
    pub body: Option<String>,
    pub from: Option<String>,
    pub to: Option<Vec<String>>,
    pub cc: Option<Vec<String>>,
    pub bcc: Option<Vec<String>>,
    #[serde(rename = "type")]
    pub kind: Option<EmailType>,
    pub status: Option<EmailStatus>,
    pub contact_id: Option<String>,
    pub company_id: Option<String>,
    pub lead_id: Option<String>,
    pub opportunity_id: Option<String>,
    #[serde(default, with = "timestamp::option")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub opened_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub clicked_at: Option<DateTime<Utc>>,
    pub attachments: Option<Vec<Attachment>>,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<serde_json::Value>,
}

impl NewEmailLog {
    pub fn into_email_log(self) -> Result<EmailLog, ApiError> {
        let mut errors = Vec::new();
        require(&mut errors, "subject", self.subject.as_deref());
        require(&mut errors, "body", self.body.as_deref());
        require(&mut errors, "from", self.from.as_deref());
        check(errors)?;

        let now = Utc::now();
        Ok(EmailLog {
            id: new_id(),
            subject: required(self.subject),
            body: required(self.body),
            from: required(self.from),
            to: self.to.unwrap_or_default(),
            cc: self.cc.unwrap_or_default(),
            bcc: self.bcc.unwrap_or_default(),
            kind: self.kind.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            contact_id: self.contact_id,
            company_id: self.company_id,
            lead_id: self.lead_id,
            opportunity_id: self.opportunity_id,
            sent_at: self.sent_at.unwrap_or(now),
            opened_at: self.opened_at,
            clicked_at: self.clicked_at,
            attachments: self.attachments.unwrap_or_default(),
            tags: self.tags.unwrap_or_default(),
            metadata: self.metadata,
            created_at: now,
            updated_at: now,
        })
    }
}

impl Draft for NewEmailLog {
    type Entity = EmailLog;

    fn build(self) -> Result<EmailLog, ApiError> {
        self.into_email_log()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EmailLogPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bcc: Option<Vec<String>>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<EmailType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EmailStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opportunity_id: Option<String>,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub opened_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub clicked_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Patch for EmailLogPatch {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        forbid_blank(&mut errors, "subject", self.subject.as_deref());
        forbid_blank(&mut errors, "body", self.body.as_deref());
        forbid_blank(&mut errors, "from", self.from.as_deref());
        errors
    }
}

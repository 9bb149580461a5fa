use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    check, forbid_blank, new_id, require, required, timestamp, Draft, Entity, Patch, Reference,
};
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LeadStatus {
    #[default]
    Cold,
    Warm,
    Hot,
    Won,
    Lost,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 5] = [
        LeadStatus::Cold,
        LeadStatus::Warm,
        LeadStatus::Hot,
        LeadStatus::Won,
        LeadStatus::Lost,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LeadStatus::Cold => "Cold",
            LeadStatus::Warm => "Warm",
            LeadStatus::Hot => "Hot",
            LeadStatus::Won => "Won",
            LeadStatus::Lost => "Lost",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Forecast {
    Low,
    #[default]
    Medium,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Free-text company name, independent of `company_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(default)]
    pub lead_status: LeadStatus,
    /// Legacy mirror of `lead_status` kept for older clients.
    #[serde(default)]
    pub status: LeadStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub forecast: Forecast,
    #[serde(default)]
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub last_contact: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub next_followup: Option<DateTime<Utc>>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Entity for Lead {
    const COLLECTION: &'static str = "leads";
    const LABEL: &'static str = "Lead";
    const ROOM: &'static str = "leads";
    const EVENT: &'static str = "lead";
    const REFERENCES: &'static [Reference] = &[
        Reference {
            field: "company_id",
            collection: "companies",
            select: &["name"],
        },
        Reference {
            field: "assigned_to",
            collection: "users",
            select: &["name", "email"],
        },
    ];
    const LOWERCASE: &'static [&'static str] = &["email"];
}

#[derive(Debug, Deserialize)]
pub struct NewLead {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub company_id: Option<String>,
    pub lead_status: Option<LeadStatus>,
    pub status: Option<LeadStatus>,
    pub source: Option<String>,
    pub forecast: Option<Forecast>,
    pub value: Option<f64>,
    pub notes: Option<String>,
    pub assigned_to: Option<String>,
    pub tags: Option<Vec<String>>,
    #[serde(default, with = "timestamp::option")]
    pub last_contact: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub next_followup: Option<DateTime<Utc>>,
}

impl NewLead {
    pub fn into_lead(self) -> Result<Lead, ApiError> {
        let mut errors = Vec::new();
        require(&mut errors, "name", self.name.as_deref());
        check(errors)?;

        let now = Utc::now();
        Ok(Lead {
            id: new_id(),
            name: required(self.name),
            email: self.email,
            phone: self.phone,
            company: self.company,
            company_id: self.company_id,
            lead_status: self.lead_status.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            source: self.source,
            forecast: self.forecast.unwrap_or_default(),
            value: self.value.unwrap_or_default(),
            notes: self.notes,
            assigned_to: self.assigned_to,
            tags: self.tags.unwrap_or_default(),
            last_contact: self.last_contact,
            next_followup: self.next_followup,
            created_at: now,
            updated_at: now,
        })
    }
}

impl Draft for NewLead {
    type Entity = Lead;

    fn build(self) -> Result<Lead, ApiError> {
        self.into_lead()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LeadPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_status: Option<LeadStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<LeadStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast: Option<Forecast>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub last_contact: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub next_followup: Option<DateTime<Utc>>,
}

impl Patch for LeadPatch {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        forbid_blank(&mut errors, "name", self.name.as_deref());
        errors
    }
}

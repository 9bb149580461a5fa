use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    check, forbid_blank, new_id, require, required, timestamp, Draft, Entity, Patch, Reference,
};
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpportunityStatus {
    #[default]
    Lead,
    Qualified,
    Proposal,
    Negotiation,
    Won,
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpportunityPriority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<String>,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub forecast_amount: f64,
    #[serde(default)]
    pub status: OpportunityStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(default)]
    pub priority: OpportunityPriority,
    #[serde(default)]
    pub probability: i32,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub close_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub competitors: Vec<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Entity for Opportunity {
    const COLLECTION: &'static str = "opportunities";
    const LABEL: &'static str = "Opportunity";
    const ROOM: &'static str = "opportunities";
    const EVENT: &'static str = "opportunity";
    const REFERENCES: &'static [Reference] = &[
        Reference {
            field: "company_id",
            collection: "companies",
            select: &["name"],
        },
        Reference {
            field: "contact_id",
            collection: "contacts",
            select: &["first_name", "last_name"],
        },
    ];
}

fn check_probability(errors: &mut Vec<String>, probability: Option<i32>) {
    if probability.is_some_and(|p| !(0..=100).contains(&p)) {
        errors.push("probability must be between 0 and 100".to_string());
    }
}

#[derive(Debug, Deserialize)]
pub struct NewOpportunity {
    pub title: Option<String>,
    pub company_id: Option<String>,
    pub contact_id: Option<String>,
    pub amount: Option<f64>,
    pub forecast_amount: Option<f64>,
    pub status: Option<OpportunityStatus>,
    pub sector: Option<String>,
    pub priority: Option<OpportunityPriority>,
    pub probability: Option<i32>,
    #[serde(default, with = "timestamp::option")]
    pub close_date: Option<DateTime<Utc>>,
    pub owner: Option<String>,
    pub description: Option<String>,
    pub competitors: Option<Vec<String>>,
}

impl NewOpportunity {
    pub fn into_opportunity(self) -> Result<Opportunity, ApiError> {
        let mut errors = Vec::new();
        require(&mut errors, "title", self.title.as_deref());
        check_probability(&mut errors, self.probability);
        check(errors)?;

        let now = Utc::now();
        Ok(Opportunity {
            id: new_id(),
            title: required(self.title),
            company_id: self.company_id,
            contact_id: self.contact_id,
            amount: self.amount.unwrap_or_default(),
            forecast_amount: self.forecast_amount.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            sector: self.sector,
            priority: self.priority.unwrap_or_default(),
            probability: self.probability.unwrap_or_default(),
            close_date: self.close_date,
            owner: self.owner,
            description: self.description,
            competitors: self.competitors.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        })
    }
}

impl Draft for NewOpportunity {
    type Entity = Opportunity;

    fn build(self) -> Result<Opportunity, ApiError> {
        self.into_opportunity()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct OpportunityPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OpportunityStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<OpportunityPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<i32>,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub close_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub competitors: Option<Vec<String>>,
}

impl Patch for OpportunityPatch {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        forbid_blank(&mut errors, "title", self.title.as_deref());
        check_probability(&mut errors, self.probability);
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probability_outside_range_is_rejected() {
        let patch = OpportunityPatch {
            probability: Some(101),
            ..Default::default()
        };
        assert_eq!(patch.validate(), vec!["probability must be between 0 and 100"]);
    }

    #[test]
    fn unknown_status_does_not_deserialize() {
        let raw = r#"{ "title": "Deal", "status": "pending" }"#;
        assert!(serde_json::from_str::<NewOpportunity>(raw).is_err());
    }
}

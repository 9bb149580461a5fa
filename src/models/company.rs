use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{check, forbid_blank, new_id, require, required, timestamp, Draft, Entity, Patch};
use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Entity for Company {
    const COLLECTION: &'static str = "companies";
    const LABEL: &'static str = "Company";
    const ROOM: &'static str = "companies";
    const EVENT: &'static str = "company";
    const LOWERCASE: &'static [&'static str] = &["email"];
}

#[derive(Debug, Deserialize)]
pub struct NewCompany {
    pub name: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl NewCompany {
    pub fn into_company(self) -> Result<Company, ApiError> {
        let mut errors = Vec::new();
        require(&mut errors, "name", self.name.as_deref());
        check(errors)?;

        let now = Utc::now();
        Ok(Company {
            id: new_id(),
            name: required(self.name),
            industry: self.industry,
            website: self.website,
            phone: self.phone,
            email: self.email,
            address: self.address,
            notes: self.notes,
            created_at: now,
            updated_at: now,
        })
    }
}

impl Draft for NewCompany {
    type Entity = Company;

    fn build(self) -> Result<Company, ApiError> {
        self.into_company()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CompanyPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Patch for CompanyPatch {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        forbid_blank(&mut errors, "name", self.name.as_deref());
        errors
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    check, forbid_blank, new_id, require, required, timestamp, Draft, Entity, Patch, Reference,
};
use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    #[serde(rename = "_id")]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Entity for Contact {
    const COLLECTION: &'static str = "contacts";
    const LABEL: &'static str = "Contact";
    const ROOM: &'static str = "contacts";
    const EVENT: &'static str = "contact";
    const REFERENCES: &'static [Reference] = &[Reference {
        field: "company_id",
        collection: "companies",
        select: &["name"],
    }];
    const LOWERCASE: &'static [&'static str] = &["email"];

    fn view(&self) -> Result<Value, serde_json::Error> {
        let mut view = serde_json::to_value(self)?;
        if let Value::Object(fields) = &mut view {
            fields.insert("full_name".to_string(), Value::String(self.full_name()));
        }
        Ok(view)
    }
}

#[derive(Debug, Deserialize)]
pub struct NewContact {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub company_id: Option<String>,
}

impl NewContact {
    pub fn into_contact(self) -> Result<Contact, ApiError> {
        let mut errors = Vec::new();
        require(&mut errors, "first_name", self.first_name.as_deref());
        require(&mut errors, "last_name", self.last_name.as_deref());
        check(errors)?;

        let now = Utc::now();
        Ok(Contact {
            id: new_id(),
            first_name: required(self.first_name),
            last_name: required(self.last_name),
            email: self.email,
            phone: self.phone,
            position: self.position,
            company_id: self.company_id,
            created_at: now,
            updated_at: now,
        })
    }
}

impl Draft for NewContact {
    type Entity = Contact;

    fn build(self) -> Result<Contact, ApiError> {
        self.into_contact()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ContactPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
}

impl Patch for ContactPatch {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        forbid_blank(&mut errors, "first_name", self.first_name.as_deref());
        forbid_blank(&mut errors, "last_name", self.last_name.as_deref());
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_carries_full_name() {
        let contact = NewContact {
            first_name: Some("Jo".to_string()),
            last_name: Some("Doe".to_string()),
            email: None,
            phone: None,
            position: None,
            company_id: None,
        }
        .into_contact()
        .unwrap();
        let view = contact.view().unwrap();
        assert_eq!(view["full_name"], "Jo Doe");
        assert!(view.get("email").is_none());
    }

    #[test]
    fn missing_names_are_reported_together() {
        let err = NewContact {
            first_name: None,
            last_name: Some(" ".to_string()),
            email: None,
            phone: None,
            position: None,
            company_id: None,
        }
        .into_contact()
        .unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                assert_eq!(errors, vec!["first_name is required", "last_name is required"])
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

pub mod activity;
pub mod company;
pub mod contact;
pub mod email_log;
pub mod expense;
pub mod lead;
pub mod notification;
pub mod opportunity;
pub mod settings;
pub mod timestamp;
pub mod user;

use chrono::Utc;
use mongodb::bson::{to_document, Bson, Document};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

pub use activity::{Activity, ActivityPatch, NewActivity};
pub use company::{Company, CompanyPatch, NewCompany};
pub use contact::{Contact, ContactPatch, NewContact};
pub use email_log::{EmailLog, EmailLogPatch, NewEmailLog};
pub use expense::{Expense, ExpensePatch, NewExpense};
pub use lead::{Lead, LeadPatch, NewLead};
pub use notification::{NewNotification, Notification};
pub use opportunity::{NewOpportunity, Opportunity, OpportunityPatch};
pub use settings::{Settings, SettingsPatch};
pub use user::User;

use crate::error::ApiError;

/// A foreign key expanded into a small projection of the referenced document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub field: &'static str,
    pub collection: &'static str,
    pub select: &'static [&'static str],
}

/// A persisted record type.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: &'static str;
    /// Human label used in messages, e.g. "Lead not found".
    const LABEL: &'static str;
    /// Real-time room that receives lifecycle events.
    const ROOM: &'static str;
    /// Event prefix: `<EVENT>-created`, `<EVENT>-updated`, `<EVENT>-deleted`.
    const EVENT: &'static str;
    const REFERENCES: &'static [Reference] = &[];
    const LOWERCASE: &'static [&'static str] = &[];
    /// String fields stored exactly as sent.
    const VERBATIM: &'static [&'static str] = &[];

    /// JSON shape returned to clients before references are expanded.
    fn view(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn to_stored(&self) -> Result<Document, ApiError> {
        let mut document = to_document(self)?;
        normalize::<Self>(&mut document);
        Ok(document)
    }
}

/// A create-request body that validates into a new entity.
pub trait Draft: DeserializeOwned + Send + 'static {
    type Entity: Entity;

    fn build(self) -> Result<Self::Entity, ApiError>;
}

/// A partial update merged into a stored document with `$set`.
pub trait Patch: Serialize {
    fn validate(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Validates a patch and turns it into the `$set` document, stamping `updated_at`.
pub fn set_document<E: Entity, P: Patch>(patch: &P) -> Result<Document, ApiError> {
    let errors = patch.validate();
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }
    let mut set = to_document(patch)?;
    normalize::<E>(&mut set);
    set.insert("updated_at", timestamp::format(&Utc::now()));
    Ok(set)
}

/// Trims top-level strings (and string arrays) and lower-cases e-mail style fields.
pub fn normalize<E: Entity>(document: &mut Document) {
    for (key, value) in document.iter_mut() {
        if E::VERBATIM.contains(&key.as_str()) {
            continue;
        }
        let lower = E::LOWERCASE.contains(&key.as_str());
        match value {
            Bson::String(s) => *s = clean(s, lower),
            Bson::Array(items) => {
                for item in items.iter_mut() {
                    if let Bson::String(s) = item {
                        *s = clean(s, lower);
                    }
                }
            }
            _ => {}
        }
    }
}

fn clean(raw: &str, lower: bool) -> String {
    let trimmed = raw.trim();
    if lower {
        trimmed.to_lowercase()
    } else {
        trimmed.to_string()
    }
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Records `"<field> is required"` when a value is absent or blank.
pub fn require(errors: &mut Vec<String>, field: &str, value: Option<&str>) {
    if value.map_or(true, |v| v.trim().is_empty()) {
        errors.push(format!("{field} is required"));
    }
}

/// Records an error when a value is present but blank.
pub fn forbid_blank(errors: &mut Vec<String>, field: &str, value: Option<&str>) {
    if value.is_some_and(|v| v.trim().is_empty()) {
        errors.push(format!("{field} cannot be empty"));
    }
}

/// `require` for values that are not free text, such as enums and dates.
pub fn require_value<T>(errors: &mut Vec<String>, field: &str, value: &Option<T>) {
    if value.is_none() {
        errors.push(format!("{field} is required"));
    }
}

pub fn check(errors: Vec<String>) -> Result<(), ApiError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

/// Unwraps a field that `require` has already vetted.
pub fn required(value: Option<String>) -> String {
    value.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;

    use super::*;

    #[test]
    fn normalize_trims_and_lowercases() {
        let mut document = doc! {
            "name": "  Acme  ",
            "email": " Sales@ACME.io ",
            "tags": [" a ", "b "],
            "value": 3,
        };
        normalize::<Contact>(&mut document);
        assert_eq!(document.get_str("name").unwrap(), "Acme");
        assert_eq!(document.get_str("email").unwrap(), "sales@acme.io");
        assert_eq!(document.get_array("tags").unwrap(), &vec![Bson::from("a"), Bson::from("b")]);
        assert_eq!(document.get_i32("value").unwrap(), 3);
    }

    #[test]
    fn verbatim_fields_are_untouched() {
        let mut document = doc! { "body": "  hello\n", "subject": " hi " };
        normalize::<EmailLog>(&mut document);
        assert_eq!(document.get_str("body").unwrap(), "  hello\n");
        assert_eq!(document.get_str("subject").unwrap(), "hi");
    }

    #[test]
    fn require_flags_blank_values() {
        let mut errors = Vec::new();
        require(&mut errors, "name", Some("   "));
        require(&mut errors, "email", None);
        require(&mut errors, "title", Some("ok"));
        assert_eq!(errors, vec!["name is required", "email is required"]);
    }
}

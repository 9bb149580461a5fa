use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    check, forbid_blank, new_id, require, require_value, required, timestamp, Draft, Entity, Patch,
    Reference,
};
use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    #[serde(rename = "_id")]
    pub id: String,
    pub description: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(with = "timestamp")]
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opportunity_id: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Entity for Expense {
    const COLLECTION: &'static str = "expenses";
    const LABEL: &'static str = "Expense";
    const ROOM: &'static str = "expenses";
    const EVENT: &'static str = "expense";
    const REFERENCES: &'static [Reference] = &[Reference {
        field: "opportunity_id",
        collection: "opportunities",
        select: &["title"],
    }];
}

fn check_amount(errors: &mut Vec<String>, amount: Option<f64>) {
    if amount.is_some_and(|a| a < 0.0) {
        errors.push("amount must be zero or greater".to_string());
    }
}

#[derive(Debug, Deserialize)]
pub struct NewExpense {
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub category: Option<String>,
    #[serde(default, with = "timestamp::option")]
    pub date: Option<DateTime<Utc>>,
    pub opportunity_id: Option<String>,
}

impl NewExpense {
    pub fn into_expense(self) -> Result<Expense, ApiError> {
        let mut errors = Vec::new();
        require(&mut errors, "description", self.description.as_deref());
        require_value(&mut errors, "amount", &self.amount);
        check_amount(&mut errors, self.amount);
        require_value(&mut errors, "date", &self.date);
        check(errors)?;

        let now = Utc::now();
        Ok(Expense {
            id: new_id(),
            description: required(self.description),
            amount: self.amount.unwrap_or_default(),
            category: self.category,
            date: self.date.unwrap_or_default(),
            opportunity_id: self.opportunity_id,
            created_at: now,
            updated_at: now,
        })
    }
}

impl Draft for NewExpense {
    type Entity = Expense;

    fn build(self) -> Result<Expense, ApiError> {
        self.into_expense()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ExpensePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opportunity_id: Option<String>,
}

impl Patch for ExpensePatch {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        forbid_blank(&mut errors, "description", self.description.as_deref());
        check_amount(&mut errors, self.amount);
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_amount_is_rejected() {
        let err = NewExpense {
            description: Some("Taxi".to_string()),
            amount: Some(-1.0),
            category: None,
            date: Some(timestamp::parse("2026-05-01").unwrap()),
            opportunity_id: None,
        }
        .into_expense()
        .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(ref e) if e == &["amount must be zero or greater"]
        ));
    }

    #[test]
    fn zero_amount_is_allowed() {
        let expense = NewExpense {
            description: Some("Coffee".to_string()),
            amount: Some(0.0),
            category: None,
            date: Some(timestamp::parse("2026-05-01").unwrap()),
            opportunity_id: None,
        }
        .into_expense()
        .unwrap();
        assert_eq!(expense.amount, 0.0);
    }
}

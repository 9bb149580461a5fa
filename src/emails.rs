use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::db::{read_count, Accumulator, Filter, SortOrder};
use crate::error::ApiResult;
use crate::models::email_log::{EmailStatus, EmailType};
use crate::models::EmailLog;
use crate::repository::{self, PageRequest};

const SEARCH_FIELDS: &[&str] = &["subject", "body", "from", "to"];

/// Entity ids an e-mail can be filed under.
#[derive(Debug, Default, Deserialize)]
pub struct LinkedTo {
    pub contact_id: Option<String>,
    pub company_id: Option<String>,
    pub lead_id: Option<String>,
    pub opportunity_id: Option<String>,
}

impl LinkedTo {
    fn clauses(&self) -> Vec<Filter> {
        [
            ("contact_id", &self.contact_id),
            ("company_id", &self.company_id),
            ("lead_id", &self.lead_id),
            ("opportunity_id", &self.opportunity_id),
        ]
        .into_iter()
        .filter_map(|(field, value)| {
            let id = value.as_deref()?.trim();
            (!id.is_empty()).then(|| Filter::eq(field, id))
        })
        .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub contact_id: Option<String>,
    pub company_id: Option<String>,
    pub lead_id: Option<String>,
    pub opportunity_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<EmailType>,
    pub status: Option<EmailStatus>,
    pub search: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    #[serde(rename = "sortOrder")]
    pub sort_order: Option<SortOrder>,
}

impl EmailQuery {
    fn linked_to(&self) -> LinkedTo {
        LinkedTo {
            contact_id: self.contact_id.clone(),
            company_id: self.company_id.clone(),
            lead_id: self.lead_id.clone(),
            opportunity_id: self.opportunity_id.clone(),
        }
    }

    pub fn filter(&self) -> Filter {
        let mut clauses = self.linked_to().clauses();
        if let Some(kind) = self.kind {
            clauses.push(Filter::eq("type", kind.as_str()));
        }
        if let Some(status) = self.status {
            clauses.push(Filter::eq("status", status.as_str()));
        }
        let search = self.search.as_deref();
        if let Some(search) = search.and_then(|s| Filter::search(SEARCH_FIELDS, s)) {
            clauses.push(search);
        }
        Filter::all_of(clauses)
    }
}

pub async fn list_emails(
    data: web::Data<AppState>,
    query: web::Query<EmailQuery>,
) -> ApiResult<HttpResponse> {
    let request = PageRequest::new(
        query.page,
        query.limit,
        query.sort_by.as_deref(),
        "sent_at",
        query.sort_order,
    )?;
    let (emails, pagination) =
        repository::page::<EmailLog>(data.store(), &query.filter(), &request).await?;
    let emails = repository::expand(data.store(), &emails).await?;
    Ok(HttpResponse::Ok().json(json!({ "emailLogs": emails, "pagination": pagination })))
}

pub async fn email_stats(
    data: web::Data<AppState>,
    query: web::Query<LinkedTo>,
) -> ApiResult<HttpResponse> {
    let accumulators = [
        Accumulator::Count("total"),
        Accumulator::count_eq("sent", "type", EmailType::Sent.as_str()),
        Accumulator::count_eq("received", "type", EmailType::Received.as_str()),
        Accumulator::count_eq("delivered", "status", EmailStatus::Delivered.as_str()),
        Accumulator::count_eq("opened", "status", EmailStatus::Opened.as_str()),
        Accumulator::count_eq("clicked", "status", EmailStatus::Clicked.as_str()),
        Accumulator::count_eq("bounced", "status", EmailStatus::Bounced.as_str()),
    ];
    let group = data
        .store()
        .group("email_logs", &Filter::all_of(query.clauses()), &accumulators)
        .await?
        .unwrap_or_default();

    let stats: serde_json::Map<String, serde_json::Value> = accumulators
        .iter()
        .map(|a| (a.name().to_string(), json!(read_count(&group, a.name()))))
        .collect();
    Ok(HttpResponse::Ok().json(stats))
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;

    use super::*;

    #[test]
    fn filters_combine_entity_ids_and_enums() {
        let query = web::Query::<EmailQuery>::from_query("lead_id=l1&type=received&status=opened")
            .unwrap()
            .into_inner();
        let filter = query.filter();
        assert!(filter.matches(&doc! { "lead_id": "l1", "type": "received", "status": "opened" }));
        assert!(!filter.matches(&doc! { "lead_id": "l2", "type": "received", "status": "opened" }));
    }

    #[test]
    fn search_reaches_recipient_lists() {
        let query = web::Query::<EmailQuery>::from_query("search=BOB@").unwrap().into_inner();
        assert!(query.filter().matches(&doc! { "to": ["alice@x.io", "bob@y.io"] }));
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(web::Query::<EmailQuery>::from_query("type=spam").is_err());
    }
}

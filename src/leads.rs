use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::db::{read_count, read_number, Accumulator, Filter, SortOrder};
use crate::error::ApiResult;
use crate::models::lead::LeadStatus;
use crate::models::Lead;
use crate::repository::{self, PageRequest};

const SEARCH_FIELDS: &[&str] = &["name", "email", "company", "notes"];

#[derive(Debug, Deserialize)]
pub struct LeadQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub forecast: Option<String>,
    pub assigned_to: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    #[serde(rename = "sortOrder")]
    pub sort_order: Option<SortOrder>,
}

/// `"all"` and blank values mean "no filter".
fn selected(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

impl LeadQuery {
    pub fn filter(&self) -> Filter {
        let mut clauses = Vec::new();
        let search = self.search.as_deref();
        if let Some(search) = search.and_then(|s| Filter::search(SEARCH_FIELDS, s)) {
            clauses.push(search);
        }
        if let Some(status) = selected(self.status.as_deref()) {
            // legacy documents only carry `status`
            clauses.push(Filter::Or(vec![
                Filter::eq("lead_status", status),
                Filter::eq("status", status),
            ]));
        }
        if let Some(forecast) = selected(self.forecast.as_deref()) {
            clauses.push(Filter::eq("forecast", forecast));
        }
        if let Some(assigned_to) = selected(self.assigned_to.as_deref()) {
            clauses.push(Filter::eq("assigned_to", assigned_to));
        }
        Filter::all_of(clauses)
    }
}

pub async fn list_leads(
    data: web::Data<AppState>,
    query: web::Query<LeadQuery>,
) -> ApiResult<HttpResponse> {
    let request = PageRequest::new(
        query.page,
        query.limit,
        query.sort_by.as_deref(),
        "created_at",
        query.sort_order,
    )?;
    let (leads, pagination) =
        repository::page::<Lead>(data.store(), &query.filter(), &request).await?;
    let leads = repository::expand(data.store(), &leads).await?;
    Ok(HttpResponse::Ok().json(json!({ "leads": leads, "pagination": pagination })))
}

pub async fn lead_stats(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let mut accumulators = vec![Accumulator::Count("total")];
    accumulators.extend(LeadStatus::ALL.iter().map(|status| {
        Accumulator::count_eq(stat_key(*status), "lead_status", status.as_str())
    }));
    accumulators.push(Accumulator::Sum {
        name: "totalValue",
        field: "value",
    });

    let group = data
        .store()
        .group("leads", &Filter::All, &accumulators)
        .await?
        .unwrap_or_default();

    let mut stats = serde_json::Map::new();
    stats.insert("total".to_string(), json!(read_count(&group, "total")));
    for status in LeadStatus::ALL {
        let key = stat_key(status);
        stats.insert(key.to_string(), json!(read_count(&group, key)));
    }
    stats.insert("totalValue".to_string(), json!(read_number(&group, "totalValue")));
    Ok(HttpResponse::Ok().json(stats))
}

fn stat_key(status: LeadStatus) -> &'static str {
    match status {
        LeadStatus::Cold => "cold",
        LeadStatus::Warm => "warm",
        LeadStatus::Hot => "hot",
        LeadStatus::Won => "won",
        LeadStatus::Lost => "lost",
    }
}

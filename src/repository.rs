//! Entity-level persistence on top of [`Store`].
//!
//! Handlers go through these helpers so every entity shares one code path for
//! lookups, `$set` merges, reference expansion and paging.

use std::collections::{BTreeSet, HashMap};

use mongodb::bson::{from_document, Document};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::db::{Filter, FindOptions, SortOrder, Store};
use crate::error::{ApiError, ApiResult};
use crate::models::{set_document, Entity, Patch, Reference};

/// Persists `entity` and returns it as stored, i.e. after normalization.
pub async fn insert<E: Entity>(store: &dyn Store, entity: &E) -> ApiResult<E> {
    let document = entity.to_stored()?;
    store.insert_one(E::COLLECTION, document.clone()).await?;
    Ok(from_document(document)?)
}

pub async fn insert_many<E: Entity>(store: &dyn Store, entities: &[E]) -> ApiResult<Vec<E>> {
    if entities.is_empty() {
        return Ok(Vec::new());
    }
    let documents = entities
        .iter()
        .map(E::to_stored)
        .collect::<Result<Vec<_>, _>>()?;
    store.insert_many(E::COLLECTION, documents.clone()).await?;
    documents
        .into_iter()
        .map(|document| from_document(document).map_err(ApiError::from))
        .collect()
}

pub async fn find_one<E: Entity>(store: &dyn Store, filter: &Filter) -> ApiResult<Option<E>> {
    match store.find_one(E::COLLECTION, filter).await? {
        Some(document) => Ok(Some(from_document(document)?)),
        None => Ok(None),
    }
}

pub async fn find_by_id<E: Entity>(store: &dyn Store, id: &str) -> ApiResult<E> {
    find_one(store, &Filter::id(id))
        .await?
        .ok_or(ApiError::NotFound(E::LABEL))
}

pub async fn list<E: Entity>(
    store: &dyn Store,
    filter: &Filter,
    options: &FindOptions,
) -> ApiResult<Vec<E>> {
    store
        .find(E::COLLECTION, filter, options)
        .await?
        .into_iter()
        .map(|document| from_document(document).map_err(ApiError::from))
        .collect()
}

/// One page of matches plus the envelope describing it.
pub async fn page<E: Entity>(
    store: &dyn Store,
    filter: &Filter,
    request: &PageRequest,
) -> ApiResult<(Vec<E>, Pagination)> {
    let items = list(store, filter, &request.options()).await?;
    let total = store.count(E::COLLECTION, filter).await?;
    Ok((items, request.pagination(total)))
}

/// Merges a validated patch into the document matching `filter`.
pub async fn update_where<E: Entity, P: Patch>(
    store: &dyn Store,
    filter: &Filter,
    patch: &P,
) -> ApiResult<E> {
    let set = set_document::<E, P>(patch)?;
    apply(store, filter, set).await
}

pub async fn update<E: Entity, P: Patch>(store: &dyn Store, id: &str, patch: &P) -> ApiResult<E> {
    update_where(store, &Filter::id(id), patch).await
}

/// Applies a raw `$set` and returns the updated entity.
pub async fn apply<E: Entity>(store: &dyn Store, filter: &Filter, set: Document) -> ApiResult<E> {
    match store.update_one(E::COLLECTION, filter, set).await? {
        Some(document) => Ok(from_document(document)?),
        None => Err(ApiError::NotFound(E::LABEL)),
    }
}

pub async fn delete_where<E: Entity>(store: &dyn Store, filter: &Filter) -> ApiResult<E> {
    match store.delete_one(E::COLLECTION, filter).await? {
        Some(document) => Ok(from_document(document)?),
        None => Err(ApiError::NotFound(E::LABEL)),
    }
}

pub async fn delete<E: Entity>(store: &dyn Store, id: &str) -> ApiResult<E> {
    delete_where(store, &Filter::id(id)).await
}

/// Client views of `entities` with every reference expanded.
pub async fn expand<E: Entity>(store: &dyn Store, entities: &[E]) -> ApiResult<Vec<Value>> {
    let mut views = entities
        .iter()
        .map(E::view)
        .collect::<Result<Vec<_>, _>>()?;
    populate(store, E::REFERENCES, &mut views).await?;
    Ok(views)
}

pub async fn expand_one<E: Entity>(store: &dyn Store, entity: &E) -> ApiResult<Value> {
    let mut views = vec![entity.view()?];
    populate(store, E::REFERENCES, &mut views).await?;
    Ok(views.pop().unwrap_or(Value::Null))
}

/// Replaces each reference id with `{_id, <selected fields>}`, or `null` when the
/// id no longer resolves. One lookup per reference field, whatever the batch size.
pub async fn populate(
    store: &dyn Store,
    references: &[Reference],
    views: &mut [Value],
) -> ApiResult<()> {
    for reference in references {
        let ids: BTreeSet<String> = views
            .iter()
            .filter_map(|view| view.get(reference.field)?.as_str().map(str::to_string))
            .collect();
        if ids.is_empty() {
            continue;
        }

        let found = store
            .find(
                reference.collection,
                &Filter::ids(ids.into_iter().collect()),
                &FindOptions::default(),
            )
            .await?;
        let projections: HashMap<String, Value> = found
            .iter()
            .filter_map(|document| {
                let id = document.get_str("_id").ok()?;
                Some((id.to_string(), project(document, reference.select)))
            })
            .collect();

        for view in views.iter_mut() {
            if let Some(slot) = view.get_mut(reference.field) {
                if let Some(id) = slot.as_str() {
                    *slot = projections.get(id).cloned().unwrap_or(Value::Null);
                }
            }
        }
    }
    Ok(())
}

fn project(document: &Document, select: &[&str]) -> Value {
    let mut fields = Map::new();
    if let Some(id) = document.get("_id") {
        fields.insert("_id".to_string(), id.clone().into_relaxed_extjson());
    }
    for field in select {
        if let Some(value) = document.get(*field) {
            fields.insert(field.to_string(), value.clone().into_relaxed_extjson());
        }
    }
    Value::Object(fields)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
}

/// Validated paging and sorting for a list request.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
    pub sort_by: String,
    pub sort_order: SortOrder,
}

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

impl PageRequest {
    pub fn new(
        page: Option<u64>,
        limit: Option<u64>,
        sort_by: Option<&str>,
        default_sort: &str,
        sort_order: Option<SortOrder>,
    ) -> ApiResult<Self> {
        let page = page.unwrap_or(DEFAULT_PAGE);
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        let mut errors = Vec::new();
        if page == 0 {
            errors.push("page must be at least 1".to_string());
        }
        if limit == 0 {
            errors.push("limit must be at least 1".to_string());
        }
        // the driver takes a signed limit and reads negatives as a single batch
        if i64::try_from(limit).is_err() {
            errors.push(format!("limit must be at most {}", i64::MAX));
        }
        let sort_by = match sort_by.map(str::trim).filter(|s| !s.is_empty()) {
            Some(field) if field.starts_with('$') => {
                errors.push(format!("cannot sort by {field}"));
                default_sort.to_string()
            }
            Some(field) => sort_field(field).to_string(),
            None => default_sort.to_string(),
        };
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }
        Ok(Self {
            page,
            limit,
            sort_by,
            sort_order: sort_order.unwrap_or_default(),
        })
    }

    pub fn options(&self) -> FindOptions {
        FindOptions::sorted(&self.sort_by, self.sort_order)
            .page((self.page - 1).saturating_mul(self.limit), self.limit)
    }

    pub fn pagination(&self, total: u64) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
            total,
            pages: total.div_ceil(self.limit),
        }
    }
}

/// Maps camel-case sort keys onto stored field names.
fn sort_field(raw: &str) -> &str {
    match raw {
        "createdAt" => "created_at",
        "updatedAt" => "updated_at",
        "sentAt" => "sent_at",
        other => other,
    }
}

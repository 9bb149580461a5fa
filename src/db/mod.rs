//! Document-store access.
//!
//! Handlers talk to a [`Store`] trait object; [`MongoStore`] backs production and
//! [`MemoryStore`] backs tests and the `memory://` connection string.

mod filter;
mod memory;
mod mongo;

use async_trait::async_trait;
use mongodb::bson::{doc, Bson, Document};
use serde::Deserialize;

pub use filter::{as_f64, compare_bson, Filter};
pub use memory::MemoryStore;
pub use mongo::MongoStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate key in {collection}: {message}")]
    Duplicate { collection: String, message: String },

    #[error("database error: {0}")]
    Backend(#[from] mongodb::error::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn direction(self) -> i32 {
        match self {
            SortOrder::Asc => 1,
            SortOrder::Desc => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FindOptions {
    pub sort: Option<(String, SortOrder)>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn sorted(field: &str, order: SortOrder) -> Self {
        FindOptions {
            sort: Some((field.to_string(), order)),
            skip: 0,
            limit: None,
        }
    }

    pub fn page(mut self, skip: u64, limit: u64) -> Self {
        self.skip = skip;
        self.limit = Some(limit);
        self
    }

    /// Sort document with `_id` appended as a tie-breaker so pages never overlap.
    pub fn sort_document(&self) -> Option<Document> {
        self.sort.as_ref().map(|(field, order)| {
            let mut sort = doc! { field.as_str(): order.direction() };
            if field != "_id" {
                sort.insert("_id", order.direction());
            }
            sort
        })
    }
}

/// One output field of a single-group aggregation.
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    Count(&'static str),
    /// Counts documents whose `field` equals `value`.
    CountEq {
        name: &'static str,
        field: &'static str,
        value: Bson,
    },
    Sum {
        name: &'static str,
        field: &'static str,
    },
}

impl Accumulator {
    pub fn count_eq(name: &'static str, field: &'static str, value: impl Into<Bson>) -> Self {
        Accumulator::CountEq {
            name,
            field,
            value: value.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Accumulator::Count(name)
            | Accumulator::CountEq { name, .. }
            | Accumulator::Sum { name, .. } => *name,
        }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), StoreError>;

    async fn insert_many(&self, collection: &str, documents: Vec<Document>)
        -> Result<(), StoreError>;

    async fn find_one(&self, collection: &str, filter: &Filter)
        -> Result<Option<Document>, StoreError>;

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError>;

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

    /// Applies `$set` to the first match and returns the document after the update.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        set: Document,
    ) -> Result<Option<Document>, StoreError>;

    /// Applies `$set` to every match and returns how many documents changed.
    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        set: Document,
    ) -> Result<u64, StoreError>;

    /// Atomic get-or-create: `set` is applied either way, `set_on_insert` only when
    /// no document matched. Field sets must be disjoint.
    async fn upsert_one(
        &self,
        collection: &str,
        filter: &Filter,
        set: Document,
        set_on_insert: Document,
    ) -> Result<Document, StoreError>;

    /// Removes the first match and returns it.
    async fn delete_one(&self, collection: &str, filter: &Filter)
        -> Result<Option<Document>, StoreError>;

    /// Folds every match into one document keyed by accumulator name; `None` when
    /// nothing matched.
    async fn group(
        &self,
        collection: &str,
        filter: &Filter,
        accumulators: &[Accumulator],
    ) -> Result<Option<Document>, StoreError>;

    async fn create_index(&self, collection: &str, field: &str, unique: bool)
        -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// Reads a numeric aggregation output regardless of the integer width the store chose.
pub fn read_number(document: &Document, key: &str) -> f64 {
    document.get(key).and_then(as_f64).unwrap_or(0.0)
}

pub fn read_count(document: &Document, key: &str) -> u64 {
    read_number(document, key).max(0.0) as u64
}

pub const INDEXES: &[(&str, &str, bool)] = &[
    ("users", "email", true),
    ("leads", "name", false),
    ("leads", "email", false),
    ("leads", "company", false),
    ("leads", "lead_status", false),
    ("leads", "status", false),
    ("leads", "forecast", false),
    ("leads", "assigned_to", false),
    ("leads", "created_at", false),
    ("email_logs", "from", false),
    ("email_logs", "to", false),
    ("email_logs", "contact_id", false),
    ("email_logs", "company_id", false),
    ("email_logs", "lead_id", false),
    ("email_logs", "opportunity_id", false),
    ("email_logs", "sent_at", false),
    ("email_logs", "type", false),
    ("email_logs", "status", false),
    ("notifications", "user_id", false),
    ("notifications", "is_read", false),
    ("notifications", "created_at", false),
    ("notifications", "expires_at", false),
];

pub async fn ensure_indexes(store: &dyn Store) -> Result<(), StoreError> {
    for (collection, field, unique) in INDEXES {
        store.create_index(collection, field, *unique).await?;
    }
    Ok(())
}

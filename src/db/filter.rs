use std::cmp::Ordering;

use mongodb::bson::{doc, Bson, Document};

/// A query predicate over top-level document fields.
///
/// Compiled to a MongoDB filter document by [`Filter::to_document`] and
/// evaluated in-process by [`Filter::matches`].
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Eq(String, Bson),
    In(String, Vec<Bson>),
    /// Case-insensitive literal substring. On array fields any element may match.
    Contains(String, String),
    Exists(String, bool),
    Gt(String, Bson),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Bson>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn id(id: &str) -> Self {
        Filter::eq("_id", id)
    }

    pub fn ids(ids: Vec<String>) -> Self {
        Filter::In("_id".to_string(), ids.into_iter().map(Bson::String).collect())
    }

    pub fn contains(field: &str, needle: &str) -> Self {
        Filter::Contains(field.to_string(), needle.to_string())
    }

    pub fn exists(field: &str, exists: bool) -> Self {
        Filter::Exists(field.to_string(), exists)
    }

    pub fn gt(field: &str, value: impl Into<Bson>) -> Self {
        Filter::Gt(field.to_string(), value.into())
    }

    /// Search across several fields; `None` when the term is blank.
    pub fn search(fields: &[&str], term: &str) -> Option<Self> {
        let term = term.trim();
        if term.is_empty() {
            return None;
        }
        Some(Filter::Or(
            fields.iter().map(|field| Filter::contains(field, term)).collect(),
        ))
    }

    /// Conjunction that drops `All` terms and collapses single clauses.
    pub fn all_of(filters: Vec<Filter>) -> Self {
        let mut clauses: Vec<Filter> = filters
            .into_iter()
            .filter(|f| !matches!(f, Filter::All))
            .collect();
        match clauses.len() {
            0 => Filter::All,
            1 => clauses.remove(0),
            _ => Filter::And(clauses),
        }
    }

    pub fn to_document(&self) -> Document {
        match self {
            Filter::All => doc! {},
            Filter::Eq(field, value) => doc! { field.as_str(): value.clone() },
            Filter::In(field, values) => doc! { field.as_str(): { "$in": values.clone() } },
            Filter::Contains(field, needle) => doc! {
                field.as_str(): { "$regex": regex::escape(needle), "$options": "i" }
            },
            Filter::Exists(field, exists) => doc! { field.as_str(): { "$exists": *exists } },
            Filter::Gt(field, value) => doc! { field.as_str(): { "$gt": value.clone() } },
            Filter::And(clauses) if clauses.is_empty() => doc! {},
            Filter::And(clauses) => doc! {
                "$and": clauses.iter().map(|c| Bson::Document(c.to_document())).collect::<Vec<_>>()
            },
            // an empty disjunction matches nothing
            Filter::Or(clauses) if clauses.is_empty() => doc! { "_id": { "$in": [] } },
            Filter::Or(clauses) => doc! {
                "$or": clauses.iter().map(|c| Bson::Document(c.to_document())).collect::<Vec<_>>()
            },
        }
    }

    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, value) => match document.get(field) {
                Some(found @ Bson::Array(items)) => {
                    found == value || items.iter().any(|item| item == value)
                }
                Some(found) => found == value,
                None => matches!(value, Bson::Null),
            },
            Filter::In(field, values) => match document.get(field) {
                Some(Bson::Array(items)) => items.iter().any(|item| values.contains(item)),
                Some(found) => values.contains(found),
                None => values.contains(&Bson::Null),
            },
            Filter::Contains(field, needle) => {
                let needle = needle.to_lowercase();
                match document.get(field) {
                    Some(Bson::String(s)) => s.to_lowercase().contains(&needle),
                    Some(Bson::Array(items)) => items.iter().any(|item| match item {
                        Bson::String(s) => s.to_lowercase().contains(&needle),
                        _ => false,
                    }),
                    _ => false,
                }
            }
            Filter::Exists(field, exists) => document.contains_key(field) == *exists,
            Filter::Gt(field, value) => document
                .get(field)
                .and_then(|found| compare_bson(found, value))
                .is_some_and(|ordering| ordering == Ordering::Greater),
            Filter::And(clauses) => clauses.iter().all(|c| c.matches(document)),
            Filter::Or(clauses) => clauses.iter().any(|c| c.matches(document)),
        }
    }

    /// Equality terms reachable through conjunctions; used to seed upserted documents.
    pub fn equalities(&self) -> Document {
        let mut seeded = Document::new();
        match self {
            Filter::Eq(field, value) => {
                seeded.insert(field.clone(), value.clone());
            }
            Filter::And(clauses) => {
                for clause in clauses {
                    seeded.extend(clause.equalities());
                }
            }
            _ => {}
        }
        seeded
    }
}

/// Ordering between comparable BSON values of the same kind. Numbers compare across types.
pub fn compare_bson(left: &Bson, right: &Bson) -> Option<Ordering> {
    match (left, right) {
        (Bson::String(a), Bson::String(b)) => Some(a.cmp(b)),
        (Bson::Boolean(a), Bson::Boolean(b)) => Some(a.cmp(b)),
        (Bson::DateTime(a), Bson::DateTime(b)) => Some(a.cmp(b)),
        (Bson::Null, Bson::Null) => Some(Ordering::Equal),
        _ => match (as_f64(left), as_f64(right)) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    }
}

pub fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

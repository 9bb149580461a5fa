use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use mongodb::bson::{Bson, Document};
use tokio::sync::RwLock;

use super::{as_f64, compare_bson, Accumulator, Filter, FindOptions, Store, StoreError};

#[derive(Default)]
struct State {
    collections: HashMap<String, Vec<Document>>,
    unique: HashSet<(String, String)>,
}

impl State {
    fn check_unique(
        &self,
        collection: &str,
        candidate: &Document,
        skip: Option<usize>,
    ) -> Result<(), StoreError> {
        let docs = self.collections.get(collection).map(Vec::as_slice).unwrap_or(&[]);
        let mut fields = vec!["_id".to_string()];
        fields.extend(
            self.unique
                .iter()
                .filter(|(c, _)| c == collection)
                .map(|(_, f)| f.clone()),
        );
        for field in fields {
            let Some(value) = candidate.get(&field) else { continue };
            let clash = docs
                .iter()
                .enumerate()
                .any(|(i, existing)| Some(i) != skip && existing.get(&field) == Some(value));
            if clash {
                return Err(StoreError::Duplicate {
                    collection: collection.to_string(),
                    message: format!("{field} {value} already exists"),
                });
            }
        }
        Ok(())
    }
}

/// Process-local store with the same observable semantics as [`super::MongoStore`].
///
/// Writes hold one lock for their whole read-modify-write, so single-document
/// operations (including upserts) are atomic.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sort_documents(docs: &mut [Document], options: &FindOptions) {
    let Some((field, order)) = &options.sort else { return };
    docs.sort_by(|a, b| {
        let primary = compare_field(a, b, field);
        let ordering = if primary == Ordering::Equal {
            compare_field(a, b, "_id")
        } else {
            primary
        };
        if order.direction() < 0 {
            ordering.reverse()
        } else {
            ordering
        }
    });
}

// missing fields sort before present ones, as in MongoDB
fn compare_field(a: &Document, b: &Document, field: &str) -> Ordering {
    match (a.get(field), b.get(field)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => compare_bson(x, y).unwrap_or(Ordering::Equal),
    }
}

fn apply_set(target: &mut Document, set: &Document) -> bool {
    let mut changed = false;
    for (key, value) in set {
        if target.get(key) != Some(value) {
            target.insert(key.clone(), value.clone());
            changed = true;
        }
    }
    changed
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.check_unique(collection, &document, None)?;
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(document);
        Ok(())
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        for document in documents {
            state.check_unique(collection, &document, None)?;
            state
                .collections
                .entry(collection.to_string())
                .or_default()
                .push(document);
        }
        Ok(())
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| filter.matches(d)).cloned()))
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        let state = self.state.read().await;
        let mut docs: Vec<Document> = state
            .collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default();
        sort_documents(&mut docs, options);
        let limit = options.limit.map_or(usize::MAX, |l| l as usize);
        Ok(docs
            .into_iter()
            .skip(options.skip as usize)
            .take(limit)
            .collect())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .collections
            .get(collection)
            .map_or(0, |docs| docs.iter().filter(|d| filter.matches(d)).count() as u64))
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        set: Document,
    ) -> Result<Option<Document>, StoreError> {
        let mut state = self.state.write().await;
        let Some(index) = state
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().position(|d| filter.matches(d)))
        else {
            return Ok(None);
        };
        let mut updated = state.collections[collection][index].clone();
        apply_set(&mut updated, &set);
        state.check_unique(collection, &updated, Some(index))?;
        let docs = state.collections.entry(collection.to_string()).or_default();
        docs[index] = updated.clone();
        Ok(Some(updated))
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        set: Document,
    ) -> Result<u64, StoreError> {
        let mut state = self.state.write().await;
        let Some(docs) = state.collections.get_mut(collection) else {
            return Ok(0);
        };
        let mut modified = 0;
        for doc in docs.iter_mut().filter(|d| filter.matches(d)) {
            if apply_set(doc, &set) {
                modified += 1;
            }
        }
        Ok(modified)
    }

    async fn upsert_one(
        &self,
        collection: &str,
        filter: &Filter,
        set: Document,
        set_on_insert: Document,
    ) -> Result<Document, StoreError> {
        let mut state = self.state.write().await;
        let docs = state.collections.entry(collection.to_string()).or_default();
        if let Some(existing) = docs.iter_mut().find(|d| filter.matches(d)) {
            apply_set(existing, &set);
            return Ok(existing.clone());
        }
        let mut created = filter.equalities();
        created.extend(set_on_insert);
        created.extend(set);
        state.check_unique(collection, &created, None)?;
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        let mut state = self.state.write().await;
        let Some(docs) = state.collections.get_mut(collection) else {
            return Ok(None);
        };
        Ok(docs
            .iter()
            .position(|d| filter.matches(d))
            .map(|index| docs.remove(index)))
    }

    async fn group(
        &self,
        collection: &str,
        filter: &Filter,
        accumulators: &[Accumulator],
    ) -> Result<Option<Document>, StoreError> {
        let state = self.state.read().await;
        let matched: Vec<&Document> = state
            .collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).collect())
            .unwrap_or_default();
        if matched.is_empty() {
            return Ok(None);
        }
        let mut result = Document::new();
        for accumulator in accumulators {
            let value = match accumulator {
                Accumulator::Count(_) => Bson::Int64(matched.len() as i64),
                Accumulator::CountEq { field, value, .. } => Bson::Int64(
                    matched.iter().filter(|d| d.get(*field) == Some(value)).count() as i64,
                ),
                Accumulator::Sum { field, .. } => Bson::Double(
                    matched
                        .iter()
                        .filter_map(|d| d.get(*field).and_then(as_f64))
                        .sum(),
                ),
            };
            result.insert(accumulator.name(), value);
        }
        Ok(Some(result))
    }

    async fn create_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
    ) -> Result<(), StoreError> {
        if unique {
            let mut state = self.state.write().await;
            state.unique.insert((collection.to_string(), field.to_string()));
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

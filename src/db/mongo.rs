use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use log::{error, info};
use mongodb::{
    bson::{doc, Bson, Document},
    error::{ErrorKind, WriteFailure},
    options::{ClientOptions, IndexOptions, ReturnDocument},
    Client, Database, IndexModel,
};

use super::{Accumulator, Filter, FindOptions, Store, StoreError};

const DUPLICATE_KEY: i32 = 11000;

pub struct MongoStore {
    pub client: Client,
    pub db: Database,
}

impl MongoStore {
    /// Builds a client without contacting the server. A connection string that does
    /// not parse falls back to the local default so the process can still start.
    pub async fn init(uri: &str, db_name: &str, timeout: Duration) -> Result<Self, StoreError> {
        let mut client_options = match ClientOptions::parse(uri).await {
            Ok(options) => options,
            Err(e) => {
                error!("Failed to parse MongoDB connection string: {}", e);
                ClientOptions::parse("mongodb://localhost:27017").await?
            }
        };
        client_options.server_selection_timeout = Some(timeout);
        client_options.app_name = Some("crm-backend".to_string());
        let client = Client::with_options(client_options)?;
        let db = client.database(db_name);
        info!("MongoDB client ready for database {}", db_name);
        Ok(MongoStore { client, db })
    }

    fn collection(&self, name: &str) -> mongodb::Collection<Document> {
        self.db.collection::<Document>(name)
    }
}

fn classify(collection: &str, err: mongodb::error::Error) -> StoreError {
    let duplicate = match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::InsertMany(e) => e
            .write_errors
            .as_ref()
            .is_some_and(|errors| errors.iter().any(|w| w.code == DUPLICATE_KEY)),
        _ => false,
    };
    if duplicate {
        StoreError::Duplicate {
            collection: collection.to_string(),
            message: err.to_string(),
        }
    } else {
        StoreError::Backend(err)
    }
}

fn group_stage(accumulators: &[Accumulator]) -> Document {
    let mut group = doc! { "_id": Bson::Null };
    for accumulator in accumulators {
        let expression = match accumulator {
            Accumulator::Count(_) => doc! { "$sum": 1 },
            Accumulator::CountEq { field, value, .. } => doc! {
                "$sum": { "$cond": [ { "$eq": [ format!("${field}"), value.clone() ] }, 1, 0 ] }
            },
            Accumulator::Sum { field, .. } => doc! { "$sum": format!("${field}") },
        };
        group.insert(accumulator.name(), expression);
    }
    group
}

#[async_trait]
impl Store for MongoStore {
    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        self.collection(collection)
            .insert_one(document)
            .await
            .map_err(|e| classify(collection, e))?;
        Ok(())
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<(), StoreError> {
        if documents.is_empty() {
            return Ok(());
        }
        self.collection(collection)
            .insert_many(documents)
            .await
            .map_err(|e| classify(collection, e))?;
        Ok(())
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self
            .collection(collection)
            .find_one(filter.to_document())
            .await?)
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        let coll = self.collection(collection);
        let mut find = coll.find(filter.to_document()).skip(options.skip);
        if let Some(sort) = options.sort_document() {
            find = find.sort(sort);
        }
        if let Some(limit) = options.limit {
            find = find.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        let cursor = find.await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        Ok(self
            .collection(collection)
            .count_documents(filter.to_document())
            .await?)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        set: Document,
    ) -> Result<Option<Document>, StoreError> {
        self.collection(collection)
            .find_one_and_update(filter.to_document(), doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| classify(collection, e))
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        set: Document,
    ) -> Result<u64, StoreError> {
        let result = self
            .collection(collection)
            .update_many(filter.to_document(), doc! { "$set": set })
            .await?;
        Ok(result.modified_count)
    }

    async fn upsert_one(
        &self,
        collection: &str,
        filter: &Filter,
        set: Document,
        set_on_insert: Document,
    ) -> Result<Document, StoreError> {
        let mut update = doc! {};
        if !set.is_empty() {
            update.insert("$set", set);
        }
        if !set_on_insert.is_empty() {
            update.insert("$setOnInsert", set_on_insert);
        }
        let upserted = self
            .collection(collection)
            .find_one_and_update(filter.to_document(), update)
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| classify(collection, e))?;
        // with upsert + After the server always hands back a document
        Ok(upserted.unwrap_or_else(|| filter.equalities()))
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self
            .collection(collection)
            .find_one_and_delete(filter.to_document())
            .await?)
    }

    async fn group(
        &self,
        collection: &str,
        filter: &Filter,
        accumulators: &[Accumulator],
    ) -> Result<Option<Document>, StoreError> {
        let pipeline = vec![
            doc! { "$match": filter.to_document() },
            doc! { "$group": group_stage(accumulators) },
            doc! { "$project": { "_id": 0 } },
        ];
        let mut cursor = self.collection(collection).aggregate(pipeline).await?;
        Ok(cursor.try_next().await?)
    }

    async fn create_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
    ) -> Result<(), StoreError> {
        let index = IndexModel::builder()
            .keys(doc! { field: 1 })
            .options(IndexOptions::builder().unique(unique).build())
            .build();
        self.collection(collection).create_index(index).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}

//! MongoDB Client Implementation
//!
//! CRUD adapter over the official mongodb driver. Writes are followed by a
//! read of the stored document by `_id`, so callers see exactly what the
//! server kept.

use super::{
    config::{MongoConfig, MongoConnectionOptions},
    convert::{bson_from_json, json_from_bson, set_operator},
    convert_mongodb_error, stored_prefix_for,
};
use crate::database::{
    client::DatabaseClient,
    types::{validate_timeout, BackendType, Document, Filter, UpdatePayload, ID_FIELD},
};
use crate::error::{BulkWriteError, DbError, Result};
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Bson, Document as BsonDocument},
    error::Error as MongoError,
    options::ClientOptions,
    Client, Collection, Database,
};
use std::collections::HashMap;
use std::future::IntoFuture;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Live session: the driver client and the selected database
struct MongoSession {
    client: Client,
    database: Database,
}

/// MongoDB Database Client
#[derive(Default)]
pub struct MongoClient {
    options: MongoConnectionOptions,
    session: Option<MongoSession>,
}

impl MongoClient {
    /// Create an unconnected client
    pub fn new(options: MongoConnectionOptions) -> Self {
        Self {
            options,
            session: None,
        }
    }

    /// Create a client and connect it using `config`
    pub async fn connect(config: &MongoConfig, timeout: i64) -> Result<Self> {
        config.validate()?;
        let mut client = Self::new(config.options.clone());
        client.connect_db(&config.uri, &config.database, timeout).await?;
        Ok(client)
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Ping the selected database
    pub async fn ping(&self, timeout: i64) -> Result<()> {
        let limit = validate_timeout(timeout)?;
        let session = self.session()?;
        ping_database(&session.database, limit).await
    }

    /// Install `session`, shutting down the one it replaces
    async fn replace_session(&mut self, session: MongoSession) {
        if let Some(MongoSession { client, database }) = self.session.replace(session) {
            debug!("Replacing existing MongoDB session");
            drop(database);
            client.shutdown().await;
        }
    }

    fn session(&self) -> Result<&MongoSession> {
        self.session.as_ref().ok_or_else(|| {
            warn!("MongoDB client is not connected");
            DbError::Connection {
                backend: BackendType::Mongo,
            }
        })
    }

    fn collection(&self, table: &str) -> Result<Collection<BsonDocument>> {
        Ok(self.session()?.database.collection::<BsonDocument>(table))
    }

    /// Fetch one native document, `NotExist` when nothing matches
    async fn find_native(
        collection: &Collection<BsonDocument>,
        limit: Duration,
        filter: BsonDocument,
    ) -> Result<BsonDocument> {
        with_deadline(limit, collection.find_one(filter))
            .await?
            .ok_or_else(DbError::not_found)
    }

    /// Re-read a stored document by identity in a fresh timeout window
    async fn refetch(
        collection: &Collection<BsonDocument>,
        limit: Duration,
        id: Bson,
    ) -> Result<Document> {
        let document = Self::find_native(collection, limit, doc! { "_id": id }).await?;
        json_from_bson(document)
    }

    /// Look up which of `ids` are stored, in a fresh timeout window.
    /// Hits come back in the order of `ids`.
    async fn find_stored(
        collection: &Collection<BsonDocument>,
        limit: Duration,
        ids: &[Bson],
    ) -> Result<Vec<Document>> {
        let filter = doc! { "_id": { "$in": ids.to_vec() } };
        let found = with_deadline(limit, collect_matches(collection, filter)).await?;
        in_id_order(ids, found)
    }
}

fn identity_of(document: &BsonDocument) -> Result<Bson> {
    document
        .get(ID_FIELD)
        .cloned()
        .ok_or_else(|| DbError::Conversion("Stored document has no _id".to_string()))
}

/// Arrange `found` in the order of `ids`, dropping ids that were not found
fn in_id_order(ids: &[Bson], found: Vec<BsonDocument>) -> Result<Vec<Document>> {
    let mut by_id: HashMap<String, BsonDocument> = HashMap::with_capacity(found.len());
    for document in found {
        by_id.insert(identity_of(&document)?.to_string(), document);
    }

    ids.iter()
        .filter_map(|id| by_id.remove(&id.to_string()))
        .map(json_from_bson)
        .collect()
}

/// Run a driver call under `limit`, classifying its failure
async fn with_deadline<T, F>(limit: Duration, call: F) -> Result<T>
where
    F: IntoFuture<Output = std::result::Result<T, MongoError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(convert_mongodb_error),
        Err(_) => Err(DbError::Timeout {
            seconds: limit.as_secs(),
        }),
    }
}

async fn ping_database(database: &Database, limit: Duration) -> Result<()> {
    match tokio::time::timeout(limit, database.run_command(doc! { "ping": 1 })).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => {
            warn!("MongoDB ping failed: {}", e);
            Err(DbError::Connection {
                backend: BackendType::Mongo,
            })
        }
        Err(_) => {
            warn!("MongoDB ping timed out after {:?}", limit);
            Err(DbError::Connection {
                backend: BackendType::Mongo,
            })
        }
    }
}

async fn collect_matches(
    collection: &Collection<BsonDocument>,
    filter: BsonDocument,
) -> std::result::Result<Vec<BsonDocument>, MongoError> {
    let cursor = collection.find(filter).await?;
    cursor.try_collect().await
}

#[async_trait]
impl DatabaseClient for MongoClient {
    fn backend(&self) -> BackendType {
        BackendType::Mongo
    }

    async fn connect_db(&mut self, uri: &str, db_name: &str, timeout: i64) -> Result<()> {
        let limit = validate_timeout(timeout)?;

        let mut client_options = with_deadline(limit, ClientOptions::parse(uri)).await?;
        self.options.apply(&mut client_options, limit);

        let client = Client::with_options(client_options).map_err(convert_mongodb_error)?;
        let database = client.database(db_name);
        ping_database(&database, limit).await?;

        info!("Connected to MongoDB database {}", db_name);
        self.replace_session(MongoSession { client, database }).await;
        Ok(())
    }

    async fn disconnect_db(&mut self) -> Result<()> {
        match self.session.take() {
            Some(MongoSession { client, database }) => {
                drop(database);
                client.shutdown().await;
                info!("Disconnected from MongoDB");
            }
            None => debug!("disconnect_db called on an unconnected MongoDB client"),
        }
        Ok(())
    }

    async fn insert_one(&self, table: &str, timeout: i64, document: Document) -> Result<Document> {
        let limit = validate_timeout(timeout)?;
        let collection = self.collection(table)?;
        let document = bson_from_json(document)?;

        debug!(collection = table, "insert_one");
        let inserted = with_deadline(limit, collection.insert_one(document)).await?;

        Self::refetch(&collection, limit, inserted.inserted_id).await
    }

    async fn insert_many(
        &self,
        table: &str,
        timeout: i64,
        documents: Vec<Document>,
    ) -> std::result::Result<Vec<Document>, BulkWriteError> {
        let limit = validate_timeout(timeout)?;
        let collection = self.collection(table)?;
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        // Identities are assigned here so the stored subset can be re-read
        // even when the driver reports a partial failure.
        let mut ids = Vec::with_capacity(documents.len());
        let mut native = Vec::with_capacity(documents.len());
        for document in documents {
            let mut document = bson_from_json(document)?;
            let id = match document.get(ID_FIELD) {
                Some(id) => id.clone(),
                None => {
                    let id = Bson::ObjectId(ObjectId::new());
                    document.insert(ID_FIELD, id.clone());
                    id
                }
            };
            ids.push(id);
            native.push(document);
        }

        debug!(collection = table, count = native.len(), "insert_many");
        let failure = match tokio::time::timeout(limit, collection.insert_many(native)).await {
            Ok(Ok(_)) => None,
            Ok(Err(e)) => {
                let stored = stored_prefix_for(&e, ids.len());
                Some((stored, convert_mongodb_error(e)))
            }
            Err(_) => Some((
                None,
                DbError::Timeout {
                    seconds: limit.as_secs(),
                },
            )),
        };

        let (stored, error) = match failure {
            None => (ids.len(), None),
            Some((Some(stored), error)) => (stored, Some(error)),
            Some((None, error)) => {
                // No per-document outcome: earlier batches may have landed.
                let found = Self::find_stored(&collection, limit, &ids).await;
                return Err(match found {
                    Ok(completed) => {
                        warn!("insert_many stored {} of {}: {}", completed.len(), ids.len(), error);
                        BulkWriteError::new(completed, error)
                    }
                    Err(lookup) => {
                        warn!("insert_many failed ({}); stored subset unknown: {}", error, lookup);
                        BulkWriteError::new(Vec::new(), error)
                    }
                });
            }
        };
        if let Some(ref error) = error {
            warn!("insert_many stored {} of {}: {}", stored, ids.len(), error);
        }

        let mut inserted = Vec::with_capacity(stored);
        for id in ids.into_iter().take(stored) {
            match Self::refetch(&collection, limit, id).await {
                Ok(document) => inserted.push(document),
                Err(e) => return Err(BulkWriteError::new(inserted, e)),
            }
        }

        match error {
            Some(error) => Err(BulkWriteError::new(inserted, error)),
            None => Ok(inserted),
        }
    }

    async fn find_one(&self, table: &str, timeout: i64, filter: Filter) -> Result<Document> {
        let limit = validate_timeout(timeout)?;
        let collection = self.collection(table)?;
        let filter = bson_from_json(filter)?;

        let document = Self::find_native(&collection, limit, filter).await?;
        json_from_bson(document)
    }

    async fn find_many(&self, table: &str, timeout: i64, filter: Filter) -> Result<Vec<Document>> {
        let limit = validate_timeout(timeout)?;
        let collection = self.collection(table)?;
        let filter = bson_from_json(filter)?;

        let documents = with_deadline(limit, collect_matches(&collection, filter)).await?;
        documents.into_iter().map(json_from_bson).collect()
    }

    async fn update_one(
        &self,
        table: &str,
        timeout: i64,
        filter: Filter,
        new_data: UpdatePayload,
    ) -> Result<Document> {
        let limit = validate_timeout(timeout)?;
        let collection = self.collection(table)?;
        let filter = bson_from_json(filter)?;
        let update = set_operator(bson_from_json(new_data)?);

        debug!(collection = table, "update_one");
        let previous = with_deadline(limit, collection.find_one_and_update(filter, update))
            .await?
            .ok_or_else(DbError::not_found)?;

        Self::refetch(&collection, limit, identity_of(&previous)?).await
    }

    async fn update_many(
        &self,
        table: &str,
        timeout: i64,
        filter: Filter,
        new_data: UpdatePayload,
    ) -> std::result::Result<Vec<Document>, BulkWriteError> {
        let limit = validate_timeout(timeout)?;
        let collection = self.collection(table)?;
        let filter = bson_from_json(filter)?;
        let update = set_operator(bson_from_json(new_data)?);

        // Not atomic: documents that start or stop matching between this read
        // and the update below are not reflected in the result.
        let matched = with_deadline(limit, collect_matches(&collection, filter.clone())).await?;
        if matched.is_empty() {
            return Err(DbError::not_found().into());
        }

        debug!(collection = table, matched = matched.len(), "update_many");
        let result = with_deadline(limit, collection.update_many(filter, update).upsert(false)).await?;
        if result.matched_count == 0 {
            return Err(DbError::not_found().into());
        }

        let mut updated = Vec::with_capacity(matched.len());
        for document in &matched {
            let refetched = match identity_of(document) {
                Ok(id) => Self::refetch(&collection, limit, id).await,
                Err(e) => Err(e),
            };
            match refetched {
                Ok(document) => updated.push(document),
                Err(e) => return Err(BulkWriteError::new(updated, e)),
            }
        }

        Ok(updated)
    }

    async fn delete_one(&self, table: &str, timeout: i64, filter: Filter) -> Result<()> {
        let limit = validate_timeout(timeout)?;
        let collection = self.collection(table)?;
        let filter = bson_from_json(filter)?;

        let result = with_deadline(limit, collection.delete_one(filter)).await?;
        if result.deleted_count == 0 {
            return Err(DbError::not_found());
        }
        Ok(())
    }

    async fn delete_many(&self, table: &str, timeout: i64, filter: Filter) -> Result<u64> {
        let limit = validate_timeout(timeout)?;
        let collection = self.collection(table)?;
        let filter = bson_from_json(filter)?;

        let result = with_deadline(limit, collection.delete_many(filter)).await?;
        debug!(collection = table, deleted = result.deleted_count, "delete_many");
        Ok(result.deleted_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn object(value: serde_json::Value) -> Document {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[tokio::test]
    async fn test_invalid_timeout_rejected_before_io() {
        let mut client = MongoClient::default();
        let doc = object(json!({ "test": "test" }));

        for timeout in [0, -5] {
            let err = client
                .connect_db("mongodb://localhost:27017", "test", timeout)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Input);

            let err = client.insert_one("c", timeout, doc.clone()).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Input);
            let err = client
                .insert_many("c", timeout, vec![doc.clone()])
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Input);
            assert!(err.completed.is_empty());
            let err = client.find_one("c", timeout, Filter::new()).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Input);
            let err = client.find_many("c", timeout, Filter::new()).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Input);
            let err = client
                .update_one("c", timeout, Filter::new(), doc.clone())
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Input);
            let err = client
                .update_many("c", timeout, Filter::new(), doc.clone())
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Input);
            let err = client.delete_one("c", timeout, Filter::new()).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Input);
            let err = client.delete_many("c", timeout, Filter::new()).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Input);
            let err = client.ping(timeout).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Input);
        }

        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_unconnected_client_reports_connection_error() {
        let client = MongoClient::default();

        let err = client
            .find_one("c", 5, object(json!({ "a": 1 })))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert_eq!(err.to_string(), "Connection refused from MongoDB");

        let err = client.insert_many("c", 5, vec![]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[tokio::test]
    async fn test_disconnect_without_connection_is_noop() {
        let mut client = MongoClient::default();
        assert!(client.disconnect_db().await.is_ok());
        assert_eq!(client.backend(), BackendType::Mongo);
    }

    async fn idle_session(database: &str) -> MongoSession {
        // Nothing is contacted until an operation runs.
        let options = ClientOptions::parse("mongodb://127.0.0.1:1").await.unwrap();
        let client = Client::with_options(options).unwrap();
        let database = client.database(database);
        MongoSession { client, database }
    }

    #[tokio::test]
    async fn test_replacing_session_shuts_down_previous_client() {
        let first = idle_session("first").await;
        let previous = first.client.clone();
        let mut client = MongoClient {
            session: Some(first),
            ..MongoClient::default()
        };

        let second = idle_session("second").await;
        tokio::time::timeout(Duration::from_secs(5), client.replace_session(second))
            .await
            .unwrap();

        assert!(client.is_connected());
        assert_eq!(client.session().unwrap().database.name(), "second");

        let err = previous
            .database("first")
            .run_command(doc! { "ping": 1 })
            .await
            .unwrap_err();
        assert!(matches!(*err.kind, mongodb::error::ErrorKind::Shutdown));
    }

    #[test]
    fn test_in_id_order_follows_input_order() {
        let ids: Vec<Bson> = (0..3).map(|_| Bson::ObjectId(ObjectId::new())).collect();
        let found = vec![
            doc! { "_id": ids[2].clone(), "n": 2 },
            doc! { "_id": ids[0].clone(), "n": 0 },
        ];

        let ordered = in_id_order(&ids, found).unwrap();
        assert_eq!(ordered.len(), 2);
        assert_eq!(ordered[0]["n"], json!(0));
        assert_eq!(ordered[1]["n"], json!(2));
        assert_eq!(ordered[0]["_id"], json!({ "$oid": ids[0].as_object_id().unwrap().to_hex() }));
    }

    #[test]
    fn test_in_id_order_rejects_document_without_identity() {
        let ids = vec![Bson::Int32(1)];
        let err = in_id_order(&ids, vec![doc! { "n": 1 }]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conversion);
    }

    #[tokio::test]
    async fn test_connect_rejects_empty_config() {
        let err = MongoClient::connect(&MongoConfig::new("", "test"), 5)
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Input);
    }
}

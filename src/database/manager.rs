//! Database Manager
//!
//! Selects a backend client by discriminator and exposes the same CRUD
//! contract, optionally bound to a default collection and timeout.

use super::client::DatabaseClient;
use super::types::{BackendType, Document, Filter, ManagerOptions, UpdatePayload};
use crate::config::DbClientConfig;
use crate::error::{BulkWriteError, DbError, Result};
use async_trait::async_trait;
use tracing::info;

/// Façade delegating every operation to one backend client
pub struct DatabaseManager {
    client: Box<dyn DatabaseClient>,
    options: ManagerOptions,
}

impl DatabaseManager {
    /// Build the client named by `backend` and connect it.
    ///
    /// An unknown discriminator fails with [`DbError::Input`] before any I/O.
    pub async fn create(
        uri: &str,
        db_name: &str,
        backend: &str,
        options: ManagerOptions,
    ) -> Result<Self> {
        let backend: BackendType = backend.parse()?;
        let mut client = Self::build_client(backend)?;
        client.connect_db(uri, db_name, options.timeout).await?;

        info!("Database manager ready for {} ({})", backend, db_name);
        Ok(Self { client, options })
    }

    /// Create a manager from loaded configuration
    pub async fn from_config(config: &DbClientConfig) -> Result<Self> {
        config.validate()?;
        Self::create(
            &config.uri,
            &config.database,
            config.backend.as_str(),
            config.manager_options(),
        )
        .await
    }

    /// Wrap an already constructed client
    pub fn with_client(client: Box<dyn DatabaseClient>, options: ManagerOptions) -> Self {
        Self { client, options }
    }

    fn build_client(backend: BackendType) -> Result<Box<dyn DatabaseClient>> {
        match backend {
            #[cfg(feature = "mongodb-backend")]
            BackendType::Mongo => Ok(Box::new(super::engines::mongodb::MongoClient::default())),
            #[cfg(not(feature = "mongodb-backend"))]
            BackendType::Mongo => Err(DbError::input(
                "MongoDB support not compiled. Enable mongodb-backend feature.",
            )),
        }
    }

    pub fn options(&self) -> &ManagerOptions {
        &self.options
    }

    /// Operations on `collection` using the configured default timeout
    pub fn scope<'a>(&'a self, collection: &'a str) -> CollectionScope<'a> {
        CollectionScope {
            client: self.client.as_ref(),
            collection,
            timeout: self.options.timeout,
        }
    }

    /// Operations on the configured default collection
    pub fn default_scope(&self) -> Result<CollectionScope<'_>> {
        let collection = self
            .options
            .collection
            .as_deref()
            .ok_or_else(|| DbError::input("No default collection configured"))?;
        Ok(self.scope(collection))
    }
}

#[async_trait]
impl DatabaseClient for DatabaseManager {
    fn backend(&self) -> BackendType {
        self.client.backend()
    }

    async fn connect_db(&mut self, uri: &str, db_name: &str, timeout: i64) -> Result<()> {
        self.client.connect_db(uri, db_name, timeout).await
    }

    async fn disconnect_db(&mut self) -> Result<()> {
        self.client.disconnect_db().await
    }

    async fn insert_one(&self, table: &str, timeout: i64, document: Document) -> Result<Document> {
        self.client.insert_one(table, timeout, document).await
    }

    async fn insert_many(
        &self,
        table: &str,
        timeout: i64,
        documents: Vec<Document>,
    ) -> std::result::Result<Vec<Document>, BulkWriteError> {
        self.client.insert_many(table, timeout, documents).await
    }

    async fn find_one(&self, table: &str, timeout: i64, filter: Filter) -> Result<Document> {
        self.client.find_one(table, timeout, filter).await
    }

    async fn find_many(&self, table: &str, timeout: i64, filter: Filter) -> Result<Vec<Document>> {
        self.client.find_many(table, timeout, filter).await
    }

    async fn update_one(
        &self,
        table: &str,
        timeout: i64,
        filter: Filter,
        new_data: UpdatePayload,
    ) -> Result<Document> {
        self.client.update_one(table, timeout, filter, new_data).await
    }

    async fn update_many(
        &self,
        table: &str,
        timeout: i64,
        filter: Filter,
        new_data: UpdatePayload,
    ) -> std::result::Result<Vec<Document>, BulkWriteError> {
        self.client.update_many(table, timeout, filter, new_data).await
    }

    async fn delete_one(&self, table: &str, timeout: i64, filter: Filter) -> Result<()> {
        self.client.delete_one(table, timeout, filter).await
    }

    async fn delete_many(&self, table: &str, timeout: i64, filter: Filter) -> Result<u64> {
        self.client.delete_many(table, timeout, filter).await
    }
}

/// CRUD calls bound to one collection and timeout
#[derive(Clone, Copy)]
pub struct CollectionScope<'a> {
    client: &'a dyn DatabaseClient,
    collection: &'a str,
    timeout: i64,
}

impl<'a> CollectionScope<'a> {
    pub fn collection(&self) -> &str {
        self.collection
    }

    /// Override the timeout for calls made through this scope
    pub fn with_timeout(mut self, timeout: i64) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn insert_one(&self, document: Document) -> Result<Document> {
        self.client
            .insert_one(self.collection, self.timeout, document)
            .await
    }

    pub async fn insert_many(
        &self,
        documents: Vec<Document>,
    ) -> std::result::Result<Vec<Document>, BulkWriteError> {
        self.client
            .insert_many(self.collection, self.timeout, documents)
            .await
    }

    pub async fn find_one(&self, filter: Filter) -> Result<Document> {
        self.client
            .find_one(self.collection, self.timeout, filter)
            .await
    }

    pub async fn find_many(&self, filter: Filter) -> Result<Vec<Document>> {
        self.client
            .find_many(self.collection, self.timeout, filter)
            .await
    }

    pub async fn update_one(&self, filter: Filter, new_data: UpdatePayload) -> Result<Document> {
        self.client
            .update_one(self.collection, self.timeout, filter, new_data)
            .await
    }

    pub async fn update_many(
        &self,
        filter: Filter,
        new_data: UpdatePayload,
    ) -> std::result::Result<Vec<Document>, BulkWriteError> {
        self.client
            .update_many(self.collection, self.timeout, filter, new_data)
            .await
    }

    pub async fn delete_one(&self, filter: Filter) -> Result<()> {
        self.client
            .delete_one(self.collection, self.timeout, filter)
            .await
    }

    pub async fn delete_many(&self, filter: Filter) -> Result<u64> {
        self.client
            .delete_many(self.collection, self.timeout, filter)
            .await
    }
}

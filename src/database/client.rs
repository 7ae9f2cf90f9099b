//! Database Client Abstraction Layer
//!
//! The single CRUD contract implemented by every backend adapter and by
//! [`DatabaseManager`](super::DatabaseManager).

use super::types::{BackendType, Document, Filter, UpdatePayload};
use crate::error::{BulkWriteError, Result};
use async_trait::async_trait;

/// Uniform CRUD interface over a document database.
///
/// Every operation takes a timeout in seconds; a value below 1 fails with
/// [`DbError::Input`](crate::DbError::Input) before any I/O. CRUD calls take
/// `&self` so one connected client can serve concurrent callers, while
/// connect/disconnect take `&mut self` and must not overlap in-flight calls.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Backend implemented by this client
    fn backend(&self) -> BackendType;

    /// Open a session and verify it with a ping
    async fn connect_db(&mut self, uri: &str, db_name: &str, timeout: i64) -> Result<()>;

    /// Release the session
    async fn disconnect_db(&mut self) -> Result<()>;

    /// Insert one document and return it as stored, identity included
    async fn insert_one(&self, table: &str, timeout: i64, document: Document) -> Result<Document>;

    /// Insert several documents.
    ///
    /// On failure the documents that were stored before the fault are carried
    /// in [`BulkWriteError::completed`].
    async fn insert_many(
        &self,
        table: &str,
        timeout: i64,
        documents: Vec<Document>,
    ) -> std::result::Result<Vec<Document>, BulkWriteError>;

    /// First document matching `filter`
    async fn find_one(&self, table: &str, timeout: i64, filter: Filter) -> Result<Document>;

    /// Every document matching `filter`, possibly none
    async fn find_many(&self, table: &str, timeout: i64, filter: Filter) -> Result<Vec<Document>>;

    /// Merge-set `new_data` into the first match and return the full document
    async fn update_one(
        &self,
        table: &str,
        timeout: i64,
        filter: Filter,
        new_data: UpdatePayload,
    ) -> Result<Document>;

    /// Merge-set `new_data` into every match and return the updated documents
    async fn update_many(
        &self,
        table: &str,
        timeout: i64,
        filter: Filter,
        new_data: UpdatePayload,
    ) -> std::result::Result<Vec<Document>, BulkWriteError>;

    /// Delete the first match
    async fn delete_one(&self, table: &str, timeout: i64, filter: Filter) -> Result<()>;

    /// Delete every match and return how many were removed
    async fn delete_many(&self, table: &str, timeout: i64, filter: Filter) -> Result<u64>;
}

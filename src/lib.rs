//! # dbclient-rs
//!
//! One CRUD contract (`connect_db`, `insert_one/many`, `find_one/many`,
//! `update_one/many`, `delete_one/many`) over document database drivers.
//! MongoDB is the only backend today.
//!
//! Every insert and update returns the document as the backend stored it,
//! re-read by `_id`. Failures are classified into a small set of
//! [`ErrorKind`]s; anything else is passed through as [`DbError::Backend`].

pub mod config;
pub mod database;
pub mod error;
pub mod logging;

pub use config::DbClientConfig;
pub use database::{
    BackendType, CollectionScope, DatabaseClient, DatabaseManager, Document, Filter,
    ManagerOptions, UpdatePayload,
};
pub use error::{BulkWriteError, DbError, ErrorKind, Result};

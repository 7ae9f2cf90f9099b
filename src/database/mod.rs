//! Database Module
//!
//! Uniform CRUD interface over document database backends

pub mod client;
pub mod engines;
pub mod manager;
pub mod types;

// 公開API
pub use client::DatabaseClient;
#[cfg(any(test, feature = "testing"))]
pub use client::MockDatabaseClient;
pub use manager::{CollectionScope, DatabaseManager};
pub use types::{BackendType, Document, Filter, ManagerOptions, UpdatePayload};

//! Database Types and Common Structures
//!
//! Types shared by the manager and every backend adapter

use crate::error::{DbError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Persisted record: field name to dynamically typed value.
///
/// Identity values (`_id`) use relaxed Extended JSON, e.g. `{"$oid": "..."}`,
/// so a returned identity can be placed in a [`Filter`] unchanged.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Field to expected value (or backend matcher) selecting documents
pub type Filter = serde_json::Map<String, serde_json::Value>;

/// Fields to overwrite or add; every other field is left untouched
pub type UpdatePayload = serde_json::Map<String, serde_json::Value>;

/// Identity field assigned by the backend on insert
pub const ID_FIELD: &str = "_id";

/// Supported backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendType {
    #[serde(rename = "MONGO", alias = "mongo", alias = "mongodb")]
    Mongo,
}

impl BackendType {
    /// Discriminator accepted by [`FromStr`]
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendType::Mongo => "MONGO",
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::Mongo => write!(f, "MongoDB"),
        }
    }
}

impl FromStr for BackendType {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("MONGO") {
            Ok(BackendType::Mongo)
        } else {
            Err(DbError::input(format!("DB of type {} does not exist", s)))
        }
    }
}

/// Manager-level defaults threaded into delegated calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerOptions {
    /// Collection (or table) used by [`default_scope`](crate::database::DatabaseManager::default_scope)
    pub collection: Option<String>,
    /// Per-call timeout in seconds
    pub timeout: i64,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            collection: None,
            timeout: 10,
        }
    }
}

impl ManagerOptions {
    pub fn new(collection: impl Into<String>, timeout: i64) -> Self {
        Self {
            collection: Some(collection.into()),
            timeout,
        }
    }
}

/// Turn a caller-supplied timeout into a deadline, rejecting non-positive values
pub fn validate_timeout(seconds: i64) -> Result<Duration> {
    if seconds < 1 {
        return Err(DbError::input(format!(
            "Invalid timeout: {}. It must be higher than 0",
            seconds
        )));
    }
    Ok(Duration::from_secs(seconds as u64))
}

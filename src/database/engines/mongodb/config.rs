//! MongoDB Configuration
//!
//! MongoDB connection and pool configuration

use crate::error::{DbError, Result};
use mongodb::options::{ClientOptions, ServerApi, ServerApiVersion};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// MongoDB Connection Configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MongoConfig {
    /// Connection URI
    pub uri: String,
    /// Database name
    pub database: String,
    /// Client options
    #[serde(default)]
    pub options: MongoConnectionOptions,
}

impl MongoConfig {
    /// Create new MongoDB configuration
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            options: MongoConnectionOptions::default(),
        }
    }

    /// Validate MongoDB configuration
    pub fn validate(&self) -> Result<()> {
        if self.uri.is_empty() {
            return Err(DbError::input("MongoDB URI cannot be empty"));
        }
        if self.database.is_empty() {
            return Err(DbError::input("Database name cannot be empty"));
        }
        Ok(())
    }
}

/// MongoDB Client Options
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MongoConnectionOptions {
    /// Maximum number of connections in the driver's pool
    pub max_pool_size: u32,
    /// Minimum number of connections in the driver's pool
    pub min_pool_size: u32,
    /// Application name reported to the server
    pub app_name: Option<String>,
    /// Request Stable API version 1
    pub server_api_v1: bool,
}

impl Default for MongoConnectionOptions {
    fn default() -> Self {
        Self {
            max_pool_size: 100,
            min_pool_size: 0,
            app_name: Some("dbclient-rs".to_string()),
            server_api_v1: true,
        }
    }
}

impl MongoConnectionOptions {
    /// Apply these options to parsed driver options.
    ///
    /// `limit` bounds both connection establishment and server selection.
    pub(crate) fn apply(&self, client_options: &mut ClientOptions, limit: Duration) {
        client_options.max_pool_size = Some(self.max_pool_size);
        client_options.min_pool_size = Some(self.min_pool_size);
        client_options.connect_timeout = Some(limit);
        client_options.server_selection_timeout = Some(limit);

        if let Some(ref app_name) = self.app_name {
            client_options.app_name = Some(app_name.clone());
        }

        if self.server_api_v1 {
            client_options.server_api = Some(ServerApi::builder().version(ServerApiVersion::V1).build());
        }
    }
}

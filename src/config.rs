//! Configuration loading
//!
//! Defaults, then an optional TOML file, then `DBCLIENT_*` environment
//! variables (nested keys use `__`, e.g. `DBCLIENT_LOG__LEVEL`).

use crate::database::types::{validate_timeout, BackendType, ManagerOptions};
use crate::error::{DbError, Result};
use crate::logging::LogSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;

const CONFIG_PATHS: [&str; 2] = ["dbclient.toml", "config/dbclient.toml"];

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DbClientConfig {
    pub uri: String,
    pub database: String,
    pub backend: BackendType,
    /// Default collection for [`DatabaseManager::default_scope`](crate::database::DatabaseManager::default_scope)
    pub collection: Option<String>,
    pub timeout_seconds: i64,
    #[serde(default)]
    pub log: LogSettings,
}

impl Default for DbClientConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "test".to_string(),
            backend: BackendType::Mongo,
            collection: None,
            timeout_seconds: ManagerOptions::default().timeout,
            log: LogSettings::default(),
        }
    }
}

impl DbClientConfig {
    /// 設定ファイルから読み込み、環境変数で上書き
    pub fn load() -> anyhow::Result<Self> {
        let file = CONFIG_PATHS
            .iter()
            .map(Path::new)
            .find(|path| path.exists());
        Self::build(file)
    }

    /// Load from an explicit file, still honouring environment overrides
    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Self::build(Some(path.as_ref()))
    }

    fn build(file: Option<&Path>) -> anyhow::Result<Self> {
        let mut settings =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = file {
            tracing::debug!("Loading configuration from {}", path.display());
            settings = settings.add_source(config::File::from(path));
        }

        settings = settings.add_source(
            config::Environment::with_prefix("DBCLIENT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let loaded: Self = settings.build()?.try_deserialize()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<()> {
        if self.uri.is_empty() {
            return Err(DbError::input("Database URI cannot be empty"));
        }
        if self.database.is_empty() {
            return Err(DbError::input("Database name cannot be empty"));
        }
        validate_timeout(self.timeout_seconds)?;
        Ok(())
    }

    pub fn manager_options(&self) -> ManagerOptions {
        ManagerOptions {
            collection: self.collection.clone(),
            timeout: self.timeout_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
uri = "mongodb://db.internal:27017"
database = "inventory"
backend = "MONGO"
collection = "items"
timeout_seconds = 3

[log]
level = "debug"
"#
        )
        .unwrap();

        let config = DbClientConfig::load_from(file.path()).unwrap();
        assert_eq!(config.uri, "mongodb://db.internal:27017");
        assert_eq!(config.database, "inventory");
        assert_eq!(config.backend, BackendType::Mongo);
        assert_eq!(config.log.level, "debug");
        assert!(config.log.console);

        let options = config.manager_options();
        assert_eq!(options.collection.as_deref(), Some("items"));
        assert_eq!(options.timeout, 3);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "database = \"other\"").unwrap();

        let config = DbClientConfig::load_from(file.path()).unwrap();
        assert_eq!(config.database, "other");
        assert_eq!(config.uri, DbClientConfig::default().uri);
        assert_eq!(config.timeout_seconds, 10);
        assert!(config.collection.is_none());
    }

    #[test]
    fn test_validate() {
        assert!(DbClientConfig::default().validate().is_ok());

        let config = DbClientConfig {
            timeout_seconds: 0,
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::Input);

        let config = DbClientConfig {
            uri: String::new(),
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::Input);
    }
}

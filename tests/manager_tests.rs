//! Manager and configuration tests that need no running server

use dbclient_rs::{DatabaseManager, DbClientConfig, ErrorKind, ManagerOptions};
use std::io::Write;

#[tokio::test]
async fn test_create_unknown_backend_is_input_error() {
    let err = DatabaseManager::create(
        "mongodb://localhost:27017",
        "test",
        "CASSANDRA",
        ManagerOptions::default(),
    )
    .await
    .err()
    .unwrap();

    assert_eq!(err.kind(), ErrorKind::Input);
    assert_eq!(err.to_string(), "DB of type CASSANDRA does not exist");
}

#[cfg(feature = "mongodb-backend")]
#[tokio::test]
async fn test_create_rejects_timeout_before_connecting() {
    // Nothing listens on port 1; the timeout check must fire first.
    let err = DatabaseManager::create(
        "mongodb://127.0.0.1:1",
        "test",
        "mongo",
        ManagerOptions::new("items", 0),
    )
    .await
    .err()
    .unwrap();

    assert_eq!(err.kind(), ErrorKind::Input);
    assert!(err.to_string().contains("Invalid timeout: 0"));
}

#[tokio::test]
async fn test_from_config_validates_first() {
    let config = DbClientConfig {
        uri: String::new(),
        ..DbClientConfig::default()
    };

    let err = DatabaseManager::from_config(&config).await.err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Input);
}

#[test]
fn test_config_file_feeds_manager_options() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
uri = "mongodb://db.internal:27017"
database = "inventory"
backend = "MONGO"
collection = "items"
timeout_seconds = 3
"#
    )
    .unwrap();

    let config = DbClientConfig::load_from(file.path()).unwrap();
    config.validate().unwrap();

    let options = config.manager_options();
    assert_eq!(options.collection.as_deref(), Some("items"));
    assert_eq!(options.timeout, 3);
}

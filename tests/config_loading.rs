//! Configuration Loading Tests
//!
//! Tests for opening a store from files on disk:
//! - Schema and config files load and validate
//! - Config limits are enforced by queries
//! - Invalid files fail before a store is opened

use std::fs;

use aerostore::observability::Severity;
use aerostore::{
    BatchAtomicity, FindManyArgs, RecordData, Schema, Store, StoreConfig, StoreErrorCode,
};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const SCHEMA: &str = r#"{
    "tables": [
        {"name": "Person", "id_type": "string", "columns": [
            {"name": "age", "type": "int"},
            {"name": "role", "type": "enum", "values": ["admin", "user"], "nullable": true}
        ]},
        {"name": "Dog", "id_type": "bigint", "columns": [
            {"name": "owner", "type": "string", "references": "Person.id"}
        ]}
    ]
}"#;

const CONFIG: &str = r#"{
    "default_limit": 2,
    "max_limit": 3,
    "update_many_atomicity": "all_or_nothing",
    "log_level": "warn"
}"#;

fn write_files(dir: &TempDir) -> (Schema, StoreConfig) {
    let schema_path = dir.path().join("schema.json");
    let config_path = dir.path().join("config.json");
    fs::write(&schema_path, SCHEMA).unwrap();
    fs::write(&config_path, CONFIG).unwrap();
    (
        Schema::load(&schema_path).unwrap(),
        StoreConfig::load(&config_path).unwrap(),
    )
}

// =============================================================================
// Loading Tests
// =============================================================================

#[test]
fn test_config_file_values() {
    let dir = TempDir::new().unwrap();
    let (schema, config) = write_files(&dir);

    assert_eq!(schema.tables.len(), 2);
    assert_eq!(config.default_limit, 2);
    assert_eq!(config.max_limit, 3);
    assert_eq!(config.update_many_atomicity, BatchAtomicity::AllOrNothing);
    assert_eq!(config.operation_timeout(), None);
    assert_eq!(config.log_level, Severity::Warn);
}

#[tokio::test]
async fn test_loaded_limits_apply() {
    let dir = TempDir::new().unwrap();
    let (schema, config) = write_files(&dir);
    let store = Store::in_memory_with_config(schema, config).unwrap();
    let people = store.table("Person").unwrap();

    people
        .create_many(["a", "b", "c", "d"].map(|id| (id, RecordData::new().set("age", 1))))
        .await
        .unwrap();

    let page = people.find_many(FindManyArgs::new()).await.unwrap();
    assert_eq!(page.ids(), vec!["a", "b"]);
    assert!(page.page_info.has_next_page);

    let err = people
        .find_many(FindManyArgs::new().limit(4))
        .await
        .unwrap_err();
    assert_eq!(err.code(), StoreErrorCode::ValidationFailed);
}

#[tokio::test]
async fn test_bigint_ids_from_loaded_schema() {
    let dir = TempDir::new().unwrap();
    let (schema, config) = write_files(&dir);
    let store = Store::in_memory_with_config(schema, config).unwrap();

    store
        .table("Person")
        .unwrap()
        .create("Jim", RecordData::new().set("age", 34))
        .await
        .unwrap();
    let dogs = store.table("Dog").unwrap();
    dogs.create(
        "98765432109876543210",
        RecordData::new().set("owner", "Jim"),
    )
    .await
    .unwrap();

    let dog = dogs.find_unique("98765432109876543210").await.unwrap();
    assert!(dog.is_some());
}

// =============================================================================
// Rejection Tests
// =============================================================================

#[test]
fn test_invalid_config_file_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");

    fs::write(&path, r#"{"default_limit": 10, "max_limit": 5}"#).unwrap();
    assert!(StoreConfig::load(&path).is_err());

    fs::write(&path, r#"{"update_many_atomicity": "sometimes"}"#).unwrap();
    assert!(StoreConfig::load(&path).is_err());

    assert!(StoreConfig::load(&dir.path().join("missing.json")).is_err());
}

#[test]
fn test_invalid_schema_file_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("schema.json");
    fs::write(
        &path,
        r#"{"tables": [{"name": "Dog", "id_type": "int", "columns": [
            {"name": "owner", "type": "string", "references": "Person.id"}
        ]}]}"#,
    )
    .unwrap();

    let err = Schema::load(&path).unwrap_err();
    assert_eq!(err.code(), StoreErrorCode::ValidationFailed);
}

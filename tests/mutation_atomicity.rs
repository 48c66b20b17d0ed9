//! Mutation Atomicity Tests
//!
//! Tests for writes through the public async API:
//! - Created records round-trip unchanged
//! - Update functions read and write in one transaction
//! - Batches are atomic per their configured guarantee
//! - References are checked at write time
//! - Storage failures and timeouts leave no partial batch

use std::sync::Arc;
use std::time::Duration;

use aerostore::{
    field, BatchAtomicity, ColumnDef, ColumnType, IdType, MemoryStorage, Record, RecordData,
    Schema, Store, StoreConfig, StoreError, StoreErrorCode, TableSchema, UpdateInput, Value,
    WhereInput,
};
use num_bigint::BigInt;

// =============================================================================
// Helper Functions
// =============================================================================

fn schema() -> Schema {
    Schema::new()
        .table(
            TableSchema::new("Person", IdType::String)
                .column(ColumnDef::int("age"))
                .column(ColumnDef::bigint("balance").nullable())
                .column(ColumnDef::hex("key").nullable())
                .column(ColumnDef::enumeration("role", &["admin", "user"]).nullable())
                .column(ColumnDef::list("scores", ColumnType::Float).nullable())
                .column(ColumnDef::json("meta").nullable()),
        )
        .table(
            TableSchema::new("Counter", IdType::Int).column(ColumnDef::int("count")),
        )
        .table(
            TableSchema::new("Dog", IdType::Int)
                .column(ColumnDef::string("owner").references("Person.id")),
        )
}

fn increment() -> UpdateInput {
    UpdateInput::with(|current: &Record| {
        let count = current.get("count").and_then(Value::as_i64).unwrap_or(0);
        Ok(RecordData::new().set("count", count + 1))
    })
}

// =============================================================================
// Single Record Tests
// =============================================================================

#[tokio::test]
async fn test_create_round_trips() {
    let store = Store::in_memory(schema()).unwrap();
    let people = store.table("Person").unwrap();

    let data = RecordData::from_json(&serde_json::json!({
        "age": 34,
        "balance": "123456789012345678901234567890",
        "key": "0xABCD",
        "role": "admin",
        "scores": [1, 2.5],
        "meta": {"nested": [1, {"a": null}]}
    }))
    .unwrap();
    let created = people.create("Jim", data).await.unwrap();

    let found = people.find_unique("Jim").await.unwrap().unwrap();
    assert_eq!(found, created);
    assert_eq!(
        found.get("balance"),
        Some(&Value::BigInt(
            "123456789012345678901234567890".parse::<BigInt>().unwrap()
        ))
    );
    assert_eq!(found.get("key").unwrap().to_string(), "0xabcd");
}

#[tokio::test]
async fn test_create_rejects_bad_data() {
    let store = Store::in_memory(schema()).unwrap();
    let people = store.table("Person").unwrap();

    let cases = [
        RecordData::new(),
        RecordData::new().set("age", "old"),
        RecordData::new().set("age", 1).set("height", 180),
        RecordData::new().set("age", 1).set("role", "owner"),
        RecordData::new().set("age", 1).set("id", "James"),
    ];
    for data in cases {
        let err = people.create("Jim", data.clone()).await.unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::ValidationFailed, "{:?}", data);
    }
    assert_eq!(people.count(WhereInput::all()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_delete_twice() {
    let store = Store::in_memory(schema()).unwrap();
    let people = store.table("Person").unwrap();
    people
        .create("Jim", RecordData::new().set("age", 34))
        .await
        .unwrap();

    assert!(people.delete("Jim").await.unwrap());
    assert!(!people.delete("Jim").await.unwrap());
    assert!(people.find_unique("Jim").await.unwrap().is_none());
}

#[tokio::test]
async fn test_upsert_twice() {
    let store = Store::in_memory(schema()).unwrap();
    let counters = store.table("Counter").unwrap();

    for _ in 0..2 {
        counters
            .upsert(1, RecordData::new().set("count", 0), increment())
            .await
            .unwrap();
    }

    let counter = counters.find_unique(1).await.unwrap().unwrap();
    assert_eq!(counter.get("count"), Some(&Value::Int(1)));
    assert_eq!(counters.count(WhereInput::all()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_update_missing_record() {
    let store = Store::in_memory(schema()).unwrap();
    let counters = store.table("Counter").unwrap();
    let err = counters.update(9, increment()).await.unwrap_err();
    assert_eq!(err.code(), StoreErrorCode::RecordNotFound);
}

#[tokio::test]
async fn test_update_function_error_aborts() {
    let store = Store::in_memory(schema()).unwrap();
    let counters = store.table("Counter").unwrap();
    counters
        .create(1, RecordData::new().set("count", 5))
        .await
        .unwrap();

    let refuse = UpdateInput::with(|_: &Record| Err(StoreError::validation("refused")));
    assert!(counters.update(1, refuse).await.is_err());

    let counter = counters.find_unique(1).await.unwrap().unwrap();
    assert_eq!(counter.get("count"), Some(&Value::Int(5)));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

/// Concurrent increments through update functions never lose an update.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_increments() {
    let store = Store::in_memory(schema()).unwrap();
    let counters = store.table("Counter").unwrap();
    counters
        .create(1, RecordData::new().set("count", 0))
        .await
        .unwrap();

    let tasks: Vec<_> = (0..2)
        .map(|_| {
            let counters = counters.clone();
            tokio::spawn(async move { counters.update(1, increment()).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let counter = counters.find_unique(1).await.unwrap().unwrap();
    assert_eq!(counter.get("count"), Some(&Value::Int(2)));

    let tasks: Vec<_> = (0..50)
        .map(|_| {
            let counters = counters.clone();
            tokio::spawn(async move { counters.update(1, increment()).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }
    let counter = counters.find_unique(1).await.unwrap().unwrap();
    assert_eq!(counter.get("count"), Some(&Value::Int(52)));
}

/// Concurrent creates of one id: exactly one wins.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_create_same_id() {
    let store = Store::in_memory(schema()).unwrap();
    let counters = store.table("Counter").unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let counters = counters.clone();
            tokio::spawn(async move {
                counters
                    .create(7, RecordData::new().set("count", i))
                    .await
            })
        })
        .collect();

    let mut created = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => created += 1,
            Err(e) => assert_eq!(e.code(), StoreErrorCode::UniqueConstraint),
        }
    }
    assert_eq!(created, 1);
}

/// Concurrent upserts of one id: one creates, the rest update what it wrote.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_upserts_same_id() {
    let store = Store::in_memory(schema()).unwrap();
    let counters = store.table("Counter").unwrap();

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let counters = counters.clone();
            tokio::spawn(async move {
                counters
                    .upsert(9, RecordData::new().set("count", 0), increment())
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let counter = counters.find_unique(9).await.unwrap().unwrap();
    assert_eq!(counter.get("count"), Some(&Value::Int(15)));
    assert_eq!(counters.count(WhereInput::all()).await.unwrap(), 1);
    assert_eq!(store.metrics().snapshot().records_created, 1);
}

// =============================================================================
// Reference Tests
// =============================================================================

#[tokio::test]
async fn test_references_checked_at_write_time() {
    let store = Store::in_memory(schema()).unwrap();
    let people = store.table("Person").unwrap();
    let dogs = store.table("Dog").unwrap();

    let err = dogs
        .create(1, RecordData::new().set("owner", "Jim"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), StoreErrorCode::ReferenceViolation);

    people
        .create("Jim", RecordData::new().set("age", 34))
        .await
        .unwrap();
    dogs.create(1, RecordData::new().set("owner", "Jim"))
        .await
        .unwrap();

    // Deleting the target is neither blocked nor cascaded
    assert!(people.delete("Jim").await.unwrap());
    assert!(dogs.find_unique(1).await.unwrap().is_some());
}

// =============================================================================
// Batch Tests
// =============================================================================

#[tokio::test]
async fn test_create_many_all_or_nothing() {
    let store = Store::in_memory(schema()).unwrap();
    let people = store.table("Person").unwrap();
    people
        .create("Existing", RecordData::new().set("age", 1))
        .await
        .unwrap();

    let err = people
        .create_many([
            ("A", RecordData::new().set("age", 1)),
            ("Existing", RecordData::new().set("age", 2)),
        ])
        .await
        .unwrap_err();
    assert_eq!(err.code(), StoreErrorCode::UniqueConstraint);
    assert!(people.find_unique("A").await.unwrap().is_none());

    let created = people
        .create_many([
            ("C", RecordData::new().set("age", 3)),
            ("B", RecordData::new().set("age", 2)),
        ])
        .await
        .unwrap();
    let ids: Vec<_> = created.iter().map(|r| r.id().to_string()).collect();
    assert_eq!(ids, vec!["C", "B"]);
}

#[tokio::test]
async fn test_update_many_per_record() {
    let store = Store::in_memory(schema()).unwrap();
    let counters = store.table("Counter").unwrap();
    counters
        .create_many((1..=5).map(|i| (i, RecordData::new().set("count", i))))
        .await
        .unwrap();

    let updated = counters
        .update_many(field("count").gte(3), increment())
        .await
        .unwrap();
    let ids: Vec<_> = updated.iter().map(|r| r.id().to_string()).collect();
    assert_eq!(ids, vec!["3", "4", "5"]);

    let capped = UpdateInput::with(|current: &Record| {
        let count = current.get("count").and_then(Value::as_i64).unwrap_or(0);
        if count > 5 {
            return Err(StoreError::validation("too big"));
        }
        Ok(RecordData::new().set("count", count * 10))
    });
    assert!(counters.update_many(WhereInput::all(), capped).await.is_err());

    // Records before the failing one stay updated
    let first = counters.find_unique(1).await.unwrap().unwrap();
    assert_eq!(first.get("count"), Some(&Value::Int(10)));
    let last = counters.find_unique(5).await.unwrap().unwrap();
    assert_eq!(last.get("count"), Some(&Value::Int(6)));
}

#[tokio::test]
async fn test_update_many_all_or_nothing() {
    let config = StoreConfig::default().with_update_many_atomicity(BatchAtomicity::AllOrNothing);
    let store = Store::in_memory_with_config(schema(), config).unwrap();
    let counters = store.table("Counter").unwrap();
    counters
        .create_many((1..=5).map(|i| (i, RecordData::new().set("count", i))))
        .await
        .unwrap();

    let capped = UpdateInput::with(|current: &Record| {
        let count = current.get("count").and_then(Value::as_i64).unwrap_or(0);
        if count > 4 {
            return Err(StoreError::validation("too big"));
        }
        Ok(RecordData::new().set("count", 0))
    });
    assert!(counters.update_many(WhereInput::all(), capped).await.is_err());
    assert_eq!(counters.count(field("count").equals(0)).await.unwrap(), 0);

    let updated = counters
        .update_many(field("count").lt(3), RecordData::new().set("count", 0))
        .await
        .unwrap();
    assert_eq!(updated.len(), 2);
    assert_eq!(counters.count(field("count").equals(0)).await.unwrap(), 2);
}

// =============================================================================
// Failure Tests
// =============================================================================

#[tokio::test]
async fn test_storage_failure_propagates() {
    let storage = Arc::new(MemoryStorage::new());
    let store = Store::open(schema(), storage.clone(), StoreConfig::default()).unwrap();
    let counters = store.table("Counter").unwrap();

    storage.set_offline(true);
    let err = counters
        .create(1, RecordData::new().set("count", 0))
        .await
        .unwrap_err();
    assert_eq!(err.code(), StoreErrorCode::StorageFailed);

    storage.set_offline(false);
    assert_eq!(counters.count(WhereInput::all()).await.unwrap(), 0);
    assert_eq!(store.metrics().snapshot().rollbacks, 1);
}

#[tokio::test]
async fn test_timeout_leaves_no_partial_batch() {
    let storage = Arc::new(MemoryStorage::new());
    let hurried = StoreConfig::default().with_operation_timeout(Duration::ZERO);
    let fast = Store::open(schema(), storage.clone(), hurried).unwrap();
    let normal = Store::open(schema(), storage, StoreConfig::default()).unwrap();

    let err = fast
        .table("Counter")
        .unwrap()
        .create_many((1..=3).map(|i| (i, RecordData::new().set("count", i))))
        .await
        .unwrap_err();
    assert_eq!(err.code(), StoreErrorCode::OperationTimeout);
    assert_eq!(fast.metrics().snapshot().timeouts, 1);

    let counters = normal.table("Counter").unwrap();
    assert_eq!(counters.count(WhereInput::all()).await.unwrap(), 0);
}

//! Mutation executor for aerostore
//!
//! Every single-record operation is one backend transaction. Static input
//! is validated before the transaction starts; update functions run and
//! are validated inside it, so they always see the record they replace.

use crate::config::BatchAtomicity;
use crate::deadline::Deadline;
use crate::error::{StoreError, StoreResult};
use crate::filter::{compile, CompiledPredicate, WhereInput};
use crate::record::{Record, RecordData, Value};
use crate::schema::{ReferenceCheck, SchemaValidator, TableSchema};
use crate::storage::{
    with_transaction, ScanControl, ScanDirection, StorageBackend, Transaction, WriteAction,
};

use super::input::{PreparedUpdate, UpdateInput};

/// Write-side engine bound to one table
pub struct MutationExecutor<'a> {
    storage: &'a dyn StorageBackend,
    table: &'a TableSchema,
    deadline: Deadline,
}

impl<'a> MutationExecutor<'a> {
    pub fn new(
        storage: &'a dyn StorageBackend,
        table: &'a TableSchema,
        deadline: Deadline,
    ) -> Self {
        Self {
            storage,
            table,
            deadline,
        }
    }

    fn validator(&self) -> SchemaValidator<'a> {
        SchemaValidator::new(self.table)
    }

    /// Inserts a new record.
    ///
    /// Flow:
    /// 1. Validate id and data against the schema
    /// 2. Reject an existing id
    /// 3. Stage the record, then check its references
    /// 4. Commit
    pub fn create(&self, id: Value, data: RecordData) -> StoreResult<Record> {
        // 1. Validate
        let validator = self.validator();
        let id = validator.coerce_id(id)?;
        let record = validator.validate_create(id, data)?;

        with_transaction(self.storage, |tx| {
            self.insert(tx, &validator, record.clone())?;
            self.deadline.check()?;
            Ok(record.clone())
        })
    }

    /// Updates an existing record.
    ///
    /// Flow:
    /// 1. Validate id (and a static patch) against the schema
    /// 2. Read the current record in the transaction; absent is `NotFound`
    /// 3. Compute and validate the patch, check its references
    /// 4. Write the merged record and commit
    pub fn update(&self, id: Value, input: &UpdateInput) -> StoreResult<Record> {
        let validator = self.validator();
        let id = validator.coerce_id(id)?;
        let update = PreparedUpdate::prepare(&validator, &id, input)?;

        let stored = self
            .storage
            .read_modify_write(&self.table.name, &id, &mut |current, tx| {
                let current =
                    current.ok_or_else(|| StoreError::not_found(&self.table.name, &id))?;
                let updated = self.apply(tx, &validator, current, &update)?;
                self.deadline.check()?;
                Ok(WriteAction::Put(updated))
            })?;
        stored.ok_or_else(|| StoreError::not_found(&self.table.name, &id))
    }

    /// Updates the record if it exists, creates it otherwise, in one
    /// transaction. Returns the record and whether it was created.
    pub fn upsert(
        &self,
        id: Value,
        create: RecordData,
        update: &UpdateInput,
    ) -> StoreResult<(Record, bool)> {
        let validator = self.validator();
        let id = validator.coerce_id(id)?;
        let created = validator.validate_create(id.clone(), create)?;
        let update = PreparedUpdate::prepare(&validator, &id, update)?;

        with_transaction(self.storage, |tx| {
            let outcome = match tx.get(&self.table.name, &id)? {
                Some(current) => {
                    let updated = self.apply(&*tx, &validator, &current, &update)?;
                    tx.put(&self.table.name, updated.clone())?;
                    (updated, false)
                }
                None => {
                    self.insert(tx, &validator, created.clone())?;
                    (created.clone(), true)
                }
            };
            self.deadline.check()?;
            Ok(outcome)
        })
    }

    /// Removes a record; `false` when it did not exist
    pub fn delete(&self, id: Value) -> StoreResult<bool> {
        let id = self.validator().coerce_id(id)?;
        with_transaction(self.storage, |tx| {
            let existed = tx.delete(&self.table.name, &id)?;
            self.deadline.check()?;
            Ok(existed)
        })
    }

    /// Inserts every item in one transaction; any failure leaves storage
    /// unchanged. Later items may reference earlier ones.
    pub fn create_many(&self, items: Vec<(Value, RecordData)>) -> StoreResult<Vec<Record>> {
        let validator = self.validator();
        let records = items
            .into_iter()
            .map(|(id, data)| {
                let id = validator.coerce_id(id)?;
                validator.validate_create(id, data)
            })
            .collect::<StoreResult<Vec<_>>>()?;

        with_transaction(self.storage, |tx| {
            for record in &records {
                self.deadline.check()?;
                self.insert(tx, &validator, record.clone())?;
            }
            self.deadline.check()?;
            Ok(records.clone())
        })
    }

    /// Updates every record matching `where_`; results are in id order.
    ///
    /// With `PerRecord` atomicity each record is re-read and re-checked in
    /// its own transaction: a record that stopped matching is skipped, and
    /// a failure keeps the updates already committed. `AllOrNothing` runs
    /// the whole batch in one transaction.
    pub fn update_many(
        &self,
        where_: &WhereInput,
        input: &UpdateInput,
        atomicity: BatchAtomicity,
    ) -> StoreResult<Vec<Record>> {
        let validator = self.validator();
        let predicate = compile(where_, self.table)?;
        let update = PreparedUpdate::prepare_batch(&validator, input)?;

        match atomicity {
            BatchAtomicity::PerRecord => self.update_each(&validator, &predicate, &update),
            BatchAtomicity::AllOrNothing => self.update_all(&validator, &predicate, &update),
        }
    }

    fn update_each(
        &self,
        validator: &SchemaValidator<'_>,
        predicate: &CompiledPredicate,
        update: &PreparedUpdate,
    ) -> StoreResult<Vec<Record>> {
        // Snapshot of matching ids
        let mut ids = Vec::new();
        self.storage.scan(
            &self.table.name,
            predicate.scan_range(),
            ScanDirection::Forward,
            &mut |record: &Record| {
                self.deadline.check()?;
                if predicate.matches(record) {
                    ids.push(record.id().clone());
                }
                Ok(ScanControl::Continue)
            },
        )?;

        let mut updated = Vec::with_capacity(ids.len());
        for id in ids {
            let mut written = false;
            let stored = self
                .storage
                .read_modify_write(&self.table.name, &id, &mut |current, tx| {
                    let current = match current {
                        Some(current) if predicate.matches(current) => current,
                        _ => return Ok(WriteAction::Keep),
                    };
                    let record = self.apply(tx, validator, current, update)?;
                    self.deadline.check()?;
                    written = true;
                    Ok(WriteAction::Put(record))
                })?;
            if written {
                updated.extend(stored);
            }
        }
        Ok(updated)
    }

    fn update_all(
        &self,
        validator: &SchemaValidator<'_>,
        predicate: &CompiledPredicate,
        update: &PreparedUpdate,
    ) -> StoreResult<Vec<Record>> {
        with_transaction(self.storage, |tx| {
            let mut matches = Vec::new();
            tx.scan(
                &self.table.name,
                predicate.scan_range(),
                ScanDirection::Forward,
                &mut |record: &Record| {
                    self.deadline.check()?;
                    if predicate.matches(record) {
                        matches.push(record.clone());
                    }
                    Ok(ScanControl::Continue)
                },
            )?;

            let mut updated = Vec::with_capacity(matches.len());
            for current in &matches {
                self.deadline.check()?;
                let record = self.apply(&*tx, validator, current, update)?;
                tx.put(&self.table.name, record.clone())?;
                updated.push(record);
            }
            self.deadline.check()?;
            Ok(updated)
        })
    }

    /// Stages `record` as new, then checks its references so a record may
    /// reference itself or earlier records of the same transaction.
    fn insert(
        &self,
        tx: &mut dyn Transaction,
        validator: &SchemaValidator<'_>,
        record: Record,
    ) -> StoreResult<()> {
        if tx.get(&self.table.name, record.id())?.is_some() {
            return Err(StoreError::unique_constraint(&self.table.name, record.id()));
        }
        let references = validator.references(record.values());
        tx.put(&self.table.name, record)?;
        self.check_references(&*tx, &references)
    }

    /// Merges the update into `current` and checks the written references
    fn apply(
        &self,
        tx: &dyn Transaction,
        validator: &SchemaValidator<'_>,
        current: &Record,
        update: &PreparedUpdate,
    ) -> StoreResult<Record> {
        let values = update.values_for(validator, current)?;
        self.check_references(tx, &validator.references(&values))?;
        Ok(current.merged(values))
    }

    fn check_references(
        &self,
        tx: &dyn Transaction,
        references: &[ReferenceCheck],
    ) -> StoreResult<()> {
        for reference in references {
            if tx.get(&reference.target, &reference.id)?.is_none() {
                return Err(StoreError::Reference {
                    table: self.table.name.clone(),
                    column: reference.column.clone(),
                    target: reference.target.clone(),
                    value: reference.id.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreErrorCode;
    use crate::filter::field;
    use crate::record::RecordId;
    use crate::schema::{ColumnDef, IdType, Schema};
    use crate::storage::MemoryStorage;
    use std::time::Duration;

    fn schema() -> Schema {
        Schema::new()
            .table(
                TableSchema::new("Person", IdType::String)
                    .column(ColumnDef::int("age"))
                    .column(ColumnDef::string("city").nullable())
                    .column(ColumnDef::string("manager").nullable().references("Person.id")),
            )
            .table(
                TableSchema::new("Post", IdType::Int)
                    .column(ColumnDef::string("author").references("Person.id"))
                    .column(ColumnDef::int("likes")),
            )
    }

    fn storage() -> MemoryStorage {
        let storage = MemoryStorage::new();
        storage.create_table("Person").unwrap();
        storage.create_table("Post").unwrap();
        storage
    }

    fn person(age: i64) -> RecordData {
        RecordData::new().set("age", age)
    }

    fn with_people<T>(
        storage: &MemoryStorage,
        f: impl FnOnce(&MutationExecutor<'_>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let schema = schema();
        let table = schema.get("Person").unwrap();
        f(&MutationExecutor::new(storage, table, Deadline::none()))
    }

    fn with_posts<T>(
        storage: &MemoryStorage,
        f: impl FnOnce(&MutationExecutor<'_>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let schema = schema();
        let table = schema.get("Post").unwrap();
        f(&MutationExecutor::new(storage, table, Deadline::none()))
    }

    #[test]
    fn test_create_and_duplicate() {
        let storage = storage();
        let jim = with_people(&storage, |m| m.create("Jim".into(), person(34))).unwrap();
        assert_eq!(jim.get("city"), Some(&Value::Null));

        let err = with_people(&storage, |m| m.create("Jim".into(), person(35))).unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::UniqueConstraint);
        assert_eq!(storage.get("Person", &RecordId::from("Jim")).unwrap(), Some(jim));
    }

    #[test]
    fn test_create_validation_happens_before_storage() {
        let storage = storage();
        storage.set_offline(true);
        let err = with_people(&storage, |m| m.create("Jim".into(), RecordData::new()))
            .unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::ValidationFailed);

        let err = with_people(&storage, |m| m.create("Jim".into(), person(1))).unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::StorageFailed);
    }

    #[test]
    fn test_references_checked() {
        let storage = storage();
        let post = RecordData::new().set("author", "Jim").set("likes", 0);
        let err = with_posts(&storage, |m| m.create(1.into(), post.clone())).unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::ReferenceViolation);
        assert_eq!(storage.len("Post"), 0);

        with_people(&storage, |m| m.create("Jim".into(), person(34))).unwrap();
        with_posts(&storage, |m| m.create(1.into(), post)).unwrap();

        let patch = UpdateInput::patch(RecordData::new().set("author", "Nobody"));
        let err = with_posts(&storage, |m| m.update(1.into(), &patch)).unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::ReferenceViolation);
    }

    #[test]
    fn test_self_reference() {
        let storage = storage();
        let data = person(50).set("manager", "Janet");
        with_people(&storage, |m| m.create("Janet".into(), data)).unwrap();
    }

    #[test]
    fn test_update_patch_and_function() {
        let storage = storage();
        with_people(&storage, |m| m.create("Jim".into(), person(34))).unwrap();

        let patch = UpdateInput::patch(RecordData::new().set("city", "Paris"));
        let updated = with_people(&storage, |m| m.update("Jim".into(), &patch)).unwrap();
        assert_eq!(updated.get("city"), Some(&Value::from("Paris")));
        assert_eq!(updated.get("age"), Some(&Value::Int(34)));

        let birthday = UpdateInput::with(|current| {
            let age = current.get("age").and_then(Value::as_i64).unwrap_or(0);
            Ok(RecordData::new().set("age", age + 1))
        });
        let updated = with_people(&storage, |m| m.update("Jim".into(), &birthday)).unwrap();
        assert_eq!(updated.get("age"), Some(&Value::Int(35)));
        assert_eq!(updated.get("city"), Some(&Value::from("Paris")));
    }

    #[test]
    fn test_update_errors() {
        let storage = storage();
        let patch = UpdateInput::patch(person(1));
        let err = with_people(&storage, |m| m.update("Bob".into(), &patch)).unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::RecordNotFound);

        with_people(&storage, |m| m.create("Jim".into(), person(34))).unwrap();
        let rename = UpdateInput::with(|_| Ok(RecordData::new().set("id", "James")));
        let err = with_people(&storage, |m| m.update("Jim".into(), &rename)).unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::ValidationFailed);

        let failing = UpdateInput::with(|_| Err(StoreError::validation("no")));
        assert!(with_people(&storage, |m| m.update("Jim".into(), &failing)).is_err());
        let jim = storage.get("Person", &RecordId::from("Jim")).unwrap().unwrap();
        assert_eq!(jim.get("age"), Some(&Value::Int(34)));
    }

    #[test]
    fn test_upsert() {
        let storage = storage();
        let increment = UpdateInput::with(|current| {
            let age = current.get("age").and_then(Value::as_i64).unwrap_or(0);
            Ok(RecordData::new().set("age", age + 1))
        });

        let (first, created) =
            with_people(&storage, |m| m.upsert("Jim".into(), person(0), &increment)).unwrap();
        assert!(created);
        assert_eq!(first.get("age"), Some(&Value::Int(0)));

        let (second, created) =
            with_people(&storage, |m| m.upsert("Jim".into(), person(0), &increment)).unwrap();
        assert!(!created);
        assert_eq!(second.get("age"), Some(&Value::Int(1)));
        assert_eq!(storage.len("Person"), 1);
    }

    #[test]
    fn test_delete() {
        let storage = storage();
        with_people(&storage, |m| m.create("Jim".into(), person(34))).unwrap();
        assert!(with_people(&storage, |m| m.delete("Jim".into())).unwrap());
        assert!(!with_people(&storage, |m| m.delete("Jim".into())).unwrap());
    }

    #[test]
    fn test_create_many_is_atomic() {
        let storage = storage();
        let items = vec![
            ("A".into(), person(1)),
            ("B".into(), person(2).set("manager", "A")),
            ("A".into(), person(3)),
        ];
        let err = with_people(&storage, |m| m.create_many(items)).unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::UniqueConstraint);
        assert_eq!(storage.len("Person"), 0);

        let items = vec![
            ("B".into(), person(2).set("manager", "A")),
            ("A".into(), person(1)),
        ];
        let err = with_people(&storage, |m| m.create_many(items)).unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::ReferenceViolation);

        let items = vec![
            ("A".into(), person(1)),
            ("B".into(), person(2).set("manager", "A")),
        ];
        let created = with_people(&storage, |m| m.create_many(items)).unwrap();
        let ids: Vec<_> = created.iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    fn seed_ages(storage: &MemoryStorage) {
        let items = vec![
            ("a".into(), person(10)),
            ("b".into(), person(20)),
            ("c".into(), person(30)),
            ("d".into(), person(40)),
        ];
        with_people(storage, |m| m.create_many(items)).unwrap();
    }

    fn age_of(storage: &MemoryStorage, id: &str) -> Value {
        storage
            .get("Person", &RecordId::from(id))
            .unwrap()
            .unwrap()
            .get("age")
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_update_many_per_record_keeps_completed() {
        let storage = storage();
        seed_ages(&storage);

        let update = UpdateInput::with(|current| {
            if current.id() == &RecordId::from("c") {
                return Err(StoreError::validation("c is frozen"));
            }
            let age = current.get("age").and_then(Value::as_i64).unwrap_or(0);
            Ok(RecordData::new().set("age", age + 1))
        });
        let result = with_people(&storage, |m| {
            m.update_many(&field("age").gte(20), &update, BatchAtomicity::PerRecord)
        });
        assert!(result.is_err());
        assert_eq!(age_of(&storage, "a"), Value::Int(10));
        assert_eq!(age_of(&storage, "b"), Value::Int(21));
        assert_eq!(age_of(&storage, "c"), Value::Int(30));
        assert_eq!(age_of(&storage, "d"), Value::Int(40));
    }

    #[test]
    fn test_update_many_all_or_nothing_rolls_back() {
        let storage = storage();
        seed_ages(&storage);

        let update = UpdateInput::with(|current| {
            if current.id() == &RecordId::from("c") {
                return Err(StoreError::validation("c is frozen"));
            }
            Ok(RecordData::new().set("city", "Oslo"))
        });
        let result = with_people(&storage, |m| {
            m.update_many(&field("age").gte(20), &update, BatchAtomicity::AllOrNothing)
        });
        assert!(result.is_err());
        let b = storage.get("Person", &RecordId::from("b")).unwrap().unwrap();
        assert_eq!(b.get("city"), Some(&Value::Null));

        let patch = UpdateInput::patch(RecordData::new().set("city", "Oslo"));
        let updated = with_people(&storage, |m| {
            m.update_many(&field("age").lt(35), &patch, BatchAtomicity::AllOrNothing)
        })
        .unwrap();
        let ids: Vec<_> = updated.iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_update_many_rejects_id_patch() {
        let storage = storage();
        seed_ages(&storage);
        let patch = UpdateInput::patch(RecordData::new().set("id", "z"));
        let err = with_people(&storage, |m| {
            m.update_many(&WhereInput::all(), &patch, BatchAtomicity::PerRecord)
        })
        .unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::ValidationFailed);
    }

    #[test]
    fn test_expired_deadline_rolls_back() {
        let storage = storage();
        let schema = schema();
        let table = schema.get("Person").unwrap();
        let mutations = MutationExecutor::new(&storage, table, Deadline::after(Duration::ZERO));
        let err = mutations
            .create_many(vec![("a".into(), person(1)), ("b".into(), person(2))])
            .unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::OperationTimeout);
        assert_eq!(storage.len("Person"), 0);
    }
}

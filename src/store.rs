//! Store context and table handles
//!
//! A `Store` owns the schema, the storage backend, the config and the
//! counters. Several stores can coexist in one process; nothing is global
//! except the log level.
//!
//! `TableHandle` is the async public API. Each call gets an operation id
//! and a deadline, then runs the synchronous executors on tokio's blocking
//! pool.

use std::sync::Arc;

use tokio::task;
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::cursor::OrderBy;
use crate::deadline::Deadline;
use crate::error::{StoreError, StoreErrorCode, StoreResult};
use crate::executor::{FindManyArgs, Page, QueryExecutor, ScanPlan};
use crate::filter::WhereInput;
use crate::mutation::{MutationExecutor, UpdateInput};
use crate::observability::{log_event, Event, Logger, MetricsRegistry};
use crate::record::{Record, RecordData, Value};
use crate::schema::{Schema, TableSchema};
use crate::storage::{MemoryStorage, StorageBackend, StorageError};

struct StoreInner {
    schema: Schema,
    storage: Arc<dyn StorageBackend>,
    config: StoreConfig,
    metrics: MetricsRegistry,
}

/// A schema bound to a storage backend
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Opens a store.
    ///
    /// Flow:
    /// 1. Validate the schema structure and the config
    /// 2. Register every table with the backend
    /// 3. Apply the configured log level
    pub fn open(
        schema: Schema,
        storage: Arc<dyn StorageBackend>,
        config: StoreConfig,
    ) -> StoreResult<Self> {
        schema
            .validate_structure()
            .map_err(|e| StoreError::validation(format!("invalid schema: {}", e)))?;
        config.validate()?;

        for table in &schema.tables {
            storage.create_table(&table.name)?;
        }

        Logger::set_min_severity(config.log_level);
        let tables = schema.tables.len().to_string();
        log_event(Event::StoreOpen, &[("tables", &tables)]);

        Ok(Self {
            inner: Arc::new(StoreInner {
                schema,
                storage,
                config,
                metrics: MetricsRegistry::new(),
            }),
        })
    }

    /// Opens a store over a fresh in-memory backend with default config
    pub fn in_memory(schema: Schema) -> StoreResult<Self> {
        Self::in_memory_with_config(schema, StoreConfig::default())
    }

    pub fn in_memory_with_config(schema: Schema, config: StoreConfig) -> StoreResult<Self> {
        Self::open(schema, Arc::new(MemoryStorage::new()), config)
    }

    /// Handle for the table `name`
    pub fn table(&self, name: &str) -> StoreResult<TableHandle> {
        if self.inner.schema.get(name).is_none() {
            return Err(StoreError::validation(format!("unknown table '{}'", name)));
        }
        Ok(TableHandle {
            inner: Arc::clone(&self.inner),
            table: name.to_string(),
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.inner.metrics
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpKind {
    Read,
    Write,
}

/// Async operations on one table
#[derive(Clone)]
pub struct TableHandle {
    inner: Arc<StoreInner>,
    table: String,
}

impl TableHandle {
    pub fn name(&self) -> &str {
        &self.table
    }

    pub async fn create(&self, id: impl Into<Value>, data: RecordData) -> StoreResult<Record> {
        let id = id.into();
        let record = self
            .run("create", OpKind::Write, move |ctx| {
                ctx.mutations().create(id, data)
            })
            .await?;
        self.inner.metrics.add_records_created(1);
        self.log_record(Event::RecordCreated, &record);
        Ok(record)
    }

    pub async fn update(
        &self,
        id: impl Into<Value>,
        input: impl Into<UpdateInput>,
    ) -> StoreResult<Record> {
        let id = id.into();
        let input = input.into();
        let record = self
            .run("update", OpKind::Write, move |ctx| {
                ctx.mutations().update(id, &input)
            })
            .await?;
        self.inner.metrics.add_records_updated(1);
        self.log_record(Event::RecordUpdated, &record);
        Ok(record)
    }

    /// Updates the record when it exists, creates it from `create` otherwise
    pub async fn upsert(
        &self,
        id: impl Into<Value>,
        create: RecordData,
        update: impl Into<UpdateInput>,
    ) -> StoreResult<Record> {
        let id = id.into();
        let update = update.into();
        let (record, created) = self
            .run("upsert", OpKind::Write, move |ctx| {
                ctx.mutations().upsert(id, create, &update)
            })
            .await?;
        if created {
            self.inner.metrics.add_records_created(1);
            self.log_record(Event::RecordCreated, &record);
        } else {
            self.inner.metrics.add_records_updated(1);
            self.log_record(Event::RecordUpdated, &record);
        }
        Ok(record)
    }

    /// Deletes a record; `false` when it did not exist
    pub async fn delete(&self, id: impl Into<Value>) -> StoreResult<bool> {
        let id = id.into();
        let shown = id.to_string();
        let removed = self
            .run("delete", OpKind::Write, move |ctx| ctx.mutations().delete(id))
            .await?;
        if removed {
            self.inner.metrics.increment_records_deleted();
            log_event(
                Event::RecordDeleted,
                &[("table", &self.table), ("id", &shown)],
            );
        }
        Ok(removed)
    }

    pub async fn find_unique(&self, id: impl Into<Value>) -> StoreResult<Option<Record>> {
        let id = id.into();
        let record = self
            .run("find_unique", OpKind::Read, move |ctx| {
                ctx.queries().find_unique(id)
            })
            .await?;
        self.log_query("find_unique", usize::from(record.is_some()));
        Ok(record)
    }

    pub async fn find_many(&self, args: FindManyArgs) -> StoreResult<Page> {
        let page = self
            .run("find_many", OpKind::Read, move |ctx| {
                ctx.queries().find_many(&args)
            })
            .await?;
        self.log_query("find_many", page.len());
        Ok(page)
    }

    /// Number of records matching `where_`
    pub async fn count(&self, where_: WhereInput) -> StoreResult<usize> {
        let count = self
            .run("count", OpKind::Read, move |ctx| ctx.queries().count(&where_))
            .await?;
        self.log_query("count", count);
        Ok(count)
    }

    /// How `find_many` would execute with this filter and order
    pub async fn explain(&self, where_: WhereInput, order: OrderBy) -> StoreResult<ScanPlan> {
        self.run("explain", OpKind::Read, move |ctx| {
            ctx.queries().explain(&where_, &order)
        })
        .await
    }

    /// Creates every item or none of them
    pub async fn create_many<I, K>(&self, items: I) -> StoreResult<Vec<Record>>
    where
        I: IntoIterator<Item = (K, RecordData)>,
        K: Into<Value>,
    {
        let items: Vec<(Value, RecordData)> =
            items.into_iter().map(|(id, data)| (id.into(), data)).collect();
        let records = self
            .run("create_many", OpKind::Write, move |ctx| {
                ctx.mutations().create_many(items)
            })
            .await?;
        self.inner.metrics.add_records_created(records.len() as u64);
        let count = records.len().to_string();
        log_event(
            Event::BatchCreated,
            &[("count", &count), ("table", &self.table)],
        );
        Ok(records)
    }

    /// Updates every record matching `where_`, with the configured
    /// atomicity. Returns the updated records in id order.
    pub async fn update_many(
        &self,
        where_: WhereInput,
        input: impl Into<UpdateInput>,
    ) -> StoreResult<Vec<Record>> {
        let input = input.into();
        let atomicity = self.inner.config.update_many_atomicity;
        let records = self
            .run("update_many", OpKind::Write, move |ctx| {
                ctx.mutations().update_many(&where_, &input, atomicity)
            })
            .await?;
        self.inner.metrics.add_records_updated(records.len() as u64);
        let count = records.len().to_string();
        log_event(
            Event::BatchUpdated,
            &[("count", &count), ("table", &self.table)],
        );
        Ok(records)
    }

    /// Runs `body` on the blocking pool under a fresh deadline
    async fn run<T, F>(&self, op: &'static str, kind: OpKind, body: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&OpContext<'_>) -> StoreResult<T> + Send + 'static,
    {
        let op_id = Uuid::new_v4().to_string();
        let inner = Arc::clone(&self.inner);
        let table = self.table.clone();
        let deadline = Deadline::from_timeout(inner.config.operation_timeout());

        let joined = task::spawn_blocking(move || {
            let schema = inner.schema.get(&table).ok_or_else(|| {
                StoreError::validation(format!("unknown table '{}'", table))
            })?;
            body(&OpContext {
                inner: &inner,
                table: schema,
                deadline,
            })
        })
        .await;

        let result = match joined {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(StorageError::unavailable("operation was cancelled")
                .with_details(e.to_string())
                .into()),
        };
        if let Err(err) = &result {
            self.record_failure(op, &op_id, kind, err);
        }
        result
    }

    fn record_failure(&self, op: &str, op_id: &str, kind: OpKind, err: &StoreError) {
        let metrics = &self.inner.metrics;
        let message = err.to_string();
        let fields = [
            ("code", err.code_str()),
            ("error", message.as_str()),
            ("op", op),
            ("op_id", op_id),
            ("table", self.table.as_str()),
        ];

        if matches!(err, StoreError::Timeout) {
            metrics.increment_timeouts();
            log_event(Event::OperationTimeout, &fields);
        }
        match kind {
            OpKind::Write if err.code() != StoreErrorCode::ValidationFailed => {
                metrics.increment_rollbacks();
                log_event(Event::TransactionRolledBack, &fields);
            }
            OpKind::Read if err.code().is_client_error() => {
                metrics.increment_queries_rejected();
                log_event(Event::QueryRejected, &fields);
            }
            _ => {}
        }
    }

    fn log_record(&self, event: Event, record: &Record) {
        let id = record.id().to_string();
        log_event(event, &[("id", &id), ("table", &self.table)]);
    }

    fn log_query(&self, op: &str, returned: usize) {
        self.inner.metrics.increment_queries_executed();
        let returned = returned.to_string();
        log_event(
            Event::QueryExecuted,
            &[("op", op), ("returned", &returned), ("table", &self.table)],
        );
    }
}

/// Borrowed view of the store handed to an operation body
struct OpContext<'a> {
    inner: &'a StoreInner,
    table: &'a TableSchema,
    deadline: Deadline,
}

impl OpContext<'_> {
    fn queries(&self) -> QueryExecutor<'_> {
        QueryExecutor::new(
            self.inner.storage.as_ref(),
            self.table,
            &self.inner.config,
            self.deadline,
        )
    }

    fn mutations(&self) -> MutationExecutor<'_> {
        MutationExecutor::new(self.inner.storage.as_ref(), self.table, self.deadline)
    }
}

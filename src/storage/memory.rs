//! In-memory storage backend
//!
//! Tables are ordered maps from id to record behind one `RwLock`.
//! Transactions hold the write lock for their whole body, which serializes
//! them, and stage writes in an overlay applied only on commit.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::error::StoreResult;
use crate::record::{Record, RecordId};

use super::backend::{
    ScanControl, ScanDirection, ScanRange, ScanVisitor, StorageBackend, Transaction,
};
use super::errors::StorageError;

type Table = BTreeMap<RecordId, Record>;

/// Staged writes of one transaction: `None` marks a delete
type Overlay = HashMap<String, BTreeMap<RecordId, Option<Record>>>;

/// Process-local backend used by `Store::in_memory` and in tests
#[derive(Default)]
pub struct MemoryStorage {
    tables: RwLock<HashMap<String, Table>>,
    offline: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates losing the backend connection. While offline every call
    /// fails with `AERO_STORAGE_UNAVAILABLE`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of committed records in `table`
    pub fn len(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable("backend is offline").into());
        }
        Ok(())
    }
}

fn table<'a>(tables: &'a HashMap<String, Table>, name: &str) -> StoreResult<&'a Table> {
    tables
        .get(name)
        .ok_or_else(|| StorageError::unknown_table(name).into())
}

fn scan_table(
    table: &Table,
    range: &ScanRange,
    direction: ScanDirection,
    visitor: &mut ScanVisitor<'_>,
) -> StoreResult<()> {
    let ScanRange::Bounded { start, end } = range else {
        return Ok(());
    };
    let entries = table.range((start.clone(), end.clone()));
    match direction {
        ScanDirection::Forward => {
            for (_, record) in entries {
                if visitor(record)? == ScanControl::Stop {
                    break;
                }
            }
        }
        ScanDirection::Reverse => {
            for (_, record) in entries.rev() {
                if visitor(record)? == ScanControl::Stop {
                    break;
                }
            }
        }
    }
    Ok(())
}

impl StorageBackend for MemoryStorage {
    fn create_table(&self, table: &str) -> StoreResult<()> {
        self.check_online()?;
        self.tables.write().entry(table.to_string()).or_default();
        Ok(())
    }

    fn get(&self, table_name: &str, id: &RecordId) -> StoreResult<Option<Record>> {
        self.check_online()?;
        let tables = self.tables.read();
        Ok(table(&tables, table_name)?.get(id).cloned())
    }

    fn scan(
        &self,
        table_name: &str,
        range: &ScanRange,
        direction: ScanDirection,
        visitor: &mut ScanVisitor<'_>,
    ) -> StoreResult<()> {
        self.check_online()?;
        let tables = self.tables.read();
        scan_table(table(&tables, table_name)?, range, direction, visitor)
    }

    fn transaction(
        &self,
        body: &mut dyn FnMut(&mut dyn Transaction) -> StoreResult<()>,
    ) -> StoreResult<()> {
        self.check_online()?;
        let mut tables = self.tables.write();

        let mut tx = MemoryTransaction {
            tables: &*tables,
            overlay: Overlay::new(),
        };
        body(&mut tx)?;
        let MemoryTransaction { overlay, .. } = tx;

        // The body may have run for a while; a backend that went away in
        // the meantime must not commit.
        self.check_online()?;

        for (name, writes) in overlay {
            let table = tables
                .get_mut(&name)
                .ok_or_else(|| StorageError::unknown_table(&name))?;
            for (id, write) in writes {
                match write {
                    Some(record) => {
                        table.insert(id, record);
                    }
                    None => {
                        table.remove(&id);
                    }
                }
            }
        }
        Ok(())
    }
}

struct MemoryTransaction<'a> {
    tables: &'a HashMap<String, Table>,
    overlay: Overlay,
}

impl MemoryTransaction<'_> {
    fn staged(&self, table: &str, id: &RecordId) -> Option<&Option<Record>> {
        self.overlay.get(table).and_then(|writes| writes.get(id))
    }
}

impl Transaction for MemoryTransaction<'_> {
    fn get(&self, table_name: &str, id: &RecordId) -> StoreResult<Option<Record>> {
        let base = table(self.tables, table_name)?;
        match self.staged(table_name, id) {
            Some(write) => Ok(write.clone()),
            None => Ok(base.get(id).cloned()),
        }
    }

    fn scan(
        &self,
        table_name: &str,
        range: &ScanRange,
        direction: ScanDirection,
        visitor: &mut ScanVisitor<'_>,
    ) -> StoreResult<()> {
        let base = table(self.tables, table_name)?;
        let Some(writes) = self.overlay.get(table_name) else {
            return scan_table(base, range, direction, visitor);
        };

        let mut merged = Table::new();
        if let ScanRange::Bounded { start, end } = range {
            for (id, record) in base.range((start.clone(), end.clone())) {
                merged.insert(id.clone(), record.clone());
            }
        }
        for (id, write) in writes {
            if !range.contains(id) {
                continue;
            }
            match write {
                Some(record) => {
                    merged.insert(id.clone(), record.clone());
                }
                None => {
                    merged.remove(id);
                }
            }
        }
        scan_table(&merged, &ScanRange::full(), direction, visitor)
    }

    fn put(&mut self, table_name: &str, record: Record) -> StoreResult<()> {
        table(self.tables, table_name)?;
        self.overlay
            .entry(table_name.to_string())
            .or_default()
            .insert(record.id().clone(), Some(record));
        Ok(())
    }

    fn delete(&mut self, table_name: &str, id: &RecordId) -> StoreResult<bool> {
        let existed = self.get(table_name, id)?.is_some();
        if existed {
            self.overlay
                .entry(table_name.to_string())
                .or_default()
                .insert(id.clone(), None);
        }
        Ok(existed)
    }
}

//! Transactional key-range storage contract
//!
//! The engine never locks on its own. Every mutation runs inside
//! `StorageBackend::transaction`, which commits when the body returns `Ok`
//! and discards all staged writes when it returns `Err`.

use std::cmp::Ordering;
use std::ops::Bound;

use crate::error::StoreResult;
use crate::record::{Record, RecordId};

/// A contiguous range of ids.
///
/// `Bounded` is always non-inverted, so it can be handed to an ordered map
/// range lookup directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanRange {
    Empty,
    Bounded {
        start: Bound<RecordId>,
        end: Bound<RecordId>,
    },
}

impl ScanRange {
    /// All ids
    pub fn full() -> Self {
        ScanRange::Bounded {
            start: Bound::Unbounded,
            end: Bound::Unbounded,
        }
    }

    /// Builds a range, collapsing inverted or degenerate bounds to `Empty`
    pub fn new(start: Bound<RecordId>, end: Bound<RecordId>) -> Self {
        if let (Some(s), Some(e)) = (bound_value(&start), bound_value(&end)) {
            match s.cmp(e) {
                Ordering::Greater => return ScanRange::Empty,
                Ordering::Equal
                    if matches!(start, Bound::Excluded(_)) || matches!(end, Bound::Excluded(_)) =>
                {
                    return ScanRange::Empty
                }
                _ => {}
            }
        }
        ScanRange::Bounded { start, end }
    }

    /// The single id `id`
    pub fn point(id: RecordId) -> Self {
        ScanRange::Bounded {
            start: Bound::Included(id.clone()),
            end: Bound::Included(id),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ScanRange::Empty)
    }

    pub fn is_full(&self) -> bool {
        matches!(
            self,
            ScanRange::Bounded {
                start: Bound::Unbounded,
                end: Bound::Unbounded
            }
        )
    }

    /// Ids present in both ranges
    pub fn intersect(&self, other: &ScanRange) -> ScanRange {
        match (self, other) {
            (
                ScanRange::Bounded { start: s1, end: e1 },
                ScanRange::Bounded { start: s2, end: e2 },
            ) => ScanRange::new(tighter_start(s1, s2), tighter_end(e1, e2)),
            _ => ScanRange::Empty,
        }
    }

    /// Smallest range covering both ranges
    pub fn hull(&self, other: &ScanRange) -> ScanRange {
        match (self, other) {
            (ScanRange::Empty, r) | (r, ScanRange::Empty) => r.clone(),
            (
                ScanRange::Bounded { start: s1, end: e1 },
                ScanRange::Bounded { start: s2, end: e2 },
            ) => ScanRange::new(looser_start(s1, s2), looser_end(e1, e2)),
        }
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        match self {
            ScanRange::Empty => false,
            ScanRange::Bounded { start, end } => {
                let after_start = match start {
                    Bound::Unbounded => true,
                    Bound::Included(s) => id >= s,
                    Bound::Excluded(s) => id > s,
                };
                let before_end = match end {
                    Bound::Unbounded => true,
                    Bound::Included(e) => id <= e,
                    Bound::Excluded(e) => id < e,
                };
                after_start && before_end
            }
        }
    }
}

fn bound_value(bound: &Bound<RecordId>) -> Option<&RecordId> {
    match bound {
        Bound::Included(v) | Bound::Excluded(v) => Some(v),
        Bound::Unbounded => None,
    }
}

// Compares two lower bounds: Less means `a` admits more ids.
fn cmp_start(a: &Bound<RecordId>, b: &Bound<RecordId>) -> Ordering {
    match (a, b) {
        (Bound::Unbounded, Bound::Unbounded) => Ordering::Equal,
        (Bound::Unbounded, _) => Ordering::Less,
        (_, Bound::Unbounded) => Ordering::Greater,
        (Bound::Included(x), Bound::Included(y)) | (Bound::Excluded(x), Bound::Excluded(y)) => {
            x.cmp(y)
        }
        (Bound::Included(x), Bound::Excluded(y)) => x.cmp(y).then(Ordering::Less),
        (Bound::Excluded(x), Bound::Included(y)) => x.cmp(y).then(Ordering::Greater),
    }
}

// Compares two upper bounds: Greater means `a` admits more ids.
fn cmp_end(a: &Bound<RecordId>, b: &Bound<RecordId>) -> Ordering {
    match (a, b) {
        (Bound::Unbounded, Bound::Unbounded) => Ordering::Equal,
        (Bound::Unbounded, _) => Ordering::Greater,
        (_, Bound::Unbounded) => Ordering::Less,
        (Bound::Included(x), Bound::Included(y)) | (Bound::Excluded(x), Bound::Excluded(y)) => {
            x.cmp(y)
        }
        (Bound::Included(x), Bound::Excluded(y)) => x.cmp(y).then(Ordering::Greater),
        (Bound::Excluded(x), Bound::Included(y)) => x.cmp(y).then(Ordering::Less),
    }
}

fn tighter_start(a: &Bound<RecordId>, b: &Bound<RecordId>) -> Bound<RecordId> {
    if cmp_start(a, b) == Ordering::Less {
        b.clone()
    } else {
        a.clone()
    }
}

fn looser_start(a: &Bound<RecordId>, b: &Bound<RecordId>) -> Bound<RecordId> {
    if cmp_start(a, b) == Ordering::Less {
        a.clone()
    } else {
        b.clone()
    }
}

fn tighter_end(a: &Bound<RecordId>, b: &Bound<RecordId>) -> Bound<RecordId> {
    if cmp_end(a, b) == Ordering::Greater {
        b.clone()
    } else {
        a.clone()
    }
}

fn looser_end(a: &Bound<RecordId>, b: &Bound<RecordId>) -> Bound<RecordId> {
    if cmp_end(a, b) == Ordering::Greater {
        a.clone()
    } else {
        b.clone()
    }
}

/// Scan order over ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDirection {
    Forward,
    Reverse,
}

/// Returned by scan visitors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanControl {
    Continue,
    Stop,
}

/// Per-record callback of an ordered scan
pub type ScanVisitor<'a> = dyn FnMut(&Record) -> StoreResult<ScanControl> + 'a;

/// Outcome of a read-modify-write body
#[derive(Debug, Clone, PartialEq)]
pub enum WriteAction {
    Put(Record),
    Delete,
    Keep,
}

/// Reads and staged writes inside one transaction.
///
/// Reads observe the transaction's own staged writes.
pub trait Transaction {
    fn get(&self, table: &str, id: &RecordId) -> StoreResult<Option<Record>>;

    fn scan(
        &self,
        table: &str,
        range: &ScanRange,
        direction: ScanDirection,
        visitor: &mut ScanVisitor<'_>,
    ) -> StoreResult<()>;

    fn put(&mut self, table: &str, record: Record) -> StoreResult<()>;

    /// Removes a record, returning whether it existed
    fn delete(&mut self, table: &str, id: &RecordId) -> StoreResult<bool>;
}

/// A transactional, ordered key-range store of records
pub trait StorageBackend: Send + Sync {
    /// Registers a table. Registering an existing table is a no-op.
    fn create_table(&self, table: &str) -> StoreResult<()>;

    fn get(&self, table: &str, id: &RecordId) -> StoreResult<Option<Record>>;

    /// Visits records with ids in `range`, in id order per `direction`,
    /// until the visitor returns `Stop` or an error.
    ///
    /// The visitor must not call back into the backend.
    fn scan(
        &self,
        table: &str,
        range: &ScanRange,
        direction: ScanDirection,
        visitor: &mut ScanVisitor<'_>,
    ) -> StoreResult<()>;

    /// Runs `body` atomically. Transactions are serialized against each
    /// other; writes become visible only when `body` returns `Ok`.
    fn transaction(
        &self,
        body: &mut dyn FnMut(&mut dyn Transaction) -> StoreResult<()>,
    ) -> StoreResult<()>;

    /// Reads the record `id` and applies the returned action in the same
    /// transaction. Returns the record as stored afterwards.
    fn read_modify_write(
        &self,
        table: &str,
        id: &RecordId,
        body: &mut dyn FnMut(Option<&Record>, &dyn Transaction) -> StoreResult<WriteAction>,
    ) -> StoreResult<Option<Record>> {
        with_transaction(self, |tx| {
            let current = tx.get(table, id)?;
            match body(current.as_ref(), &*tx)? {
                WriteAction::Put(record) => {
                    tx.put(table, record.clone())?;
                    Ok(Some(record))
                }
                WriteAction::Delete => {
                    tx.delete(table, id)?;
                    Ok(None)
                }
                WriteAction::Keep => Ok(current),
            }
        })
    }
}

/// Runs `body` in a transaction and returns its value
pub fn with_transaction<B, T, F>(backend: &B, mut body: F) -> StoreResult<T>
where
    B: StorageBackend + ?Sized,
    F: FnMut(&mut dyn Transaction) -> StoreResult<T>,
{
    let mut output = None;
    backend.transaction(&mut |tx| {
        output = Some(body(tx)?);
        Ok(())
    })?;
    output.ok_or_else(|| {
        crate::storage::StorageError::write_failed("transaction committed without running").into()
    })
}

//! Query executor for aerostore
//!
//! Execution flow of `find_many` (strict order):
//! 1. Resolve limit and order, reject conflicting cursors
//! 2. Compile the filter and decode the cursor (no storage access yet)
//! 3. Scan storage over the lowered id range
//! 4. Filter every scanned record with the compiled predicate
//! 5. Order by id natively, or sort the matches in memory
//! 6. Cut the page and probe both sides for `PageInfo`

use std::ops::Bound;

use crate::config::StoreConfig;
use crate::cursor::{decode_cursor, encode_cursor, CursorPosition, OrderBy, SortDirection};
use crate::deadline::Deadline;
use crate::error::{StoreError, StoreResult};
use crate::filter::{compile, CompiledPredicate, WhereInput};
use crate::record::{Record, Value};
use crate::schema::{SchemaValidator, TableSchema};
use crate::storage::{ScanControl, ScanDirection, ScanRange, StorageBackend};

use super::result::{Page, PageInfo, ScanPlan, ScanStrategy};
use super::sorter::{ResultSorter, Window};

/// Arguments of `find_many`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindManyArgs {
    pub where_: WhereInput,
    pub order_by: OrderBy,
    /// Return records strictly after this cursor
    pub after: Option<String>,
    /// Return records strictly before this cursor
    pub before: Option<String>,
    /// Page size; the configured default when absent
    pub limit: Option<usize>,
}

impl FindManyArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_(mut self, input: WhereInput) -> Self {
        self.where_ = input;
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by = order;
        self
    }

    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.after = Some(cursor.into());
        self
    }

    pub fn before(mut self, cursor: impl Into<String>) -> Self {
        self.before = Some(cursor.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Parses `{"where": .., "orderBy": .., "after": .., "before": .., "limit": ..}`.
    /// Every key is optional.
    pub fn from_json(json: &serde_json::Value) -> StoreResult<Self> {
        let object = json
            .as_object()
            .ok_or_else(|| StoreError::validation("findMany arguments must be an object"))?;

        let mut args = Self::new();
        for (key, value) in object {
            match key.as_str() {
                "where" => args.where_ = WhereInput::from_json(value)?,
                "orderBy" => args.order_by = OrderBy::from_json(value)?,
                "after" | "before" => {
                    let cursor = value.as_str().map(str::to_string).ok_or_else(|| {
                        StoreError::validation(format!("'{}' must be a cursor string", key))
                    })?;
                    if key == "after" {
                        args.after = Some(cursor);
                    } else {
                        args.before = Some(cursor);
                    }
                }
                "limit" => {
                    let limit = value.as_u64().ok_or_else(|| {
                        StoreError::validation("'limit' must be a non-negative integer")
                    })?;
                    args.limit = Some(usize::try_from(limit).unwrap_or(usize::MAX));
                }
                other => {
                    return Err(StoreError::validation(format!(
                        "unknown findMany argument '{}'",
                        other
                    )))
                }
            }
        }
        Ok(args)
    }
}

/// A validated `find_many` request
struct PageRequest {
    predicate: CompiledPredicate,
    order: OrderBy,
    position: Option<CursorPosition>,
    backward: bool,
    limit: usize,
}

/// Read-side engine bound to one table
pub struct QueryExecutor<'a> {
    storage: &'a dyn StorageBackend,
    table: &'a TableSchema,
    config: &'a StoreConfig,
    deadline: Deadline,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(
        storage: &'a dyn StorageBackend,
        table: &'a TableSchema,
        config: &'a StoreConfig,
        deadline: Deadline,
    ) -> Self {
        Self {
            storage,
            table,
            config,
            deadline,
        }
    }

    /// Fetches a record by id; a missing record is `None`, not an error
    pub fn find_unique(&self, id: Value) -> StoreResult<Option<Record>> {
        let id = SchemaValidator::new(self.table).coerce_id(id)?;
        self.deadline.check()?;
        self.storage.get(&self.table.name, &id)
    }

    pub fn find_many(&self, args: &FindManyArgs) -> StoreResult<Page> {
        let request = self.prepare(args)?;

        let window = if request.order.is_id() {
            self.indexed_window(&request)?
        } else {
            self.sorted_window(&request)?
        };

        if window.items.is_empty() {
            return Ok(Page::empty());
        }

        let page_info = PageInfo {
            start_cursor: window.items.first().map(|r| encode_cursor(r, &request.order)),
            end_cursor: window.items.last().map(|r| encode_cursor(r, &request.order)),
            has_previous_page: window.has_previous,
            has_next_page: window.has_next,
        };
        Ok(Page {
            items: window.items,
            page_info,
        })
    }

    /// Number of records matching `where_`
    pub fn count(&self, where_: &WhereInput) -> StoreResult<usize> {
        let predicate = compile(where_, self.table)?;
        let mut count = 0;
        self.scan(predicate.scan_range(), ScanDirection::Forward, |record| {
            if predicate.matches(record) {
                count += 1;
            }
            Ok(ScanControl::Continue)
        })?;
        Ok(count)
    }

    /// Describes how `find_many` would reach its records, without scanning
    pub fn explain(&self, where_: &WhereInput, order: &OrderBy) -> StoreResult<ScanPlan> {
        order.validate(self.table)?;
        let predicate = compile(where_, self.table)?;
        Ok(ScanPlan {
            range: predicate.scan_range().clone(),
            strategy: if order.is_id() {
                ScanStrategy::Indexed
            } else {
                ScanStrategy::Sorted
            },
            residual_filter: predicate.has_residual_filter(),
        })
    }

    fn prepare(&self, args: &FindManyArgs) -> StoreResult<PageRequest> {
        let limit = args.limit.unwrap_or(self.config.default_limit);
        if limit == 0 {
            return Err(StoreError::validation("limit must be at least 1"));
        }
        if limit > self.config.max_limit {
            return Err(StoreError::validation(format!(
                "limit {} exceeds the maximum of {}",
                limit, self.config.max_limit
            )));
        }
        if args.after.is_some() && args.before.is_some() {
            return Err(StoreError::validation(
                "'before' and 'after' cannot be combined",
            ));
        }

        args.order_by.validate(self.table)?;
        let predicate = compile(&args.where_, self.table)?;
        let position = match args.after.as_deref().or(args.before.as_deref()) {
            Some(cursor) => Some(decode_cursor(cursor)?),
            None => None,
        };

        Ok(PageRequest {
            predicate,
            order: args.order_by.clone(),
            position,
            backward: args.before.is_some(),
            limit,
        })
    }

    /// Id order: the storage scan already yields result order, so the scan
    /// stops after `limit + 1` matches.
    fn indexed_window(&self, request: &PageRequest) -> StoreResult<Window> {
        // Direction of travel in id space
        let ascending = (request.order.direction == SortDirection::Asc) != request.backward;
        let (direction, opposite) = if ascending {
            (ScanDirection::Forward, ScanDirection::Reverse)
        } else {
            (ScanDirection::Reverse, ScanDirection::Forward)
        };

        let range = match &request.position {
            Some(position) if ascending => {
                ScanRange::new(Bound::Excluded(position.id.clone()), Bound::Unbounded)
            }
            Some(position) => {
                ScanRange::new(Bound::Unbounded, Bound::Excluded(position.id.clone()))
            }
            None => ScanRange::full(),
        };
        let range = request.predicate.scan_range().intersect(&range);

        let probe = request.limit + 1;
        let mut items = Vec::new();
        self.scan(&range, direction, |record| {
            if request.predicate.matches(record) {
                items.push(record.clone());
                if items.len() == probe {
                    return Ok(ScanControl::Stop);
                }
            }
            Ok(ScanControl::Continue)
        })?;
        let more = items.len() > request.limit;
        items.truncate(request.limit);

        // One-record probe from the cursor, inclusive, the other way
        let behind = match &request.position {
            Some(position) => {
                let range = if ascending {
                    ScanRange::new(Bound::Unbounded, Bound::Included(position.id.clone()))
                } else {
                    ScanRange::new(Bound::Included(position.id.clone()), Bound::Unbounded)
                };
                self.any_match(&request.predicate, &range, opposite)?
            }
            None => false,
        };

        if request.backward {
            items.reverse();
            Ok(Window {
                items,
                has_previous: more,
                has_next: behind,
            })
        } else {
            Ok(Window {
                items,
                has_previous: behind,
                has_next: more,
            })
        }
    }

    /// Any other order: collect every match in the lowered range and sort.
    fn sorted_window(&self, request: &PageRequest) -> StoreResult<Window> {
        let mut matches = Vec::new();
        self.scan(
            request.predicate.scan_range(),
            ScanDirection::Forward,
            |record| {
                if request.predicate.matches(record) {
                    matches.push(record.clone());
                }
                Ok(ScanControl::Continue)
            },
        )?;
        ResultSorter::sort(&mut matches, &request.order);

        Ok(match (&request.position, request.backward) {
            (Some(position), true) => {
                ResultSorter::before(matches, position, &request.order, request.limit)
            }
            (position, _) => {
                ResultSorter::after(matches, position.as_ref(), &request.order, request.limit)
            }
        })
    }

    fn any_match(
        &self,
        predicate: &CompiledPredicate,
        range: &ScanRange,
        direction: ScanDirection,
    ) -> StoreResult<bool> {
        let mut found = false;
        self.scan(range, direction, |record| {
            if predicate.matches(record) {
                found = true;
                return Ok(ScanControl::Stop);
            }
            Ok(ScanControl::Continue)
        })?;
        Ok(found)
    }

    /// Storage scan with a deadline check per record
    fn scan<F>(
        &self,
        range: &ScanRange,
        direction: ScanDirection,
        mut visit: F,
    ) -> StoreResult<()>
    where
        F: FnMut(&Record) -> StoreResult<ScanControl>,
    {
        self.deadline.check()?;
        if range.is_empty() {
            return Ok(());
        }
        let deadline = self.deadline;
        self.storage.scan(
            &self.table.name,
            range,
            direction,
            &mut |record: &Record| {
                deadline.check()?;
                visit(record)
            },
        )
    }
}

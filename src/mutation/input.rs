//! Update inputs: a static patch or a function of the current record

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::StoreResult;
use crate::record::{Record, RecordData, RecordId, Value};
use crate::schema::SchemaValidator;

/// Computes a patch from the current record inside the update's transaction
pub type UpdateFn = Arc<dyn Fn(&Record) -> StoreResult<RecordData> + Send + Sync>;

/// How an update changes a record
#[derive(Clone)]
pub enum UpdateInput {
    /// Columns to overwrite; absent columns keep their value
    Patch(RecordData),
    /// Called with the current record; an `Err` aborts the update
    With(UpdateFn),
}

impl UpdateInput {
    pub fn patch(data: RecordData) -> Self {
        UpdateInput::Patch(data)
    }

    pub fn with<F>(f: F) -> Self
    where
        F: Fn(&Record) -> StoreResult<RecordData> + Send + Sync + 'static,
    {
        UpdateInput::With(Arc::new(f))
    }
}

impl From<RecordData> for UpdateInput {
    fn from(data: RecordData) -> Self {
        UpdateInput::Patch(data)
    }
}

impl fmt::Debug for UpdateInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateInput::Patch(data) => f.debug_tuple("Patch").field(data).finish(),
            UpdateInput::With(_) => f.write_str("With(<fn>)"),
        }
    }
}

/// An update whose static parts were validated before storage access
#[derive(Clone)]
pub(crate) enum PreparedUpdate {
    Patch(BTreeMap<String, Value>),
    With(UpdateFn),
}

impl PreparedUpdate {
    pub(crate) fn prepare(
        validator: &SchemaValidator<'_>,
        id: &RecordId,
        input: &UpdateInput,
    ) -> StoreResult<Self> {
        Ok(match input {
            UpdateInput::Patch(data) => {
                PreparedUpdate::Patch(validator.validate_patch(id, data.clone())?)
            }
            UpdateInput::With(f) => PreparedUpdate::With(Arc::clone(f)),
        })
    }

    /// Like `prepare`, for a patch shared by many records
    pub(crate) fn prepare_batch(
        validator: &SchemaValidator<'_>,
        input: &UpdateInput,
    ) -> StoreResult<Self> {
        Ok(match input {
            UpdateInput::Patch(data) => {
                PreparedUpdate::Patch(validator.validate_batch_patch(data.clone())?)
            }
            UpdateInput::With(f) => PreparedUpdate::With(Arc::clone(f)),
        })
    }

    /// The validated columns to write over `current`
    pub(crate) fn values_for(
        &self,
        validator: &SchemaValidator<'_>,
        current: &Record,
    ) -> StoreResult<BTreeMap<String, Value>> {
        match self {
            PreparedUpdate::Patch(values) => Ok(values.clone()),
            PreparedUpdate::With(f) => validator.validate_patch(current.id(), f(current)?),
        }
    }
}

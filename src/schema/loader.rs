//! Schema loading from JSON
//!
//! A schema file holds `{"tables": [...]}`. Each column carries its type
//! tag inline, and references are written `"Table.id"`:
//!
//! ```json
//! {"tables": [{"name": "Dog", "id_type": "int", "columns": [
//!     {"name": "owner", "type": "string", "references": "Person.id"}
//! ]}]}
//! ```
//!
//! Malformed or structurally invalid schemas fail to load.

use std::fs;
use std::path::Path;

use crate::error::{StoreError, StoreResult};

use super::types::Schema;

impl Schema {
    /// Parses and validates a schema from a JSON string
    pub fn from_json_str(json: &str) -> StoreResult<Self> {
        let schema: Schema = serde_json::from_str(json)
            .map_err(|e| StoreError::validation(format!("malformed schema: {}", e)))?;
        schema.validate_structure().map_err(StoreError::validation)?;
        Ok(schema)
    }

    /// Loads and validates a schema file
    pub fn load(path: &Path) -> StoreResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            StoreError::validation(format!(
                "failed to read schema file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&content)
    }

    /// Renders the schema as pretty JSON
    pub fn to_json_string(&self) -> StoreResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| StoreError::validation(format!("failed to serialize schema: {}", e)))
    }
}

//! Schema type definitions
//!
//! Supported column types:
//! - string: UTF-8 string
//! - int: 64-bit signed integer
//! - bigint: arbitrary-precision integer
//! - hex: byte string written as 0x…
//! - boolean
//! - float: 64-bit floating point
//! - enum: string restricted to declared variants
//! - list: homogeneous list of a scalar element type
//! - json: arbitrary JSON

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Reserved name of the id column
pub const ID_COLUMN: &str = "id";

/// Column types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Int,
    BigInt,
    Hex,
    Boolean,
    Float,
    Enum {
        values: Vec<String>,
    },
    List {
        element: Box<ColumnType>,
    },
    Json,
}

impl ColumnType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Int => "int",
            ColumnType::BigInt => "bigint",
            ColumnType::Hex => "hex",
            ColumnType::Boolean => "boolean",
            ColumnType::Float => "float",
            ColumnType::Enum { .. } => "enum",
            ColumnType::List { .. } => "list",
            ColumnType::Json => "json",
        }
    }

    /// Types supporting gt/gte/lt/lte
    pub fn is_ordered(&self) -> bool {
        matches!(
            self,
            ColumnType::String
                | ColumnType::Int
                | ColumnType::BigInt
                | ColumnType::Hex
                | ColumnType::Float
        )
    }

    /// Types a result set may be sorted by
    pub fn is_sortable(&self) -> bool {
        !matches!(self, ColumnType::List { .. } | ColumnType::Json)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::List { element } => write!(f, "list({})", element),
            other => write!(f, "{}", other.type_name()),
        }
    }
}

/// The id kind of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdType {
    String,
    Hex,
    Int,
    BigInt,
}

impl IdType {
    /// Returns the equivalent column type
    pub fn column_type(&self) -> ColumnType {
        match self {
            IdType::String => ColumnType::String,
            IdType::Hex => ColumnType::Hex,
            IdType::Int => ColumnType::Int,
            IdType::BigInt => ColumnType::BigInt,
        }
    }
}

/// A foreign-key reference written as `Table.column`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Reference {
    pub table: String,
    pub column: String,
}

impl Reference {
    /// Parses `Table.column`
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.split_once('.') {
            Some((table, column)) if !table.is_empty() && !column.is_empty() => Ok(Self {
                table: table.to_string(),
                column: column.to_string(),
            }),
            _ => Err(format!("reference '{}' must be written as Table.column", s)),
        }
    }
}

impl TryFrom<String> for Reference {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Reference> for String {
    fn from(value: Reference) -> Self {
        format!("{}.{}", value.table, value.column)
    }
}

/// Column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(flatten)]
    pub column_type: ColumnType,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Reference>,
}

impl ColumnDef {
    /// Create a non-nullable column
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: false,
            references: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::String)
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Int)
    }

    pub fn bigint(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::BigInt)
    }

    pub fn hex(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Hex)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Boolean)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Float)
    }

    pub fn json(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Json)
    }

    pub fn enumeration(name: impl Into<String>, values: &[&str]) -> Self {
        Self::new(
            name,
            ColumnType::Enum {
                values: values.iter().map(|v| v.to_string()).collect(),
            },
        )
    }

    pub fn list(name: impl Into<String>, element: ColumnType) -> Self {
        Self::new(
            name,
            ColumnType::List {
                element: Box::new(element),
            },
        )
    }

    /// Marks the column nullable
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Adds a reference to `Table.column`
    ///
    /// Malformed targets are reported by `Schema::validate_structure`.
    pub fn references(mut self, target: &str) -> Self {
        self.references = Some(Reference::parse(target).unwrap_or(Reference {
            table: target.to_string(),
            column: String::new(),
        }));
        self
    }
}

/// A table: name, id kind, and ordered columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub id_type: IdType,
    #[serde(default)]
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, id_type: IdType) -> Self {
        Self {
            name: name.into(),
            id_type,
            columns: Vec::new(),
        }
    }

    /// Appends a column
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Looks up a column definition (not the id)
    pub fn get_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns the type of a field, including `id`
    pub fn field_type(&self, name: &str) -> Option<ColumnType> {
        if name == ID_COLUMN {
            return Some(self.id_type.column_type());
        }
        self.get_column(name).map(|c| c.column_type.clone())
    }

    fn validate_columns(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("table name must not be empty".into());
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if column.name.is_empty() {
                return Err(format!("table '{}' has a column with an empty name", self.name));
            }
            if column.name == ID_COLUMN {
                return Err(format!(
                    "table '{}' must not redeclare the '{}' column",
                    self.name, ID_COLUMN
                ));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(format!(
                    "table '{}' declares column '{}' twice",
                    self.name, column.name
                ));
            }
            validate_column_type(&self.name, &column.name, &column.column_type)?;
        }
        Ok(())
    }
}

fn validate_column_type(table: &str, column: &str, column_type: &ColumnType) -> Result<(), String> {
    match column_type {
        ColumnType::Enum { values } => {
            if values.is_empty() {
                return Err(format!("enum column '{}.{}' has no variants", table, column));
            }
            let unique: HashSet<_> = values.iter().collect();
            if unique.len() != values.len() {
                return Err(format!(
                    "enum column '{}.{}' has duplicate variants",
                    table, column
                ));
            }
            Ok(())
        }
        ColumnType::List { element } => match element.as_ref() {
            ColumnType::List { .. } | ColumnType::Json => Err(format!(
                "list column '{}.{}' must have a scalar element type",
                table, column
            )),
            other => validate_column_type(table, column, other),
        },
        _ => Ok(()),
    }
}

/// Complete schema: the set of tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub tables: Vec<TableSchema>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a table
    pub fn table(mut self, table: TableSchema) -> Self {
        self.tables.push(table);
        self
    }

    /// Looks up a table by name
    pub fn get(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Validates the schema structure itself (not any data)
    pub fn validate_structure(&self) -> Result<(), String> {
        let mut names = HashSet::new();
        for table in &self.tables {
            if !names.insert(table.name.as_str()) {
                return Err(format!("table '{}' is declared twice", table.name));
            }
            table.validate_columns()?;
        }

        for table in &self.tables {
            for column in &table.columns {
                let Some(reference) = &column.references else {
                    continue;
                };
                let target = self.get(&reference.table).ok_or_else(|| {
                    format!(
                        "column '{}.{}' references unknown table '{}'",
                        table.name, column.name, reference.table
                    )
                })?;
                if reference.column != ID_COLUMN {
                    return Err(format!(
                        "column '{}.{}' must reference '{}.{}', not '{}'",
                        table.name, column.name, target.name, ID_COLUMN, reference.column
                    ));
                }
                if column.column_type != target.id_type.column_type() {
                    return Err(format!(
                        "column '{}.{}' is {} but '{}.{}' is {}",
                        table.name,
                        column.name,
                        column.column_type,
                        target.name,
                        ID_COLUMN,
                        target.id_type.column_type()
                    ));
                }
            }
        }
        Ok(())
    }
}

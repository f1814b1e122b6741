//! Allowed-schema configuration.
//!
//! Declares which tables and columns generated SQL may reference and which
//! column pairs may be used as join keys.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The allowed schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Table name -> allowed columns.
    #[serde(default)]
    pub tables: BTreeMap<String, TableDefinition>,

    /// Allowed join keys.
    #[serde(default)]
    pub joins: Vec<JoinDefinition>,

    /// Free-form notes passed to the SQL generator (e.g. date formats).
    #[serde(default)]
    pub notes: Vec<String>,
}

/// A table definition: either a bare column list or a full definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TableDefinition {
    /// `files: [id, name, created_at]`
    Columns(Vec<String>),
    /// `files: { columns: [...], description: ... }`
    Full(TableDefinitionFull),
}

/// Full table definition with optional description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDefinitionFull {
    /// Allowed columns, in display order.
    pub columns: Vec<String>,

    /// Human-readable description of the table.
    #[serde(default)]
    pub description: Option<String>,
}

impl TableDefinition {
    /// Allowed columns, in declaration order.
    pub fn columns(&self) -> &[String] {
        match self {
            TableDefinition::Columns(cols) => cols,
            TableDefinition::Full(full) => &full.columns,
        }
    }

    /// Optional description.
    pub fn description(&self) -> Option<&str> {
        match self {
            TableDefinition::Columns(_) => None,
            TableDefinition::Full(full) => full.description.as_deref(),
        }
    }
}

impl From<Vec<String>> for TableDefinition {
    fn from(columns: Vec<String>) -> Self {
        TableDefinition::Columns(columns)
    }
}

/// An allowed join key pair, written as `table.column` on each side.
///
/// The pair is unordered: `files.id = share_logs.file_id` also allows
/// `share_logs.file_id = files.id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinDefinition {
    pub left: String,
    pub right: String,
}

impl JoinDefinition {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

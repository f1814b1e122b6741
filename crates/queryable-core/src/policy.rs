//! The immutable schema policy enforced by the guardrail.
//!
//! A [`SchemaPolicy`] is built once at startup from configuration and then
//! shared read-only (typically behind an `Arc`) by every compilation. The same
//! object renders the human-readable description handed to the SQL generator,
//! so the generator and the validator never disagree about what is allowed.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::config::{ConfigError, GuardrailsConfig, JoinDefinition, SchemaConfig, TableDefinition};

/// A `table.column` pair, stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnKey {
    pub table: String,
    pub column: String,
}

impl ColumnKey {
    pub fn new(table: impl AsRef<str>, column: impl AsRef<str>) -> Self {
        Self {
            table: table.as_ref().to_ascii_lowercase(),
            column: column.as_ref().to_ascii_lowercase(),
        }
    }

    /// Parse `table.column`.
    pub fn parse(s: &str) -> Option<Self> {
        let (table, column) = s.trim().split_once('.')?;
        if !is_plain_identifier(table) || !is_plain_identifier(column) {
            return None;
        }
        Some(Self::new(table, column))
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// An allowed join key pair. Matching ignores side order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinKey {
    pub left: ColumnKey,
    pub right: ColumnKey,
}

impl JoinKey {
    /// Whether `a = b` (in either order) is this join key.
    pub fn matches(&self, a: &ColumnKey, b: &ColumnKey) -> bool {
        (&self.left == a && &self.right == b) || (&self.left == b && &self.right == a)
    }
}

/// Allowed columns of one table.
#[derive(Debug, Clone)]
pub struct TablePolicy {
    name: String,
    columns: Vec<String>,
    description: Option<String>,
}

impl TablePolicy {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Allowed columns, in declaration order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Case-insensitive column membership.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c.eq_ignore_ascii_case(column))
    }
}

/// Allowed tables, columns, join keys, functions and row limits.
#[derive(Debug, Clone)]
pub struct SchemaPolicy {
    tables: BTreeMap<String, TablePolicy>,
    joins: Vec<JoinKey>,
    notes: Vec<String>,
    functions: BTreeSet<String>,
    default_limit: u64,
    max_limit: u64,
    allow_wildcard: bool,
    allow_subqueries: bool,
}

impl SchemaPolicy {
    /// Build and validate a policy from configuration.
    pub fn from_config(
        schema: &SchemaConfig,
        guardrails: &GuardrailsConfig,
    ) -> Result<Self, ConfigError> {
        if schema.tables.is_empty() {
            return Err(ConfigError::Config(
                "schema must declare at least one table".to_string(),
            ));
        }

        let mut tables = BTreeMap::new();
        for (name, definition) in &schema.tables {
            let table = build_table(name, definition)?;
            let key = name.to_ascii_lowercase();
            if tables.insert(key, table).is_some() {
                return Err(ConfigError::Config(format!(
                    "table '{}' is declared more than once",
                    name
                )));
            }
        }

        let mut joins = Vec::with_capacity(schema.joins.len());
        for join in &schema.joins {
            joins.push(build_join(join, &tables)?);
        }

        if guardrails.max_limit == 0 {
            return Err(ConfigError::Config(
                "guardrails.max_limit must be greater than zero".to_string(),
            ));
        }
        if guardrails.default_limit > guardrails.max_limit {
            return Err(ConfigError::Config(format!(
                "guardrails.default_limit ({}) exceeds guardrails.max_limit ({})",
                guardrails.default_limit, guardrails.max_limit
            )));
        }

        let mut functions = BTreeSet::new();
        for function in &guardrails.functions {
            if !is_plain_identifier(function) {
                return Err(ConfigError::Config(format!(
                    "invalid function name '{}' in guardrails.functions",
                    function
                )));
            }
            functions.insert(function.to_ascii_lowercase());
        }

        Ok(Self {
            tables,
            joins,
            notes: schema.notes.clone(),
            functions,
            default_limit: guardrails.default_limit,
            max_limit: guardrails.max_limit,
            allow_wildcard: guardrails.allow_wildcard,
            allow_subqueries: guardrails.allow_subqueries,
        })
    }

    /// Start building a policy programmatically.
    pub fn builder() -> SchemaPolicyBuilder {
        SchemaPolicyBuilder::default()
    }

    /// Look up a table (case-insensitive).
    pub fn table(&self, name: &str) -> Option<&TablePolicy> {
        self.tables.get(&name.to_ascii_lowercase())
    }

    /// All tables, ordered by name.
    pub fn tables(&self) -> impl Iterator<Item = &TablePolicy> {
        self.tables.values()
    }

    pub fn allows_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    pub fn allows_column(&self, table: &str, column: &str) -> bool {
        self.table(table).is_some_and(|t| t.has_column(column))
    }

    /// Whether `a = b` is a whitelisted join equality (unordered).
    pub fn allows_join(&self, a: &ColumnKey, b: &ColumnKey) -> bool {
        self.joins.iter().any(|j| j.matches(a, b))
    }

    pub fn allows_function(&self, name: &str) -> bool {
        self.functions.contains(&name.to_ascii_lowercase())
    }

    pub fn joins(&self) -> &[JoinKey] {
        &self.joins
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// LIMIT injected when a query has none.
    pub fn default_limit(&self) -> u64 {
        self.default_limit
    }

    /// Upper bound for any LIMIT.
    pub fn max_limit(&self) -> u64 {
        self.max_limit
    }

    pub fn allow_wildcard(&self) -> bool {
        self.allow_wildcard
    }

    pub fn allow_subqueries(&self) -> bool {
        self.allow_subqueries
    }

    /// Human-readable listing of tables, relationships and notes.
    ///
    /// This is the schema section of the SQL generator's instructions.
    pub fn describe(&self) -> String {
        let mut lines = Vec::new();
        lines.push("tables:".to_string());
        for table in self.tables.values() {
            let mut line = format!("- {}({})", table.name, table.columns.join(", "));
            if let Some(description) = &table.description {
                line.push_str(&format!(" -- {}", description));
            }
            lines.push(line);
        }

        if !self.joins.is_empty() {
            lines.push(String::new());
            lines.push("relationships:".to_string());
            for join in &self.joins {
                lines.push(format!("- {} = {}", join.left, join.right));
            }
        }

        lines.push(String::new());
        lines.push("notes:".to_string());
        for note in &self.notes {
            lines.push(format!("- {}", note));
        }
        lines.push(format!(
            "- default to LIMIT {} if not specified; never exceed LIMIT {}",
            self.default_limit, self.max_limit
        ));

        lines.join("\n")
    }
}

fn build_table(name: &str, definition: &TableDefinition) -> Result<TablePolicy, ConfigError> {
    if !is_plain_identifier(name) {
        return Err(ConfigError::Config(format!("invalid table name '{}'", name)));
    }
    if definition.columns().is_empty() {
        return Err(ConfigError::Config(format!(
            "table '{}' must declare at least one column",
            name
        )));
    }

    let mut columns: Vec<String> = Vec::with_capacity(definition.columns().len());
    for column in definition.columns() {
        if !is_plain_identifier(column) {
            return Err(ConfigError::Config(format!(
                "invalid column name '{}' in table '{}'",
                column, name
            )));
        }
        let column = column.to_ascii_lowercase();
        if columns.contains(&column) {
            return Err(ConfigError::Config(format!(
                "column '{}' is declared more than once in table '{}'",
                column, name
            )));
        }
        columns.push(column);
    }

    Ok(TablePolicy {
        name: name.to_ascii_lowercase(),
        columns,
        description: definition.description().map(String::from),
    })
}

fn build_join(
    join: &JoinDefinition,
    tables: &BTreeMap<String, TablePolicy>,
) -> Result<JoinKey, ConfigError> {
    let side = |raw: &str| -> Result<ColumnKey, ConfigError> {
        let key = ColumnKey::parse(raw).ok_or_else(|| {
            ConfigError::Config(format!("join key '{}' must be written as table.column", raw))
        })?;
        let table = tables.get(&key.table).ok_or_else(|| {
            ConfigError::Config(format!("join key '{}' references an undeclared table", raw))
        })?;
        if !table.has_column(&key.column) {
            return Err(ConfigError::Config(format!(
                "join key '{}' references an undeclared column",
                raw
            )));
        }
        Ok(key)
    };

    Ok(JoinKey {
        left: side(&join.left)?,
        right: side(&join.right)?,
    })
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_plain_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Programmatic construction of a [`SchemaPolicy`].
///
/// Goes through the same validation as configuration files.
#[derive(Debug, Clone, Default)]
pub struct SchemaPolicyBuilder {
    schema: SchemaConfig,
    guardrails: GuardrailsConfig,
}

impl SchemaPolicyBuilder {
    pub fn table<I, S>(mut self, name: &str, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        self.schema
            .tables
            .insert(name.to_string(), TableDefinition::Columns(columns));
        self
    }

    /// Allow `left = right`, each written as `table.column`.
    pub fn join(mut self, left: &str, right: &str) -> Self {
        self.schema.joins.push(JoinDefinition::new(left, right));
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.schema.notes.push(note.into());
        self
    }

    pub fn default_limit(mut self, limit: u64) -> Self {
        self.guardrails.default_limit = limit;
        self
    }

    pub fn max_limit(mut self, limit: u64) -> Self {
        self.guardrails.max_limit = limit;
        self
    }

    pub fn allow_wildcard(mut self, allow: bool) -> Self {
        self.guardrails.allow_wildcard = allow;
        self
    }

    pub fn allow_subqueries(mut self, allow: bool) -> Self {
        self.guardrails.allow_subqueries = allow;
        self
    }

    /// Replace the function allow-list.
    pub fn functions<I, S>(mut self, functions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.guardrails.functions = functions.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Result<SchemaPolicy, ConfigError> {
        SchemaPolicy::from_config(&self.schema, &self.guardrails)
    }
}

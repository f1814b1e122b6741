//! Table bindings and column resolution.

use queryable_core::{ColumnKey, SchemaPolicy};

use crate::error::GuardError;
use crate::tree::{ColumnRef, FromClause};

/// A table in FROM/JOIN, with its optional alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReference {
    pub name: String,
    pub alias: Option<String>,
}

impl TableReference {
    /// The name other clauses use for this table: the alias if present.
    pub fn visible_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// The tables visible to one query, chained to the enclosing query's scope
/// for correlated subqueries.
#[derive(Debug)]
pub struct Scope<'a> {
    tables: Vec<TableReference>,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    /// Bind the tables of a FROM clause.
    ///
    /// Two tables with the same visible name make every qualified reference
    /// ambiguous, so they are rejected up front.
    pub fn new(from: Option<&FromClause>, parent: Option<&'a Scope<'a>>) -> Result<Self, GuardError> {
        let mut tables: Vec<TableReference> = Vec::new();
        if let Some(from) = from {
            for table in from.tables() {
                let reference = TableReference {
                    name: table.name.clone(),
                    alias: table.alias.clone(),
                };
                if tables
                    .iter()
                    .any(|t| t.visible_name() == reference.visible_name())
                {
                    return Err(GuardError::AmbiguousReference {
                        name: reference.visible_name().to_string(),
                    });
                }
                tables.push(reference);
            }
        }
        Ok(Self { tables, parent })
    }

    /// Tables bound by this query, in FROM order.
    pub fn tables(&self) -> &[TableReference] {
        &self.tables
    }

    /// Find a binding by visible name, innermost scope first.
    pub fn lookup(&self, qualifier: &str) -> Option<&TableReference> {
        self.tables
            .iter()
            .find(|t| t.visible_name() == qualifier)
            .or_else(|| self.parent.and_then(|p| p.lookup(qualifier)))
    }

    /// Resolve a column reference to its declared `table.column`.
    ///
    /// Qualified names resolve through their binding. Unqualified names
    /// resolve to the only in-scope table declaring the column, looking
    /// outward when the current query has none.
    pub fn resolve(&self, column: &ColumnRef, policy: &SchemaPolicy) -> Result<ColumnKey, GuardError> {
        match &column.qualifier {
            Some(qualifier) => {
                let table = self
                    .lookup(qualifier)
                    .ok_or_else(|| GuardError::DisallowedTable {
                        name: qualifier.clone(),
                    })?;
                if policy.allows_column(&table.name, &column.name) {
                    Ok(ColumnKey::new(&table.name, &column.name))
                } else {
                    Err(GuardError::disallowed_column(&table.name, &column.name))
                }
            }
            None => {
                let candidates: Vec<&TableReference> = self
                    .tables
                    .iter()
                    .filter(|t| policy.allows_column(&t.name, &column.name))
                    .collect();
                match candidates.as_slice() {
                    [table] => Ok(ColumnKey::new(&table.name, &column.name)),
                    [] => {
                        let local = GuardError::disallowed_column(self.owner_hint(), &column.name);
                        match self.parent {
                            Some(parent) => match parent.resolve(column, policy) {
                                Ok(key) => Ok(key),
                                Err(err @ GuardError::AmbiguousReference { .. }) => Err(err),
                                Err(_) => Err(local),
                            },
                            None => Err(local),
                        }
                    }
                    _ => Err(GuardError::AmbiguousReference {
                        name: column.name.clone(),
                    }),
                }
            }
        }
    }

    /// Table named in errors for an unqualified column nobody declares.
    fn owner_hint(&self) -> &str {
        match self.tables.as_slice() {
            [only] => &only.name,
            _ => "unknown",
        }
    }
}

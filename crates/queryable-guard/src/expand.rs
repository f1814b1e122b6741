//! Wildcard expansion.
//!
//! `*` and `t.*` are replaced with the allowed columns of the bound tables,
//! so a wildcard can never read a column the policy does not list, even if
//! the live table has more.

use queryable_core::SchemaPolicy;

use crate::error::GuardError;
use crate::tree::{ColumnRef, Expr, ExpressionTree, Query, SelectItem, Table};

/// Rewrite every wildcard in the statement, subqueries included.
pub fn expand_wildcards(tree: &mut ExpressionTree, policy: &SchemaPolicy) -> Result<(), GuardError> {
    let mut result = Ok(());
    tree.query.walk_queries_mut(&mut |query| {
        if result.is_ok() {
            result = expand_query(query, policy);
        }
    });
    result
}

fn expand_query(query: &mut Query, policy: &SchemaPolicy) -> Result<(), GuardError> {
    let needs_expansion = query
        .select
        .projection
        .iter()
        .any(|item| !matches!(item, SelectItem::Expr { .. }));
    if !needs_expansion {
        return Ok(());
    }

    let tables: Vec<Table> = query
        .select
        .from
        .as_ref()
        .map(|from| from.tables().cloned().collect())
        .unwrap_or_default();
    let qualify = tables.len() > 1;

    let mut projection = Vec::with_capacity(query.select.projection.len());
    for item in query.select.projection.drain(..) {
        match item {
            SelectItem::Wildcard => {
                if tables.is_empty() {
                    return Err(GuardError::unsupported("WILDCARD WITHOUT FROM"));
                }
                for table in &tables {
                    projection.extend(table_columns(table, qualify, policy)?);
                }
            }
            SelectItem::QualifiedWildcard(qualifier) => {
                let table = tables
                    .iter()
                    .find(|t| t.binding() == qualifier)
                    .ok_or(GuardError::DisallowedTable { name: qualifier })?;
                projection.extend(table_columns(table, true, policy)?);
            }
            item @ SelectItem::Expr { .. } => projection.push(item),
        }
    }
    query.select.projection = projection;
    Ok(())
}

fn table_columns(
    table: &Table,
    qualify: bool,
    policy: &SchemaPolicy,
) -> Result<Vec<SelectItem>, GuardError> {
    let declared = policy
        .table(&table.name)
        .ok_or_else(|| GuardError::DisallowedTable {
            name: table.name.clone(),
        })?;
    Ok(declared
        .columns()
        .iter()
        .map(|column| SelectItem::Expr {
            expr: Expr::Column(ColumnRef {
                qualifier: qualify.then(|| table.binding().to_string()),
                name: column.clone(),
            }),
            alias: None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SqlParser;
    use crate::render::render;
    use pretty_assertions::assert_eq;

    fn policy() -> SchemaPolicy {
        SchemaPolicy::builder()
            .table("files", ["id", "name", "created_at"])
            .table("share_logs", ["id", "file_id", "viewer_email", "opened_at"])
            .join("files.id", "share_logs.file_id")
            .allow_subqueries(true)
            .build()
            .unwrap()
    }

    fn expand(sql: &str) -> String {
        let mut tree = SqlParser::new().parse(sql).unwrap();
        expand_wildcards(&mut tree, &policy()).unwrap();
        render(&tree)
    }

    #[test]
    fn test_single_table_star() {
        assert_eq!(
            expand("SELECT * FROM files"),
            "SELECT id, name, created_at FROM files"
        );
    }

    #[test]
    fn test_joined_star_is_qualified() {
        assert_eq!(
            expand("SELECT * FROM files f JOIN share_logs s ON f.id = s.file_id"),
            "SELECT f.id, f.name, f.created_at, s.id, s.file_id, s.viewer_email, s.opened_at \
             FROM files AS f JOIN share_logs AS s ON f.id = s.file_id"
        );
    }

    #[test]
    fn test_qualified_star_keeps_other_items() {
        assert_eq!(
            expand("SELECT s.*, f.name FROM files f JOIN share_logs s ON f.id = s.file_id"),
            "SELECT s.id, s.file_id, s.viewer_email, s.opened_at, f.name \
             FROM files AS f JOIN share_logs AS s ON f.id = s.file_id"
        );
    }

    #[test]
    fn test_subquery_star() {
        assert_eq!(
            expand("SELECT name FROM files WHERE EXISTS (SELECT * FROM share_logs)"),
            "SELECT name FROM files WHERE EXISTS (SELECT id, file_id, viewer_email, opened_at FROM share_logs)"
        );
    }
}

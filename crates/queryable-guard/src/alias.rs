//! Output alias inlining.
//!
//! SQLite looks a name up in GROUP BY, HAVING and compound ORDER BY terms
//! against the columns of the FROM tables before the projection aliases, so a
//! live column missing from the policy would shadow the alias. Alias
//! references in those positions are replaced with the aliased expression and
//! the rendered statement never names the alias there. A bare ORDER BY term
//! is matched against aliases first and is left as written.

use queryable_core::SchemaPolicy;

use crate::tree::{Expr, ExpressionTree, Query, SelectItem};

/// Inline alias references in every query of the statement.
pub fn inline_output_aliases(tree: &mut ExpressionTree, policy: &SchemaPolicy) {
    tree.query
        .walk_queries_mut(&mut |query| inline_query(query, policy));
}

fn inline_query(query: &mut Query, policy: &SchemaPolicy) {
    let aliases: Vec<(String, Expr)> = query
        .select
        .projection
        .iter()
        .filter_map(|item| match item {
            SelectItem::Expr {
                expr,
                alias: Some(alias),
            } => Some((alias.clone(), expr.clone())),
            _ => None,
        })
        .collect();
    if aliases.is_empty() {
        return;
    }

    let tables: Vec<String> = query
        .select
        .from
        .as_ref()
        .map(|from| from.tables().map(|t| t.name.clone()).collect())
        .unwrap_or_default();

    let mut substitute = |expr: &mut Expr| -> bool {
        let replacement = match expr {
            Expr::Column(column) if column.qualifier.is_none() => {
                let is_table_column = tables
                    .iter()
                    .any(|table| policy.allows_column(table, &column.name));
                if is_table_column {
                    None
                } else {
                    aliases
                        .iter()
                        .find(|(alias, _)| *alias == column.name)
                        .map(|(_, aliased)| aliased.clone())
                }
            }
            Expr::Column(_) => None,
            _ => return true,
        };
        if let Some(aliased) = replacement {
            *expr = Expr::Nested(Box::new(aliased));
        }
        false
    };

    for expr in &mut query.select.group_by {
        expr.rewrite(&mut substitute);
    }
    if let Some(having) = &mut query.select.having {
        having.rewrite(&mut substitute);
    }
    for item in &mut query.order_by {
        if !is_bare_name(&item.expr) {
            item.expr.rewrite(&mut substitute);
        }
    }
}

/// An unqualified name, possibly parenthesized, standing alone as a term.
pub(crate) fn is_bare_name(expr: &Expr) -> bool {
    matches!(expr.strip_parens(), Expr::Column(column) if column.qualifier.is_none())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SqlParser;
    use crate::render::render;
    use pretty_assertions::assert_eq;

    fn inline(sql: &str) -> String {
        let policy = SchemaPolicy::builder()
            .table("files", ["id", "name", "created_at"])
            .build()
            .unwrap();
        let mut tree = SqlParser::new().parse(sql).unwrap();
        inline_output_aliases(&mut tree, &policy);
        render(&tree)
    }

    #[test]
    fn test_having_alias_is_inlined() {
        assert_eq!(
            inline("SELECT name AS secret_token FROM files GROUP BY id HAVING secret_token LIKE 'a%'"),
            "SELECT name AS secret_token FROM files GROUP BY id HAVING (name) LIKE 'a%'"
        );
    }

    #[test]
    fn test_group_by_alias_is_inlined() {
        assert_eq!(
            inline("SELECT date(created_at) AS opened_day, count(*) FROM files GROUP BY opened_day"),
            "SELECT DATE(created_at) AS opened_day, COUNT(*) FROM files GROUP BY (DATE(created_at))"
        );
    }

    #[test]
    fn test_bare_order_by_alias_is_kept() {
        assert_eq!(
            inline("SELECT count(*) AS opens FROM files ORDER BY opens DESC"),
            "SELECT COUNT(*) AS opens FROM files ORDER BY opens DESC"
        );
    }

    #[test]
    fn test_compound_order_by_alias_is_inlined() {
        assert_eq!(
            inline("SELECT name AS secret FROM files ORDER BY secret || ''"),
            "SELECT name AS secret FROM files ORDER BY (name) || ''"
        );
    }

    #[test]
    fn test_declared_column_wins_over_alias() {
        assert_eq!(
            inline("SELECT created_at AS name FROM files GROUP BY name"),
            "SELECT created_at AS name FROM files GROUP BY name"
        );
    }

    #[test]
    fn test_substituted_expression_is_not_rescanned() {
        assert_eq!(
            inline("SELECT a AS b, b AS a FROM files GROUP BY a"),
            "SELECT a AS b, b AS a FROM files GROUP BY (b)"
        );
    }
}

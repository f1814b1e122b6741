//! Read-only policy checks over a parsed statement.
//!
//! Checks run in a fixed order over the whole statement (root query and every
//! subquery) and the first violation wins:
//!
//! 1. statement kind (ordinals, subqueries)
//! 2. tables
//! 3. columns
//! 4. joins
//! 5. functions

use queryable_core::{ColumnKey, SchemaPolicy};

use crate::error::GuardError;
use crate::scope::Scope;
use crate::tree::{
    BinaryOperator, ColumnRef, Expr, ExpressionTree, FromClause, JoinKind, Literal, Query,
    SelectItem, UnaryOperator,
};

/// Validates statements against a [`SchemaPolicy`].
#[derive(Debug, Clone, Copy)]
pub struct StatementValidator<'p> {
    policy: &'p SchemaPolicy,
}

impl<'p> StatementValidator<'p> {
    pub fn new(policy: &'p SchemaPolicy) -> Self {
        Self { policy }
    }

    /// Run every check. Never mutates the tree.
    pub fn validate(&self, tree: &ExpressionTree) -> Result<(), GuardError> {
        self.check_kind(&tree.query)?;
        self.check_tables(&tree.query)?;
        self.check_columns(&tree.query, None)?;
        self.check_joins(&tree.query)?;
        self.check_functions(&tree.query)?;
        Ok(())
    }

    fn check_kind(&self, root: &Query) -> Result<(), GuardError> {
        let mut result = Ok(());
        let mut is_root = true;
        root.walk_queries(&mut |query| {
            let nested = !std::mem::replace(&mut is_root, false);
            if result.is_err() {
                return;
            }
            let offset_only = query
                .limit
                .as_ref()
                .is_some_and(|l| l.count.is_none() && l.offset.is_some());
            if nested && offset_only {
                // The root query always gets a LIMIT; a subquery needs its own.
                result = Err(GuardError::invalid_limit("OFFSET requires LIMIT"));
            } else if query.order_by.iter().any(|item| is_ordinal(&item.expr)) {
                result = Err(GuardError::unsupported("ORDER BY ordinal"));
            } else if query.select.group_by.iter().any(is_ordinal) {
                result = Err(GuardError::unsupported("GROUP BY ordinal"));
            } else if !self.policy.allow_subqueries() {
                query.walk(&mut |expr| {
                    if result.is_ok() && expr.subquery().is_some() {
                        result = Err(GuardError::unsupported("SUBQUERY"));
                    }
                });
            }
        });
        result
    }

    fn check_tables(&self, root: &Query) -> Result<(), GuardError> {
        for name in referenced_tables(root) {
            if !self.policy.allows_table(&name) {
                return Err(GuardError::DisallowedTable { name });
            }
        }
        Ok(())
    }

    fn check_columns(&self, query: &Query, parent: Option<&Scope<'_>>) -> Result<(), GuardError> {
        let scope = Scope::new(query.select.from.as_ref(), parent)?;
        let aliases: Vec<&str> = query
            .select
            .projection
            .iter()
            .filter_map(|item| match item {
                SelectItem::Expr {
                    alias: Some(alias), ..
                } => Some(alias.as_str()),
                _ => None,
            })
            .collect();

        for item in &query.select.projection {
            match item {
                SelectItem::Wildcard => self.check_wildcard(&scope)?,
                SelectItem::QualifiedWildcard(qualifier) => {
                    self.check_qualified_wildcard(&scope, qualifier)?
                }
                SelectItem::Expr { expr, .. } => self.check_expr_columns(expr, &scope)?,
            }
        }
        if let Some(from) = &query.select.from {
            for on in from.joins.iter().filter_map(|j| j.on.as_ref()) {
                self.check_expr_columns(on, &scope)?;
            }
        }
        if let Some(selection) = &query.select.selection {
            self.check_expr_columns(selection, &scope)?;
        }
        for expr in &query.select.group_by {
            self.check_expr_columns(expr, &scope)?;
        }
        if let Some(having) = &query.select.having {
            self.check_expr_columns(having, &scope)?;
        }
        // Only a bare ORDER BY name is matched against the projection aliases
        // before the table columns; every other term resolves normally.
        for item in &query.order_by {
            if is_output_alias(&item.expr, &aliases) {
                continue;
            }
            self.check_expr_columns(&item.expr, &scope)?;
        }
        if let Some(offset) = query.limit.as_ref().and_then(|l| l.offset.as_ref()) {
            self.check_expr_columns(offset, &scope)?;
        }
        Ok(())
    }

    /// Check every column in `expr`. Subqueries get a child scope.
    fn check_expr_columns(&self, expr: &Expr, scope: &Scope<'_>) -> Result<(), GuardError> {
        let mut result = Ok(());
        expr.walk(&mut |node| {
            if result.is_err() {
                return;
            }
            if let Expr::Column(column) = node {
                result = scope.resolve(column, self.policy).map(|_| ());
            } else if let Some(subquery) = node.subquery() {
                result = self.check_columns(subquery, Some(scope));
            }
        });
        result
    }

    fn check_wildcard(&self, scope: &Scope<'_>) -> Result<(), GuardError> {
        let first = scope
            .tables()
            .first()
            .ok_or_else(|| GuardError::unsupported("WILDCARD WITHOUT FROM"))?;
        if !self.policy.allow_wildcard() {
            return Err(GuardError::disallowed_column(&first.name, "*"));
        }
        Ok(())
    }

    fn check_qualified_wildcard(&self, scope: &Scope<'_>, qualifier: &str) -> Result<(), GuardError> {
        let table = scope
            .tables()
            .iter()
            .find(|t| t.visible_name() == qualifier)
            .ok_or_else(|| GuardError::DisallowedTable {
                name: qualifier.to_string(),
            })?;
        if !self.policy.allow_wildcard() {
            return Err(GuardError::disallowed_column(&table.name, "*"));
        }
        Ok(())
    }

    fn check_joins(&self, root: &Query) -> Result<(), GuardError> {
        let mut result = Ok(());
        root.walk_queries(&mut |query| {
            if result.is_ok() {
                if let Some(from) = &query.select.from {
                    result = self.check_from_joins(from);
                }
            }
        });
        result
    }

    /// Each JOIN must be `earlier.col = joined.col` on a whitelisted pair.
    fn check_from_joins(&self, from: &FromClause) -> Result<(), GuardError> {
        let bound: Vec<_> = from.tables().collect();

        for (index, join) in from.joins.iter().enumerate() {
            let joined = index + 1;
            let previous = bound[index];
            let rejected = || GuardError::DisallowedJoin {
                left: previous.name.clone(),
                right: join.table.name.clone(),
            };

            let on = match (join.kind, &join.on) {
                (JoinKind::Cross, _) | (_, None) => return Err(rejected()),
                (JoinKind::Inner | JoinKind::Left, Some(on)) => on,
            };

            let (a, b) = match equality_operands(on) {
                Some(pair) => pair,
                None => return Err(rejected()),
            };

            let resolve = |column: &ColumnRef| -> Option<(usize, ColumnKey)> {
                let candidates: Vec<usize> = (0..=joined)
                    .filter(|&i| match &column.qualifier {
                        Some(q) => bound[i].binding() == q.as_str(),
                        None => self.policy.allows_column(&bound[i].name, &column.name),
                    })
                    .collect();
                match candidates.as_slice() {
                    [i] => Some((*i, ColumnKey::new(&bound[*i].name, &column.name))),
                    _ => None,
                }
            };

            let (Some((side_a, key_a)), Some((side_b, key_b))) = (resolve(a), resolve(b)) else {
                return Err(rejected());
            };

            let links_new_table = (side_a == joined && side_b < joined)
                || (side_b == joined && side_a < joined);
            if !links_new_table || !self.policy.allows_join(&key_a, &key_b) {
                return Err(GuardError::DisallowedJoin {
                    left: key_a.to_string(),
                    right: key_b.to_string(),
                });
            }
        }
        Ok(())
    }

    fn check_functions(&self, root: &Query) -> Result<(), GuardError> {
        let mut result = Ok(());
        root.walk_queries(&mut |query| {
            query.walk(&mut |expr| {
                if result.is_ok() {
                    if let Expr::Function(function) = expr {
                        if !self.policy.allows_function(&function.name) {
                            result = Err(GuardError::DisallowedFunction {
                                name: function.name.clone(),
                            });
                        }
                    }
                }
            });
        });
        result
    }
}

/// Every table referenced anywhere in the statement, deduplicated, first-seen order.
pub fn referenced_tables(root: &Query) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    root.walk_queries(&mut |query| {
        if let Some(from) = &query.select.from {
            for table in from.tables() {
                if !names.contains(&table.name) {
                    names.push(table.name.clone());
                }
            }
        }
    });
    names
}

/// `ORDER BY 2` / `GROUP BY 2` refer to a projection position. SQLite drops
/// parentheses and a leading sign, so `(2)` and `+2` are ordinals too.
fn is_ordinal(mut expr: &Expr) -> bool {
    loop {
        match expr {
            Expr::Nested(inner)
            | Expr::UnaryOp {
                op: UnaryOperator::Plus | UnaryOperator::Minus,
                expr: inner,
            } => expr = inner,
            Expr::Literal(Literal::Number(_)) => return true,
            _ => return false,
        }
    }
}

fn is_output_alias(expr: &Expr, aliases: &[&str]) -> bool {
    match expr.strip_parens() {
        Expr::Column(column) => {
            column.qualifier.is_none() && aliases.contains(&column.name.as_str())
        }
        _ => false,
    }
}

/// The two columns of `a = b`, ignoring parentheses.
fn equality_operands(expr: &Expr) -> Option<(&ColumnRef, &ColumnRef)> {
    match expr.strip_parens() {
        Expr::BinaryOp {
            left,
            op: BinaryOperator::Eq,
            right,
        } => match (left.strip_parens(), right.strip_parens()) {
            (Expr::Column(a), Expr::Column(b)) => Some((a, b)),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::inline_output_aliases;
    use crate::parser::SqlParser;

    fn policy() -> SchemaPolicy {
        SchemaPolicy::builder()
            .table("files", ["id", "name", "created_at"])
            .table("share_logs", ["id", "file_id", "viewer_email", "opened_at"])
            .join("files.id", "share_logs.file_id")
            .allow_subqueries(true)
            .build()
            .unwrap()
    }

    fn validate_with(policy: &SchemaPolicy, sql: &str) -> Result<(), GuardError> {
        let mut tree = SqlParser::new().parse(sql)?;
        inline_output_aliases(&mut tree, policy);
        StatementValidator::new(policy).validate(&tree)
    }

    fn validate(sql: &str) -> Result<(), GuardError> {
        validate_with(&policy(), sql)
    }

    #[test]
    fn test_accepts_policy_conforming_queries() {
        for sql in [
            "SELECT name FROM files WHERE created_at > '2024-01-01'",
            "SELECT f.name, s.viewer_email FROM files f JOIN share_logs s ON f.id = s.file_id",
            "SELECT f.name FROM files f LEFT JOIN share_logs s ON (s.file_id = f.id)",
            "SELECT name, count(*) AS n FROM files GROUP BY name HAVING n > 1 ORDER BY n DESC",
            "SELECT * FROM files",
            "SELECT s.* FROM files f JOIN share_logs s ON f.id = s.file_id",
            "SELECT name FROM files WHERE id IN (SELECT file_id FROM share_logs)",
            "SELECT name FROM files WHERE EXISTS (SELECT 1 FROM share_logs s WHERE s.file_id = files.id)",
            "SELECT date(opened_at) AS opened_day, count(*) FROM share_logs GROUP BY opened_day",
        ] {
            assert_eq!(validate(sql), Ok(()), "{sql}");
        }
    }

    #[test]
    fn test_disallowed_table() {
        assert_eq!(
            validate("SELECT id FROM users"),
            Err(GuardError::DisallowedTable {
                name: "users".into()
            })
        );
        assert_eq!(
            validate("SELECT id FROM files WHERE id IN (SELECT id FROM secrets)"),
            Err(GuardError::DisallowedTable {
                name: "secrets".into()
            })
        );
    }

    #[test]
    fn test_disallowed_column() {
        assert_eq!(
            validate("SELECT files.secret_token FROM files"),
            Err(GuardError::disallowed_column("files", "secret_token"))
        );
        assert_eq!(
            validate("SELECT name FROM files WHERE password = 'x'"),
            Err(GuardError::disallowed_column("files", "password"))
        );
        assert_eq!(
            validate("SELECT name FROM files ORDER BY secret"),
            Err(GuardError::disallowed_column("files", "secret"))
        );
    }

    #[test]
    fn test_alias_outside_bare_order_by_resolves_as_column() {
        let policy = policy();
        let validator = StatementValidator::new(&policy);
        for sql in [
            "SELECT name AS secret_token FROM files GROUP BY id HAVING secret_token LIKE 'a%'",
            "SELECT name AS secret_token FROM files GROUP BY secret_token",
            "SELECT name AS secret_token FROM files ORDER BY secret_token || ''",
        ] {
            let tree = SqlParser::new().parse(sql).unwrap();
            assert_eq!(
                validator.validate(&tree),
                Err(GuardError::disallowed_column("files", "secret_token")),
                "{sql}"
            );
        }
        let tree = SqlParser::new()
            .parse("SELECT name AS secret_token FROM files ORDER BY (secret_token) DESC")
            .unwrap();
        assert_eq!(validator.validate(&tree), Ok(()));
    }

    #[test]
    fn test_ambiguous_column() {
        assert_eq!(
            validate("SELECT id FROM files f JOIN share_logs s ON f.id = s.file_id"),
            Err(GuardError::AmbiguousReference { name: "id".into() })
        );
    }

    #[test]
    fn test_unknown_qualifier() {
        assert_eq!(
            validate("SELECT x.name FROM files f"),
            Err(GuardError::DisallowedTable { name: "x".into() })
        );
    }

    #[test]
    fn test_disallowed_joins() {
        for sql in [
            "SELECT f.name FROM files f JOIN share_logs s ON f.id = s.id",
            "SELECT f.name FROM files f JOIN share_logs s ON f.name = s.viewer_email",
            "SELECT f.name FROM files f JOIN share_logs s ON f.id = s.file_id AND s.id > 1",
            "SELECT f.name FROM files f JOIN share_logs s ON f.id > s.file_id",
            "SELECT f.name FROM files f, share_logs s WHERE f.id = s.file_id",
            "SELECT f.name FROM files f CROSS JOIN share_logs s",
            "SELECT f.name FROM files f JOIN share_logs s ON s.file_id = s.file_id",
        ] {
            assert!(
                matches!(validate(sql), Err(GuardError::DisallowedJoin { .. })),
                "{sql}: {:?}",
                validate(sql)
            );
        }
    }

    #[test]
    fn test_join_error_names_key_pair() {
        assert_eq!(
            validate("SELECT f.name FROM files f JOIN share_logs s ON f.id = s.id"),
            Err(GuardError::DisallowedJoin {
                left: "files.id".into(),
                right: "share_logs.id".into()
            })
        );
    }

    #[test]
    fn test_disallowed_function() {
        assert_eq!(
            validate("SELECT load_extension(name) FROM files"),
            Err(GuardError::DisallowedFunction {
                name: "load_extension".into()
            })
        );
    }

    #[test]
    fn test_ordinals_rejected() {
        assert_eq!(
            validate("SELECT name FROM files ORDER BY 1"),
            Err(GuardError::unsupported("ORDER BY ordinal"))
        );
        assert_eq!(
            validate("SELECT name, count(*) FROM files GROUP BY 1"),
            Err(GuardError::unsupported("GROUP BY ordinal"))
        );
        for sql in [
            "SELECT id, name FROM files ORDER BY (2) DESC",
            "SELECT id, name FROM files ORDER BY +2",
            "SELECT id, name FROM files ORDER BY -(1)",
        ] {
            assert_eq!(
                validate(sql),
                Err(GuardError::unsupported("ORDER BY ordinal")),
                "{sql}"
            );
        }
        assert_eq!(
            validate("SELECT name, count(*) FROM files GROUP BY (1)"),
            Err(GuardError::unsupported("GROUP BY ordinal"))
        );
        assert_eq!(validate("SELECT id FROM files ORDER BY id + 2"), Ok(()));
    }

    #[test]
    fn test_subqueries_gated_by_policy() {
        let strict = SchemaPolicy::builder()
            .table("files", ["id", "name"])
            .build()
            .unwrap();
        assert_eq!(
            validate_with(&strict, "SELECT name FROM files WHERE id IN (SELECT id FROM files)"),
            Err(GuardError::unsupported("SUBQUERY"))
        );
    }

    #[test]
    fn test_wildcard_gated_by_policy() {
        let strict = SchemaPolicy::builder()
            .table("files", ["id", "name"])
            .allow_wildcard(false)
            .build()
            .unwrap();
        assert_eq!(
            validate_with(&strict, "SELECT * FROM files"),
            Err(GuardError::disallowed_column("files", "*"))
        );
    }

    #[test]
    fn test_kind_check_runs_before_table_check() {
        assert_eq!(
            validate("SELECT id FROM users ORDER BY 1"),
            Err(GuardError::unsupported("ORDER BY ordinal"))
        );
    }

    #[test]
    fn test_referenced_tables_dedup_in_order() {
        let tree = SqlParser::new()
            .parse("SELECT f.name FROM files f JOIN share_logs s ON f.id = s.file_id WHERE f.id IN (SELECT id FROM files)")
            .unwrap();
        assert_eq!(referenced_tables(&tree.query), vec!["files", "share_logs"]);
    }
}

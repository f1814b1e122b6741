//! SQL parsing and lowering into the closed expression tree.
//!
//! Text is parsed with `sqlparser`'s SQLite dialect, then every node is
//! translated into [`crate::tree`]. Anything without a counterpart in the tree
//! is rejected here with [`GuardError::UnsupportedStatement`], so later passes
//! never see a construct they do not know.

use std::fmt::Debug;

use sqlparser::ast;
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;

use crate::error::GuardError;
use crate::tree::{
    BinaryOperator, CaseBranch, ColumnRef, Expr, ExpressionTree, FromClause, Function,
    FunctionArgs, Join, JoinKind, Limit, Literal, OrderByItem, Query, Select, SelectItem, Table,
    UnaryOperator,
};

/// Accepted `CAST` target types.
const CAST_TYPES: &[&str] = &["INTEGER", "INT", "TEXT", "REAL", "NUMERIC", "BLOB"];

/// Parses untrusted SQL into an [`ExpressionTree`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlParser;

impl SqlParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse one statement.
    pub fn parse(&self, sql: &str) -> Result<ExpressionTree, GuardError> {
        let statements = Parser::parse_sql(&SQLiteDialect {}, sql)
            .map_err(|e| GuardError::parse(sql, sanitize_diagnostic(&e.to_string())))?;

        let statement = match statements.as_slice() {
            [] => return Err(GuardError::parse(sql, "empty query")),
            [statement] => statement,
            many => {
                let kind = many
                    .iter()
                    .find(|s| !matches!(s, ast::Statement::Query(_)))
                    .map(statement_keyword)
                    .unwrap_or_else(|| "MULTIPLE STATEMENTS".to_string());
                return Err(GuardError::unsupported(kind));
            }
        };

        let query = match statement {
            ast::Statement::Query(query) => lower_query(query)?,
            other => return Err(GuardError::unsupported(statement_keyword(other))),
        };

        Ok(ExpressionTree { query })
    }
}

/// First keyword of a statement, e.g. `DROP`.
fn statement_keyword(statement: &ast::Statement) -> String {
    statement
        .to_string()
        .split_whitespace()
        .next()
        .map(str::to_ascii_uppercase)
        .unwrap_or_else(|| "UNKNOWN".to_string())
}

/// Parser diagnostics quote the offending token, which may be an injected
/// literal. Keep only the expectation and drop quoted text and positions.
fn sanitize_diagnostic(message: &str) -> String {
    let message = message.strip_prefix("sql parser error: ").unwrap_or(message);
    let message = message.split(", found").next().unwrap_or(message);
    let message = message.split(" at Line").next().unwrap_or(message);

    let mut out = String::with_capacity(message.len());
    let mut quote: Option<char> = None;
    for c in message.chars() {
        match quote {
            Some(q) if c == q => {
                out.push(c);
                quote = None;
            }
            Some(_) => {}
            None => {
                if matches!(c, '\'' | '"' | '`') {
                    out.push_str(&format!("{c}..."));
                    quote = Some(c);
                } else if !c.is_ascii_digit() {
                    out.push(c);
                }
            }
        }
    }
    out.trim().to_string()
}

/// Name of an AST variant without any of its contents.
fn variant_name(node: &impl Debug) -> String {
    let debug = format!("{node:?}");
    debug
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .next()
        .unwrap_or("expression")
        .to_ascii_uppercase()
}

fn lower_ident(ident: &ast::Ident) -> String {
    ident.value.to_ascii_lowercase()
}

fn lower_object_name(name: &ast::ObjectName) -> Result<Vec<String>, GuardError> {
    name.0
        .iter()
        .map(|part| match part {
            ast::ObjectNamePart::Identifier(ident) => Ok(lower_ident(ident)),
            #[allow(unreachable_patterns)]
            other => Err(GuardError::unsupported(variant_name(other))),
        })
        .collect()
}

fn lower_query(query: &ast::Query) -> Result<Query, GuardError> {
    if query.with.is_some() {
        return Err(GuardError::unsupported("WITH"));
    }
    if query.fetch.is_some() {
        return Err(GuardError::unsupported("FETCH"));
    }
    if !query.locks.is_empty() {
        return Err(GuardError::unsupported("FOR UPDATE"));
    }

    let select = match &*query.body {
        ast::SetExpr::Select(select) => lower_select(select)?,
        ast::SetExpr::SetOperation { op, .. } => {
            return Err(GuardError::unsupported(op.to_string().to_ascii_uppercase()));
        }
        ast::SetExpr::Query(_) => return Err(GuardError::unsupported("PARENTHESIZED QUERY")),
        ast::SetExpr::Values(_) => return Err(GuardError::unsupported("VALUES")),
        other => {
            let kind = other
                .to_string()
                .split_whitespace()
                .next()
                .map(str::to_ascii_uppercase)
                .unwrap_or_else(|| variant_name(other));
            return Err(GuardError::unsupported(kind));
        }
    };

    let order_by = match &query.order_by {
        None => Vec::new(),
        Some(order_by) => match &order_by.kind {
            ast::OrderByKind::Expressions(exprs) => exprs
                .iter()
                .map(|item| {
                    Ok(OrderByItem {
                        expr: lower_expr(&item.expr)?,
                        asc: item.options.asc,
                        nulls_first: item.options.nulls_first,
                    })
                })
                .collect::<Result<Vec<_>, GuardError>>()?,
            #[allow(unreachable_patterns)]
            _ => return Err(GuardError::unsupported("ORDER BY ALL")),
        },
    };

    let limit = match &query.limit_clause {
        None => None,
        Some(ast::LimitClause::LimitOffset {
            limit,
            offset,
            limit_by,
            ..
        }) => {
            if !limit_by.is_empty() {
                return Err(GuardError::unsupported("LIMIT BY"));
            }
            let count = limit.as_ref().map(lower_limit_count).transpose()?;
            let offset = offset
                .as_ref()
                .map(|offset| lower_expr(&offset.value))
                .transpose()?;
            if count.is_none() && offset.is_none() {
                None
            } else {
                Some(Limit { count, offset })
            }
        }
        Some(ast::LimitClause::OffsetCommaLimit { offset, limit }) => Some(Limit {
            count: Some(lower_limit_count(limit)?),
            offset: Some(lower_expr(offset)?),
        }),
    };

    Ok(Query {
        select,
        order_by,
        limit,
    })
}

/// A LIMIT count must be a non-negative integer constant.
fn lower_limit_count(expr: &ast::Expr) -> Result<u64, GuardError> {
    match expr {
        ast::Expr::Value(value) => match &value.value {
            ast::Value::Number(text, _) => text
                .parse::<u64>()
                .map_err(|_| GuardError::invalid_limit("must be a non-negative integer")),
            ast::Value::Placeholder(_) => {
                Err(GuardError::invalid_limit("must be a constant, not a parameter"))
            }
            _ => Err(GuardError::invalid_limit("must be a non-negative integer")),
        },
        ast::Expr::UnaryOp {
            op: ast::UnaryOperator::Minus,
            ..
        } => Err(GuardError::invalid_limit("must not be negative")),
        ast::Expr::Nested(inner) => lower_limit_count(inner),
        _ => Err(GuardError::invalid_limit("must be an integer constant")),
    }
}

fn lower_select(select: &ast::Select) -> Result<Select, GuardError> {
    let distinct = match &select.distinct {
        None => false,
        Some(ast::Distinct::Distinct) => true,
        Some(_) => return Err(GuardError::unsupported("DISTINCT ON")),
    };

    if select.top.is_some() {
        return Err(GuardError::unsupported("TOP"));
    }
    if select.into.is_some() {
        return Err(GuardError::unsupported("SELECT INTO"));
    }
    if !select.lateral_views.is_empty() {
        return Err(GuardError::unsupported("LATERAL VIEW"));
    }
    if select.prewhere.is_some() {
        return Err(GuardError::unsupported("PREWHERE"));
    }
    if select.qualify.is_some() {
        return Err(GuardError::unsupported("QUALIFY"));
    }
    if !select.named_window.is_empty() {
        return Err(GuardError::unsupported("WINDOW"));
    }
    if !select.cluster_by.is_empty()
        || !select.distribute_by.is_empty()
        || !select.sort_by.is_empty()
    {
        return Err(GuardError::unsupported("CLUSTER BY"));
    }

    let projection = select
        .projection
        .iter()
        .map(lower_select_item)
        .collect::<Result<Vec<_>, _>>()?;

    let from = match select.from.as_slice() {
        [] => None,
        [first, rest @ ..] => {
            let mut clause = FromClause {
                base: lower_table(&first.relation)?,
                joins: Vec::new(),
            };
            for join in &first.joins {
                clause.joins.push(lower_join(join)?);
            }
            // `FROM a, b` is a cross join with no constraint.
            for item in rest {
                clause.joins.push(Join {
                    kind: JoinKind::Cross,
                    table: lower_table(&item.relation)?,
                    on: None,
                });
                for join in &item.joins {
                    clause.joins.push(lower_join(join)?);
                }
            }
            Some(clause)
        }
    };

    let selection = select.selection.as_ref().map(lower_expr).transpose()?;

    let group_by = match &select.group_by {
        ast::GroupByExpr::Expressions(exprs, modifiers) => {
            if !modifiers.is_empty() {
                return Err(GuardError::unsupported("GROUP BY modifier"));
            }
            exprs.iter().map(lower_expr).collect::<Result<Vec<_>, _>>()?
        }
        ast::GroupByExpr::All(_) => return Err(GuardError::unsupported("GROUP BY ALL")),
    };

    let having = select.having.as_ref().map(lower_expr).transpose()?;

    Ok(Select {
        distinct,
        projection,
        from,
        selection,
        group_by,
        having,
    })
}

fn lower_select_item(item: &ast::SelectItem) -> Result<SelectItem, GuardError> {
    match item {
        ast::SelectItem::UnnamedExpr(expr) => Ok(SelectItem::Expr {
            expr: lower_expr(expr)?,
            alias: None,
        }),
        ast::SelectItem::ExprWithAlias { expr, alias } => Ok(SelectItem::Expr {
            expr: lower_expr(expr)?,
            alias: Some(lower_ident(alias)),
        }),
        ast::SelectItem::Wildcard(options) => {
            if !options.to_string().trim().is_empty() {
                return Err(GuardError::unsupported("WILDCARD OPTIONS"));
            }
            Ok(SelectItem::Wildcard)
        }
        ast::SelectItem::QualifiedWildcard(qualifier, options) => {
            if !options.to_string().trim().is_empty() {
                return Err(GuardError::unsupported("WILDCARD OPTIONS"));
            }
            let qualifier = qualifier.to_string();
            let unquoted = qualifier.trim_matches(|c| c == '"' || c == '`');
            if !queryable_core::policy::is_plain_identifier(unquoted) {
                return Err(GuardError::unsupported("QUALIFIED WILDCARD"));
            }
            Ok(SelectItem::QualifiedWildcard(unquoted.to_ascii_lowercase()))
        }
        #[allow(unreachable_patterns)]
        other => Err(GuardError::unsupported(variant_name(other))),
    }
}

fn lower_table(factor: &ast::TableFactor) -> Result<Table, GuardError> {
    match factor {
        ast::TableFactor::Table {
            name,
            alias,
            args,
            with_hints,
            ..
        } => {
            if args.is_some() {
                return Err(GuardError::unsupported("TABLE FUNCTION"));
            }
            if !with_hints.is_empty() {
                return Err(GuardError::unsupported("TABLE HINTS"));
            }
            let parts = lower_object_name(name)?;
            let name = match parts.as_slice() {
                [name] => name.clone(),
                _ => return Err(GuardError::unsupported("QUALIFIED TABLE NAME")),
            };
            let alias = match alias {
                None => None,
                Some(alias) => {
                    if !alias.columns.is_empty() {
                        return Err(GuardError::unsupported("ALIAS COLUMN LIST"));
                    }
                    Some(lower_ident(&alias.name))
                }
            };
            Ok(Table { name, alias })
        }
        ast::TableFactor::Derived { .. } => Err(GuardError::unsupported("DERIVED TABLE")),
        ast::TableFactor::NestedJoin { .. } => Err(GuardError::unsupported("NESTED JOIN")),
        other => Err(GuardError::unsupported(variant_name(other))),
    }
}

fn lower_join(join: &ast::Join) -> Result<Join, GuardError> {
    let table = lower_table(&join.relation)?;

    let (kind, constraint) = match &join.join_operator {
        ast::JoinOperator::Join(c) | ast::JoinOperator::Inner(c) => (JoinKind::Inner, Some(c)),
        ast::JoinOperator::Left(c) | ast::JoinOperator::LeftOuter(c) => (JoinKind::Left, Some(c)),
        _ => {
            let rendered = join.to_string().to_ascii_uppercase();
            if rendered.trim_start().starts_with("CROSS JOIN") {
                (JoinKind::Cross, None)
            } else {
                return Err(GuardError::unsupported("JOIN"));
            }
        }
    };

    let on = match constraint {
        None | Some(ast::JoinConstraint::None) => None,
        Some(ast::JoinConstraint::On(expr)) => Some(lower_expr(expr)?),
        Some(ast::JoinConstraint::Using(_)) => return Err(GuardError::unsupported("USING")),
        Some(ast::JoinConstraint::Natural) => return Err(GuardError::unsupported("NATURAL JOIN")),
        #[allow(unreachable_patterns)]
        Some(_) => return Err(GuardError::unsupported("JOIN")),
    };

    // A join without ON joins every row; the join check rejects it.
    let kind = if on.is_none() { JoinKind::Cross } else { kind };

    Ok(Join { kind, table, on })
}

fn boxed(expr: &ast::Expr) -> Result<Box<Expr>, GuardError> {
    lower_expr(expr).map(Box::new)
}

fn lower_expr(expr: &ast::Expr) -> Result<Expr, GuardError> {
    let lowered = match expr {
        ast::Expr::Identifier(ident) => Expr::Column(ColumnRef {
            qualifier: None,
            name: lower_ident(ident),
        }),
        ast::Expr::CompoundIdentifier(parts) => match parts.as_slice() {
            [qualifier, name] => Expr::Column(ColumnRef {
                qualifier: Some(lower_ident(qualifier)),
                name: lower_ident(name),
            }),
            _ => return Err(GuardError::unsupported("QUALIFIED COLUMN NAME")),
        },
        ast::Expr::Value(value) => lower_value(&value.value)?,
        ast::Expr::BinaryOp { left, op, right } => Expr::BinaryOp {
            left: boxed(left)?,
            op: lower_binary_operator(op)?,
            right: boxed(right)?,
        },
        ast::Expr::UnaryOp { op, expr } => {
            let op = match op {
                ast::UnaryOperator::Plus => UnaryOperator::Plus,
                ast::UnaryOperator::Minus => UnaryOperator::Minus,
                ast::UnaryOperator::Not => UnaryOperator::Not,
                other => return Err(GuardError::unsupported(format!("OPERATOR {other}"))),
            };
            Expr::UnaryOp {
                op,
                expr: boxed(expr)?,
            }
        }
        ast::Expr::Nested(inner) => Expr::Nested(boxed(inner)?),
        ast::Expr::IsNull(inner) => Expr::IsNull {
            expr: boxed(inner)?,
            negated: false,
        },
        ast::Expr::IsNotNull(inner) => Expr::IsNull {
            expr: boxed(inner)?,
            negated: true,
        },
        ast::Expr::InList {
            expr,
            list,
            negated,
            ..
        } => Expr::InList {
            expr: boxed(expr)?,
            list: list.iter().map(lower_expr).collect::<Result<Vec<_>, _>>()?,
            negated: *negated,
        },
        ast::Expr::InSubquery {
            expr,
            subquery,
            negated,
            ..
        } => Expr::InSubquery {
            expr: boxed(expr)?,
            subquery: Box::new(lower_query(subquery)?),
            negated: *negated,
        },
        ast::Expr::Between {
            expr,
            negated,
            low,
            high,
            ..
        } => Expr::Between {
            expr: boxed(expr)?,
            low: boxed(low)?,
            high: boxed(high)?,
            negated: *negated,
        },
        ast::Expr::Like {
            negated,
            any,
            expr,
            pattern,
            escape_char,
            ..
        } => {
            if *any {
                return Err(GuardError::unsupported("LIKE ANY"));
            }
            if escape_char.is_some() {
                return Err(GuardError::unsupported("LIKE ESCAPE"));
            }
            Expr::Like {
                expr: boxed(expr)?,
                pattern: boxed(pattern)?,
                negated: *negated,
            }
        }
        ast::Expr::Cast {
            kind,
            expr,
            data_type,
            format,
            ..
        } => {
            if !matches!(kind, ast::CastKind::Cast) {
                return Err(GuardError::unsupported(variant_name(kind)));
            }
            if format.is_some() {
                return Err(GuardError::unsupported("CAST FORMAT"));
            }
            let data_type = data_type.to_string().to_ascii_uppercase();
            if !CAST_TYPES.contains(&data_type.as_str()) {
                return Err(GuardError::unsupported("CAST TYPE"));
            }
            Expr::Cast {
                expr: boxed(expr)?,
                data_type,
            }
        }
        ast::Expr::Case {
            operand,
            conditions,
            else_result,
            ..
        } => Expr::Case {
            operand: operand.as_deref().map(boxed).transpose()?,
            branches: conditions
                .iter()
                .map(|when| {
                    Ok(CaseBranch {
                        condition: lower_expr(&when.condition)?,
                        result: lower_expr(&when.result)?,
                    })
                })
                .collect::<Result<Vec<_>, GuardError>>()?,
            else_result: else_result.as_deref().map(boxed).transpose()?,
        },
        ast::Expr::Subquery(query) => Expr::Subquery(Box::new(lower_query(query)?)),
        ast::Expr::Exists {
            subquery, negated, ..
        } => Expr::Exists {
            subquery: Box::new(lower_query(subquery)?),
            negated: *negated,
        },
        ast::Expr::Function(function) => Expr::Function(lower_function(function)?),
        other => return Err(GuardError::unsupported(variant_name(other))),
    };
    Ok(lowered)
}

fn lower_value(value: &ast::Value) -> Result<Expr, GuardError> {
    let literal = match value {
        ast::Value::Number(text, false) => Literal::Number(text.to_string()),
        ast::Value::SingleQuotedString(text) => Literal::String(text.clone()),
        ast::Value::Boolean(b) => Literal::Boolean(*b),
        ast::Value::Null => Literal::Null,
        ast::Value::Placeholder(name) if name == "?" => return Ok(Expr::Placeholder),
        ast::Value::Placeholder(_) => return Err(GuardError::unsupported("NAMED PARAMETER")),
        other => return Err(GuardError::unsupported(format!("{} LITERAL", variant_name(other)))),
    };
    Ok(Expr::Literal(literal))
}

fn lower_binary_operator(op: &ast::BinaryOperator) -> Result<BinaryOperator, GuardError> {
    Ok(match op {
        ast::BinaryOperator::Plus => BinaryOperator::Plus,
        ast::BinaryOperator::Minus => BinaryOperator::Minus,
        ast::BinaryOperator::Multiply => BinaryOperator::Multiply,
        ast::BinaryOperator::Divide => BinaryOperator::Divide,
        ast::BinaryOperator::Modulo => BinaryOperator::Modulo,
        ast::BinaryOperator::StringConcat => BinaryOperator::Concat,
        ast::BinaryOperator::Eq => BinaryOperator::Eq,
        ast::BinaryOperator::NotEq => BinaryOperator::NotEq,
        ast::BinaryOperator::Lt => BinaryOperator::Lt,
        ast::BinaryOperator::LtEq => BinaryOperator::LtEq,
        ast::BinaryOperator::Gt => BinaryOperator::Gt,
        ast::BinaryOperator::GtEq => BinaryOperator::GtEq,
        ast::BinaryOperator::And => BinaryOperator::And,
        ast::BinaryOperator::Or => BinaryOperator::Or,
        other => return Err(GuardError::unsupported(format!("OPERATOR {other}"))),
    })
}

fn lower_function(function: &ast::Function) -> Result<Function, GuardError> {
    if function.over.is_some() {
        return Err(GuardError::unsupported("WINDOW FUNCTION"));
    }
    if function.filter.is_some() {
        return Err(GuardError::unsupported("FILTER"));
    }
    if !function.within_group.is_empty() {
        return Err(GuardError::unsupported("WITHIN GROUP"));
    }
    if !matches!(function.parameters, ast::FunctionArguments::None) {
        return Err(GuardError::unsupported("FUNCTION PARAMETERS"));
    }

    let name = match lower_object_name(&function.name)?.as_slice() {
        [name] => name.clone(),
        _ => return Err(GuardError::unsupported("QUALIFIED FUNCTION NAME")),
    };

    let (distinct, args) = match &function.args {
        ast::FunctionArguments::None => (false, FunctionArgs::Bare),
        ast::FunctionArguments::Subquery(_) => {
            return Err(GuardError::unsupported("FUNCTION SUBQUERY ARGUMENT"));
        }
        ast::FunctionArguments::List(list) => {
            if !list.clauses.is_empty() {
                return Err(GuardError::unsupported("FUNCTION ARGUMENT CLAUSE"));
            }
            let distinct = match &list.duplicate_treatment {
                None | Some(ast::DuplicateTreatment::All) => false,
                Some(ast::DuplicateTreatment::Distinct) => true,
            };
            let args = match list.args.as_slice() {
                [ast::FunctionArg::Unnamed(ast::FunctionArgExpr::Wildcard)] => FunctionArgs::Star,
                args => FunctionArgs::List(
                    args.iter()
                        .map(|arg| match arg {
                            ast::FunctionArg::Unnamed(ast::FunctionArgExpr::Expr(expr)) => {
                                lower_expr(expr)
                            }
                            ast::FunctionArg::Unnamed(_) => {
                                Err(GuardError::unsupported("WILDCARD ARGUMENT"))
                            }
                            _ => Err(GuardError::unsupported("NAMED ARGUMENT")),
                        })
                        .collect::<Result<Vec<_>, _>>()?,
                ),
            };
            (distinct, args)
        }
    };

    if distinct && matches!(args, FunctionArgs::Star) {
        return Err(GuardError::unsupported("DISTINCT *"));
    }

    Ok(Function {
        name,
        distinct,
        args,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(sql: &str) -> Result<Query, GuardError> {
        SqlParser::new().parse(sql).map(|tree| tree.query)
    }

    fn unsupported(sql: &str) -> String {
        match parse(sql) {
            Err(GuardError::UnsupportedStatement { kind }) => kind,
            other => panic!("expected UnsupportedStatement for {sql}, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_simple_select() {
        let query = parse("SELECT name FROM files WHERE id = 1").unwrap();
        let from = query.select.from.unwrap();
        assert_eq!(from.base.name, "files");
        assert!(from.joins.is_empty());
        assert_eq!(
            query.select.selection,
            Some(Expr::BinaryOp {
                left: Box::new(Expr::Column(ColumnRef {
                    qualifier: None,
                    name: "id".into()
                })),
                op: BinaryOperator::Eq,
                right: Box::new(Expr::Literal(Literal::Number("1".into()))),
            })
        );
        assert!(query.limit.is_none());
    }

    #[test]
    fn test_identifiers_are_lowercased() {
        let query = parse("SELECT F.Name FROM Files AS F").unwrap();
        let from = query.select.from.unwrap();
        assert_eq!(from.base.name, "files");
        assert_eq!(from.base.alias.as_deref(), Some("f"));
    }

    #[test]
    fn test_join_kinds() {
        let query = parse(
            "SELECT f.name FROM files f LEFT JOIN share_logs s ON f.id = s.file_id, share_logs t",
        )
        .unwrap();
        let joins = query.select.from.unwrap().joins;
        assert_eq!(joins.len(), 2);
        assert_eq!(joins[0].kind, JoinKind::Left);
        assert!(joins[0].on.is_some());
        assert_eq!(joins[1].kind, JoinKind::Cross);
        assert!(joins[1].on.is_none());
    }

    #[test]
    fn test_limit_and_offset() {
        let query = parse("SELECT name FROM files LIMIT 50 OFFSET 10").unwrap();
        let limit = query.limit.unwrap();
        assert_eq!(limit.count, Some(50));
        assert_eq!(
            limit.offset,
            Some(Expr::Literal(Literal::Number("10".into())))
        );
    }

    #[test]
    fn test_invalid_limits() {
        for sql in [
            "SELECT name FROM files LIMIT -1",
            "SELECT name FROM files LIMIT ?",
            "SELECT name FROM files LIMIT 1 + 1",
            "SELECT name FROM files LIMIT 'ten'",
        ] {
            assert!(
                matches!(parse(sql), Err(GuardError::InvalidLimit { .. })),
                "{sql}"
            );
        }
    }

    #[test]
    fn test_statement_kinds_are_named() {
        assert_eq!(unsupported("DROP TABLE files"), "DROP");
        assert_eq!(unsupported("DELETE FROM files"), "DELETE");
        assert_eq!(unsupported("INSERT INTO files (id) VALUES (1)"), "INSERT");
        assert_eq!(unsupported("UPDATE files SET name = 'x'"), "UPDATE");
        assert_eq!(
            unsupported("WITH x AS (SELECT id FROM files) SELECT id FROM x"),
            "WITH"
        );
        assert_eq!(
            unsupported("SELECT id FROM files UNION SELECT id FROM share_logs"),
            "UNION"
        );
    }

    #[test]
    fn test_multiple_statements() {
        assert_eq!(unsupported("SELECT id FROM files; DROP TABLE files"), "DROP");
        assert_eq!(
            unsupported("SELECT id FROM files; SELECT id FROM files"),
            "MULTIPLE STATEMENTS"
        );
    }

    #[test]
    fn test_unsupported_constructs() {
        assert_eq!(
            unsupported("SELECT id FROM (SELECT id FROM files) AS sub"),
            "DERIVED TABLE"
        );
        assert_eq!(
            unsupported("SELECT count(*) OVER () FROM files"),
            "WINDOW FUNCTION"
        );
        assert_eq!(
            unsupported("SELECT name FROM files WHERE id = :id"),
            "NAMED PARAMETER"
        );
        assert_eq!(
            unsupported("SELECT f.name FROM files f JOIN share_logs s USING (id)"),
            "USING"
        );
        assert_eq!(
            unsupported("SELECT f.name FROM files f RIGHT JOIN share_logs s ON f.id = s.file_id"),
            "JOIN"
        );
    }

    #[test]
    fn test_functions() {
        let query = parse("SELECT COUNT(*), count(DISTINCT name), CURRENT_TIMESTAMP FROM files")
            .unwrap();
        let names: Vec<(String, bool, bool)> = query
            .select
            .projection
            .iter()
            .map(|item| match item {
                SelectItem::Expr {
                    expr: Expr::Function(f),
                    ..
                } => (
                    f.name.clone(),
                    f.distinct,
                    matches!(f.args, FunctionArgs::Star),
                ),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(
            names,
            vec![
                ("count".to_string(), false, true),
                ("count".to_string(), true, false),
                ("current_timestamp".to_string(), false, false),
            ]
        );
    }

    #[test]
    fn test_parse_error_is_sanitized() {
        let err = parse("SELECT 'secret-payload' FRM files").unwrap_err();
        match &err {
            GuardError::Parse { sql, message } => {
                assert!(sql.contains("secret-payload"));
                assert!(!message.contains("secret-payload"));
            }
            other => panic!("expected Parse, got {other:?}"),
        }
        assert!(!err.to_string().contains("secret-payload"));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(parse("   "), Err(GuardError::Parse { .. })));
    }

    #[test]
    fn test_sanitize_diagnostic() {
        assert_eq!(
            sanitize_diagnostic(
                "sql parser error: Expected: end of statement, found: 'x' at Line: 1, Column: 9"
            ),
            "Expected: end of statement"
        );
        assert_eq!(
            sanitize_diagnostic("Unterminated string 'abc 42"),
            "Unterminated string '..."
        );
    }
}

//! Deterministic SQLite rendering of the expression tree.
//!
//! Output is a single line with upper-case keywords and function names.
//! Identifiers are printed bare when they are plain and not keywords,
//! otherwise double-quoted. Parentheses are printed exactly where the tree
//! has a `Nested` node, so re-parsing the output yields the same tree.

use std::fmt::{self, Display, Formatter, Write};

use queryable_core::policy::is_plain_identifier;

use crate::tree::{
    BinaryOperator, ColumnRef, Expr, ExpressionTree, FromClause, Function, FunctionArgs, Join,
    JoinKind, Literal, OrderByItem, Query, SelectItem, Table, UnaryOperator,
};

/// Words that must be quoted when used as identifiers.
const RESERVED: &[&str] = &[
    "abort", "action", "add", "all", "alter", "always", "analyze", "and", "as", "asc", "attach",
    "autoincrement", "before", "begin", "between", "by", "cascade", "case", "cast", "check",
    "collate", "column", "commit", "conflict", "constraint", "create", "cross", "current",
    "current_date", "current_time", "current_timestamp", "database", "default", "deferrable",
    "deferred", "delete", "desc", "detach", "distinct", "do", "drop", "each", "else", "end",
    "escape", "except", "exclude", "exclusive", "exists", "explain", "fail", "filter", "first",
    "following", "for", "foreign", "from", "full", "glob", "group", "groups", "having", "if",
    "ignore", "immediate", "in", "index", "indexed", "initially", "inner", "insert", "instead",
    "intersect", "into", "is", "isnull", "join", "key", "last", "left", "like", "limit", "match",
    "materialized", "natural", "no", "not", "nothing", "notnull", "null", "nulls", "of", "offset",
    "on", "or", "order", "others", "outer", "over", "partition", "plan", "pragma", "preceding",
    "primary", "query", "raise", "range", "recursive", "references", "regexp", "reindex",
    "release", "rename", "replace", "restrict", "returning", "right", "rollback", "row", "rows",
    "savepoint", "select", "set", "table", "temp", "temporary", "then", "ties", "to",
    "transaction", "trigger", "true", "false", "unbounded", "union", "unique", "update", "using",
    "vacuum", "values", "view", "virtual", "when", "where", "window", "with", "without",
];

/// Render a statement.
pub fn render(tree: &ExpressionTree) -> String {
    tree.query.to_string()
}

/// An identifier, quoted only when needed.
struct Ident<'a>(&'a str);

impl Display for Ident<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = self.0;
        if is_plain_identifier(name) && !RESERVED.contains(&name.to_ascii_lowercase().as_str()) {
            f.write_str(name)
        } else {
            write!(f, "\"{}\"", name.replace('"', "\"\""))
        }
    }
}

/// Items joined by `", "`.
struct CommaSeparated<'a, T>(&'a [T]);

impl<T: Display> Display for CommaSeparated<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", item)?;
        }
        Ok(())
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let select = &self.select;
        f.write_str("SELECT ")?;
        if select.distinct {
            f.write_str("DISTINCT ")?;
        }
        write!(f, "{}", CommaSeparated(select.projection.as_slice()))?;
        if let Some(from) = &select.from {
            write!(f, " FROM {}", from)?;
        }
        if let Some(selection) = &select.selection {
            write!(f, " WHERE {}", selection)?;
        }
        if !select.group_by.is_empty() {
            write!(f, " GROUP BY {}", CommaSeparated(select.group_by.as_slice()))?;
        }
        if let Some(having) = &select.having {
            write!(f, " HAVING {}", having)?;
        }
        if !self.order_by.is_empty() {
            write!(f, " ORDER BY {}", CommaSeparated(self.order_by.as_slice()))?;
        }
        if let Some(limit) = &self.limit {
            if let Some(count) = limit.count {
                write!(f, " LIMIT {}", count)?;
            }
            if let Some(offset) = &limit.offset {
                write!(f, " OFFSET {}", offset)?;
            }
        }
        Ok(())
    }
}

impl Display for SelectItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SelectItem::Wildcard => f.write_str("*"),
            SelectItem::QualifiedWildcard(qualifier) => write!(f, "{}.*", Ident(qualifier)),
            SelectItem::Expr { expr, alias: None } => write!(f, "{}", expr),
            SelectItem::Expr {
                expr,
                alias: Some(alias),
            } => write!(f, "{} AS {}", expr, Ident(alias)),
        }
    }
}

impl Display for FromClause {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        for join in &self.joins {
            write!(f, " {}", join)?;
        }
        Ok(())
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Ident(&self.name))?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {}", Ident(alias))?;
        }
        Ok(())
    }
}

impl Display for Join {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let keyword = match self.kind {
            JoinKind::Inner => "JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Cross => "CROSS JOIN",
        };
        write!(f, "{} {}", keyword, self.table)?;
        if let Some(on) = &self.on {
            write!(f, " ON {}", on)?;
        }
        Ok(())
    }
}

impl Display for OrderByItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        match self.asc {
            Some(true) => f.write_str(" ASC")?,
            Some(false) => f.write_str(" DESC")?,
            None => {}
        }
        match self.nulls_first {
            Some(true) => f.write_str(" NULLS FIRST")?,
            Some(false) => f.write_str(" NULLS LAST")?,
            None => {}
        }
        Ok(())
    }
}

impl Display for ColumnRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(qualifier) = &self.qualifier {
            write!(f, "{}.", Ident(qualifier))?;
        }
        write!(f, "{}", Ident(&self.name))
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(text) => write!(f, "'{}'", text.replace('\'', "''")),
            Literal::Number(text) => f.write_str(text),
            Literal::Boolean(true) => f.write_str("TRUE"),
            Literal::Boolean(false) => f.write_str("FALSE"),
            Literal::Null => f.write_str("NULL"),
        }
    }
}

impl Display for BinaryOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Concat => "||",
            BinaryOperator::Eq => "=",
            BinaryOperator::NotEq => "<>",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
        })
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = self.name.to_ascii_uppercase();
        match &self.args {
            FunctionArgs::Bare => f.write_str(&name),
            FunctionArgs::Star => write!(f, "{}(*)", name),
            FunctionArgs::List(args) => {
                write!(f, "{}(", name)?;
                if self.distinct {
                    f.write_str("DISTINCT ")?;
                }
                write!(f, "{})", CommaSeparated(args.as_slice()))
            }
        }
    }
}

fn not(negated: bool) -> &'static str {
    if negated { "NOT " } else { "" }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(column) => write!(f, "{}", column),
            Expr::Literal(literal) => write!(f, "{}", literal),
            Expr::Placeholder => f.write_char('?'),
            Expr::BinaryOp { left, op, right } => write!(f, "{} {} {}", left, op, right),
            Expr::UnaryOp { op, expr } => {
                let operand = expr.to_string();
                match op {
                    UnaryOperator::Not => write!(f, "NOT {}", operand),
                    UnaryOperator::Plus | UnaryOperator::Minus => {
                        let sign = if *op == UnaryOperator::Plus { '+' } else { '-' };
                        f.write_char(sign)?;
                        // `- -x` must not print as the comment `--x`.
                        if operand.starts_with(['-', '+']) {
                            f.write_char(' ')?;
                        }
                        f.write_str(&operand)
                    }
                }
            }
            Expr::Nested(inner) => write!(f, "({})", inner),
            Expr::Function(function) => write!(f, "{}", function),
            Expr::IsNull { expr, negated } => write!(f, "{} IS {}NULL", expr, not(*negated)),
            Expr::InList {
                expr,
                list,
                negated,
            } => write!(f, "{} {}IN ({})", expr, not(*negated), CommaSeparated(list.as_slice())),
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => write!(f, "{} {}BETWEEN {} AND {}", expr, not(*negated), low, high),
            Expr::Like {
                expr,
                pattern,
                negated,
            } => write!(f, "{} {}LIKE {}", expr, not(*negated), pattern),
            Expr::Case {
                operand,
                branches,
                else_result,
            } => {
                f.write_str("CASE")?;
                if let Some(operand) = operand {
                    write!(f, " {}", operand)?;
                }
                for branch in branches {
                    write!(f, " WHEN {} THEN {}", branch.condition, branch.result)?;
                }
                if let Some(else_result) = else_result {
                    write!(f, " ELSE {}", else_result)?;
                }
                f.write_str(" END")
            }
            Expr::Cast { expr, data_type } => write!(f, "CAST({} AS {})", expr, data_type),
            Expr::Subquery(query) => write!(f, "({})", query),
            Expr::InSubquery {
                expr,
                subquery,
                negated,
            } => write!(f, "{} {}IN ({})", expr, not(*negated), subquery),
            Expr::Exists { subquery, negated } => write!(f, "{}EXISTS ({})", not(*negated), subquery),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SqlParser;
    use pretty_assertions::assert_eq;

    fn roundtrip(sql: &str) -> String {
        render(&SqlParser::new().parse(sql).unwrap())
    }

    #[test]
    fn test_keywords_and_functions_upper_case() {
        assert_eq!(
            roundtrip("select count(distinct name) as n from files where name like 'a%' order by n desc"),
            "SELECT COUNT(DISTINCT name) AS n FROM files WHERE name LIKE 'a%' ORDER BY n DESC"
        );
    }

    #[test]
    fn test_parentheses_are_preserved() {
        assert_eq!(
            roundtrip("SELECT name FROM files WHERE (id = 1 OR id = 2) AND name IS NOT NULL"),
            "SELECT name FROM files WHERE (id = 1 OR id = 2) AND name IS NOT NULL"
        );
    }

    #[test]
    fn test_reserved_identifiers_are_quoted() {
        assert_eq!(
            roundtrip(r#"SELECT name AS "order", id AS "two words" FROM files"#),
            r#"SELECT name AS "order", id AS "two words" FROM files"#
        );
    }

    #[test]
    fn test_case_cast_and_in() {
        assert_eq!(
            roundtrip(
                "SELECT CASE WHEN id IN (1, 2) THEN 'low' ELSE 'high' END, CAST(id AS TEXT) \
                 FROM files WHERE id NOT BETWEEN 3 AND 4"
            ),
            "SELECT CASE WHEN id IN (1, 2) THEN 'low' ELSE 'high' END, CAST(id AS TEXT) \
             FROM files WHERE id NOT BETWEEN 3 AND 4"
        );
    }

    #[test]
    fn test_nested_unary_minus_is_spaced() {
        assert_eq!(
            roundtrip("SELECT - -id FROM files"),
            "SELECT - -id FROM files"
        );
    }

    #[test]
    fn test_string_literals_are_escaped() {
        assert_eq!(
            roundtrip("SELECT name FROM files WHERE name = 'it''s'"),
            "SELECT name FROM files WHERE name = 'it''s'"
        );
    }

    #[test]
    fn test_joins_and_limit() {
        assert_eq!(
            roundtrip(
                "SELECT f.name FROM files f LEFT OUTER JOIN share_logs s ON f.id = s.file_id LIMIT 5 OFFSET 2"
            ),
            "SELECT f.name FROM files AS f LEFT JOIN share_logs AS s ON f.id = s.file_id LIMIT 5 OFFSET 2"
        );
    }
}

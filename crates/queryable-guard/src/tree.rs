//! The expression tree of one accepted SELECT statement.
//!
//! This is a closed set of node types: anything the parser cannot express here
//! is rejected before a tree exists. Every pass (validation, wildcard
//! expansion, parameterization, limit enforcement, rendering) matches these
//! enums exhaustively, so adding a node kind breaks the build until each pass
//! handles it.
//!
//! The tree is owned by a single compilation and discarded after rendering.

/// Root of a parsed statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionTree {
    pub query: Query,
}

/// A SELECT with its ORDER BY and LIMIT.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub select: Select,
    pub order_by: Vec<OrderByItem>,
    pub limit: Option<Limit>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub distinct: bool,
    pub projection: Vec<SelectItem>,
    pub from: Option<FromClause>,
    pub selection: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// `*`
    Wildcard,
    /// `alias.*`
    QualifiedWildcard(String),
    /// `expr [AS alias]`
    Expr { expr: Expr, alias: Option<String> },
}

/// `FROM base [JOIN ...]*`
#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    pub base: Table,
    pub joins: Vec<Join>,
}

impl FromClause {
    /// Every table in FROM order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        std::iter::once(&self.base).chain(self.joins.iter().map(|j| &j.table))
    }
}

/// A table in FROM/JOIN, with its optional alias.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub alias: Option<String>,
}

impl Table {
    /// The name other clauses use to refer to this table.
    pub fn binding(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: Table,
    /// The ON condition. `None` for cross joins.
    pub on: Option<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    /// Comma join or JOIN without ON.
    Cross,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub expr: Expr,
    pub asc: Option<bool>,
    pub nulls_first: Option<bool>,
}

/// `LIMIT count [OFFSET offset]`
///
/// The count is a constant, never a literal node, so it is never parameterized.
#[derive(Debug, Clone, PartialEq)]
pub struct Limit {
    pub count: Option<u64>,
    pub offset: Option<Expr>,
}

/// A column reference, optionally qualified by a table name or alias.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    pub qualifier: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    /// Numeric text exactly as written.
    Number(String),
    Boolean(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Concat,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,
    Minus,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// Lowercase function name.
    pub name: String,
    pub distinct: bool,
    pub args: FunctionArgs,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionArgs {
    /// `CURRENT_TIMESTAMP` (no parentheses)
    Bare,
    /// `COUNT(*)`
    Star,
    List(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseBranch {
    pub condition: Expr,
    pub result: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(ColumnRef),
    Literal(Literal),
    /// Positional `?` parameter.
    Placeholder,
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOperator,
        expr: Box<Expr>,
    },
    /// Explicit parentheses.
    Nested(Box<Expr>),
    Function(Function),
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
    },
    Case {
        operand: Option<Box<Expr>>,
        branches: Vec<CaseBranch>,
        else_result: Option<Box<Expr>>,
    },
    Cast {
        expr: Box<Expr>,
        /// Uppercase SQLite type name.
        data_type: String,
    },
    Subquery(Box<Query>),
    InSubquery {
        expr: Box<Expr>,
        subquery: Box<Query>,
        negated: bool,
    },
    Exists {
        subquery: Box<Query>,
        negated: bool,
    },
}

// -----------------------------------------------------------------------------
// Traversal
//
// Walks are pre-order and left to right, in exactly the order the renderer
// prints: projection, ON conditions, WHERE, GROUP BY, HAVING, ORDER BY,
// OFFSET. The parameterizer relies on this to line placeholders up with
// parameter indexes.
//
// `walk` stays inside one query. `walk_deep_mut` also enters subqueries at the
// position they are printed.
// -----------------------------------------------------------------------------

impl Query {
    fn exprs(&self) -> Vec<&Expr> {
        let mut out = Vec::new();
        for item in &self.select.projection {
            if let SelectItem::Expr { expr, .. } = item {
                out.push(expr);
            }
        }
        if let Some(from) = &self.select.from {
            out.extend(from.joins.iter().filter_map(|j| j.on.as_ref()));
        }
        out.extend(self.select.selection.as_ref());
        out.extend(self.select.group_by.iter());
        out.extend(self.select.having.as_ref());
        out.extend(self.order_by.iter().map(|item| &item.expr));
        out.extend(self.limit.as_ref().and_then(|l| l.offset.as_ref()));
        out
    }

    fn exprs_mut(&mut self) -> Vec<&mut Expr> {
        let mut out = Vec::new();
        for item in &mut self.select.projection {
            if let SelectItem::Expr { expr, .. } = item {
                out.push(expr);
            }
        }
        if let Some(from) = &mut self.select.from {
            out.extend(from.joins.iter_mut().filter_map(|j| j.on.as_mut()));
        }
        out.extend(self.select.selection.as_mut());
        out.extend(self.select.group_by.iter_mut());
        out.extend(self.select.having.as_mut());
        out.extend(self.order_by.iter_mut().map(|item| &mut item.expr));
        out.extend(self.limit.as_mut().and_then(|l| l.offset.as_mut()));
        out
    }

    /// Visit every expression of this query, not entering subqueries.
    pub fn walk(&self, f: &mut dyn FnMut(&Expr)) {
        for expr in self.exprs() {
            expr.walk(f);
        }
    }

    /// Visit every expression of this query and of its subqueries, in print order.
    pub fn walk_deep_mut(&mut self, f: &mut dyn FnMut(&mut Expr)) {
        for expr in self.exprs_mut() {
            expr.walk_deep_mut(f);
        }
    }

    /// This query followed by every nested subquery, outermost first.
    pub fn walk_queries(&self, f: &mut dyn FnMut(&Query)) {
        f(self);
        self.walk(&mut |expr| {
            if let Some(subquery) = expr.subquery() {
                subquery.walk_queries(f);
            }
        });
    }

    /// Mutable variant of [`Query::walk_queries`].
    pub fn walk_queries_mut(&mut self, f: &mut dyn FnMut(&mut Query)) {
        f(self);
        for expr in self.exprs_mut() {
            expr.for_each_subquery_mut(&mut |subquery| subquery.walk_queries_mut(f));
        }
    }
}

/// A child of an expression node: another expression or a subquery body.
enum ChildMut<'a> {
    Expr(&'a mut Expr),
    Query(&'a mut Query),
}

impl Expr {
    /// Direct child expressions, not entering subquery bodies.
    fn child_exprs(&self) -> Vec<&Expr> {
        let mut out: Vec<&Expr> = Vec::new();
        match self {
            Expr::Column(_) | Expr::Literal(_) | Expr::Placeholder => {}
            Expr::BinaryOp { left, right, .. } => {
                out.push(left);
                out.push(right);
            }
            Expr::UnaryOp { expr, .. }
            | Expr::Nested(expr)
            | Expr::IsNull { expr, .. }
            | Expr::Cast { expr, .. } => out.push(expr),
            Expr::Function(function) => {
                if let FunctionArgs::List(args) = &function.args {
                    out.extend(args.iter());
                }
            }
            Expr::InList { expr, list, .. } => {
                out.push(expr);
                out.extend(list.iter());
            }
            Expr::Between {
                expr, low, high, ..
            } => {
                out.push(expr);
                out.push(low);
                out.push(high);
            }
            Expr::Like { expr, pattern, .. } => {
                out.push(expr);
                out.push(pattern);
            }
            Expr::Case {
                operand,
                branches,
                else_result,
            } => {
                if let Some(operand) = operand {
                    out.push(operand);
                }
                for branch in branches {
                    out.push(&branch.condition);
                    out.push(&branch.result);
                }
                if let Some(else_result) = else_result {
                    out.push(else_result);
                }
            }
            Expr::Subquery(_) | Expr::Exists { .. } => {}
            Expr::InSubquery { expr, .. } => out.push(expr),
        }
        out
    }

    fn children_mut(&mut self) -> Vec<ChildMut<'_>> {
        let mut out = Vec::new();
        match self {
            Expr::Column(_) | Expr::Literal(_) | Expr::Placeholder => {}
            Expr::BinaryOp { left, right, .. } => {
                out.push(ChildMut::Expr(left));
                out.push(ChildMut::Expr(right));
            }
            Expr::UnaryOp { expr, .. }
            | Expr::Nested(expr)
            | Expr::IsNull { expr, .. }
            | Expr::Cast { expr, .. } => out.push(ChildMut::Expr(expr)),
            Expr::Function(function) => {
                if let FunctionArgs::List(args) = &mut function.args {
                    out.extend(args.iter_mut().map(ChildMut::Expr));
                }
            }
            Expr::InList { expr, list, .. } => {
                out.push(ChildMut::Expr(expr));
                out.extend(list.iter_mut().map(ChildMut::Expr));
            }
            Expr::Between {
                expr, low, high, ..
            } => {
                out.push(ChildMut::Expr(expr));
                out.push(ChildMut::Expr(low));
                out.push(ChildMut::Expr(high));
            }
            Expr::Like { expr, pattern, .. } => {
                out.push(ChildMut::Expr(expr));
                out.push(ChildMut::Expr(pattern));
            }
            Expr::Case {
                operand,
                branches,
                else_result,
            } => {
                if let Some(operand) = operand {
                    out.push(ChildMut::Expr(operand));
                }
                for branch in branches {
                    out.push(ChildMut::Expr(&mut branch.condition));
                    out.push(ChildMut::Expr(&mut branch.result));
                }
                if let Some(else_result) = else_result {
                    out.push(ChildMut::Expr(else_result));
                }
            }
            Expr::Subquery(subquery) | Expr::Exists { subquery, .. } => {
                out.push(ChildMut::Query(subquery))
            }
            Expr::InSubquery { expr, subquery, .. } => {
                out.push(ChildMut::Expr(expr));
                out.push(ChildMut::Query(subquery));
            }
        }
        out
    }

    /// The subquery directly owned by this node, if any.
    pub fn subquery(&self) -> Option<&Query> {
        match self {
            Expr::Subquery(q) | Expr::InSubquery { subquery: q, .. } | Expr::Exists { subquery: q, .. } => {
                Some(q)
            }
            _ => None,
        }
    }

    /// Pre-order walk that does not enter subquery bodies.
    pub fn walk(&self, f: &mut dyn FnMut(&Expr)) {
        f(self);
        for child in self.child_exprs() {
            child.walk(f);
        }
    }

    /// Mutable pre-order walk that does not enter subquery bodies. When `f`
    /// returns `false` the children of that node are skipped.
    pub fn rewrite(&mut self, f: &mut dyn FnMut(&mut Expr) -> bool) {
        if !f(self) {
            return;
        }
        for child in self.children_mut() {
            if let ChildMut::Expr(expr) = child {
                expr.rewrite(f);
            }
        }
    }

    /// The expression inside any number of parentheses.
    pub fn strip_parens(&self) -> &Expr {
        let mut expr = self;
        while let Expr::Nested(inner) = expr {
            expr = inner;
        }
        expr
    }

    /// Pre-order walk that enters subquery bodies where they are printed.
    pub fn walk_deep_mut(&mut self, f: &mut dyn FnMut(&mut Expr)) {
        f(self);
        for child in self.children_mut() {
            match child {
                ChildMut::Expr(expr) => expr.walk_deep_mut(f),
                ChildMut::Query(query) => query.walk_deep_mut(f),
            }
        }
    }

    fn for_each_subquery_mut(&mut self, f: &mut dyn FnMut(&mut Query)) {
        for child in self.children_mut() {
            match child {
                ChildMut::Expr(expr) => expr.for_each_subquery_mut(f),
                ChildMut::Query(query) => f(query),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str) -> Expr {
        Expr::Column(ColumnRef {
            qualifier: None,
            name: name.to_string(),
        })
    }

    fn query(selection: Option<Expr>) -> Query {
        Query {
            select: Select {
                distinct: false,
                projection: vec![SelectItem::Expr {
                    expr: column("name"),
                    alias: None,
                }],
                from: Some(FromClause {
                    base: Table {
                        name: "files".into(),
                        alias: None,
                    },
                    joins: vec![],
                }),
                selection,
                group_by: vec![],
                having: None,
            },
            order_by: vec![],
            limit: None,
        }
    }

    #[test]
    fn test_deep_walk_enters_subqueries_in_place() {
        let inner = query(Some(Expr::Literal(Literal::Number("2".into()))));
        let mut outer = query(Some(Expr::BinaryOp {
            left: Box::new(Expr::InSubquery {
                expr: Box::new(Expr::Literal(Literal::Number("1".into()))),
                subquery: Box::new(inner),
                negated: false,
            }),
            op: BinaryOperator::And,
            right: Box::new(Expr::Literal(Literal::Number("3".into()))),
        }));

        let mut seen = Vec::new();
        outer.walk_deep_mut(&mut |expr| {
            if let Expr::Literal(Literal::Number(n)) = expr {
                seen.push(n.clone());
            }
        });
        assert_eq!(seen, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_shallow_walk_skips_subqueries() {
        let inner = query(Some(Expr::Literal(Literal::Number("2".into()))));
        let outer = query(Some(Expr::Exists {
            subquery: Box::new(inner),
            negated: false,
        }));

        let mut literals = 0;
        outer.walk(&mut |expr| {
            if matches!(expr, Expr::Literal(_)) {
                literals += 1;
            }
        });
        assert_eq!(literals, 0);

        let mut queries = 0;
        outer.walk_queries(&mut |_| queries += 1);
        assert_eq!(queries, 2);
    }

    #[test]
    fn test_rewrite_prunes_replaced_nodes() {
        let mut expr = Expr::BinaryOp {
            left: Box::new(column("a")),
            op: BinaryOperator::And,
            right: Box::new(Expr::Nested(Box::new(column("b")))),
        };

        let mut visited = 0;
        expr.rewrite(&mut |node| {
            visited += 1;
            if let Expr::Column(c) = node {
                let renamed = format!("{}_x", c.name);
                *node = Expr::Nested(Box::new(column(&renamed)));
                return false;
            }
            true
        });

        assert_eq!(visited, 4);
        let Expr::BinaryOp { left, right, .. } = &expr else {
            panic!("root replaced: {expr:?}");
        };
        assert_eq!(left.strip_parens(), &column("a_x"));
        assert_eq!(right.strip_parens(), &column("b_x"));
    }
}

//! Parameter-bound query execution contract.

use async_trait::async_trait;
use queryable_guard::CompiledQuery;

/// One result row: column name to value, in column order.
pub type Row = serde_json::Map<String, serde_json::Value>;

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run a compiled query, binding `query.params` positionally.
    ///
    /// Implementations must check [`is_read_only_select`] first and refuse
    /// anything else without touching the store.
    async fn execute(&self, query: &CompiledQuery) -> anyhow::Result<Vec<Row>>;
}

/// Independent check that `sql` is a single SELECT statement.
///
/// Deliberately simple: it does not parse, it only looks at the leading
/// keyword and for statement separators outside quoted text.
pub fn is_read_only_select(sql: &str) -> bool {
    let sql = sql.trim();
    let sql = sql.strip_suffix(';').unwrap_or(sql).trim_end();

    let leading = sql
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or_default();
    if !leading.eq_ignore_ascii_case("select") {
        return false;
    }

    let mut quote: Option<char> = None;
    for c in sql.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None if c == ';' => return false,
            None => {}
        }
    }
    quote.is_none()
}

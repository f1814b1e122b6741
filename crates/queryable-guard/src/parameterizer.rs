//! Literal parameterization.
//!
//! String and numeric literals are replaced by positional `?` placeholders in
//! print order, and their values collected in the same order. NULL and boolean
//! literals stay inline: they carry no caller data. LIMIT counts are not
//! literal nodes and are never touched.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::GuardError;
use crate::tree::{Expr, ExpressionTree, Literal};

/// A bound parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Integer(i64),
    Real(f64),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Integer(v) => write!(f, "{}", v),
            ParamValue::Real(v) => write!(f, "{}", v),
            ParamValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// Replace literals with placeholders and return their values in placeholder order.
///
/// `sql` is the original input, only used to build a parse error for a
/// numeric literal that is not a number.
pub fn parameterize(tree: &mut ExpressionTree, sql: &str) -> Result<Vec<ParamValue>, GuardError> {
    let mut params = Vec::new();
    let mut result = Ok(());
    tree.query.walk_deep_mut(&mut |expr| {
        if result.is_err() {
            return;
        }
        let value = match expr {
            Expr::Literal(Literal::String(text)) => ParamValue::Text(std::mem::take(text)),
            Expr::Literal(Literal::Number(text)) => match parse_number(text) {
                Some(value) => value,
                None => {
                    result = Err(GuardError::parse(sql, "invalid numeric literal"));
                    return;
                }
            },
            _ => return,
        };
        params.push(value);
        *expr = Expr::Placeholder;
    });
    result.map(|()| params)
}

fn parse_number(text: &str) -> Option<ParamValue> {
    if let Ok(v) = text.parse::<i64>() {
        return Some(ParamValue::Integer(v));
    }
    if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        return i64::from_str_radix(hex, 16).ok().map(ParamValue::Integer);
    }
    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(ParamValue::Real)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SqlParser;
    use crate::render::render;
    use pretty_assertions::assert_eq;

    fn run(sql: &str) -> (String, Vec<ParamValue>) {
        let mut tree = SqlParser::new().parse(sql).unwrap();
        let params = parameterize(&mut tree, sql).unwrap();
        (render(&tree), params)
    }

    #[test]
    fn test_strings_and_numbers_become_placeholders() {
        let (sql, params) =
            run("SELECT name FROM files WHERE created_at > '2024-01-01' AND id = 42");
        assert_eq!(sql, "SELECT name FROM files WHERE created_at > ? AND id = ?");
        assert_eq!(
            params,
            vec![
                ParamValue::Text("2024-01-01".into()),
                ParamValue::Integer(42)
            ]
        );
    }

    #[test]
    fn test_order_follows_printed_clauses() {
        let (sql, params) = run(
            "SELECT substr(name, 1, 3) FROM files WHERE id BETWEEN 10 AND 20 \
             GROUP BY name HAVING count(*) > 2 ORDER BY length(name) + 5 LIMIT 7 OFFSET 4",
        );
        assert_eq!(
            sql,
            "SELECT SUBSTR(name, ?, ?) FROM files WHERE id BETWEEN ? AND ? \
             GROUP BY name HAVING COUNT(*) > ? ORDER BY LENGTH(name) + ? LIMIT 7 OFFSET ?"
        );
        assert_eq!(
            params,
            [1, 3, 10, 20, 2, 5, 4]
                .into_iter()
                .map(ParamValue::Integer)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_null_and_booleans_stay_inline() {
        let (sql, params) = run("SELECT name FROM files WHERE name IS NOT NULL AND id <> NULL");
        assert_eq!(
            sql,
            "SELECT name FROM files WHERE name IS NOT NULL AND id <> NULL"
        );
        assert!(params.is_empty());
    }

    #[test]
    fn test_reals_and_large_numbers() {
        let (_, params) = run("SELECT name FROM files WHERE id > 1.5 OR id < 99999999999999999999");
        assert_eq!(
            params,
            vec![ParamValue::Real(1.5), ParamValue::Real(1e20)]
        );
    }

    #[test]
    fn test_existing_placeholders_are_kept() {
        let (sql, params) = run("SELECT name FROM files WHERE id = ?");
        assert_eq!(sql, "SELECT name FROM files WHERE id = ?");
        assert!(params.is_empty());
    }

    #[test]
    fn test_param_value_serializes_untagged() {
        let json = serde_json::to_string(&vec![
            ParamValue::Integer(1),
            ParamValue::Real(2.5),
            ParamValue::Text("x".into()),
        ])
        .unwrap();
        assert_eq!(json, r#"[1,2.5,"x"]"#);
    }
}

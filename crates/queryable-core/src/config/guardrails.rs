//! Guardrail settings applied to every compiled query.

use serde::{Deserialize, Serialize};

/// Global guardrails configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailsConfig {
    /// LIMIT injected when a query has none.
    #[serde(default = "default_limit")]
    pub default_limit: u64,

    /// Upper bound for any requested LIMIT.
    #[serde(default = "default_max_limit")]
    pub max_limit: u64,

    /// Whether `SELECT *` / `t.*` is accepted (it is expanded to the allowed columns).
    #[serde(default = "default_true")]
    pub allow_wildcard: bool,

    /// Whether subqueries in expressions (`IN (SELECT ..)`, `EXISTS`, scalar) are accepted.
    #[serde(default)]
    pub allow_subqueries: bool,

    /// SQL functions generated queries may call.
    #[serde(default = "default_functions")]
    pub functions: Vec<String>,
}

impl Default for GuardrailsConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            allow_wildcard: true,
            allow_subqueries: false,
            functions: default_functions(),
        }
    }
}

fn default_limit() -> u64 {
    100
}

fn default_max_limit() -> u64 {
    200
}

fn default_true() -> bool {
    true
}

fn default_functions() -> Vec<String> {
    [
        // aggregates
        "count",
        "sum",
        "avg",
        "min",
        "max",
        "total",
        "group_concat",
        // strings
        "lower",
        "upper",
        "length",
        "trim",
        "ltrim",
        "rtrim",
        "substr",
        "replace",
        "instr",
        // null handling / math
        "coalesce",
        "ifnull",
        "nullif",
        "abs",
        "round",
        // date and time
        "date",
        "time",
        "datetime",
        "julianday",
        "strftime",
        "current_date",
        "current_time",
        "current_timestamp",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

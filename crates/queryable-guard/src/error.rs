//! Error types for the guardrail.

use thiserror::Error;

/// Errors that can occur while compiling untrusted SQL.
///
/// Messages name the offending construct or identifier but never echo the
/// input text or any literal value from it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    /// The text is not valid SQL.
    #[error("could not understand query: {message}")]
    Parse {
        /// The original input, kept for the caller. Not part of the message.
        sql: String,
        message: String,
    },

    /// The statement is not a single flat SELECT, or uses a construct the
    /// guardrail does not accept.
    #[error("unsupported statement: {kind}")]
    UnsupportedStatement { kind: String },

    /// Query references a table outside the policy.
    #[error("access to table {name} is not allowed")]
    DisallowedTable { name: String },

    /// Query references a column outside the policy.
    #[error("access to column {table}.{column} is not allowed")]
    DisallowedColumn { table: String, column: String },

    /// Join between two tables does not use a whitelisted key pair.
    #[error("join between {left} and {right} is not allowed")]
    DisallowedJoin { left: String, right: String },

    /// A name could refer to more than one table or column.
    #[error("ambiguous reference: {name}")]
    AmbiguousReference { name: String },

    /// Function call outside the allow-list.
    #[error("function {name} is not allowed")]
    DisallowedFunction { name: String },

    /// LIMIT is not a non-negative integer constant.
    #[error("invalid LIMIT: {reason}")]
    InvalidLimit { reason: String },
}

impl GuardError {
    pub(crate) fn parse(sql: &str, message: impl Into<String>) -> Self {
        GuardError::Parse {
            sql: sql.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn unsupported(kind: impl Into<String>) -> Self {
        GuardError::UnsupportedStatement { kind: kind.into() }
    }

    pub(crate) fn disallowed_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        GuardError::DisallowedColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    pub(crate) fn invalid_limit(reason: impl Into<String>) -> Self {
        GuardError::InvalidLimit {
            reason: reason.into(),
        }
    }

    /// `"parse"` for malformed text, `"guardrail"` for policy violations.
    pub fn category(&self) -> &'static str {
        match self {
            GuardError::Parse { .. } => "parse",
            _ => "guardrail",
        }
    }
}

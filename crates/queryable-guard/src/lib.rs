//! # queryable-guard
//!
//! The guardrail between untrusted, generated SQL and execution.
//!
//! [`SqlCompiler::compile_safe_query`] takes raw SQL text and either returns a
//! [`CompiledQuery`] (rendered SQL with positional `?` placeholders plus the
//! ordered parameter values) or a typed [`GuardError`]. A compiled query:
//!
//! - is a single flat SELECT (no mutations, DDL, CTEs or set operations)
//! - only references tables, columns, join keys and functions the
//!   [`SchemaPolicy`](queryable_core::SchemaPolicy) allows
//! - carries no string or numeric literal from the input in its text
//! - has a LIMIT no larger than the policy maximum
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use queryable_core::SchemaPolicy;
//! use queryable_guard::{ParamValue, SqlCompiler};
//!
//! let policy = SchemaPolicy::builder()
//!     .table("files", ["id", "name", "created_at"])
//!     .build()
//!     .unwrap();
//! let compiler = SqlCompiler::new(Arc::new(policy));
//!
//! let compiled = compiler
//!     .compile_safe_query("SELECT name FROM files WHERE created_at > '2024-01-01'")
//!     .unwrap();
//! assert_eq!(compiled.sql, "SELECT name FROM files WHERE created_at > ? LIMIT 100");
//! assert_eq!(compiled.params, vec![ParamValue::Text("2024-01-01".into())]);
//! ```

pub mod alias;
pub mod compiler;
pub mod error;
pub mod expand;
pub mod limit;
pub mod parameterizer;
pub mod parser;
pub mod render;
pub mod scope;
pub mod tree;
pub mod validator;

pub use compiler::{CompiledQuery, SqlCompiler, compile_safe_query};
pub use error::GuardError;
pub use parameterizer::ParamValue;
pub use parser::SqlParser;
pub use scope::TableReference;
pub use tree::ExpressionTree;
pub use validator::StatementValidator;

//! # queryable-core
//!
//! Configuration and the schema policy shared by every queryable crate.
//!
//! The [`SchemaPolicy`] is the single source of truth for what generated SQL
//! may touch: allowed tables and columns, whitelisted join keys, callable
//! functions and the row-limit ceiling. It is loaded once, never mutated, and
//! read concurrently by any number of compilations.

pub mod config;
pub mod policy;

pub use config::{
    ConfigError, DatabaseConfig, GuardrailsConfig, JoinDefinition, QueryableConfig, SchemaConfig,
    TableDefinition,
};
pub use policy::{ColumnKey, JoinKey, SchemaPolicy, SchemaPolicyBuilder, TablePolicy};

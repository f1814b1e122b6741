//! Configuration types for the queryable guardrail.
//!
//! Configuration is loaded from a single YAML file (`queryable.yaml` by default)
//! and split into three sections:
//!
//! - **schema**: the tables, columns and join keys a generated query may touch
//! - **guardrails**: row limits, wildcard/subquery switches and the function allow-list
//! - **database**: where the SQLite store lives
//!
//! The `schema` and `guardrails` sections are turned into an immutable
//! [`SchemaPolicy`](crate::SchemaPolicy) once at startup.

pub mod database;
pub mod guardrails;
pub mod schema;

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub use database::DatabaseConfig;
pub use guardrails::GuardrailsConfig;
pub use schema::{JoinDefinition, SchemaConfig, TableDefinition, TableDefinitionFull};

use crate::policy::SchemaPolicy;

/// Environment variable that overrides the default configuration path.
pub const CONFIG_PATH_ENV: &str = "QUERYABLE_CONFIG";

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "queryable.yaml";

/// Complete queryable configuration loaded from a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryableConfig {
    /// Allowed schema (tables, columns, join keys).
    #[serde(default)]
    pub schema: SchemaConfig,

    /// Query guardrails.
    #[serde(default)]
    pub guardrails: GuardrailsConfig,

    /// SQLite store settings.
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl QueryableConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration and resolve relative paths against the file's directory.
    pub fn load_with_context(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = Self::from_file(path)?;

        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        if let Some(db_path) = &config.database.path {
            if db_path.is_relative() {
                config.database.path = Some(base_dir.join(db_path));
            }
        }

        tracing::debug!(
            path = %path.display(),
            tables = config.schema.tables.len(),
            joins = config.schema.joins.len(),
            "loaded configuration"
        );

        Ok(config)
    }

    /// Build the immutable schema policy described by this configuration.
    pub fn policy(&self) -> Result<SchemaPolicy, ConfigError> {
        SchemaPolicy::from_config(&self.schema, &self.guardrails)
    }
}

/// Resolve the configuration path: explicit argument, then `QUERYABLE_CONFIG`,
/// then `queryable.yaml` in the working directory.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    if let Ok(p) = env::var(CONFIG_PATH_ENV) {
        return PathBuf::from(p);
    }
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

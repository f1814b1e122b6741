//! CLI command implementations.

pub mod check;
pub mod compile;
pub mod describe;
pub mod query;

use std::path::Path;

use anyhow::{Context, Result};
use queryable_core::{QueryableConfig, SchemaPolicy};

/// Load the configuration file and build its policy.
pub fn load(config_path: &Path) -> Result<(QueryableConfig, SchemaPolicy)> {
    let config = QueryableConfig::load_with_context(config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;
    let policy = config
        .policy()
        .with_context(|| format!("Invalid schema policy in {:?}", config_path))?;
    Ok((config, policy))
}

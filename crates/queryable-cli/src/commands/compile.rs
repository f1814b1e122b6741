//! `queryable compile` command implementation.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use queryable_guard::SqlCompiler;

pub fn run(config_path: &Path, sql: &str) -> Result<()> {
    let (_, policy) = super::load(config_path)?;
    let compiler = SqlCompiler::new(Arc::new(policy));

    let compiled = compiler
        .compile_safe_query(sql)
        .map_err(|e| anyhow::anyhow!("{} error: {}", e.category(), e))?;

    let json = serde_json::to_string_pretty(&compiled).context("Failed to serialize result")?;
    println!("{}", json);
    Ok(())
}

//! `queryable query` command implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use queryable_adapter_sqlite::SqliteExecutor;
use queryable_guard::SqlCompiler;
use queryable_runtime::{NoopGenerator, QueryPipeline, TracingAuditSink};

pub async fn run(config_path: &Path, sql: &str, database: Option<PathBuf>) -> Result<()> {
    let (mut config, policy) = super::load(config_path)?;
    if database.is_some() {
        config.database.path = database;
    }

    let executor = SqliteExecutor::from_config(&config.database).await?;
    let pipeline = QueryPipeline::new(
        SqlCompiler::new(Arc::new(policy)),
        NoopGenerator,
        executor,
        TracingAuditSink,
    );

    let response = pipeline.run_sql(sql).await.map_err(|e| {
        if e.is_client_error() {
            anyhow::anyhow!("rejected: {}", e)
        } else {
            anyhow::anyhow!(e)
        }
    })?;

    let json = serde_json::to_string_pretty(&response).context("Failed to serialize response")?;
    println!("{}", json);
    Ok(())
}

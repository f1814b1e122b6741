//! SQLite execution for compiled queries.
//!
//! The pool is opened read-only, so even a statement that slipped past the
//! guardrail could not modify the store.

use std::path::Path;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use queryable_core::DatabaseConfig;
use queryable_guard::{CompiledQuery, ParamValue};
use queryable_runtime::executor::{QueryExecutor, Row, is_read_only_select};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

pub struct SqliteExecutor {
    pool: SqlitePool,
}

impl SqliteExecutor {
    /// Open a read-only pool over an existing database file.
    pub async fn connect(path: impl AsRef<Path>, max_connections: u32) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .create_if_missing(false);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| anyhow::anyhow!("failed to open {}: {}", path.display(), e))?;

        tracing::info!(path = %path.display(), max_connections, "Opened SQLite store");
        Ok(Self { pool })
    }

    pub async fn from_config(config: &DatabaseConfig) -> anyhow::Result<Self> {
        let path = config
            .path
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("database.path is not configured"))?;
        Self::connect(path, config.max_connections).await
    }

    /// Wrap an existing pool. The caller is responsible for its access mode.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueryExecutor for SqliteExecutor {
    async fn execute(&self, query: &CompiledQuery) -> anyhow::Result<Vec<Row>> {
        if !is_read_only_select(&query.sql) {
            anyhow::bail!("refusing to execute a statement that is not a single SELECT");
        }

        let mut statement = sqlx::query(&query.sql);
        for param in &query.params {
            statement = match param {
                ParamValue::Integer(v) => statement.bind(*v),
                ParamValue::Real(v) => statement.bind(*v),
                ParamValue::Text(v) => statement.bind(v.clone()),
            };
        }

        let rows = statement.fetch_all(&self.pool).await?;
        tracing::debug!(rows = rows.len(), "Fetched rows");
        rows.iter().map(row_to_json).collect()
    }
}

fn row_to_json(row: &SqliteRow) -> anyhow::Result<Row> {
    let mut out = Row::new();
    for (i, column) in row.columns().iter().enumerate() {
        out.insert(column.name().to_string(), cell_to_json(row, i)?);
    }
    Ok(out)
}

/// Map one cell by its runtime storage class.
fn cell_to_json(row: &SqliteRow, index: usize) -> anyhow::Result<Value> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_ascii_uppercase();

    let value = match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => Value::from(row.try_get_unchecked::<i64, _>(index)?),
        "REAL" => float_value(row.try_get_unchecked::<f64, _>(index)?),
        "NUMERIC" => match row.try_get_unchecked::<i64, _>(index) {
            Ok(v) => Value::from(v),
            Err(_) => float_value(row.try_get_unchecked::<f64, _>(index)?),
        },
        "BLOB" => Value::String(STANDARD.encode(row.try_get_unchecked::<Vec<u8>, _>(index)?)),
        _ => Value::String(row.try_get_unchecked::<String, _>(index)?),
    };
    Ok(value)
}

fn float_value(v: f64) -> Value {
    serde_json::Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

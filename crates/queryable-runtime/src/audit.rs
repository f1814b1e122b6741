//! Audit trail for compilations and executions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Where a request ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStage {
    /// The guardrail accepted the SQL.
    Compiled,
    /// The generator declined or the guardrail refused.
    Rejected,
    /// The compiled query ran.
    Executed,
    /// Generation or execution failed.
    Failed,
}

impl AuditStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStage::Compiled => "compiled",
            AuditStage::Rejected => "rejected",
            AuditStage::Executed => "executed",
            AuditStage::Failed => "failed",
        }
    }
}

/// One audit record.
///
/// Only rendered SQL is recorded, never the raw input or parameter values.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub stage: AuditStage,
    pub sql: Option<String>,
    pub param_count: usize,
    pub row_count: Option<usize>,
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn new(stage: AuditStage) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            stage,
            sql: None,
            param_count: 0,
            row_count: None,
            error: None,
        }
    }

    pub fn with_sql(mut self, sql: impl Into<String>, param_count: usize) -> Self {
        self.sql = Some(sql.into());
        self.param_count = param_count;
        self
    }

    pub fn with_rows(mut self, row_count: usize) -> Self {
        self.row_count = Some(row_count);
        self
    }

    pub fn with_error(mut self, error: impl ToString) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Emits each event as a structured `tracing` event on the `queryable::audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        tracing::info!(
            target: "queryable::audit",
            id = %event.id,
            timestamp = %event.timestamp.to_rfc3339(),
            stage = event.stage.as_str(),
            sql = event.sql.as_deref().unwrap_or(""),
            params = event.param_count,
            rows = event.row_count,
            error = event.error.as_deref(),
            "audit"
        );
    }
}

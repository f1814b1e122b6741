//! The query pipeline: generate, guard, execute.

use queryable_guard::{CompiledQuery, GuardError, ParamValue, SqlCompiler};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::audit::{AuditEvent, AuditSink, AuditStage};
use crate::executor::{QueryExecutor, Row};
use crate::generator::{Generation, SqlGenerator, generator_instructions};

/// What a caller gets back for an answered request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub sql: String,
    pub params: Vec<ParamValue>,
    pub data: Vec<Row>,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The generator found no safe translation. Raised before the guardrail runs.
    #[error("query not supported by allowed schema")]
    UnsupportedRequest,

    #[error(transparent)]
    Guard(#[from] GuardError),

    #[error("SQL generation failed: {0}")]
    Generation(anyhow::Error),

    #[error("query execution failed: {0}")]
    Execution(anyhow::Error),
}

impl PipelineError {
    /// Whether the request itself is at fault (as opposed to a collaborator).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::UnsupportedRequest | PipelineError::Guard(_)
        )
    }
}

/// Chains a [`SqlGenerator`], the guardrail and a [`QueryExecutor`],
/// recording every outcome to an [`AuditSink`].
pub struct QueryPipeline<G: SqlGenerator, E: QueryExecutor, S: AuditSink> {
    compiler: SqlCompiler,
    generator: G,
    executor: E,
    audit: S,
    instructions: String,
}

impl<G: SqlGenerator, E: QueryExecutor, S: AuditSink> QueryPipeline<G, E, S> {
    pub fn new(compiler: SqlCompiler, generator: G, executor: E, audit: S) -> Self {
        let instructions = generator_instructions(compiler.policy());
        Self {
            compiler,
            generator,
            executor,
            audit,
            instructions,
        }
    }

    /// The instruction context handed to the generator.
    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// Answer a natural-language request.
    pub async fn answer(&self, request: &str) -> Result<QueryResponse, PipelineError> {
        let generation = match self.generator.generate(request, &self.instructions).await {
            Ok(generation) => generation,
            Err(err) => {
                self.audit
                    .record(AuditEvent::new(AuditStage::Failed).with_error(format!("{err:#}")));
                return Err(PipelineError::Generation(err));
            }
        };

        match generation {
            Generation::Sql(sql) => self.run_sql(&sql).await,
            Generation::Unsupported => {
                info!("Generator declined request");
                self.audit.record(
                    AuditEvent::new(AuditStage::Rejected)
                        .with_error(PipelineError::UnsupportedRequest),
                );
                Err(PipelineError::UnsupportedRequest)
            }
        }
    }

    /// Compile and execute caller-supplied SQL.
    pub async fn run_sql(&self, sql: &str) -> Result<QueryResponse, PipelineError> {
        let compiled = self.compile(sql)?;

        match self.executor.execute(&compiled).await {
            Ok(data) => {
                info!(rows = data.len(), "Query executed");
                self.audit.record(
                    AuditEvent::new(AuditStage::Executed)
                        .with_sql(&compiled.sql, compiled.params.len())
                        .with_rows(data.len()),
                );
                Ok(QueryResponse {
                    sql: compiled.sql,
                    params: compiled.params,
                    data,
                })
            }
            Err(err) => {
                self.audit.record(
                    AuditEvent::new(AuditStage::Failed)
                        .with_sql(&compiled.sql, compiled.params.len())
                        .with_error(format!("{err:#}")),
                );
                Err(PipelineError::Execution(err))
            }
        }
    }

    fn compile(&self, sql: &str) -> Result<CompiledQuery, PipelineError> {
        let result = self.compiler.compile_safe_query(sql).and_then(|compiled| {
            // Placeholders written by the caller have no values to bind.
            if compiled.is_fully_bound() {
                Ok(compiled)
            } else {
                Err(GuardError::UnsupportedStatement {
                    kind: "UNBOUND PARAMETER".to_string(),
                })
            }
        });

        match result {
            Ok(compiled) => {
                self.audit.record(
                    AuditEvent::new(AuditStage::Compiled)
                        .with_sql(&compiled.sql, compiled.params.len()),
                );
                Ok(compiled)
            }
            Err(err) => {
                self.audit
                    .record(AuditEvent::new(AuditStage::Rejected).with_error(&err));
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(PipelineError::UnsupportedRequest.is_client_error());
        assert!(
            PipelineError::Guard(GuardError::DisallowedTable {
                name: "users".into()
            })
            .is_client_error()
        );
        assert!(!PipelineError::Execution(anyhow::anyhow!("disk I/O error")).is_client_error());
        assert!(!PipelineError::Generation(anyhow::anyhow!("timeout")).is_client_error());
    }

    #[test]
    fn test_guard_error_message_is_passed_through() {
        let err = PipelineError::from(GuardError::DisallowedColumn {
            table: "files".into(),
            column: "secret".into(),
        });
        assert_eq!(err.to_string(), "access to column files.secret is not allowed");
    }
}

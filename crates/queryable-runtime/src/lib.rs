//! # queryable-runtime
//!
//! The collaborators around the guardrail and the pipeline that chains them:
//! a [`SqlGenerator`] proposes SQL for a natural-language request, the
//! guardrail compiles it, and a [`QueryExecutor`] runs the compiled,
//! parameter-bound statement. Every outcome goes to an [`AuditSink`].

pub mod audit;
pub mod executor;
pub mod generator;
pub mod pipeline;

pub use audit::{AuditEvent, AuditSink, AuditStage, TracingAuditSink};
pub use executor::{QueryExecutor, Row, is_read_only_select};
pub use generator::{
    Generation, NoopGenerator, SqlGenerator, StaticGenerator, UNSUPPORTED_SENTINEL,
    generator_instructions,
};
pub use pipeline::{PipelineError, QueryPipeline, QueryResponse};

//! Natural-language to SQL generation contract.

use async_trait::async_trait;
use queryable_core::SchemaPolicy;

/// Marker a generator returns when no safe translation exists.
pub const UNSUPPORTED_SENTINEL: &str = "UNSUPPORTED";

/// What a generator produced for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    /// A single candidate SQL statement.
    Sql(String),
    /// The request cannot be answered from the allowed schema.
    Unsupported,
}

impl Generation {
    /// Interpret raw generator output.
    ///
    /// Strips Markdown code fences. Blank output, or output mentioning the
    /// sentinel anywhere, is [`Generation::Unsupported`].
    pub fn from_raw(raw: &str) -> Self {
        let sql = strip_code_fence(raw.trim());
        if sql.is_empty() || sql.to_ascii_uppercase().contains(UNSUPPORTED_SENTINEL) {
            Generation::Unsupported
        } else {
            Generation::Sql(sql.to_string())
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (```sql) with the first line.
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    body.trim_end().trim_end_matches('`').trim()
}

#[async_trait]
pub trait SqlGenerator: Send + Sync {
    /// Translate `request` into SQL under the given instructions.
    async fn generate(&self, request: &str, instructions: &str) -> anyhow::Result<Generation>;
}

/// Instruction context for a generator: rules, then the allowed schema.
///
/// Built from the same policy the compiler enforces.
pub fn generator_instructions(policy: &SchemaPolicy) -> String {
    format!(
        "You translate questions into SQL for a SQLite database.\n\
         \n\
         Reply with raw SQL only: no Markdown, no backticks, no commentary.\n\
         \n\
         Rules:\n\
         - Use only the tables and columns listed below.\n\
         - Write a single SELECT statement.\n\
         - Join tables only on the listed relationships.\n\
         - If the question cannot be answered from this schema, reply exactly: SELECT '{sentinel}' AS error;\n\
         - Always include LIMIT, at most {max}.\n\
         \n\
         Allowed schema:\n\
         {schema}",
        sentinel = UNSUPPORTED_SENTINEL,
        max = policy.max_limit(),
        schema = policy.describe(),
    )
}

/// Always returns the same raw response. Useful for tests and the CLI.
#[derive(Debug, Clone)]
pub struct StaticGenerator {
    response: String,
}

impl StaticGenerator {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[async_trait]
impl SqlGenerator for StaticGenerator {
    async fn generate(&self, _request: &str, _instructions: &str) -> anyhow::Result<Generation> {
        Ok(Generation::from_raw(&self.response))
    }
}

/// Declines every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopGenerator;

#[async_trait]
impl SqlGenerator for NoopGenerator {
    async fn generate(&self, _request: &str, _instructions: &str) -> anyhow::Result<Generation> {
        Ok(Generation::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_raw_plain_sql() {
        assert_eq!(
            Generation::from_raw("  SELECT name FROM files;\n"),
            Generation::Sql("SELECT name FROM files;".into())
        );
    }

    #[test]
    fn test_from_raw_strips_fences() {
        assert_eq!(
            Generation::from_raw("```sql\nSELECT name FROM files\n```"),
            Generation::Sql("SELECT name FROM files".into())
        );
        assert_eq!(
            Generation::from_raw("```\nSELECT id FROM files\n```\n"),
            Generation::Sql("SELECT id FROM files".into())
        );
    }

    #[test]
    fn test_from_raw_sentinel() {
        assert_eq!(
            Generation::from_raw("SELECT 'UNSUPPORTED' AS error;"),
            Generation::Unsupported
        );
        assert_eq!(
            Generation::from_raw("select 'unsupported' as error"),
            Generation::Unsupported
        );
        assert_eq!(Generation::from_raw("   "), Generation::Unsupported);
    }

    #[test]
    fn test_instructions_embed_policy() {
        let policy = SchemaPolicy::builder()
            .table("files", ["id", "name", "created_at"])
            .max_limit(50)
            .default_limit(10)
            .build()
            .unwrap();
        let instructions = generator_instructions(&policy);
        assert!(instructions.contains("SELECT 'UNSUPPORTED' AS error;"));
        assert!(instructions.contains("at most 50"));
        assert!(instructions.ends_with(&policy.describe()));
    }
}

//! The safe-query compiler: parse, validate, rewrite, render.

use std::sync::Arc;

use queryable_core::SchemaPolicy;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::alias::inline_output_aliases;
use crate::error::GuardError;
use crate::expand::expand_wildcards;
use crate::limit::enforce_limit;
use crate::parameterizer::{ParamValue, parameterize};
use crate::parser::SqlParser;
use crate::render::render;
use crate::validator::{StatementValidator, referenced_tables};

/// Rendered SQL plus its positional parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<ParamValue>,
}

impl CompiledQuery {
    /// Number of `?` placeholders in `sql`.
    ///
    /// Equal to `params.len()` unless the input already contained placeholders.
    pub fn placeholder_count(&self) -> usize {
        let mut count = 0;
        let mut quote: Option<char> = None;
        for c in self.sql.chars() {
            match quote {
                Some(q) if c == q => quote = None,
                Some(_) => {}
                None if c == '\'' || c == '"' => quote = Some(c),
                None if c == '?' => count += 1,
                None => {}
            }
        }
        count
    }

    /// Whether every placeholder has a value.
    pub fn is_fully_bound(&self) -> bool {
        self.placeholder_count() == self.params.len()
    }
}

/// Compiles untrusted SQL against a shared, immutable [`SchemaPolicy`].
///
/// Stateless apart from the policy; safe to share across threads.
#[derive(Debug, Clone)]
pub struct SqlCompiler {
    parser: SqlParser,
    policy: Arc<SchemaPolicy>,
}

impl SqlCompiler {
    pub fn new(policy: Arc<SchemaPolicy>) -> Self {
        Self {
            parser: SqlParser::new(),
            policy,
        }
    }

    pub fn policy(&self) -> &SchemaPolicy {
        &self.policy
    }

    /// Compile one statement into a parameter-bound, policy-conforming query.
    ///
    /// Any failure aborts the whole compilation; there is no partial output.
    ///
    /// Compiling the rendered `sql` of a previous result again yields the same
    /// `sql` but an empty `params`, since its `?` placeholders pass through
    /// unbound. The two [`CompiledQuery`] values are therefore not equal;
    /// compare their `sql` fields instead.
    pub fn compile_safe_query(&self, sql: &str) -> Result<CompiledQuery, GuardError> {
        match self.compile(sql) {
            Ok((compiled, tables, limit)) => {
                debug!(
                    tables = tables,
                    params = compiled.params.len(),
                    limit = limit,
                    "Compiled query"
                );
                Ok(compiled)
            }
            Err(err) => {
                warn!(category = err.category(), error = %err, "Query rejected");
                Err(err)
            }
        }
    }

    fn compile(&self, sql: &str) -> Result<(CompiledQuery, usize, u64), GuardError> {
        let mut tree = self.parser.parse(sql)?;
        inline_output_aliases(&mut tree, &self.policy);
        StatementValidator::new(&self.policy).validate(&tree)?;
        let tables = referenced_tables(&tree.query).len();

        expand_wildcards(&mut tree, &self.policy)?;
        let params = parameterize(&mut tree, sql)?;
        let limit = enforce_limit(
            &mut tree,
            self.policy.default_limit(),
            self.policy.max_limit(),
        );

        let compiled = CompiledQuery {
            sql: render(&tree),
            params,
        };
        Ok((compiled, tables, limit))
    }
}

/// One-shot compilation without constructing a [`SqlCompiler`].
pub fn compile_safe_query(policy: &SchemaPolicy, sql: &str) -> Result<CompiledQuery, GuardError> {
    SqlCompiler::new(Arc::new(policy.clone())).compile_safe_query(sql)
}

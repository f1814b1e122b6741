//! `queryable check` command implementation.
//!
//! Loads the configuration, builds the policy (which rejects inconsistent
//! schemas outright) and reports softer findings on top.

use std::path::Path;

use anyhow::Result;
use queryable_core::{QueryableConfig, SchemaPolicy};

/// Severity level for check results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARN"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckFinding {
    pub severity: Severity,
    pub message: String,
}

impl CheckFinding {
    fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

pub fn run(config_path: &Path) -> Result<()> {
    let (config, policy) = super::load(config_path)?;

    println!("Configuration: {}", config_path.display());
    for finding in findings(&config, &policy) {
        println!("  [{}] {}", finding.severity, finding.message);
    }
    println!("OK");
    Ok(())
}

pub fn findings(config: &QueryableConfig, policy: &SchemaPolicy) -> Vec<CheckFinding> {
    let mut out = Vec::new();

    let tables = policy.tables().count();
    out.push(CheckFinding::info(format!(
        "{} table(s), {} join key(s), LIMIT default {} / max {}",
        tables,
        policy.joins().len(),
        policy.default_limit(),
        policy.max_limit()
    )));

    if tables > 1 && policy.joins().is_empty() {
        out.push(CheckFinding::warning(
            "several tables but no join keys; joins will always be rejected",
        ));
    }
    for table in policy.tables() {
        if table.description().is_none() {
            out.push(CheckFinding::info(format!(
                "table '{}' has no description",
                table.name()
            )));
        }
    }
    if policy.allow_subqueries() {
        out.push(CheckFinding::info("subqueries are enabled"));
    }
    match &config.database.path {
        None => out.push(CheckFinding::warning(
            "database.path is not set; `query` needs --database",
        )),
        Some(path) if !path.exists() => out.push(CheckFinding::warning(format!(
            "database file {} does not exist",
            path.display()
        ))),
        Some(_) => {}
    }

    out
}

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "queryable", version, about = "Schema-aware SQL guardrail")]
struct Cli {
    /// Configuration file. Defaults to $QUERYABLE_CONFIG, then ./queryable.yaml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile SQL through the guardrail and print the result as JSON.
    Compile {
        /// Candidate SQL text
        sql: String,
    },

    /// Print the allowed schema.
    Describe {
        /// Print the full generator instructions instead of the schema alone
        #[arg(long, default_value_t = false)]
        instructions: bool,
    },

    /// Compile SQL and execute it against the SQLite store.
    Query {
        /// Candidate SQL text
        sql: String,

        /// SQLite file. Overrides database.path from the configuration.
        #[arg(long)]
        database: Option<PathBuf>,
    },

    /// Validate the configuration and print a summary.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = queryable_core::config::config_path(cli.config.as_deref());

    match cli.cmd {
        Command::Compile { sql } => commands::compile::run(&config_path, &sql),
        Command::Describe { instructions } => commands::describe::run(&config_path, instructions),
        Command::Query { sql, database } => {
            commands::query::run(&config_path, &sql, database).await
        }
        Command::Check => commands::check::run(&config_path),
    }
}

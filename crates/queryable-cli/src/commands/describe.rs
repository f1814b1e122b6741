//! `queryable describe` command implementation.

use std::path::Path;

use anyhow::Result;
use queryable_runtime::generator_instructions;

pub fn run(config_path: &Path, instructions: bool) -> Result<()> {
    let (_, policy) = super::load(config_path)?;
    if instructions {
        println!("{}", generator_instructions(&policy));
    } else {
        println!("{}", policy.describe());
    }
    Ok(())
}

//! Discover command implementation.
//!
//! Runs the full discovery pipeline once and prints the resulting table.
//! The output file can be inspected or diffed between builds of the target;
//! it is never loaded back in place of discovery.

use anyhow::Result;
use remscope_core::offset::save_table;
use remscope_core::{Config, discover, format_table};
use tracing::info;

use crate::cli_utils::open_process;

pub fn run(
    config: &Config,
    process: Option<&str>,
    pid: Option<i32>,
    json: bool,
    output: Option<&str>,
) -> Result<()> {
    let memory = open_process(config, process, pid)?;

    let table = discover(&memory)?;
    info!("Discovered {} offsets", table.entries().len());

    if json {
        println!("{}", serde_json::to_string_pretty(&table)?);
    } else {
        print!("{}", format_table(&table));
    }

    if let Some(path) = output {
        save_table(path, &table)?;
        println!("Offsets saved to {}", path);
    }

    Ok(())
}

//! Scan command implementation.

use anyhow::{Context, Result};
use remscope_core::image::scan_module_all;
use remscope_core::{Config, Pattern};

use crate::cli_utils::{format_location, open_process};

/// Print every match of `pattern` in `module`.
///
/// More than one hit means the signature is ambiguous and discovery would
/// silently take the first.
pub fn run(
    config: &Config,
    module: &str,
    pattern: &str,
    process: Option<&str>,
    pid: Option<i32>,
) -> Result<()> {
    let memory = open_process(config, process, pid)?;

    let base = memory
        .module_base(module)
        .with_context(|| format!("{} is not loaded", module))?;
    let compiled = Pattern::compile(pattern);

    let hits = scan_module_all(&memory, base, &compiled);
    println!("{} match(es) in {}", hits.len(), module);
    for hit in hits {
        println!("  {}", format_location(base.get(), hit.get()));
    }

    Ok(())
}

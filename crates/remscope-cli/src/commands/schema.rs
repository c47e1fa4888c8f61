//! Schema command implementation.
//!
//! Walks the target's reflection registry and prints either every class of
//! one scope or the fields of a single class.

use anyhow::{Context, Result, bail};
use remscope_core::layout::target::SCHEMA_LIB;
use remscope_core::{Config, Schema};

use crate::cli_utils::open_process;

pub fn run(
    config: &Config,
    scope: &str,
    class: Option<&str>,
    process: Option<&str>,
    pid: Option<i32>,
) -> Result<()> {
    let memory = open_process(config, process, pid)?;

    let base = memory
        .module_base(SCHEMA_LIB)
        .with_context(|| format!("{} is not loaded", SCHEMA_LIB))?;
    let schema = Schema::build(&memory, base).context("Reflection registry not found")?;
    println!(
        "{} scopes, {} classes",
        schema.scopes().count(),
        schema.class_count()
    );

    let Some(module_scope) = schema.scope(scope) else {
        let mut known: Vec<&str> = schema.scopes().map(|s| s.name()).collect();
        known.sort_unstable();
        bail!("Scope {} not found (known: {})", scope, known.join(", "));
    };

    match class {
        Some(name) => {
            let class = module_scope
                .class(name)
                .with_context(|| format!("Class {} not found in {}", name, scope))?;
            println!("{} (size {:#x})", class.name(), class.size());
            let mut fields = class.fields();
            fields.sort_by_key(|&(_, offset)| offset);
            for (field, offset) in fields {
                println!("  {:#06x} {}", offset, field);
            }
        }
        None => {
            let mut classes: Vec<_> = module_scope.classes().collect();
            classes.sort_by(|a, b| a.name().cmp(b.name()));
            for class in classes {
                println!(
                    "{:<48} size {:#x}, {} fields",
                    class.name(),
                    class.size(),
                    class.field_count()
                );
            }
        }
    }

    Ok(())
}

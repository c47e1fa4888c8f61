//! Modules command implementation.

use anyhow::Result;
use remscope_core::layout::target::LIBRARIES;
use remscope_core::{Config, module_size};

use crate::cli_utils::open_process;

pub fn run(config: &Config, process: Option<&str>, pid: Option<i32>) -> Result<()> {
    let memory = open_process(config, process, pid)?;

    let modules = memory.modules()?;
    println!("{} modules mapped", modules.len());
    for (name, base) in &modules {
        let marker = if LIBRARIES.contains(&name.as_str()) { "*" } else { " " };
        let size = module_size(&memory, *base);
        if size > 0 {
            println!("{} {:<40} {} size {:#x}", marker, name, base, size);
        } else {
            println!("{} {:<40} {}", marker, name, base);
        }
    }

    for library in LIBRARIES {
        if memory.module_base(library).is_none() {
            println!("missing: {}", library);
        }
    }

    println!("Address range: {}", memory.address_range());
    Ok(())
}

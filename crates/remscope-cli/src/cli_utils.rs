//! Common CLI utility functions shared across commands.

use std::path::Path;

use anyhow::{Context, Result};
use remscope_core::{
    Config, NamedProcessProvider, PidProcessProvider, ProcessProvider, RemoteMemory,
};
use tracing::info;

/// Load the config file, or defaults when no path was given.
pub fn load_config(path: Option<&str>) -> Result<Config> {
    match path {
        Some(path) => {
            let config = Config::load(Path::new(path))
                .with_context(|| format!("Failed to load config from {}", path))?;
            info!("Loaded config from {}", path);
            Ok(config)
        }
        None => Ok(Config::default()),
    }
}

/// Open the target by PID, or by name (falling back to the configured one).
pub fn open_process(config: &Config, process: Option<&str>, pid: Option<i32>) -> Result<RemoteMemory> {
    let memory = if let Some(pid) = pid {
        println!("Opening process with PID {}...", pid);
        PidProcessProvider::new(pid).access(config.access()).attach()?
    } else {
        let name = process.unwrap_or(&config.process_name);
        println!("Searching for {}...", name);
        NamedProcessProvider::new(name)
            .access(config.access())
            .attach()?
    };
    println!("Attached to PID {}", memory.pid());
    Ok(memory)
}

/// Absolute address followed by its distance from `base`.
pub fn format_location(base: u64, address: u64) -> String {
    format!("{:#x} (+{:#x})", address, address.wrapping_sub(base))
}

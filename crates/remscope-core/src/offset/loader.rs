use std::fs;
use std::path::Path;

use tracing::warn;

use crate::error::{Error, Result};
use crate::offset::table::{OffsetTable, Resolved};

/// Write a discovered table as `group.field = 0x...` lines.
pub fn save_table<P: AsRef<Path>>(path: P, table: &OffsetTable) -> Result<()> {
    fs::write(path, format_table(table))?;
    Ok(())
}

/// Read a table written by [`save_table`].
///
/// Meant for inspecting a previous run; live sessions always rediscover.
pub fn load_table<P: AsRef<Path>>(path: P) -> Result<OffsetTable> {
    let content = fs::read_to_string(&path)?;
    parse_table(&content)
}

pub fn format_table(table: &OffsetTable) -> String {
    table
        .entries()
        .into_iter()
        .map(|(key, value)| format!("{} = {:#x}", key, value))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn parse_table(content: &str) -> Result<OffsetTable> {
    let mut resolved = Resolved::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            warn!("Ignoring malformed offset line: '{}'", line);
            continue;
        };
        let key = key.trim();
        if !key.contains('.') {
            warn!("Unknown offset key: '{}' (value: {})", key, value.trim());
            continue;
        }
        resolved.insert(key, parse_hex_value(value)?);
    }

    Ok(OffsetTable::from_resolved(&resolved)?)
}

fn parse_hex_value(value: &str) -> Result<u64> {
    let value = value.trim();
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);

    u64::from_str_radix(digits, 16)
        .map_err(|e| Error::ConfigParseError(format!("Failed to parse '{}': {}", value, e)))
}

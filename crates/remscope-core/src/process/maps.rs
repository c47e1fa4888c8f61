//! `/proc` helpers: process lookup by executable name and module bases.

use std::path::Path;

use tracing::debug;

use crate::address::RemoteAddress;
use crate::error::Result;

/// One line of `/proc/<pid>/maps`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    pub start: u64,
    pub end: u64,
    pub perms: String,
    pub offset: u64,
    pub path: String,
}

impl MapEntry {
    /// Final path component, empty for anonymous mappings.
    pub fn file_name(&self) -> &str {
        basename(&self.path)
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Parse a maps line such as
/// `7f8a1000-7f8a2000 r-xp 00000000 08:01 12345  /lib/libc.so.6`.
pub fn parse_map_line(line: &str) -> Option<MapEntry> {
    let mut parts = line.splitn(6, char::is_whitespace);

    let range = parts.next()?;
    let perms = parts.next()?;
    let offset = parts.next()?;
    let _dev = parts.next()?;
    let _inode = parts.next()?;
    let path = parts.next().unwrap_or("").trim().to_string();

    let (start, end) = range.split_once('-')?;
    if perms.len() < 4 {
        return None;
    }

    Some(MapEntry {
        start: u64::from_str_radix(start, 16).ok()?,
        end: u64::from_str_radix(end, 16).ok()?,
        perms: perms.to_string(),
        offset: u64::from_str_radix(offset, 16).ok()?,
        path,
    })
}

pub fn parse_maps(content: &str) -> Vec<MapEntry> {
    content.lines().filter_map(parse_map_line).collect()
}

pub fn read_maps(pid: i32) -> Result<Vec<MapEntry>> {
    let content = std::fs::read_to_string(format!("/proc/{}/maps", pid))?;
    Ok(parse_maps(&content))
}

/// Start of the first mapping whose file name equals `name`.
pub fn module_base_in(entries: &[MapEntry], name: &str) -> Option<RemoteAddress> {
    entries
        .iter()
        .find(|entry| entry.file_name() == name)
        .map(|entry| RemoteAddress::new(entry.start))
}

/// Every file-backed module with its lowest mapping, in maps order.
pub fn modules_in(entries: &[MapEntry]) -> Vec<(String, RemoteAddress)> {
    let mut modules: Vec<(String, RemoteAddress)> = Vec::new();
    for entry in entries {
        if !entry.path.starts_with('/') {
            continue;
        }
        let name = entry.file_name();
        if modules.iter().any(|(known, _)| known == name) {
            continue;
        }
        modules.push((name.to_string(), RemoteAddress::new(entry.start)));
    }
    modules
}

/// Find a pid whose `/proc/<pid>/exe` link resolves to a file named `name`.
pub fn find_pid(name: &str) -> Option<i32> {
    find_pid_in(Path::new("/proc"), name)
}

fn find_pid_in(proc_root: &Path, name: &str) -> Option<i32> {
    let entries = match std::fs::read_dir(proc_root) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot list {}: {}", proc_root.display(), e);
            return None;
        }
    };

    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let Some(pid) = file_name.to_str().and_then(|s| s.parse::<i32>().ok()) else {
            continue;
        };
        let Ok(exe) = std::fs::read_link(entry.path().join("exe")) else {
            continue;
        };
        if exe.file_name().and_then(|n| n.to_str()) == Some(name) {
            return Some(pid);
        }
    }

    None
}

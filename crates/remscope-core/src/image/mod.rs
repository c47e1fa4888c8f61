//! ELF loader-view parsing over remote memory.
//!
//! Works on the image as the dynamic loader left it mapped: header fields at
//! their file offsets, `PT_DYNAMIC` pointing at relocated `DT_*` entries, and
//! a symbol table whose values are relative to the module base.

mod elf;

use serde::Serialize;
use tracing::{debug, trace};

use crate::address::RemoteAddress;
use crate::layout::elf::{
    DT_NULL, DT_STRTAB, DT_SYMTAB, DYNAMIC_ENTRY_SIZE, PHDR_VADDR, PT_DYNAMIC, SYMBOL_ENTRY_SIZE,
    SYMBOL_VALUE,
};
use crate::layout::limits::{MAX_DYNAMIC_ENTRIES, MAX_MODULE_DUMP, MAX_SYMBOL_SCAN, MIN_DUMP_SIZE};
use crate::pattern::Pattern;
use crate::process::ReadMemory;

pub use elf::ElfHeader;

/// A loaded module. The size is not stored; see [`module_size`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Module {
    pub name: String,
    pub base: RemoteAddress,
}

impl Module {
    pub fn new(name: impl Into<String>, base: RemoteAddress) -> Self {
        Self {
            name: name.into(),
            base,
        }
    }

    pub fn size<R: ReadMemory>(&self, reader: &R) -> u64 {
        module_size(reader, self.base)
    }
}

/// Approximate image size: end of the section header table. 0 if not ELF.
pub fn module_size<R: ReadMemory>(reader: &R, base: RemoteAddress) -> u64 {
    ElfHeader::read(reader, base)
        .map(|header| header.image_size())
        .unwrap_or(0)
}

/// Copy of the whole module, best effort, capped at `MAX_MODULE_DUMP`.
pub fn dump_module<R: ReadMemory>(reader: &R, base: RemoteAddress) -> Vec<u8> {
    let size = module_size(reader, base);
    if size > MAX_MODULE_DUMP {
        debug!(
            "Module at {} claims {} bytes, dumping the first {}",
            base, size, MAX_MODULE_DUMP
        );
    }
    let size = size.min(MAX_MODULE_DUMP) as usize;
    if size == 0 {
        return Vec::new();
    }
    reader.read_bytes(base, size)
}

/// First match of `pattern` inside the module.
///
/// Dumps under 500 bytes are treated as an unreadable module.
pub fn scan_module<R: ReadMemory>(
    reader: &R,
    base: RemoteAddress,
    pattern: &Pattern,
) -> Option<RemoteAddress> {
    scan_dump(base, &dump_module(reader, base), pattern)
}

/// First match of `pattern` in a dump taken at `base`, for callers that scan
/// one module with several patterns.
pub fn scan_dump(base: RemoteAddress, dump: &[u8], pattern: &Pattern) -> Option<RemoteAddress> {
    if dump.len() < MIN_DUMP_SIZE {
        debug!("Module at {} too small to scan ({} bytes)", base, dump.len());
        return None;
    }
    pattern.scan(dump).map(|offset| base + offset as u64)
}

/// Every match of `pattern` inside the module.
pub fn scan_module_all<R: ReadMemory>(
    reader: &R,
    base: RemoteAddress,
    pattern: &Pattern,
) -> Vec<RemoteAddress> {
    let dump = dump_module(reader, base);
    if dump.len() < MIN_DUMP_SIZE {
        return Vec::new();
    }
    pattern
        .scan_all(&dump)
        .into_iter()
        .map(|offset| base + offset as u64)
        .collect()
}

/// First program header whose `p_type` equals `p_type`.
pub fn segment_by_type<R: ReadMemory>(
    reader: &R,
    base: RemoteAddress,
    p_type: u32,
) -> Option<RemoteAddress> {
    let header = ElfHeader::read(reader, base)?;
    (0..header.phnum)
        .map(|index| header.program_header(base, index))
        .find(|&entry| reader.read::<u32>(entry) == p_type)
}

/// Value of the first `PT_DYNAMIC` entry tagged `tag`.
pub fn dynamic_entry<R: ReadMemory>(reader: &R, base: RemoteAddress, tag: u64) -> Option<u64> {
    let segment = segment_by_type(reader, base, PT_DYNAMIC)?;
    let first = base + reader.read::<u64>(segment + PHDR_VADDR);

    for index in 0..MAX_DYNAMIC_ENTRIES as u64 {
        let entry = first + index * DYNAMIC_ENTRY_SIZE;
        match reader.read::<u64>(entry) {
            DT_NULL => break,
            found if found == tag => return Some(reader.read::<u64>(entry + 8)),
            _ => {}
        }
    }

    None
}

/// Address of the exported symbol named exactly `name`.
///
/// The walk starts after the null symbol and stops at the first record with
/// a zero name offset, or after `MAX_SYMBOL_SCAN` records.
pub fn module_export<R: ReadMemory>(
    reader: &R,
    base: RemoteAddress,
    name: &str,
) -> Option<RemoteAddress> {
    if name.is_empty() {
        return None;
    }
    let strings = RemoteAddress::new(dynamic_entry(reader, base, DT_STRTAB)?);
    let symbols = RemoteAddress::new(dynamic_entry(reader, base, DT_SYMTAB)?);

    let mut expected = name.as_bytes().to_vec();
    expected.push(0);

    for index in 1..MAX_SYMBOL_SCAN as u64 {
        let record = symbols + index * SYMBOL_ENTRY_SIZE;
        let name_offset = reader.read::<u32>(record);
        if name_offset == 0 {
            trace!("Symbol table at {} ended after {} records", symbols, index);
            break;
        }
        if reader.read_bytes(strings + u64::from(name_offset), expected.len()) == expected {
            return Some(base + reader.read::<u64>(record + SYMBOL_VALUE));
        }
    }

    None
}

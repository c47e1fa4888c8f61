//! Mock memory and process for testing
//!
//! Provides an in-memory [`ReadMemory`] implementation, a builder for laying
//! out remote structures byte by byte, a [`MockProcess`] that pairs such a
//! buffer with a module table, and [`MockElf`] for synthesizing the loader
//! view of a shared library.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::address::{AddressRange, RemoteAddress};
use crate::error::{Error, Result};
use crate::layout::elf;
use crate::process::plain::Plain;
use crate::process::provider::{ProcessProvider, RemoteProcess};
use crate::process::reader::{ReadMemory, WriteMemory};

/// Mock memory reader for testing
///
/// Reads from an in-memory buffer mapped at `base`. Writes land in the same
/// buffer.
#[derive(Debug)]
pub struct MockMemoryReader {
    data: RwLock<Vec<u8>>,
    base: u64,
}

impl MockMemoryReader {
    /// Create a new mock reader with the given data at base address 0x1000
    pub fn new(data: Vec<u8>) -> Self {
        Self::with_base(data, 0x1000)
    }

    pub fn with_base(data: Vec<u8>, base: u64) -> Self {
        Self {
            data: RwLock::new(data),
            base,
        }
    }

    pub fn base(&self) -> RemoteAddress {
        RemoteAddress::new(self.base)
    }

    pub fn len(&self) -> usize {
        self.data.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn span(&self, address: RemoteAddress, size: usize, len: usize) -> Result<usize> {
        if address.get() < self.base {
            return Err(Error::read_failed(
                address,
                format!("Address below base (base=0x{:X})", self.base),
            ));
        }
        let offset = (address.get() - self.base) as usize;
        match offset.checked_add(size) {
            Some(end) if end <= len => Ok(offset),
            _ => Err(Error::read_failed(
                address,
                format!("Out of bounds: offset={}, size={}, len={}", offset, size, len),
            )),
        }
    }
}

impl Clone for MockMemoryReader {
    fn clone(&self) -> Self {
        let data = self.data.read().map(|d| d.clone()).unwrap_or_default();
        Self::with_base(data, self.base)
    }
}

impl ReadMemory for MockMemoryReader {
    fn try_read_bytes(&self, address: RemoteAddress, size: usize) -> Result<Vec<u8>> {
        let data = self
            .data
            .read()
            .map_err(|_| Error::read_failed(address, "Mock buffer poisoned"))?;
        let offset = self.span(address, size, data.len())?;
        Ok(data[offset..offset + size].to_vec())
    }
}

impl WriteMemory for MockMemoryReader {
    fn try_write_bytes(&self, address: RemoteAddress, bytes: &[u8]) -> Result<()> {
        let mut data = self
            .data
            .write()
            .map_err(|_| Error::write_failed(address, "Mock buffer poisoned"))?;
        let len = data.len();
        let offset = self
            .span(address, bytes.len(), len)
            .map_err(|e| Error::write_failed(address, e.to_string()))?;
        data[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

/// Builder for creating test memory buffers
///
/// Offsets are relative to the base address. The consuming `write_*` methods
/// chain; the `put_*` methods work through `&mut` for fixtures that lay out
/// memory in loops.
#[derive(Debug, Clone)]
pub struct MockMemoryBuilder {
    data: Vec<u8>,
    base: u64,
}

impl Default for MockMemoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMemoryBuilder {
    /// Create a new builder with default base address (0x1000)
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            base: 0x1000,
        }
    }

    pub fn base(mut self, base: u64) -> Self {
        self.base = base;
        self
    }

    /// Pre-allocate buffer with zeros up to the specified size
    pub fn with_size(mut self, size: usize) -> Self {
        self.ensure_size(size);
        self
    }

    /// Absolute address of `offset` in the built reader.
    pub fn address_of(&self, offset: usize) -> RemoteAddress {
        RemoteAddress::new(self.base + offset as u64)
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn put_value<T: Plain>(&mut self, offset: usize, value: T) -> &mut Self {
        self.put_bytes(offset, &value.to_le_vec())
    }

    pub fn put_bytes(&mut self, offset: usize, bytes: &[u8]) -> &mut Self {
        self.ensure_size(offset + bytes.len());
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        self
    }

    /// NUL-terminated string
    pub fn put_cstring(&mut self, offset: usize, text: &str) -> &mut Self {
        self.put_bytes(offset, text.as_bytes());
        self.put_value(offset + text.len(), 0u8)
    }

    pub fn write_value<T: Plain>(mut self, offset: usize, value: T) -> Self {
        self.put_value(offset, value);
        self
    }

    pub fn write_i16(self, offset: usize, value: i16) -> Self {
        self.write_value(offset, value)
    }

    pub fn write_i32(self, offset: usize, value: i32) -> Self {
        self.write_value(offset, value)
    }

    pub fn write_u32(self, offset: usize, value: u32) -> Self {
        self.write_value(offset, value)
    }

    pub fn write_u64(self, offset: usize, value: u64) -> Self {
        self.write_value(offset, value)
    }

    pub fn write_address(self, offset: usize, value: RemoteAddress) -> Self {
        self.write_value(offset, value)
    }

    pub fn write_bytes(mut self, offset: usize, bytes: &[u8]) -> Self {
        self.put_bytes(offset, bytes);
        self
    }

    pub fn write_cstring(mut self, offset: usize, text: &str) -> Self {
        self.put_cstring(offset, text);
        self
    }

    pub fn build(self) -> MockMemoryReader {
        MockMemoryReader::with_base(self.data, self.base)
    }

    fn ensure_size(&mut self, required: usize) {
        if self.data.len() < required {
            self.data.resize(required, 0);
        }
    }
}

/// Minimal loader view of an ELF shared library
///
/// Writes an image with one `PT_DYNAMIC` program header, a dynamic section
/// holding `DT_STRTAB`/`DT_SYMTAB`, and a symbol table whose first entry is
/// the null symbol. Layout relative to the module base:
///
/// ```text
/// 0x000  ELF header        0x040  program header (PT_DYNAMIC)
/// 0x080  dynamic section   0x0C0  symbol table
/// 0x300  string table      0x400  free space (MockElf::CODE_START)
/// ```
///
/// The section header fields are set so that `module_size` equals `size`.
#[derive(Debug, Clone)]
pub struct MockElf {
    size: u64,
    symbols: Vec<(String, u64)>,
}

impl MockElf {
    pub const PHDR: usize = 0x40;
    pub const DYNAMIC: usize = 0x80;
    pub const SYMTAB: usize = 0xC0;
    pub const STRTAB: usize = 0x300;
    pub const CODE_START: usize = 0x400;
    const SECTION_HEADERS: u64 = 4;
    const SECTION_HEADER_SIZE: u64 = 0x40;

    pub fn new(size: u64) -> Self {
        Self {
            size: size.max(0x1000),
            symbols: Vec::new(),
        }
    }

    /// Export `name` at `value`, relative to the module base.
    pub fn symbol(mut self, name: &str, value: u64) -> Self {
        self.symbols.push((name.to_string(), value));
        self
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Lay the image out at `module` (an offset inside the builder).
    pub fn write_into(&self, memory: &mut MockMemoryBuilder, module: usize) {
        let abs = |offset: usize| memory.address_of(module + offset);
        let strtab = abs(Self::STRTAB);
        let symtab = abs(Self::SYMTAB);
        let section_table = self.size - Self::SECTION_HEADERS * Self::SECTION_HEADER_SIZE;

        memory
            .put_bytes(module, &elf::MAGIC)
            .put_value(module + elf::PROGRAM_HEADER_OFFSET as usize, Self::PHDR as u64)
            .put_value(module + elf::SECTION_HEADER_OFFSET as usize, section_table)
            .put_value(module + elf::PROGRAM_HEADER_ENTRY_SIZE as usize, 0x38u16)
            .put_value(module + elf::PROGRAM_HEADER_NUM_ENTRIES as usize, 1u16)
            .put_value(
                module + elf::SECTION_HEADER_ENTRY_SIZE as usize,
                Self::SECTION_HEADER_SIZE as u16,
            )
            .put_value(
                module + elf::SECTION_HEADER_NUM_ENTRIES as usize,
                Self::SECTION_HEADERS as u16,
            );

        let phdr = module + Self::PHDR;
        memory
            .put_value(phdr, elf::PT_DYNAMIC)
            .put_value(phdr + elf::PHDR_VADDR as usize, Self::DYNAMIC as u64);

        let dynamic = module + Self::DYNAMIC;
        memory
            .put_value(dynamic, elf::DT_STRTAB)
            .put_value(dynamic + 0x08, strtab)
            .put_value(dynamic + 0x10, elf::DT_SYMTAB)
            .put_value(dynamic + 0x18, symtab)
            .put_value(dynamic + 0x20, elf::DT_NULL)
            .put_value(dynamic + 0x28, 0u64);

        // String offset 0 is the empty name, so names start at 1
        let mut name_offset = 1usize;
        for (index, (name, value)) in self.symbols.iter().enumerate() {
            let record = module + Self::SYMTAB + (index + 1) * elf::SYMBOL_ENTRY_SIZE as usize;
            memory
                .put_value(record, name_offset as u32)
                .put_value(record + elf::SYMBOL_VALUE as usize, *value)
                .put_cstring(module + Self::STRTAB + name_offset, name);
            name_offset += name.len() + 1;
        }

        memory.ensure_size(module + self.size as usize);
    }
}

/// Process double: a memory buffer plus a module table.
#[derive(Debug, Clone)]
pub struct MockProcess {
    memory: Arc<MockMemoryReader>,
    pid: i32,
    modules: HashMap<String, RemoteAddress>,
    range: AddressRange,
    alive: Arc<AtomicBool>,
}

impl MockProcess {
    pub fn builder(memory: MockMemoryReader) -> MockProcessBuilder {
        MockProcessBuilder {
            memory,
            pid: 4242,
            modules: HashMap::new(),
            range: None,
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Shared liveness flag; clearing it makes `is_valid` return false.
    pub fn liveness(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.alive)
    }

    pub fn memory(&self) -> &MockMemoryReader {
        &self.memory
    }
}

pub struct MockProcessBuilder {
    memory: MockMemoryReader,
    pid: i32,
    modules: HashMap<String, RemoteAddress>,
    range: Option<AddressRange>,
    alive: Arc<AtomicBool>,
}

impl MockProcessBuilder {
    pub fn pid(mut self, pid: i32) -> Self {
        self.pid = pid;
        self
    }

    pub fn module(mut self, name: &str, base: RemoteAddress) -> Self {
        self.modules.insert(name.to_string(), base);
        self
    }

    /// Override the range otherwise computed from the module table.
    pub fn range(mut self, range: AddressRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn liveness(mut self, alive: Arc<AtomicBool>) -> Self {
        self.alive = alive;
        self
    }

    pub fn build(self) -> MockProcess {
        let range = self.range.unwrap_or_else(|| {
            AddressRange::from_modules(&self.memory, self.modules.values().copied())
        });
        MockProcess {
            memory: Arc::new(self.memory),
            pid: self.pid,
            modules: self.modules,
            range,
            alive: self.alive,
        }
    }
}

impl ReadMemory for MockProcess {
    fn try_read_bytes(&self, address: RemoteAddress, size: usize) -> Result<Vec<u8>> {
        self.memory.try_read_bytes(address, size)
    }
}

impl WriteMemory for MockProcess {
    fn try_write_bytes(&self, address: RemoteAddress, bytes: &[u8]) -> Result<()> {
        self.memory.try_write_bytes(address, bytes)
    }
}

impl RemoteProcess for MockProcess {
    fn pid(&self) -> i32 {
        self.pid
    }

    fn module_base(&self, name: &str) -> Option<RemoteAddress> {
        self.modules.get(name).copied()
    }

    fn address_range(&self) -> AddressRange {
        self.range
    }

    fn is_valid(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

/// Hands out clones of one [`MockProcess`] and counts attach attempts.
#[derive(Debug, Default)]
pub struct MockProcessProvider {
    process: RwLock<Option<MockProcess>>,
    attaches: AtomicUsize,
}

impl MockProcessProvider {
    pub fn new(process: MockProcess) -> Self {
        Self {
            process: RwLock::new(Some(process)),
            attaches: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Replace (or remove) the process future attaches will see.
    pub fn set_process(&self, process: Option<MockProcess>) {
        if let Ok(mut slot) = self.process.write() {
            *slot = process;
        }
    }

    pub fn attach_count(&self) -> usize {
        self.attaches.load(Ordering::SeqCst)
    }
}

impl ProcessProvider for MockProcessProvider {
    type Process = MockProcess;

    fn attach(&self) -> Result<Self::Process> {
        self.attaches.fetch_add(1, Ordering::SeqCst);
        self.process
            .read()
            .ok()
            .and_then(|slot| slot.clone())
            .ok_or_else(|| Error::ProcessNotFound("Mock process not configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_reader_basic() {
        let data = vec![0x78, 0x56, 0x34, 0x12];
        let reader = MockMemoryReader::new(data);

        let value: i32 = reader.try_read(RemoteAddress::new(0x1000)).unwrap();
        assert_eq!(value, 0x12345678);
    }

    #[test]
    fn test_mock_reader_with_base() {
        let data = vec![0x01, 0x02, 0x03, 0x04];
        let reader = MockMemoryReader::with_base(data, 0x140000000);

        let bytes = reader
            .try_read_bytes(RemoteAddress::new(0x140000000), 4)
            .unwrap();
        assert_eq!(bytes, vec![0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_mock_reader_out_of_bounds() {
        let reader = MockMemoryReader::new(vec![0x01, 0x02]);

        assert!(reader.try_read::<u32>(RemoteAddress::new(0x1000)).is_err());
        assert!(reader.try_read::<u8>(RemoteAddress::new(0xFFF)).is_err());
    }

    #[test]
    fn test_mock_reader_write() {
        let reader = MockMemoryBuilder::new().with_size(8).build();

        reader.try_write(RemoteAddress::new(0x1004), 7u32).unwrap();
        assert_eq!(reader.read::<u32>(RemoteAddress::new(0x1004)), 7);
        assert!(reader.try_write(RemoteAddress::new(0x1006), 7u32).is_err());
    }

    #[test]
    fn test_builder_chain() {
        let reader = MockMemoryBuilder::new()
            .write_i32(0, 100)
            .write_u64(8, 0xDEADBEEF)
            .write_cstring(16, "name")
            .build();

        assert_eq!(reader.read::<i32>(RemoteAddress::new(0x1000)), 100);
        assert_eq!(reader.read::<u64>(RemoteAddress::new(0x1008)), 0xDEADBEEF);
        assert_eq!(reader.read_cstring(RemoteAddress::new(0x1010)), "name");
    }

    #[test]
    fn test_mock_elf_size_matches_section_table() {
        let mut memory = MockMemoryBuilder::new();
        MockElf::new(0x2000).write_into(&mut memory, 0);

        assert_eq!(memory.size(), 0x2000);
        let reader = memory.build();
        let shoff: u64 = reader.read(RemoteAddress::new(0x1000 + 0x28));
        assert_eq!(shoff, 0x2000 - 0x100);
    }

    #[test]
    fn test_mock_process_liveness() {
        let process = MockProcess::builder(MockMemoryBuilder::new().with_size(16).build())
            .module("libfoo.so", RemoteAddress::new(0x1000))
            .build();

        assert!(process.is_valid());
        assert_eq!(
            process.module_base("libfoo.so"),
            Some(RemoteAddress::new(0x1000))
        );
        process.liveness().store(false, Ordering::SeqCst);
        assert!(!process.is_valid());
    }
}

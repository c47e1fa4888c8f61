use crate::address::RemoteAddress;
use crate::layout::elf::{
    HEADER_SIZE, MAGIC, PROGRAM_HEADER_ENTRY_SIZE, PROGRAM_HEADER_NUM_ENTRIES,
    PROGRAM_HEADER_OFFSET, SECTION_HEADER_ENTRY_SIZE, SECTION_HEADER_NUM_ENTRIES,
    SECTION_HEADER_OFFSET,
};
use crate::process::{ByteBuffer, ReadMemory};

/// The ELF64 header fields the loader leaves intact in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElfHeader {
    pub phoff: u64,
    pub shoff: u64,
    pub phentsize: u16,
    pub phnum: u16,
    pub shentsize: u16,
    pub shnum: u16,
}

impl ElfHeader {
    /// Copy the header out of the target. `None` if unreadable or not ELF.
    pub fn read<R: ReadMemory>(reader: &R, base: RemoteAddress) -> Option<Self> {
        let raw = reader.try_read_bytes(base, HEADER_SIZE).ok()?;
        Self::parse(base, &raw)
    }

    pub fn parse(base: RemoteAddress, raw: &[u8]) -> Option<Self> {
        let buf = ByteBuffer::at(base, raw);
        if buf.slice_at(0, MAGIC.len()).ok()? != MAGIC {
            return None;
        }

        Some(Self {
            phoff: buf.read_at(PROGRAM_HEADER_OFFSET as usize).ok()?,
            shoff: buf.read_at(SECTION_HEADER_OFFSET as usize).ok()?,
            phentsize: buf.read_at(PROGRAM_HEADER_ENTRY_SIZE as usize).ok()?,
            phnum: buf.read_at(PROGRAM_HEADER_NUM_ENTRIES as usize).ok()?,
            shentsize: buf.read_at(SECTION_HEADER_ENTRY_SIZE as usize).ok()?,
            shnum: buf.read_at(SECTION_HEADER_NUM_ENTRIES as usize).ok()?,
        })
    }

    /// End of the section header table, an upper bound on the file image.
    pub fn image_size(&self) -> u64 {
        self.shoff
            .saturating_add(u64::from(self.shentsize) * u64::from(self.shnum))
    }

    /// Address of program header `index`.
    pub fn program_header(&self, base: RemoteAddress, index: u16) -> RemoteAddress {
        base + self.phoff + u64::from(index) * u64::from(self.phentsize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes() -> Vec<u8> {
        let mut raw = vec![0u8; HEADER_SIZE];
        raw[..4].copy_from_slice(&MAGIC);
        raw[0x20..0x28].copy_from_slice(&0x40u64.to_le_bytes());
        raw[0x28..0x30].copy_from_slice(&0x1F00u64.to_le_bytes());
        raw[0x36..0x38].copy_from_slice(&0x38u16.to_le_bytes());
        raw[0x38..0x3A].copy_from_slice(&9u16.to_le_bytes());
        raw[0x3A..0x3C].copy_from_slice(&0x40u16.to_le_bytes());
        raw[0x3C..0x3E].copy_from_slice(&4u16.to_le_bytes());
        raw
    }

    #[test]
    fn test_parse_header() {
        let header = ElfHeader::parse(RemoteAddress::new(0x1000), &header_bytes()).unwrap();

        assert_eq!(header.phoff, 0x40);
        assert_eq!(header.phnum, 9);
        assert_eq!(header.image_size(), 0x2000);
        assert_eq!(
            header.program_header(RemoteAddress::new(0x1000), 2),
            RemoteAddress::new(0x1000 + 0x40 + 2 * 0x38)
        );
    }

    #[test]
    fn test_parse_rejects_bad_magic() {
        let mut raw = header_bytes();
        raw[1] = b'X';
        assert!(ElfHeader::parse(RemoteAddress::NULL, &raw).is_none());
    }

    #[test]
    fn test_parse_rejects_short_buffer() {
        let raw = header_bytes();
        assert!(ElfHeader::parse(RemoteAddress::NULL, &raw[..0x30]).is_none());
    }
}

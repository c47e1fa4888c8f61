//! Position-tracking reader over a local snapshot of remote bytes.
//!
//! Used where a structure is copied out in one read (the ELF header, a dumped
//! module) and then decoded field by field. Errors report the remote address
//! the failing field would have had.

use crate::address::RemoteAddress;
use crate::error::{Error, Result};
use crate::process::plain::Plain;

/// A position-tracking byte reader.
///
/// # Example
///
/// ```
/// use remscope_core::process::ByteBuffer;
///
/// let data = [0x78, 0x56, 0x34, 0x12, 0x00, 0x00, 0x00, 0x00];
/// let mut buf = ByteBuffer::new(&data);
///
/// let value: i32 = buf.read().unwrap();
/// assert_eq!(value, 0x12345678);
/// assert_eq!(buf.position(), 4);
/// ```
pub struct ByteBuffer<'a> {
    data: &'a [u8],
    pos: usize,
    origin: RemoteAddress,
}

impl<'a> ByteBuffer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::at(RemoteAddress::NULL, data)
    }

    /// Wrap bytes that were copied from `origin` in the target.
    pub fn at(origin: RemoteAddress, data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            origin,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn set_position(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(self.out_of_bounds(pos, 0));
        }
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.set_position(self.pos.saturating_add(count))
    }

    /// Bytes at `offset` without moving the cursor.
    pub fn slice_at(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        match offset.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(&self.data[offset..end]),
            _ => Err(self.out_of_bounds(offset, len)),
        }
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let bytes = self.slice_at(self.pos, count)?;
        self.pos += count;
        Ok(bytes)
    }

    /// Decode the next value and advance.
    pub fn read<T: Plain>(&mut self) -> Result<T> {
        let bytes = self.read_bytes(T::SIZE)?;
        Ok(T::from_le_slice(bytes))
    }

    /// Decode a value at `offset` without moving the cursor.
    pub fn read_at<T: Plain>(&self, offset: usize) -> Result<T> {
        let bytes = self.slice_at(offset, T::SIZE)?;
        Ok(T::from_le_slice(bytes))
    }

    fn out_of_bounds(&self, offset: usize, len: usize) -> Error {
        Error::read_failed(
            self.origin + offset as u64,
            format!(
                "Range {}..{} exceeds buffer length {}",
                offset,
                offset.saturating_add(len),
                self.data.len()
            ),
        )
    }
}

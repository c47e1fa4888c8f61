use tracing::trace;

use crate::address::RemoteAddress;
use crate::error::{Error, Result};
use crate::layout::limits::{MAX_STRING_LEN, STRING_CHUNK};
use crate::process::plain::Plain;

/// Trait for reading memory from a process or buffer
///
/// Only [`try_read_bytes`](ReadMemory::try_read_bytes) is required. The typed
/// helpers come in two flavours: `try_*` reports failures, the plain variants
/// return zeroes instead. Polling a live process makes transient failures
/// routine, so most callers use the zero-fill variants and sanity check the
/// values they get.
pub trait ReadMemory {
    /// Read exactly `size` bytes or fail
    fn try_read_bytes(&self, address: RemoteAddress, size: usize) -> Result<Vec<u8>>;

    /// Read `size` bytes, zero-filled on failure
    fn read_bytes(&self, address: RemoteAddress, size: usize) -> Vec<u8> {
        self.try_read_bytes(address, size)
            .unwrap_or_else(|_| vec![0; size])
    }

    /// Read a fixed-size value, reporting whether the read succeeded
    fn try_read<T: Plain>(&self, address: RemoteAddress) -> Result<T> {
        let bytes = self.try_read_bytes(address, T::SIZE)?;
        if bytes.len() < T::SIZE {
            return Err(Error::read_failed(
                address,
                format!("Expected {} bytes, read {}", T::SIZE, bytes.len()),
            ));
        }
        Ok(T::from_le_slice(&bytes))
    }

    /// Read a fixed-size value, zero on failure
    fn read<T: Plain>(&self, address: RemoteAddress) -> T {
        self.try_read(address).unwrap_or_else(|_| T::zeroed())
    }

    fn read_pointer(&self, address: RemoteAddress) -> RemoteAddress {
        self.read::<RemoteAddress>(address)
    }

    /// Read a NUL-terminated string of at most 1024 bytes.
    ///
    /// Reads in small chunks and falls back to single bytes when a chunk
    /// crosses into unreadable memory. Invalid UTF-8 is replaced.
    fn read_cstring(&self, address: RemoteAddress) -> String {
        if address.is_null() {
            return String::new();
        }

        let mut out = Vec::with_capacity(STRING_CHUNK);
        let mut cursor = address;

        'outer: while out.len() < MAX_STRING_LEN {
            let want = STRING_CHUNK.min(MAX_STRING_LEN - out.len());
            match self.try_read_bytes(cursor, want) {
                Ok(chunk) => {
                    if let Some(end) = chunk.iter().position(|&b| b == 0) {
                        out.extend_from_slice(&chunk[..end]);
                        break;
                    }
                    out.extend_from_slice(&chunk);
                    cursor = cursor + want as u64;
                }
                Err(_) => {
                    for i in 0..want as u64 {
                        match self.try_read::<u8>(cursor + i) {
                            Ok(0) | Err(_) => break 'outer,
                            Ok(byte) => out.push(byte),
                        }
                    }
                    cursor = cursor + want as u64;
                }
            }
        }

        String::from_utf8_lossy(&out).into_owned()
    }
}

impl<R: ReadMemory + ?Sized> ReadMemory for &R {
    fn try_read_bytes(&self, address: RemoteAddress, size: usize) -> Result<Vec<u8>> {
        (**self).try_read_bytes(address, size)
    }

    fn read_bytes(&self, address: RemoteAddress, size: usize) -> Vec<u8> {
        (**self).read_bytes(address, size)
    }
}

/// Trait for writing memory into a process
pub trait WriteMemory {
    fn try_write_bytes(&self, address: RemoteAddress, bytes: &[u8]) -> Result<()>;

    fn try_write<T: Plain>(&self, address: RemoteAddress, value: T) -> Result<()> {
        self.try_write_bytes(address, &value.to_le_vec())
    }

    /// Write a value, ignoring failures (including disabled writes)
    fn write<T: Plain>(&self, address: RemoteAddress, value: T) {
        if let Err(e) = self.try_write(address, value) {
            trace!("Write to {} dropped: {}", address, e);
        }
    }
}

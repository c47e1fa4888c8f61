#![cfg_attr(not(target_os = "linux"), allow(dead_code, unused_variables))]

use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;
use tracing::{debug, trace};

use crate::address::{AddressRange, RemoteAddress};
use crate::error::{Error, Result};
use crate::layout::target::LIBRARIES;
use crate::process::maps;
use crate::process::provider::RemoteProcess;
use crate::process::reader::{ReadMemory, WriteMemory};

#[cfg(target_os = "linux")]
use std::io::{IoSlice, IoSliceMut};
#[cfg(target_os = "linux")]
use std::os::unix::fs::FileExt;

#[cfg(target_os = "linux")]
use nix::sys::uio::{RemoteIoVec, process_vm_readv, process_vm_writev};
#[cfg(target_os = "linux")]
use nix::unistd::Pid;

/// Whether remote writes are permitted on a handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum AccessMode {
    #[default]
    ReadWrite,
    ReadOnly,
}

/// Handle on a live target process.
///
/// Reads go through `process_vm_readv` and fall back to `/proc/<pid>/mem`.
/// When neither works every read fails, which the zero-fill helpers turn into
/// zeroes. Not `Clone`: one handle per attachment.
pub struct RemoteMemory {
    pid: i32,
    proc_path: PathBuf,
    mem: Option<File>,
    range: AddressRange,
    access: AccessMode,
    strings: Mutex<HashMap<RemoteAddress, String>>,
}

impl RemoteMemory {
    /// Attach to the first process whose executable is named `name`.
    pub fn open(name: &str) -> Result<Self> {
        let pid = maps::find_pid(name).ok_or_else(|| Error::ProcessNotFound(name.to_string()))?;
        debug!("Found {} with PID {}", name, pid);

        let memory = Self::with_pid(pid);
        if !memory.is_valid() {
            return Err(Error::ProcessNotFound(format!(
                "{} (pid {}) exited during attach",
                name, pid
            )));
        }
        Ok(memory)
    }

    /// Build a handle for `pid` without checking that it exists.
    pub fn with_pid(pid: i32) -> Self {
        let proc_path = PathBuf::from(format!("/proc/{}", pid));
        let mem = if pid > 0 {
            match File::open(proc_path.join("mem")) {
                Ok(file) => Some(file),
                Err(e) => {
                    debug!("Cannot open /proc/{}/mem, using syscalls only: {}", pid, e);
                    None
                }
            }
        } else {
            None
        };

        let mut memory = Self {
            pid,
            proc_path,
            mem,
            range: AddressRange::EMPTY,
            access: AccessMode::ReadWrite,
            strings: Mutex::new(HashMap::new()),
        };
        memory.range = memory.compute_range();
        debug!("Process {} address range {}", pid, memory.range);
        memory
    }

    pub fn with_access(mut self, access: AccessMode) -> Self {
        self.access = access;
        self
    }

    pub fn read_only(self) -> Self {
        self.with_access(AccessMode::ReadOnly)
    }

    pub fn pid(&self) -> i32 {
        self.pid
    }

    pub fn access(&self) -> AccessMode {
        self.access
    }

    pub fn address_range(&self) -> AddressRange {
        self.range
    }

    /// Process still listed in `/proc`.
    pub fn is_valid(&self) -> bool {
        self.pid > 0 && self.proc_path.exists()
    }

    pub fn module_base(&self, name: &str) -> Option<RemoteAddress> {
        if self.pid <= 0 {
            return None;
        }
        match maps::read_maps(self.pid) {
            Ok(entries) => maps::module_base_in(&entries, name),
            Err(e) => {
                trace!("Cannot read maps of {}: {}", self.pid, e);
                None
            }
        }
    }

    /// Every file-backed module mapped into the process.
    pub fn modules(&self) -> Result<Vec<(String, RemoteAddress)>> {
        Ok(maps::modules_in(&maps::read_maps(self.pid)?))
    }

    /// NUL-terminated string, memoized per address for the handle's lifetime.
    pub fn read_cached_string(&self, address: RemoteAddress) -> String {
        let mut cache = self
            .strings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(hit) = cache.get(&address) {
            return hit.clone();
        }
        let value = self.read_cstring(address);
        cache.insert(address, value.clone());
        value
    }

    fn compute_range(&self) -> AddressRange {
        let bases: Vec<RemoteAddress> = LIBRARIES
            .iter()
            .filter_map(|lib| self.module_base(lib))
            .collect();
        AddressRange::from_modules(self, bases)
    }

    fn writes_allowed(&self) -> bool {
        !cfg!(feature = "read-only") && self.access == AccessMode::ReadWrite
    }

    /// Fill as much of `buf` as can be read, returning the byte count.
    #[cfg(target_os = "linux")]
    fn read_into(&self, address: RemoteAddress, buf: &mut [u8]) -> std::result::Result<usize, String> {
        if buf.is_empty() {
            return Ok(0);
        }
        let len = buf.len();
        let remote = [RemoteIoVec {
            base: address.get() as usize,
            len,
        }];

        let syscall_error = match process_vm_readv(
            Pid::from_raw(self.pid),
            &mut [IoSliceMut::new(&mut *buf)],
            &remote,
        ) {
            Ok(read) if read > 0 => return Ok(read),
            Ok(_) => "process_vm_readv read nothing".to_string(),
            Err(e) => e.to_string(),
        };

        let Some(file) = &self.mem else {
            return Err(syscall_error);
        };
        match file.read_at(buf, address.get()) {
            Ok(read) if read > 0 => Ok(read),
            Ok(_) => Err(format!("{}; /proc mem read nothing", syscall_error)),
            Err(e) => Err(format!("{}; /proc mem: {}", syscall_error, e)),
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn read_into(&self, _address: RemoteAddress, _buf: &mut [u8]) -> std::result::Result<usize, String> {
        Err("Linux only: memory reading not supported on this platform".to_string())
    }

    #[cfg(target_os = "linux")]
    fn write_from(&self, address: RemoteAddress, bytes: &[u8]) -> Result<()> {
        let remote = [RemoteIoVec {
            base: address.get() as usize,
            len: bytes.len(),
        }];
        let written = process_vm_writev(Pid::from_raw(self.pid), &[IoSlice::new(bytes)], &remote)
            .map_err(|e| Error::write_failed(address, e.to_string()))?;
        if written != bytes.len() {
            return Err(Error::write_failed(
                address,
                format!("Expected {} bytes, wrote {}", bytes.len(), written),
            ));
        }
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    fn write_from(&self, address: RemoteAddress, _bytes: &[u8]) -> Result<()> {
        Err(Error::write_failed(
            address,
            "Linux only: memory writing not supported on this platform",
        ))
    }
}

impl ReadMemory for RemoteMemory {
    fn try_read_bytes(&self, address: RemoteAddress, size: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; size];
        let mut filled = 0;
        while filled < size {
            match self.read_into(address + filled as u64, &mut buffer[filled..]) {
                Ok(read) => filled += read,
                Err(message) => return Err(Error::read_failed(address + filled as u64, message)),
            }
        }
        Ok(buffer)
    }

    /// Best effort: keeps whatever prefix could be read, zeroes the rest.
    fn read_bytes(&self, address: RemoteAddress, size: usize) -> Vec<u8> {
        let mut buffer = vec![0u8; size];
        let mut filled = 0;
        while filled < size {
            match self.read_into(address + filled as u64, &mut buffer[filled..]) {
                Ok(read) => filled += read,
                Err(message) => {
                    trace!("Short read at {}: {}", address + filled as u64, message);
                    break;
                }
            }
        }
        buffer
    }
}

impl WriteMemory for RemoteMemory {
    fn try_write_bytes(&self, address: RemoteAddress, bytes: &[u8]) -> Result<()> {
        if !self.writes_allowed() {
            return Err(Error::WritesDisabled);
        }
        if bytes.is_empty() {
            return Ok(());
        }
        self.write_from(address, bytes)
    }
}

impl RemoteProcess for RemoteMemory {
    fn pid(&self) -> i32 {
        self.pid
    }

    fn module_base(&self, name: &str) -> Option<RemoteAddress> {
        RemoteMemory::module_base(self, name)
    }

    fn address_range(&self) -> AddressRange {
        self.range
    }

    fn is_valid(&self) -> bool {
        RemoteMemory::is_valid(self)
    }

    fn read_cached_string(&self, address: RemoteAddress) -> String {
        RemoteMemory::read_cached_string(self, address)
    }
}

impl std::fmt::Debug for RemoteMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteMemory")
            .field("pid", &self.pid)
            .field("mem", &self.mem.is_some())
            .field("range", &self.range)
            .field("access", &self.access)
            .finish()
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;

    fn own_pid() -> i32 {
        std::process::id() as i32
    }

    #[test]
    fn test_invalid_pid_reads_zero() {
        let memory = RemoteMemory::with_pid(-1);

        assert!(!memory.is_valid());
        assert_eq!(memory.read::<u64>(RemoteAddress::new(0x1000)), 0);
        assert!(memory.try_read::<u32>(RemoteAddress::new(0x1000)).is_err());
        assert_eq!(memory.module_base("libc.so.6"), None);
        assert!(memory.address_range().is_empty());
    }

    #[test]
    fn test_self_read() {
        let memory = RemoteMemory::with_pid(own_pid());
        let value: u64 = 0x1122_3344_5566_7788;
        let address = RemoteAddress::new(&value as *const u64 as u64);

        assert!(memory.is_valid());
        assert_eq!(memory.try_read::<u64>(address).unwrap(), value);
    }

    #[test]
    fn test_self_read_string_cached() {
        let memory = RemoteMemory::with_pid(own_pid());
        let text = b"remscope\0";
        let address = RemoteAddress::new(text.as_ptr() as u64);

        assert_eq!(memory.read_cached_string(address), "remscope");
        assert_eq!(memory.read_cached_string(address), "remscope");
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let memory = RemoteMemory::with_pid(own_pid()).read_only();
        let mut target: u32 = 5;
        let address = RemoteAddress::new(&mut target as *mut u32 as u64);

        assert!(matches!(
            memory.try_write(address, 9u32),
            Err(Error::WritesDisabled)
        ));
        memory.write(address, 9u32);
        assert_eq!(unsafe { std::ptr::read_volatile(&target) }, 5);
    }
}

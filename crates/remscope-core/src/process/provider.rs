//! Process provider abstraction for testability.
//!
//! Discovery and the connection manager only see these traits, so tests can
//! drive them with [`MockProcess`](crate::process::MockProcess) instead of a
//! running target.

use crate::address::{AddressRange, RemoteAddress};
use crate::error::{Error, Result};
use crate::process::handle::{AccessMode, RemoteMemory};
use crate::process::reader::{ReadMemory, WriteMemory};

/// An attached target process.
pub trait RemoteProcess: ReadMemory + WriteMemory {
    fn pid(&self) -> i32;

    /// Base of the first mapping of the module named exactly `name`.
    fn module_base(&self, name: &str) -> Option<RemoteAddress>;

    /// Coarse window spanning the target's known libraries.
    fn address_range(&self) -> AddressRange;

    /// Whether the process still exists.
    fn is_valid(&self) -> bool;

    /// String read that may be served from a per-process cache.
    fn read_cached_string(&self, address: RemoteAddress) -> String {
        self.read_cstring(address)
    }
}

/// Trait for finding and attaching to the target.
pub trait ProcessProvider {
    type Process: RemoteProcess;

    fn attach(&self) -> Result<Self::Process>;
}

/// Attaches to the first process whose executable is named `name`.
#[derive(Debug, Clone)]
pub struct NamedProcessProvider {
    name: String,
    access: AccessMode,
}

impl NamedProcessProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            access: AccessMode::ReadWrite,
        }
    }

    pub fn access(mut self, access: AccessMode) -> Self {
        self.access = access;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ProcessProvider for NamedProcessProvider {
    type Process = RemoteMemory;

    fn attach(&self) -> Result<Self::Process> {
        RemoteMemory::open(&self.name).map(|memory| memory.with_access(self.access))
    }
}

/// Attaches to a known pid.
#[derive(Debug, Clone, Copy)]
pub struct PidProcessProvider {
    pid: i32,
    access: AccessMode,
}

impl PidProcessProvider {
    pub fn new(pid: i32) -> Self {
        Self {
            pid,
            access: AccessMode::ReadWrite,
        }
    }

    pub fn access(mut self, access: AccessMode) -> Self {
        self.access = access;
        self
    }
}

impl ProcessProvider for PidProcessProvider {
    type Process = RemoteMemory;

    fn attach(&self) -> Result<Self::Process> {
        let memory = RemoteMemory::with_pid(self.pid).with_access(self.access);
        if !memory.is_valid() {
            return Err(Error::ProcessNotFound(format!("pid {}", self.pid)));
        }
        Ok(memory)
    }
}

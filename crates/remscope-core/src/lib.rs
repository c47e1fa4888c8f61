//! # remscope-core
//!
//! Structure discovery for a running process whose data layout is unknown at
//! compile time.
//!
//! This crate provides:
//! - Remote memory access with zero-fill and checked reads
//! - ELF loader-view parsing (module size, dynamic entries, exports)
//! - Masked signature scanning
//! - Interface registry and console-variable lookups
//! - A walker for the target's own reflection registry
//! - Transactional discovery of the offset table, and a connection manager
//!
//! ## Feature Flags
//!
//! - `read-only`: compiles every remote write into a `WritesDisabled` error.

pub mod address;
pub mod config;
pub mod error;
pub mod image;
pub mod interface;
pub mod layout;
pub mod offset;
pub mod pattern;
pub mod process;
pub mod schema;
pub mod session;

pub use address::{AddressRange, RemoteAddress};

pub use config::Config;

pub use error::{Error, Result};

pub use image::{Module, dump_module, module_export, module_size, scan_module};

pub use interface::{console_variable, interface_address, relative_target, virtual_function};

pub use offset::{
    DiscoveryError, DiscoveryPlan, OffsetTable, Requirement, RequirementKind, Resolved, discover,
    format_table, resolve,
};

pub use pattern::Pattern;

pub use process::{
    AccessMode, NamedProcessProvider, PidProcessProvider, ProcessProvider, ReadMemory,
    RemoteMemory, RemoteProcess, WriteMemory,
};

pub use schema::{ModuleScope, Schema, SchemaClass};

pub use session::{ConnectionContext, ConnectionManager};

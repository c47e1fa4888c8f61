//! Discovery of the offset table.
//!
//! A [`DiscoveryPlan`] lists every lookup; [`resolve`] runs them in a fixed
//! order and stops at the first failure, and [`discover`] assembles the
//! standard plan's results into an [`OffsetTable`].

mod error;
mod loader;
mod pipeline;
mod plan;
mod table;

pub use error::DiscoveryError;
pub use loader::{format_table, load_table, parse_table, save_table};
pub use pipeline::{discover, resolve};
pub use plan::{
    ClassSizeRequest, ConvarRequest, Derivation, DerivedRequest, DiscoveryPlan, ExportRequest,
    FieldRequest, InterfaceRequest, LibraryRequest, OptionalFieldRequest, Requirement,
    RequirementKind, SchemaRequest, SignatureRequest,
};
pub use table::*;

//! Reflection registry walker.
//!
//! The target keeps a self-describing type registry: a singleton holding an
//! array of type scopes (one per library), each scope holding class records
//! in a 1024-bucket hash table plus a free list of allocation blobs. Walking
//! both sources yields every class name, size and field offset.

mod class;
mod walker;

pub use class::{ModuleScope, Schema, SchemaClass};
pub use walker::{read_class, read_scope};

use crate::address::{AddressRange, RemoteAddress};
use crate::process::{ReadMemory, RemoteProcess};

impl Schema {
    /// Walk the registry of `process`, using its address range as the
    /// plausibility filter for free-list records.
    pub fn build<P: RemoteProcess>(process: &P, schema_base: RemoteAddress) -> Option<Schema> {
        walker::build(process, process.address_range(), schema_base)
    }

    /// Walk with an explicit plausibility range.
    pub fn build_with_range<R: ReadMemory>(
        reader: &R,
        range: AddressRange,
        schema_base: RemoteAddress,
    ) -> Option<Schema> {
        walker::build(reader, range, schema_base)
    }
}

//! Attached process plus its discovered offsets, and the manager that owns
//! the current connection.

mod manager;

pub use manager::{ConnectionManager, Discover};

use crate::address::RemoteAddress;
use crate::error::Result;
use crate::offset::OffsetTable;
use crate::process::{Plain, RemoteProcess};

/// One successful connection: the attached process and the offsets
/// discovered for it. Never mutated after construction.
#[derive(Debug)]
pub struct ConnectionContext<M> {
    memory: M,
    offsets: OffsetTable,
}

impl<M: RemoteProcess> ConnectionContext<M> {
    pub fn new(memory: M, offsets: OffsetTable) -> Self {
        Self { memory, offsets }
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn offsets(&self) -> &OffsetTable {
        &self.offsets
    }

    pub fn pid(&self) -> i32 {
        self.memory.pid()
    }

    /// Field of a remote object; zero when unreadable.
    pub fn field<T: Plain>(&self, object: RemoteAddress, offset: u64) -> T {
        self.memory.read(object + offset)
    }

    pub fn try_field<T: Plain>(&self, object: RemoteAddress, offset: u64) -> Result<T> {
        self.memory.try_read(object + offset)
    }

    /// Pointer-sized field of a remote object.
    pub fn pointer_field(&self, object: RemoteAddress, offset: u64) -> RemoteAddress {
        self.memory.read_pointer(object + offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{MockMemoryBuilder, MockProcess};

    const BASE: u64 = 0x50_0000;

    #[test]
    fn test_field_reads_through_offsets() {
        let memory = MockMemoryBuilder::new()
            .base(BASE)
            .write_i32(0x344, 87)
            .write_u64(0x338, BASE + 0x10)
            .build();
        let mut offsets = OffsetTable::default();
        offsets.pawn.health = 0x344;
        offsets.pawn.game_scene_node = 0x338;
        let context = ConnectionContext::new(MockProcess::builder(memory).build(), offsets);
        let pawn = RemoteAddress::new(BASE);

        assert_eq!(context.field::<i32>(pawn, context.offsets().pawn.health), 87);
        assert_eq!(
            context.pointer_field(pawn, context.offsets().pawn.game_scene_node),
            RemoteAddress::new(BASE + 0x10)
        );
        assert_eq!(context.pid(), 4242);
    }

    #[test]
    fn test_field_out_of_bounds() {
        let memory = MockMemoryBuilder::new().base(BASE).with_size(0x10).build();
        let context =
            ConnectionContext::new(MockProcess::builder(memory).build(), OffsetTable::default());
        let object = RemoteAddress::new(BASE);

        assert_eq!(context.field::<u32>(object, 0x100), 0);
        assert!(context.try_field::<u32>(object, 0x100).is_err());
    }
}

mod bytes;
mod handle;
pub mod maps;
mod plain;
pub mod provider;
mod reader;

// Mock memory and process for testing (always available for unit and integration tests)
#[doc(hidden)]
pub mod mock;

pub use bytes::ByteBuffer;
pub use handle::{AccessMode, RemoteMemory};
pub use plain::Plain;
pub use provider::{NamedProcessProvider, PidProcessProvider, ProcessProvider, RemoteProcess};
pub use reader::{ReadMemory, WriteMemory};

#[doc(hidden)]
pub use mock::{MockElf, MockMemoryBuilder, MockMemoryReader, MockProcess, MockProcessProvider};

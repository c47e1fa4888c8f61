//! Fixed memory layout constants for the structures walked in the target.
//!
//! Every offset the crate reads from remote memory lives here, grouped by the
//! structure it belongs to. None of these are discovered at runtime; they
//! describe the stable shape of the ELF loader view and of the target's
//! interface, console-variable and reflection registries.

/// Target process and the libraries whose bases bound its address range.
pub mod target {
    pub const PROCESS_NAME: &str = "cs2";

    pub const CLIENT_LIB: &str = "libclient.so";
    pub const ENGINE_LIB: &str = "libengine2.so";
    pub const TIER0_LIB: &str = "libtier0.so";
    pub const INPUT_LIB: &str = "libinputsystem.so";
    pub const SDL_LIB: &str = "libSDL3.so.0";
    pub const SCHEMA_LIB: &str = "libschemasystem.so";

    pub const LIBRARIES: [&str; 6] = [
        CLIENT_LIB, ENGINE_LIB, TIER0_LIB, INPUT_LIB, SDL_LIB, SCHEMA_LIB,
    ];
}

/// ELF64 header and loader-view layout
///
/// ```text
/// Offset   Field          Size
/// ─────────────────────────────
/// 0x00     e_ident        16     starts with 7F 'E' 'L' 'F'
/// 0x20     e_phoff        8
/// 0x28     e_shoff        8
/// 0x36     e_phentsize    2
/// 0x38     e_phnum        2
/// 0x3A     e_shentsize    2
/// 0x3C     e_shnum        2
/// ```
pub mod elf {
    pub const MAGIC: [u8; 4] = [0x7F, b'E', b'L', b'F'];
    pub const HEADER_SIZE: usize = 0x40;

    pub const PROGRAM_HEADER_OFFSET: u64 = 0x20;
    pub const SECTION_HEADER_OFFSET: u64 = 0x28;
    pub const PROGRAM_HEADER_ENTRY_SIZE: u64 = 0x36;
    pub const PROGRAM_HEADER_NUM_ENTRIES: u64 = 0x38;
    pub const SECTION_HEADER_ENTRY_SIZE: u64 = 0x3A;
    pub const SECTION_HEADER_NUM_ENTRIES: u64 = 0x3C;

    /// `p_vaddr` inside a program header entry
    pub const PHDR_VADDR: u64 = 0x10;

    pub const PT_DYNAMIC: u32 = 0x02;
    pub const DT_NULL: u64 = 0;
    pub const DT_STRTAB: u64 = 0x05;
    pub const DT_SYMTAB: u64 = 0x06;

    pub const DYNAMIC_ENTRY_SIZE: u64 = 0x10;
    pub const SYMBOL_ENTRY_SIZE: u64 = 0x18;
    pub const SYMBOL_VALUE: u64 = 0x08;
}

/// `CreateInterface` registration list
///
/// ```text
/// export + 0x10      stub, `mov reg, [rip + disp32]` loading the list head
///
/// node + 0x00        create function (`lea rax, [rip + disp32]; ret`)
/// node + 0x08        name pointer
/// node + 0x10        next node
/// ```
pub mod interface {
    pub const FACTORY_EXPORT: &str = "CreateInterface";
    pub const STUB_OFFSET: u64 = 0x10;

    pub const NODE_CREATE_FN: u64 = 0x00;
    pub const NODE_NAME: u64 = 0x08;
    pub const NODE_NEXT: u64 = 0x10;

    /// `lea`/`mov` with a RIP-relative operand: displacement at +3, length 7
    pub const RIP_DISP_OFFSET: u64 = 0x03;
    pub const RIP_INSTR_LEN: u64 = 0x07;
}

/// Console variable registry hanging off the cvar interface
pub mod convar {
    pub const OBJECTS: u64 = 0x48;
    pub const COUNT: u64 = 0xA0;
    pub const STRIDE: u64 = 0x10;
}

/// Reflection (schema system) layout
///
/// ```text
/// system + 0x1F0     i32  type scope count
/// system + 0x1F8     ptr  type scope pointer array
///
/// scope  + 0x008     inline name
/// scope  + 0x580     free list head (blob chain)
/// scope  + 0x5F0     1024 buckets, 24 bytes each, chain head at +0x28
///
/// class  + 0x08      name pointer
/// class  + 0x18      i32 size
/// class  + 0x1C      i16 field count
/// class  + 0x28      field vector, 0x20 per field
/// ```
pub mod schema {
    pub const SYSTEM_PATTERN: &str =
        "48 8D 3D ? ? ? ? E8 ? ? ? ? 48 8B BD ? ? ? ? 31 F6 E8 ? ? ? ? E9";

    pub const SCOPE_COUNT: u64 = 0x1F0;
    pub const SCOPE_ARRAY: u64 = 0x1F8;

    pub const SCOPE_NAME: u64 = 0x08;
    pub const SCOPE_BUCKETS: u64 = 0x5F0;
    pub const BUCKET_COUNT: u64 = 1024;
    pub const BUCKET_STRIDE: u64 = 24;
    pub const BUCKET_HEAD: u64 = 0x28;
    pub const SCOPE_FREE_LIST: u64 = 0x580;

    pub const NODE_DATA: u64 = 0x10;
    pub const NODE_NEXT: u64 = 0x08;
    pub const BLOB_DATA: u64 = 0x10;
    pub const BLOB_NEXT: u64 = 0x00;

    pub const CLASS_NAME: u64 = 0x08;
    pub const CLASS_SIZE: u64 = 0x18;
    pub const CLASS_FIELD_COUNT: u64 = 0x1C;
    pub const CLASS_FIELDS: u64 = 0x28;

    pub const FIELD_STRIDE: u64 = 0x20;
    pub const FIELD_NAME: u64 = 0x00;
    pub const FIELD_OFFSET: u64 = 0x10;

    pub const MAX_FIELDS: i16 = 20000;
}

/// Iteration ceilings for every walk over remote structures
pub mod limits {
    pub const MAX_DYNAMIC_ENTRIES: usize = 4096;
    pub const MAX_SYMBOL_SCAN: usize = 1 << 20;
    pub const MAX_INTERFACE_NODES: usize = 4096;
    pub const MAX_CONVARS: u32 = 1 << 16;
    pub const MAX_CHAIN_LENGTH: usize = 1 << 16;
    pub const MAX_TYPE_SCOPES: i32 = 256;

    /// Upper bound on a single module dump (512 MiB)
    pub const MAX_MODULE_DUMP: u64 = 512 * 1024 * 1024;
    /// Dumps smaller than this are treated as unreadable
    pub const MIN_DUMP_SIZE: usize = 500;

    pub const MAX_STRING_LEN: usize = 1024;
    pub const STRING_CHUNK: usize = 64;
}

pub mod range {
    /// Slack added on both sides of every module when computing the range
    pub const ADDRESS_RANGE_MARGIN: u64 = 1_000_000;
}

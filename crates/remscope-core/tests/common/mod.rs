//! Synthetic target process that satisfies the standard discovery plan.
//!
//! Six ELF images sit 64 KiB apart starting at `ARENA_BASE`; interface
//! instances, console variables and the reflection registry live on a heap
//! after them. Any single required lookup can be left out with
//! [`Fixture::without`].

#![allow(dead_code)]

use std::collections::BTreeMap;

use remscope_core::RemoteAddress;
use remscope_core::layout::interface::{NODE_CREATE_FN, NODE_NAME, NODE_NEXT, STUB_OFFSET};
use remscope_core::layout::schema::{
    BLOB_DATA, BLOB_NEXT, BUCKET_HEAD, BUCKET_STRIDE, CLASS_FIELD_COUNT, CLASS_FIELDS, CLASS_NAME,
    CLASS_SIZE, FIELD_NAME, FIELD_OFFSET, FIELD_STRIDE, NODE_DATA, SCOPE_ARRAY, SCOPE_BUCKETS,
    SCOPE_COUNT, SCOPE_FREE_LIST, SCOPE_NAME,
};
use remscope_core::layout::target::{CLIENT_LIB, ENGINE_LIB, INPUT_LIB, SCHEMA_LIB, SDL_LIB, TIER0_LIB};
use remscope_core::offset::{DiscoveryPlan, Requirement, RequirementKind};
use remscope_core::process::{MockElf, MockMemoryBuilder, MockProcess};

pub const ARENA_BASE: u64 = 0x10_0000;
pub const MODULE_STRIDE: usize = 0x1_0000;
pub const MODULE_SIZE: u64 = 0x4000;
pub const PID: i32 = 31337;
pub const BUTTON_STATE: u32 = 0x5E70;
pub const ENTITY_IDENTITY_SIZE: i32 = 0x78;

const HEAP_START: usize = 0x6_0000;
/// Exported function of every image (CreateInterface or the SDL export)
const EXPORT: usize = 0x500;
const LIST_HEAD: usize = 0x3000;
const SIGNATURES: usize = 0x400;
const SCHEMA_SIGNATURE: usize = 0x400;
const SCOPE_SIZE: usize = 0x6800;

/// Bytes matching each standard client signature, operands zeroed.
fn signature_bytes(key: &str) -> Vec<u8> {
    match key {
        "direct.local_player" => vec![
            0x48, 0x83, 0x3D, 0, 0, 0, 0, 0x00, 0x0F, 0x95, 0xC0, 0xC3,
        ],
        "direct.view_matrix" => vec![
            0xC6, 0x83, 0x10, 0x02, 0x00, 0x00, 0x01, 0x4C, 0x8D, 0x05, 0, 0, 0, 0,
        ],
        "direct.planted_c4" => vec![
            0x48, 0x8D, 0x35, 0, 0, 0, 0, 0x66, 0x0F, 0xEF, 0xC0, 0xC6, 0x05, 0, 0, 0, 0, 0x01,
            0x48, 0x8D, 0x3D, 0, 0, 0, 0,
        ],
        "direct.global_vars" => vec![
            0x48, 0x8D, 0x05, 0, 0, 0, 0, 0x48, 0x8B, 0x00, 0x8B, 0x50, 0x08, 0xE9,
        ],
        other => panic!("no fixture bytes for signature {}", other),
    }
}

const SCHEMA_SYSTEM_BYTES: [u8; 27] = [
    0x48, 0x8D, 0x3D, 0, 0, 0, 0, 0xE8, 0, 0, 0, 0, 0x48, 0x8B, 0xBD, 0, 0, 0, 0, 0x31, 0xF6,
    0xE8, 0, 0, 0, 0, 0xE9,
];

/// Bump allocator over one mock address space.
struct Arena {
    memory: MockMemoryBuilder,
    next: usize,
}

impl Arena {
    fn new() -> Self {
        Self {
            memory: MockMemoryBuilder::new().base(ARENA_BASE),
            next: HEAP_START,
        }
    }

    fn alloc(&mut self, size: usize) -> usize {
        let at = self.next;
        self.memory.put_bytes(at, &vec![0u8; size]);
        self.next = (at + size + 0xF) & !0xF;
        at
    }

    fn addr(&self, offset: usize) -> u64 {
        self.memory.address_of(offset).get()
    }

    fn string(&mut self, text: &str) -> u64 {
        let at = self.alloc(text.len() + 1);
        self.memory.put_cstring(at, text);
        self.addr(at)
    }

    fn put_u64(&mut self, offset: usize, value: u64) {
        self.memory.put_value(offset, value);
    }

    /// RIP-relative operand of the instruction at `instr` pointing to `target`.
    fn put_rel(&mut self, instr: usize, disp_offset: usize, instr_len: usize, target: usize) {
        let disp = target as i64 - (instr + instr_len) as i64;
        self.memory.put_value(instr + disp_offset, disp as i32);
    }

    /// `CreateInterface` registration list of the image at `module`.
    fn registry(&mut self, module: usize, entries: &[(&str, usize)]) {
        let stub = module + EXPORT + STUB_OFFSET as usize;
        self.memory.put_bytes(stub, &[0x48, 0x8B, 0x05]);
        self.put_rel(stub, 3, 7, module + LIST_HEAD);

        let mut next = 0u64;
        for (index, (name, instance)) in entries.iter().enumerate().rev() {
            let create = module + 0x600 + index * 0x10;
            self.memory
                .put_bytes(create, &[0x48, 0x8D, 0x05])
                .put_value(create + 7, 0xC3u8);
            self.put_rel(create, 3, 7, *instance);

            let name = self.string(name);
            let node = self.alloc(0x18);
            let create = self.addr(create);
            self.put_u64(node + NODE_CREATE_FN as usize, create);
            self.put_u64(node + NODE_NAME as usize, name);
            self.put_u64(node + NODE_NEXT as usize, next);
            next = self.addr(node);
        }
        self.put_u64(module + LIST_HEAD, next);
    }

    fn class(&mut self, class: &ClassDef) -> u64 {
        let record = self.alloc(0x30);
        let vector = self.alloc(class.fields.len().max(1) * FIELD_STRIDE as usize);
        let name = self.string(&class.name);
        let count = class.count.unwrap_or(class.fields.len() as i16);

        self.put_u64(record + CLASS_NAME as usize, name);
        self.memory
            .put_value(record + CLASS_SIZE as usize, class.size)
            .put_value(record + CLASS_FIELD_COUNT as usize, count);
        let vector_addr = self.addr(vector);
        self.put_u64(record + CLASS_FIELDS as usize, vector_addr);

        for (index, (field, offset)) in class.fields.iter().enumerate() {
            let entry = vector + index * FIELD_STRIDE as usize;
            let field_name = self.string(field);
            self.put_u64(entry + FIELD_NAME as usize, field_name);
            self.memory.put_value(entry + FIELD_OFFSET as usize, *offset);
        }
        self.addr(record)
    }

    /// Type scope holding `classes`. Every fifth class goes on the free list,
    /// the rest are chained into eight buckets.
    fn scope(&mut self, name: &str, classes: &[ClassDef]) -> (u64, Vec<String>) {
        let scope = self.alloc(SCOPE_SIZE);
        self.memory.put_cstring(scope + SCOPE_NAME as usize, name);

        // Dead blob at the tail of the free list
        let tail = self.alloc(0x18);
        let mut free_head = self.addr(tail);
        let mut heads: BTreeMap<usize, u64> = BTreeMap::new();
        let mut free_listed = Vec::new();

        for (index, class) in classes.iter().enumerate() {
            let record = self.class(class);
            if index % 5 == 4 {
                let blob = self.alloc(0x18);
                self.put_u64(blob + BLOB_NEXT as usize, free_head);
                self.put_u64(blob + BLOB_DATA as usize, record);
                free_head = self.addr(blob);
                if class.count.is_none() {
                    free_listed.push(class.name.clone());
                }
            } else {
                let bucket = (index % 8) * 97;
                let node = self.alloc(0x18);
                let previous = heads.get(&bucket).copied().unwrap_or(0);
                self.put_u64(node + NODE_NEXT_SCHEMA, previous);
                self.put_u64(node + NODE_DATA as usize, record);
                heads.insert(bucket, self.addr(node));
            }
        }

        for (bucket, head) in heads {
            let slot = scope + SCOPE_BUCKETS as usize + bucket * BUCKET_STRIDE as usize;
            self.put_u64(slot + BUCKET_HEAD as usize, head);
        }
        self.put_u64(scope + SCOPE_FREE_LIST as usize, free_head);

        (self.addr(scope), free_listed)
    }
}

const NODE_NEXT_SCHEMA: usize = remscope_core::layout::schema::NODE_NEXT as usize;

#[derive(Debug, Clone)]
pub struct ClassDef {
    pub name: String,
    pub size: i32,
    pub fields: Vec<(String, i32)>,
    /// Field count written instead of the real one
    pub count: Option<i16>,
    next: i32,
}

impl ClassDef {
    fn new(name: &str, size: i32) -> Self {
        Self {
            name: name.to_string(),
            size,
            fields: Vec::new(),
            count: None,
            next: 0x40,
        }
    }

    fn next_offset(&mut self) -> i32 {
        let offset = self.next;
        self.next += 0x10;
        offset
    }
}

/// Knobs for the synthetic target.
#[derive(Debug, Clone)]
pub struct Fixture {
    omit: Option<Requirement>,
    optional_fields: bool,
    legacy_glow: bool,
}

/// A built target plus the value discovery is expected to produce per key.
pub struct Target {
    pub process: MockProcess,
    pub expected: BTreeMap<String, u64>,
    /// Client-scope classes reachable only through the free list
    pub free_listed: Vec<String>,
    pub schema_base: RemoteAddress,
}

impl Target {
    pub fn expected(&self, key: &str) -> u64 {
        self.expected[key]
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            omit: None,
            optional_fields: true,
            legacy_glow: false,
        }
    }

    /// Build the target so that `requirement` cannot be resolved.
    pub fn without(mut self, requirement: Requirement) -> Self {
        self.omit = Some(requirement);
        self
    }

    /// Leave every optional field out of the reflection registry.
    pub fn without_optional_fields(mut self) -> Self {
        self.optional_fields = false;
        self
    }

    /// Register the glow property under its fallback name.
    pub fn legacy_glow(mut self) -> Self {
        self.legacy_glow = true;
        self
    }

    fn omits(&self, kind: RequirementKind, name: &str) -> bool {
        self.omit
            .as_ref()
            .is_some_and(|r| r.kind == kind && r.name == name)
    }

    pub fn build(self) -> Target {
        use RequirementKind::*;

        let plan = DiscoveryPlan::standard();
        let module = |name: &str| {
            plan.libraries
                .iter()
                .position(|library| library.module == name)
                .map(|index| index * MODULE_STRIDE)
                .unwrap_or_else(|| panic!("{} is not a plan library", name))
        };

        let mut arena = Arena::new();
        let mut expected = BTreeMap::new();
        let mut registered = Vec::new();

        for library in plan.libraries {
            let offset = module(library.module);
            let export = if library.module != SDL_LIB {
                "CreateInterface"
            } else if self.omits(Export, "export.keyboard_focus") {
                "SDL_GetKeyboardFocusRenamed"
            } else {
                "SDL_GetKeyboardFocus"
            };
            let mut image = MockElf::new(MODULE_SIZE);
            if library.module == SDL_LIB {
                image = image.symbol("SDL_Init", 0x480);
            }
            image
                .symbol(export, EXPORT as u64)
                .write_into(&mut arena.memory, offset);

            let base = arena.addr(offset);
            expected.insert(library.key.to_string(), base);
            if !self.omits(Library, library.key) {
                registered.push((library.module, RemoteAddress::new(base)));
            }
        }

        // engine: resource service, entity system behind it
        let resource = arena.alloc(0x100);
        let entity_system = arena.alloc(0x100);
        if !self.omits(Derived, "interfaces.entity") {
            let entity = arena.addr(entity_system);
            arena.put_u64(resource + 0x50, entity);
        }
        let decoy = arena.alloc(0x10);
        let resource_name = if self.omits(Interface, "interfaces.resource") {
            "GameResourceServiceServerV001"
        } else {
            "GameResourceServiceClientV001"
        };
        arena.registry(
            module(ENGINE_LIB),
            &[("Source2EngineToClient001", decoy), (resource_name, resource)],
        );
        expected.insert("interfaces.resource".into(), arena.addr(resource));
        expected.insert("interfaces.entity".into(), arena.addr(entity_system) + 0x10);

        // tier0: console variables
        let cvar = arena.alloc(0x100);
        let convars: Vec<(&str, Option<&str>)> = [
            ("sv_cheats", None),
            ("mp_teammates_are_enemies", Some("convars.ffa")),
            ("sensitivity", Some("convars.sensitivity")),
        ]
        .into_iter()
        .filter(|(_, key)| !key.is_some_and(|key| self.omits(Convar, key)))
        .collect();
        let array = arena.alloc(convars.len() * 16);
        for (index, (name, key)) in convars.iter().enumerate() {
            let object = arena.alloc(0x40);
            let name = arena.string(name);
            arena.put_u64(object, name);
            let object = arena.addr(object);
            arena.put_u64(array + index * 16, object);
            if let Some(key) = key {
                expected.insert(key.to_string(), object);
            }
        }
        let array = arena.addr(array);
        arena.put_u64(cvar + 0x48, array);
        arena.memory.put_value(cvar + 0xA0, convars.len() as u32);
        let cvar_name = if self.omits(Interface, "interfaces.cvar") {
            "VEngineConsole001"
        } else {
            "VEngineCvar007"
        };
        arena.registry(module(TIER0_LIB), &[(cvar_name, cvar)]);
        expected.insert("interfaces.cvar".into(), arena.addr(cvar));

        // input: vtable slot 19 holds the key-state offset at +0x14
        let input = arena.alloc(0x40);
        let vtable = arena.alloc(20 * 8);
        let function = module(INPUT_LIB) + 0x800;
        arena.memory.put_value(function + 0x14, BUTTON_STATE);
        let function = arena.addr(function);
        arena.put_u64(vtable + 19 * 8, function);
        if !self.omits(Derived, "direct.button_state") {
            let vtable = arena.addr(vtable);
            arena.put_u64(input, vtable);
        }
        let input_name = if self.omits(Interface, "interfaces.input") {
            "InputStackSystemVersion001"
        } else {
            "InputSystemVersion001"
        };
        arena.registry(module(INPUT_LIB), &[(input_name, input)]);
        expected.insert("interfaces.input".into(), arena.addr(input));
        expected.insert("direct.button_state".into(), u64::from(BUTTON_STATE));

        // sdl: `jmp [rip + slot]` export, slot -> `mov rax, [rip + window]`
        let sdl = module(SDL_LIB);
        let (export, slot, code, window) = (sdl + EXPORT, sdl + 0x2000, sdl + 0x800, sdl + 0x2800);
        arena.memory.put_bytes(export, &[0xFF, 0x25]);
        arena.put_rel(export, 2, 6, slot);
        arena.memory.put_bytes(code, &[0x48, 0x8B, 0x05]);
        arena.put_rel(code, 3, 7, window);
        if !self.omits(Derived, "direct.sdl_window") {
            let code = arena.addr(code);
            arena.put_u64(slot, code);
        }
        expected.insert("export.keyboard_focus".into(), arena.addr(export));
        expected.insert("direct.sdl_window".into(), arena.addr(window));

        // client: one hit per signature, each pointing at its own global
        let client = module(CLIENT_LIB);
        for (index, signature) in plan.signatures.iter().enumerate() {
            let at = client + SIGNATURES + index * 0x40;
            let target = client + 0x3000 + index * 0x100;
            expected.insert(signature.key.to_string(), arena.addr(target));
            if self.omits(Signature, signature.key) {
                continue;
            }
            arena.memory.put_bytes(at, &signature_bytes(signature.key));
            arena.put_rel(
                at + signature.instr_offset as usize,
                signature.disp_offset as usize,
                signature.instr_len as usize,
                target,
            );
        }

        // reflection registry
        let mut classes: BTreeMap<&str, ClassDef> = BTreeMap::new();
        for request in plan.fields {
            let class = classes
                .entry(request.class)
                .or_insert_with(|| ClassDef::new(request.class, 0x400));
            let offset = class.next_offset();
            expected.insert(request.key.to_string(), offset as u64 + request.addend);
            if !self.omits(Field, request.key) {
                class.fields.push((request.field.to_string(), offset));
            }
        }
        if self.optional_fields {
            for request in plan.optional_fields {
                let field = if self.legacy_glow && request.fields.len() > 1 {
                    request.fields[1]
                } else {
                    request.fields[0]
                };
                let class = classes
                    .entry(request.class)
                    .or_insert_with(|| ClassDef::new(request.class, 0x40));
                let offset = class.next_offset();
                class.fields.push((field.to_string(), offset));
                expected.insert(request.key.to_string(), offset as u64);
            }
        }
        if !self.omits(ClassSize, "entity_identity.size") {
            let mut identity = ClassDef::new("CEntityIdentity", ENTITY_IDENTITY_SIZE);
            identity.fields.push(("m_designerName".to_string(), 0x20));
            classes.insert("CEntityIdentity", identity);
        }
        expected.insert("entity_identity.size".into(), ENTITY_IDENTITY_SIZE as u64);

        let mut corrupted = ClassDef::new("CCorruptedRecord", 0x10);
        corrupted.fields.push(("m_value".to_string(), 0x8));
        corrupted.count = Some(30000);
        classes.insert("CCorruptedRecord", corrupted);

        let client_classes: Vec<ClassDef> = classes.into_values().collect();
        let scope_name = if self.omits(Scope, CLIENT_LIB) {
            "libclient_legacy.so"
        } else {
            CLIENT_LIB
        };
        let (client_scope, free_listed) = arena.scope(scope_name, &client_classes);

        let mut engine_only = ClassDef::new("CEngineOnly", 0x10);
        engine_only.fields.push(("m_nValue".to_string(), 0x8));
        let (engine_scope, _) = arena.scope(ENGINE_LIB, &[engine_only]);

        let system = arena.alloc(0x200);
        let scopes = arena.alloc(0x10);
        arena.put_u64(scopes, client_scope);
        arena.put_u64(scopes + 8, engine_scope);
        arena.memory.put_value(system + SCOPE_COUNT as usize, 2i32);
        let scopes = arena.addr(scopes);
        arena.put_u64(system + SCOPE_ARRAY as usize, scopes);

        let schema = module(SCHEMA_LIB);
        if !self.omits(Schema, "schema") {
            arena.memory.put_bytes(schema + SCHEMA_SIGNATURE, &SCHEMA_SYSTEM_BYTES);
            arena.put_rel(schema + SCHEMA_SIGNATURE, 3, 7, system);
        }
        let schema_base = RemoteAddress::new(arena.addr(schema));

        let mut builder = MockProcess::builder(arena.memory.build()).pid(PID);
        for (name, base) in registered {
            builder = builder.module(name, base);
        }

        Target {
            process: builder.build(),
            expected,
            free_listed,
            schema_base,
        }
    }
}

/// The full target with nothing left out.
pub fn target() -> Target {
    Fixture::new().build()
}

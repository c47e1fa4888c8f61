use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::address::{AddressRange, RemoteAddress};
use crate::image;
use crate::interface::relative_target;
use crate::layout::limits::{MAX_CHAIN_LENGTH, MAX_TYPE_SCOPES};
use crate::layout::schema::*;
use crate::pattern::Pattern;
use crate::process::ReadMemory;
use crate::schema::class::{ModuleScope, Schema, SchemaClass};

/// Bounded walk over a singly linked remote list.
///
/// Yields each non-null node, following the pointer at `next_offset`, and
/// stops at null or after `MAX_CHAIN_LENGTH` nodes.
struct Chain<'r, R> {
    reader: &'r R,
    node: RemoteAddress,
    next_offset: u64,
    steps: usize,
}

impl<'r, R: ReadMemory> Chain<'r, R> {
    fn new(reader: &'r R, head: RemoteAddress, next_offset: u64) -> Self {
        Self {
            reader,
            node: head,
            next_offset,
            steps: 0,
        }
    }
}

impl<R: ReadMemory> Iterator for Chain<'_, R> {
    type Item = RemoteAddress;

    fn next(&mut self) -> Option<Self::Item> {
        if self.node.is_null() {
            return None;
        }
        if self.steps >= MAX_CHAIN_LENGTH {
            warn!("Chain walk stopped after {} nodes at {}", self.steps, self.node);
            return None;
        }
        let current = self.node;
        self.node = self.reader.read_pointer(current + self.next_offset);
        self.steps += 1;
        Some(current)
    }
}

/// Walk the reflection registry of the target.
///
/// `None` when the registry singleton cannot be located or its scope count is
/// implausible. Free-list records outside `range` are ignored.
pub fn build<R: ReadMemory>(
    reader: &R,
    range: AddressRange,
    schema_base: RemoteAddress,
) -> Option<Schema> {
    let Some(hit) = image::scan_module(reader, schema_base, &Pattern::compile(SYSTEM_PATTERN))
    else {
        debug!("Schema system signature not found in module {}", schema_base);
        return None;
    };
    let system = relative_target(reader, hit, 3, 7);
    debug!("Schema system at {}", system);

    let count = reader.read::<i32>(system + SCOPE_COUNT);
    if !(0..=MAX_TYPE_SCOPES).contains(&count) {
        warn!("Implausible type scope count {} at {}", count, system);
        return None;
    }
    let scopes = reader.read_pointer(system + SCOPE_ARRAY);

    let mut schema = Schema::new();
    for index in 0..count as u64 {
        let scope = reader.read_pointer(scopes + index * 8);
        if scope.is_null() {
            continue;
        }
        let scope = read_scope(reader, range, scope);
        debug!("Type scope {} with {} classes", scope.name(), scope.len());
        schema.insert(scope);
    }

    info!(
        "Schema loaded: {} scopes, {} classes",
        schema.scopes().count(),
        schema.class_count()
    );
    Some(schema)
}

/// Collect every class record reachable from one type scope.
pub fn read_scope<R: ReadMemory>(
    reader: &R,
    range: AddressRange,
    scope: RemoteAddress,
) -> ModuleScope {
    let mut module = ModuleScope::new(reader.read_cstring(scope + SCOPE_NAME));

    let buckets = scope + SCOPE_BUCKETS;
    for bucket in 0..BUCKET_COUNT {
        let head = reader.read_pointer(buckets + bucket * BUCKET_STRIDE + BUCKET_HEAD);
        for node in Chain::new(reader, head, NODE_NEXT) {
            let data = reader.read_pointer(node + NODE_DATA);
            if data.is_null() {
                continue;
            }
            if let Some(class) = read_class(reader, data) {
                module.insert(class);
            }
        }
    }

    let free_list = reader.read_pointer(scope + SCOPE_FREE_LIST);
    for blob in Chain::new(reader, free_list, BLOB_NEXT) {
        let data = reader.read_pointer(blob + BLOB_DATA);
        if !range.contains(data) {
            continue;
        }
        if let Some(class) = read_class(reader, data) {
            module.insert(class);
        }
    }

    module
}

/// Parse one class record. Records with no name or a field count outside
/// `0..=MAX_FIELDS` are skipped.
pub fn read_class<R: ReadMemory>(reader: &R, record: RemoteAddress) -> Option<SchemaClass> {
    let name = reader.read_cstring(reader.read_pointer(record + CLASS_NAME));
    if name.is_empty() {
        return None;
    }

    let field_count = reader.read::<i16>(record + CLASS_FIELD_COUNT);
    if !(0..=MAX_FIELDS).contains(&field_count) {
        warn!(
            "Skipping class {} with field count {} at {}",
            name, field_count, record
        );
        return None;
    }

    let size = reader.read::<i32>(record + CLASS_SIZE);
    let vector = reader.read_pointer(record + CLASS_FIELDS);

    let mut fields = HashMap::with_capacity(field_count as usize);
    for index in 0..field_count as u64 {
        let field = vector + index * FIELD_STRIDE;
        let field_name = reader.read_cstring(reader.read_pointer(field + FIELD_NAME));
        if field_name.is_empty() {
            continue;
        }
        fields.insert(field_name, reader.read::<i32>(field + FIELD_OFFSET));
    }

    Some(SchemaClass::new(name, size, fields))
}

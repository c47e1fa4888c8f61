//! Interface registry, RIP-relative operands, vtable slots and console variables.

use tracing::{debug, warn};

use crate::address::RemoteAddress;
use crate::error::Result;
use crate::image;
use crate::layout::convar;
use crate::layout::interface::{
    FACTORY_EXPORT, NODE_CREATE_FN, NODE_NAME, NODE_NEXT, RIP_DISP_OFFSET, RIP_INSTR_LEN,
    STUB_OFFSET,
};
use crate::layout::limits::{MAX_CONVARS, MAX_INTERFACE_NODES};
use crate::process::ReadMemory;

/// Target of a RIP-relative operand.
///
/// `instruction + instr_len + disp32`, with the displacement read at
/// `instruction + disp_offset` and sign-extended. A failed read counts as a
/// zero displacement.
pub fn relative_target<R: ReadMemory>(
    reader: &R,
    instruction: RemoteAddress,
    disp_offset: u64,
    instr_len: u64,
) -> RemoteAddress {
    let displacement = reader.read::<i32>(instruction + disp_offset);
    instruction.offset(instr_len as i64 + i64::from(displacement))
}

/// [`relative_target`] that fails when the displacement is unreadable.
pub fn try_relative_target<R: ReadMemory>(
    reader: &R,
    instruction: RemoteAddress,
    disp_offset: u64,
    instr_len: u64,
) -> Result<RemoteAddress> {
    let displacement = reader.try_read::<i32>(instruction + disp_offset)?;
    Ok(instruction.offset(instr_len as i64 + i64::from(displacement)))
}

/// Resolve the first registered interface whose name starts with `prefix`.
pub fn interface_address<R: ReadMemory>(
    reader: &R,
    module_base: RemoteAddress,
    prefix: &str,
) -> Option<RemoteAddress> {
    let factory = image::module_export(reader, module_base, FACTORY_EXPORT)?;
    let list_head = relative_target(reader, factory + STUB_OFFSET, RIP_DISP_OFFSET, RIP_INSTR_LEN);
    let mut node = reader.read_pointer(list_head);

    for _ in 0..MAX_INTERFACE_NODES {
        if node.is_null() {
            debug!("Interface {} not registered in module {}", prefix, module_base);
            return None;
        }

        let name = reader.read_cstring(reader.read_pointer(node + NODE_NAME));
        if name.starts_with(prefix) {
            let create = reader.read_pointer(node + NODE_CREATE_FN);
            let address = relative_target(reader, create, RIP_DISP_OFFSET, RIP_INSTR_LEN);
            debug!("Interface {} ({}) at {}", prefix, name, address);
            return Some(address);
        }

        node = reader.read_pointer(node + NODE_NEXT);
    }

    warn!(
        "Interface list of module {} exceeded {} nodes",
        module_base, MAX_INTERFACE_NODES
    );
    None
}

/// Entry `index` of the object's virtual table.
pub fn virtual_function<R: ReadMemory>(
    reader: &R,
    object: RemoteAddress,
    index: u64,
) -> RemoteAddress {
    let vtable = reader.read_pointer(object);
    reader.read_pointer(vtable + index * 8)
}

/// Console variable object named exactly `name`.
pub fn console_variable<R: ReadMemory>(
    reader: &R,
    cvar_interface: RemoteAddress,
    name: &str,
) -> Option<RemoteAddress> {
    if cvar_interface.is_null() {
        return None;
    }

    let objects = reader.read_pointer(cvar_interface + convar::OBJECTS);
    let count = reader.read::<u32>(cvar_interface + convar::COUNT).min(MAX_CONVARS);

    for index in 0..u64::from(count) {
        let object = reader.read_pointer(objects + index * convar::STRIDE);
        if object.is_null() {
            break;
        }
        if reader.read_cstring(reader.read_pointer(object)) == name {
            return Some(object);
        }
    }

    None
}

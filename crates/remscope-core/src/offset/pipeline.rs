//! Transactional discovery: resolve every lookup of a plan or fail with the
//! first one that cannot be resolved.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::address::RemoteAddress;
use crate::error::Error;
use crate::image;
use crate::interface::{console_variable, interface_address, relative_target, try_relative_target};
use crate::offset::error::DiscoveryError;
use crate::offset::plan::{Derivation, DiscoveryPlan, SchemaRequest};
use crate::offset::table::{OffsetTable, Resolved};
use crate::pattern::Pattern;
use crate::process::{ReadMemory, RemoteProcess};
use crate::schema::{ModuleScope, Schema};

/// Discover the standard offset table of an attached process.
pub fn discover<P: RemoteProcess>(process: &P) -> Result<OffsetTable, DiscoveryError> {
    let resolved = resolve(process, &DiscoveryPlan::standard())?;
    let table = OffsetTable::from_resolved(&resolved)?;
    info!(
        "Discovery complete for pid {}: {} values resolved",
        process.pid(),
        resolved.len()
    );
    Ok(table)
}

/// Run every step of `plan` in order.
///
/// Nothing is returned unless every required lookup succeeded. Optional
/// fields that are absent are left out of the result.
pub fn resolve<P: RemoteProcess>(
    process: &P,
    plan: &DiscoveryPlan,
) -> Result<Resolved, DiscoveryError> {
    let mut resolved = Resolved::new();

    resolve_libraries(process, plan, &mut resolved)?;
    resolve_exports(process, plan, &mut resolved)?;
    resolve_interfaces(process, plan, &mut resolved)?;
    resolve_signatures(process, plan, &mut resolved)?;
    resolve_convars(process, plan, &mut resolved)?;
    if let Some(request) = &plan.schema {
        let scope = load_scope(process, plan, request, &resolved)?;
        resolve_fields(plan, &scope, &mut resolved)?;
    }
    resolve_derived(process, plan, &mut resolved)?;

    Ok(resolved)
}

fn module_name(plan: &DiscoveryPlan, library_key: &str) -> String {
    plan.library(library_key)
        .map(|library| library.module)
        .unwrap_or(library_key)
        .to_string()
}

fn resolve_libraries<P: RemoteProcess>(
    process: &P,
    plan: &DiscoveryPlan,
    resolved: &mut Resolved,
) -> Result<(), DiscoveryError> {
    for library in plan.libraries {
        let base = process
            .module_base(library.module)
            .ok_or_else(|| DiscoveryError::ModuleNotLoaded {
                key: library.key.to_string(),
                module: library.module.to_string(),
            })?;
        debug!("{} ({}) at {}", library.key, library.module, base);
        resolved.insert(library.key, base.get());
    }
    Ok(())
}

fn resolve_exports<R: ReadMemory>(
    reader: &R,
    plan: &DiscoveryPlan,
    resolved: &mut Resolved,
) -> Result<(), DiscoveryError> {
    for export in plan.exports {
        let base = RemoteAddress::new(resolved.require(export.library)?);
        let address = image::module_export(reader, base, export.symbol).ok_or_else(|| {
            DiscoveryError::ExportNotFound {
                key: export.key.to_string(),
                module: module_name(plan, export.library),
                symbol: export.symbol.to_string(),
            }
        })?;
        debug!("{} ({}) at {}", export.key, export.symbol, address);
        resolved.insert(export.key, address.get());
    }
    Ok(())
}

fn resolve_interfaces<R: ReadMemory>(
    reader: &R,
    plan: &DiscoveryPlan,
    resolved: &mut Resolved,
) -> Result<(), DiscoveryError> {
    for interface in plan.interfaces {
        let base = RemoteAddress::new(resolved.require(interface.library)?);
        let address = interface_address(reader, base, interface.prefix).ok_or_else(|| {
            DiscoveryError::InterfaceNotFound {
                key: interface.key.to_string(),
                module: module_name(plan, interface.library),
                prefix: interface.prefix.to_string(),
            }
        })?;
        debug!("{} at {}", interface.key, address);
        resolved.insert(interface.key, address.get());
    }
    Ok(())
}

fn resolve_signatures<R: ReadMemory>(
    reader: &R,
    plan: &DiscoveryPlan,
    resolved: &mut Resolved,
) -> Result<(), DiscoveryError> {
    // one dump per module, shared by every signature that targets it
    let mut dumps: HashMap<&str, Vec<u8>> = HashMap::new();

    for signature in plan.signatures {
        let base = RemoteAddress::new(resolved.require(signature.library)?);
        let dump = dumps.entry(signature.library).or_insert_with(|| {
            debug!("Dumping {} for signature scans", module_name(plan, signature.library));
            image::dump_module(reader, base)
        });
        let pattern = Pattern::compile(signature.pattern);
        let hit = image::scan_dump(base, dump, &pattern).ok_or_else(|| {
            DiscoveryError::SignatureNotFound {
                key: signature.key.to_string(),
                module: module_name(plan, signature.library),
            }
        })?;
        let address = relative_target(
            reader,
            hit + signature.instr_offset,
            signature.disp_offset,
            signature.instr_len,
        );
        debug!("{} matched at {}, target {}", signature.key, hit, address);
        resolved.insert(signature.key, address.get());
    }
    Ok(())
}

fn resolve_convars<R: ReadMemory>(
    reader: &R,
    plan: &DiscoveryPlan,
    resolved: &mut Resolved,
) -> Result<(), DiscoveryError> {
    for convar in plan.convars {
        let interface = RemoteAddress::new(resolved.require(convar.interface)?);
        let address = console_variable(reader, interface, convar.name).ok_or_else(|| {
            DiscoveryError::ConvarNotFound {
                key: convar.key.to_string(),
                name: convar.name.to_string(),
            }
        })?;
        debug!("{} ({}) at {}", convar.key, convar.name, address);
        resolved.insert(convar.key, address.get());
    }
    Ok(())
}

fn load_scope<P: RemoteProcess>(
    process: &P,
    plan: &DiscoveryPlan,
    request: &SchemaRequest,
    resolved: &Resolved,
) -> Result<ModuleScope, DiscoveryError> {
    let base = RemoteAddress::new(resolved.require(request.library)?);
    let schema =
        Schema::build(process, base).ok_or_else(|| DiscoveryError::SchemaUnavailable {
            key: request.key.to_string(),
            module: module_name(plan, request.library),
        })?;
    schema
        .into_scope(request.scope)
        .ok_or_else(|| DiscoveryError::ScopeNotFound {
            scope: request.scope.to_string(),
        })
}

fn resolve_fields(
    plan: &DiscoveryPlan,
    scope: &ModuleScope,
    resolved: &mut Resolved,
) -> Result<(), DiscoveryError> {
    for request in plan.fields {
        let offset = scope.lookup(request.class, request.field).ok_or_else(|| {
            DiscoveryError::FieldNotFound {
                key: request.key.to_string(),
                class: request.class.to_string(),
                field: request.field.to_string(),
            }
        })?;
        resolved.insert(request.key, offset + request.addend);
    }
    debug!("{} schema fields resolved", plan.fields.len());

    for request in plan.optional_fields {
        let found = request
            .fields
            .iter()
            .find_map(|field| scope.lookup(request.class, field));
        match found {
            Some(offset) => resolved.insert(request.key, offset),
            None => debug!("Optional {} not present in {}", request.key, request.class),
        }
    }

    for request in plan.class_sizes {
        let class = scope
            .class(request.class)
            .ok_or_else(|| DiscoveryError::ClassNotFound {
                key: request.key.to_string(),
                class: request.class.to_string(),
            })?;
        let size = u64::try_from(class.size())
            .ok()
            .filter(|size| *size > 0)
            .ok_or_else(|| DiscoveryError::InvalidClassSize {
                key: request.key.to_string(),
                class: request.class.to_string(),
                size: class.size(),
            })?;
        debug!("{} = {:#x}", request.key, size);
        resolved.insert(request.key, size);
    }
    Ok(())
}

fn resolve_derived<R: ReadMemory>(
    reader: &R,
    plan: &DiscoveryPlan,
    resolved: &mut Resolved,
) -> Result<(), DiscoveryError> {
    for request in plan.derived {
        let source = RemoteAddress::new(resolved.require(request.derivation.source())?);
        let value = derive(reader, source, &request.derivation).map_err(|message| {
            DiscoveryError::DerivedValue {
                key: request.key.to_string(),
                message,
            }
        })?;
        debug!("{} = {:#x}", request.key, value);
        resolved.insert(request.key, value);
    }
    Ok(())
}

fn derive<R: ReadMemory>(
    reader: &R,
    source: RemoteAddress,
    derivation: &Derivation,
) -> Result<u64, String> {
    match *derivation {
        Derivation::PointerAt { offset, addend, .. } => {
            let pointer = checked_pointer(reader, source + offset)?;
            Ok(pointer.get().wrapping_add(addend))
        }
        Derivation::VirtualSlotU32 {
            index,
            field_offset,
            ..
        } => {
            let vtable = checked_pointer(reader, source)?;
            let function = checked_pointer(reader, vtable + index * 8)?;
            reader
                .try_read::<u32>(function + field_offset)
                .map(u64::from)
                .map_err(|e| e.to_string())
        }
        Derivation::RelativeChain { first, second, .. } => {
            let slot = try_relative_target(reader, source, first.0, first.1)
                .map_err(|e| e.to_string())?;
            let code = checked_pointer(reader, slot)?;
            try_relative_target(reader, code, second.0, second.1)
                .map(RemoteAddress::get)
                .map_err(|e| e.to_string())
        }
    }
}

/// Read a pointer that must be readable and non-null.
fn checked_pointer<R: ReadMemory>(
    reader: &R,
    address: RemoteAddress,
) -> Result<RemoteAddress, String> {
    let pointer = reader
        .try_read::<RemoteAddress>(address)
        .map_err(|e: Error| e.to_string())?;
    pointer
        .non_null()
        .ok_or_else(|| format!("null pointer at {}", address))
}

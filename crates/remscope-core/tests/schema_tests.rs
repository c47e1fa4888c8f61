//! Reflection registry walks over the synthetic target.

mod common;

use common::{ENTITY_IDENTITY_SIZE, target};
use remscope_core::AddressRange;
use remscope_core::layout::target::{CLIENT_LIB, ENGINE_LIB};
use remscope_core::process::RemoteProcess;
use remscope_core::schema::Schema;

#[test]
fn test_build_reads_every_scope() {
    let target = target();
    let schema = Schema::build(&target.process, target.schema_base).unwrap();

    let mut names: Vec<&str> = schema.scopes().map(|scope| scope.name()).collect();
    names.sort_unstable();
    assert_eq!(names, vec![CLIENT_LIB, ENGINE_LIB]);
    assert_eq!(schema.lookup(ENGINE_LIB, "CEngineOnly", "m_nValue"), Some(8));
}

#[test]
fn test_lookup_and_class_size() {
    let target = target();
    let schema = Schema::build(&target.process, target.schema_base).unwrap();

    assert_eq!(
        schema.lookup(CLIENT_LIB, "C_BaseEntity", "m_iHealth"),
        Some(target.expected("pawn.health"))
    );
    assert_eq!(
        schema.class(CLIENT_LIB, "CEntityIdentity").map(|class| class.size()),
        Some(ENTITY_IDENTITY_SIZE)
    );
    assert_eq!(schema.lookup(CLIENT_LIB, "C_BaseEntity", "m_iMissing"), None);
    assert_eq!(schema.lookup(ENGINE_LIB, "C_BaseEntity", "m_iHealth"), None);
}

#[test]
fn test_free_list_classes_are_found() {
    let target = target();
    let schema = Schema::build(&target.process, target.schema_base).unwrap();

    assert!(!target.free_listed.is_empty());
    for name in &target.free_listed {
        assert!(schema.class(CLIENT_LIB, name).is_some(), "{}", name);
    }
}

#[test]
fn test_free_list_outside_range_is_ignored() {
    let target = target();
    let full = Schema::build(&target.process, target.schema_base).unwrap();
    assert!(!target.process.address_range().is_empty());

    // a window that excludes the heap holding every class record
    let narrow = AddressRange::new(0, 0x1000);
    let schema = Schema::build_with_range(&target.process, narrow, target.schema_base).unwrap();
    let scope = schema.scope(CLIENT_LIB).unwrap();

    for name in &target.free_listed {
        assert!(scope.class(name).is_none(), "{}", name);
    }
    assert_eq!(
        scope.len() + target.free_listed.len(),
        full.scope(CLIENT_LIB).unwrap().len()
    );
}

#[test]
fn test_corrupted_field_count_skips_class() {
    let target = target();
    let schema = Schema::build(&target.process, target.schema_base).unwrap();

    assert!(schema.class(CLIENT_LIB, "CCorruptedRecord").is_none());
}

#[test]
fn test_missing_registry() {
    let target = target();
    let client = target.process.module_base(CLIENT_LIB).unwrap();

    assert!(Schema::build(&target.process, client).is_none());
}

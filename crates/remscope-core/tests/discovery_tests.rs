//! End-to-end discovery against the synthetic target.

mod common;

use common::{BUTTON_STATE, Fixture, PID, target};
use remscope_core::layout::target::{CLIENT_LIB, SCHEMA_LIB};
use remscope_core::offset::{
    DiscoveryError, DiscoveryPlan, LibraryRequest, OptionalFieldRequest, Requirement,
    RequirementKind, SchemaRequest, discover, resolve,
};
use remscope_core::process::RemoteProcess;

#[test]
fn test_discover_full_table() {
    let target = target();
    let table = discover(&target.process).unwrap();

    assert_eq!(table.library.client, target.expected("library.client"));
    assert_eq!(table.interfaces.entity, target.expected("interfaces.entity"));
    assert_eq!(table.direct.button_state, u64::from(BUTTON_STATE));
    assert_eq!(table.direct.view_matrix, target.expected("direct.view_matrix"));
    assert_eq!(table.direct.sdl_window, target.expected("direct.sdl_window"));
    assert_eq!(table.convars.sensitivity, target.expected("convars.sensitivity"));
    assert_eq!(table.pawn.health, target.expected("pawn.health"));
    assert_eq!(table.entity_identity.size, 0x78);
    assert_eq!(table.glow.property, Some(target.expected("glow.property")));
    assert_eq!(
        table.controller.mvp_count,
        Some(target.expected("controller.mvp_count"))
    );
}

#[test]
fn test_resolve_matches_every_expected_value() {
    let target = target();
    let resolved = resolve(&target.process, &DiscoveryPlan::standard()).unwrap();

    for (key, value) in &target.expected {
        assert_eq!(resolved.get(key), Some(*value), "{}", key);
    }
    assert_eq!(resolved.len(), target.expected.len());
}

#[test]
fn test_aim_punch_cache_includes_addend() {
    let target = target();
    let table = discover(&target.process).unwrap();

    // fixture fields sit on 16-byte boundaries; the cache is 8 bytes past one
    assert_eq!(table.pawn.aim_punch_cache, target.expected("pawn.aim_punch_cache"));
    assert_eq!(table.pawn.aim_punch_cache % 0x10, 8);
}

#[test]
fn test_table_entries_are_plan_keys() {
    let target = target();
    let table = discover(&target.process).unwrap();

    for (key, value) in table.entries() {
        assert_eq!(target.expected.get(&key), Some(&value), "{}", key);
    }
}

#[test]
fn test_every_requirement_is_fatal() {
    let plan = DiscoveryPlan::standard();

    for requirement in plan.requirements() {
        let target = Fixture::new().without(requirement.clone()).build();

        let error = resolve(&target.process, &plan)
            .expect_err(&format!("discovery succeeded without {}", requirement));
        assert_eq!(error.requirement(), requirement, "{}", error);
        assert!(discover(&target.process).is_err(), "{}", requirement);
    }
}

#[test]
fn test_failure_names_the_lookup() {
    let target = Fixture::new()
        .without(Requirement::new(
            RequirementKind::Field,
            "planted_c4.bomb_site",
        ))
        .build();

    let error = discover(&target.process).unwrap_err();
    assert_eq!(
        error,
        DiscoveryError::FieldNotFound {
            key: "planted_c4.bomb_site".to_string(),
            class: "C_PlantedC4".to_string(),
            field: "m_nBombSite".to_string(),
        }
    );
}

#[test]
fn test_missing_module_reports_module_name() {
    let target = Fixture::new()
        .without(Requirement::new(
            RequirementKind::Library,
            "library.schema",
        ))
        .build();

    match discover(&target.process) {
        Err(DiscoveryError::ModuleNotLoaded { module, .. }) => assert_eq!(module, SCHEMA_LIB),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_optional_fields_absent() {
    let target = Fixture::new().without_optional_fields().build();
    let table = discover(&target.process).unwrap();

    assert_eq!(table.glow.property, None);
    assert_eq!(table.glow.enabled, None);
    assert_eq!(table.glow.through_walls, None);
    assert_eq!(table.controller.sanitized_name, None);
    assert_eq!(table.controller.mvp_count, None);
    assert_eq!(table.pawn.health, target.expected("pawn.health"));
}

#[test]
fn test_optional_field_fallback_name() {
    let target = Fixture::new().legacy_glow().build();
    let table = discover(&target.process).unwrap();

    assert_eq!(table.glow.property, Some(target.expected("glow.property")));
}

#[test]
fn test_custom_plan() {
    const PLAN: DiscoveryPlan = DiscoveryPlan {
        libraries: &[LibraryRequest {
            key: "library.schema",
            module: SCHEMA_LIB,
        }],
        exports: &[],
        interfaces: &[],
        signatures: &[],
        convars: &[],
        schema: Some(SchemaRequest {
            key: "schema",
            library: "library.schema",
            scope: CLIENT_LIB,
        }),
        fields: &[],
        optional_fields: &[OptionalFieldRequest {
            key: "glow.property",
            class: "C_BaseModelEntity",
            fields: &["m_GlowProperty", "m_Glow"],
        }],
        class_sizes: &[],
        derived: &[],
    };

    let target = target();
    let resolved = resolve(&target.process, &PLAN).unwrap();

    assert_eq!(resolved.len(), 2);
    assert_eq!(resolved.get("glow.property"), Some(target.expected("glow.property")));
    assert_eq!(target.process.pid(), PID);
}

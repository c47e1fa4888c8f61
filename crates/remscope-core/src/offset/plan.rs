//! Static description of everything discovery has to resolve.
//!
//! Keys are dotted `group.field` names. Keys of values that end up in the
//! [`OffsetTable`](crate::offset::OffsetTable) match its serialized layout;
//! intermediate values (exports) use their own prefix.

use std::fmt;

use serde::Serialize;
use strum::{Display, EnumIter, IntoStaticStr};

use crate::layout::target::{
    CLIENT_LIB, ENGINE_LIB, INPUT_LIB, SCHEMA_LIB, SDL_LIB, TIER0_LIB,
};

#[derive(Debug, Clone, Copy)]
pub struct LibraryRequest {
    pub key: &'static str,
    pub module: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct ExportRequest {
    pub key: &'static str,
    /// Key of the library exporting the symbol
    pub library: &'static str,
    pub symbol: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct InterfaceRequest {
    pub key: &'static str,
    pub library: &'static str,
    /// Registered names are matched by prefix
    pub prefix: &'static str,
}

/// A code signature whose hit contains a RIP-relative operand.
///
/// The operand's instruction starts `instr_offset` bytes into the match.
#[derive(Debug, Clone, Copy)]
pub struct SignatureRequest {
    pub key: &'static str,
    pub library: &'static str,
    pub pattern: &'static str,
    pub instr_offset: u64,
    pub disp_offset: u64,
    pub instr_len: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct ConvarRequest {
    pub key: &'static str,
    /// Key of the resolved cvar interface
    pub interface: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct SchemaRequest {
    pub key: &'static str,
    pub library: &'static str,
    /// Type scope every field and class request is looked up in
    pub scope: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRequest {
    pub key: &'static str,
    pub class: &'static str,
    pub field: &'static str,
    pub addend: u64,
}

/// A field that some target builds lack; the first name found wins.
#[derive(Debug, Clone, Copy)]
pub struct OptionalFieldRequest {
    pub key: &'static str,
    pub class: &'static str,
    pub fields: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub struct ClassSizeRequest {
    pub key: &'static str,
    pub class: &'static str,
}

/// How a derived value is computed from already resolved ones.
#[derive(Debug, Clone, Copy)]
pub enum Derivation {
    /// `read_u64(source + offset) + addend`
    PointerAt {
        source: &'static str,
        offset: u64,
        addend: u64,
    },
    /// `read_u32(vtable_slot(source, index) + field_offset)`
    VirtualSlotU32 {
        source: &'static str,
        index: u64,
        field_offset: u64,
    },
    /// Follow a RIP-relative operand in `source`, load the pointer it
    /// targets, then follow the RIP-relative operand found there.
    RelativeChain {
        source: &'static str,
        first: (u64, u64),
        second: (u64, u64),
    },
}

impl Derivation {
    pub fn source(&self) -> &'static str {
        match self {
            Derivation::PointerAt { source, .. }
            | Derivation::VirtualSlotU32 { source, .. }
            | Derivation::RelativeChain { source, .. } => source,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DerivedRequest {
    pub key: &'static str,
    pub derivation: Derivation,
}

/// Category of a required lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    Library,
    Export,
    Interface,
    Signature,
    Convar,
    Schema,
    Scope,
    Field,
    ClassSize,
    Derived,
}

/// Identity of one required lookup of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Requirement {
    pub kind: RequirementKind,
    pub name: String,
}

impl Requirement {
    pub fn new(kind: RequirementKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

/// The full set of lookups one discovery run performs.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryPlan {
    pub libraries: &'static [LibraryRequest],
    pub exports: &'static [ExportRequest],
    pub interfaces: &'static [InterfaceRequest],
    pub signatures: &'static [SignatureRequest],
    pub convars: &'static [ConvarRequest],
    pub schema: Option<SchemaRequest>,
    pub fields: &'static [FieldRequest],
    pub optional_fields: &'static [OptionalFieldRequest],
    pub class_sizes: &'static [ClassSizeRequest],
    pub derived: &'static [DerivedRequest],
}

impl DiscoveryPlan {
    /// Every required lookup, in the order discovery performs them.
    /// Optional fields are not requirements.
    pub fn requirements(&self) -> Vec<Requirement> {
        use RequirementKind::*;

        let mut out = Vec::new();
        out.extend(self.libraries.iter().map(|r| Requirement::new(Library, r.key)));
        out.extend(self.exports.iter().map(|r| Requirement::new(Export, r.key)));
        out.extend(self.interfaces.iter().map(|r| Requirement::new(Interface, r.key)));
        out.extend(self.signatures.iter().map(|r| Requirement::new(Signature, r.key)));
        out.extend(self.convars.iter().map(|r| Requirement::new(Convar, r.key)));
        if let Some(schema) = &self.schema {
            out.push(Requirement::new(Schema, schema.key));
            out.push(Requirement::new(Scope, schema.scope));
        }
        out.extend(self.fields.iter().map(|r| Requirement::new(Field, r.key)));
        out.extend(self.class_sizes.iter().map(|r| Requirement::new(ClassSize, r.key)));
        out.extend(self.derived.iter().map(|r| Requirement::new(Derived, r.key)));
        out
    }

    pub fn library(&self, key: &str) -> Option<&'static LibraryRequest> {
        self.libraries.iter().find(|r| r.key == key)
    }

    /// The lookups needed to attach to the usual target.
    pub const fn standard() -> Self {
        STANDARD
    }
}

const fn field(key: &'static str, class: &'static str, field: &'static str) -> FieldRequest {
    FieldRequest {
        key,
        class,
        field,
        addend: 0,
    }
}

const STANDARD: DiscoveryPlan = DiscoveryPlan {
    libraries: &[
        LibraryRequest { key: "library.client", module: CLIENT_LIB },
        LibraryRequest { key: "library.engine", module: ENGINE_LIB },
        LibraryRequest { key: "library.tier0", module: TIER0_LIB },
        LibraryRequest { key: "library.input", module: INPUT_LIB },
        LibraryRequest { key: "library.sdl", module: SDL_LIB },
        LibraryRequest { key: "library.schema", module: SCHEMA_LIB },
    ],
    exports: &[ExportRequest {
        key: "export.keyboard_focus",
        library: "library.sdl",
        symbol: "SDL_GetKeyboardFocus",
    }],
    interfaces: &[
        InterfaceRequest {
            key: "interfaces.resource",
            library: "library.engine",
            prefix: "GameResourceServiceClientV0",
        },
        InterfaceRequest {
            key: "interfaces.cvar",
            library: "library.tier0",
            prefix: "VEngineCvar0",
        },
        InterfaceRequest {
            key: "interfaces.input",
            library: "library.input",
            prefix: "InputSystemVersion0",
        },
    ],
    signatures: &[
        SignatureRequest {
            key: "direct.local_player",
            library: "library.client",
            pattern: "48 83 3D ? ? ? ? 00 0F 95 C0 C3",
            instr_offset: 0,
            disp_offset: 3,
            instr_len: 8,
        },
        SignatureRequest {
            key: "direct.view_matrix",
            library: "library.client",
            pattern: "C6 83 ? ? 00 00 01 4C 8D 05",
            instr_offset: 0x0A,
            disp_offset: 0,
            instr_len: 4,
        },
        SignatureRequest {
            key: "direct.planted_c4",
            library: "library.client",
            pattern: "48 8D 35 ? ? ? ? 66 0F EF C0 C6 05 ? ? ? ? 01 48 8D 3D",
            instr_offset: 0,
            disp_offset: 3,
            instr_len: 0x0E,
        },
        SignatureRequest {
            key: "direct.global_vars",
            library: "library.client",
            pattern: "48 8D 05 ? ? ? ? 48 8B 00 8B 50 ? E9",
            instr_offset: 0,
            disp_offset: 3,
            instr_len: 7,
        },
    ],
    convars: &[
        ConvarRequest {
            key: "convars.ffa",
            interface: "interfaces.cvar",
            name: "mp_teammates_are_enemies",
        },
        ConvarRequest {
            key: "convars.sensitivity",
            interface: "interfaces.cvar",
            name: "sensitivity",
        },
    ],
    schema: Some(SchemaRequest {
        key: "schema",
        library: "library.schema",
        scope: CLIENT_LIB,
    }),
    fields: &[
        field("controller.steam_id", "CBasePlayerController", "m_steamID"),
        field("controller.name", "CBasePlayerController", "m_iszPlayerName"),
        field("controller.pawn", "CBasePlayerController", "m_hPawn"),
        field("controller.desired_fov", "CBasePlayerController", "m_iDesiredFOV"),
        field("controller.owner_entity", "C_BaseEntity", "m_hOwnerEntity"),
        field("controller.color", "CCSPlayerController", "m_iCompTeammateColor"),
        field("controller.ping", "CCSPlayerController", "m_iPing"),
        field("pawn.health", "C_BaseEntity", "m_iHealth"),
        field("pawn.armor", "C_CSPlayerPawn", "m_ArmorValue"),
        field("pawn.team", "C_BaseEntity", "m_iTeamNum"),
        field("pawn.life_state", "C_BaseEntity", "m_lifeState"),
        field("pawn.weapon", "C_CSPlayerPawn", "m_pClippingWeapon"),
        field("pawn.fov_multiplier", "C_BasePlayerPawn", "m_flFOVSensitivityAdjust"),
        field("pawn.game_scene_node", "C_BaseEntity", "m_pGameSceneNode"),
        field("pawn.eye_offset", "C_BaseModelEntity", "m_vecViewOffset"),
        field("pawn.eye_angles", "C_CSPlayerPawn", "m_angEyeAngles"),
        field("pawn.velocity", "C_BaseEntity", "m_vecAbsVelocity"),
        field("pawn.flags", "C_BaseEntity", "m_fFlags"),
        // The punch cache vector sits 8 bytes past the tick fraction
        FieldRequest {
            key: "pawn.aim_punch_cache",
            class: "C_CSPlayerPawn",
            field: "m_aimPunchTickFraction",
            addend: 8,
        },
        field("pawn.shots_fired", "C_CSPlayerPawn", "m_iShotsFired"),
        field("pawn.view_angles", "C_BasePlayerPawn", "v_angle"),
        field("pawn.spotted_state", "C_CSPlayerPawn", "m_entitySpottedState"),
        field("pawn.crosshair_entity", "C_CSPlayerPawn", "m_iIDEntIndex"),
        field("pawn.is_scoped", "C_CSPlayerPawn", "m_bIsScoped"),
        field("pawn.flash_alpha", "C_CSPlayerPawnBase", "m_flFlashMaxAlpha"),
        field("pawn.flash_duration", "C_CSPlayerPawnBase", "m_flFlashDuration"),
        field("pawn.deathmatch_immunity", "C_CSPlayerPawn", "m_bGunGameImmunity"),
        field("pawn.camera_services", "C_BasePlayerPawn", "m_pCameraServices"),
        field("pawn.item_services", "C_BasePlayerPawn", "m_pItemServices"),
        field("pawn.weapon_services", "C_BasePlayerPawn", "m_pWeaponServices"),
        field("pawn.observer_services", "C_BasePlayerPawn", "m_pObserverServices"),
        field("game_scene_node.dormant", "CGameSceneNode", "m_bDormant"),
        field("game_scene_node.origin", "CGameSceneNode", "m_vecAbsOrigin"),
        field("game_scene_node.model_state", "CSkeletonInstance", "m_modelState"),
        field("skeleton.skeleton_instance", "CBodyComponentSkeletonInstance", "m_skeletonInstance"),
        field("smoke.did_smoke_effect", "C_SmokeGrenadeProjectile", "m_bDidSmokeEffect"),
        field("smoke.smoke_color", "C_SmokeGrenadeProjectile", "m_vSmokeColor"),
        field("molotov.is_incendiary", "C_MolotovProjectile", "m_bIsIncGrenade"),
        field("inferno.is_burning", "C_Inferno", "m_bFireIsBurning"),
        field("inferno.fire_count", "C_Inferno", "m_fireCount"),
        field("inferno.fire_positions", "C_Inferno", "m_firePositions"),
        field("spotted_state.spotted", "EntitySpottedState_t", "m_bSpotted"),
        field("spotted_state.mask", "EntitySpottedState_t", "m_bSpottedByMask"),
        field("camera_services.fov", "CCSPlayerBase_CameraServices", "m_iFOV"),
        field("item_services.has_defuser", "CCSPlayer_ItemServices", "m_bHasDefuser"),
        field("item_services.has_helmet", "CCSPlayer_ItemServices", "m_bHasHelmet"),
        field("weapon_services.weapons", "CPlayer_WeaponServices", "m_hMyWeapons"),
        field("observer_services.target", "CPlayer_ObserverServices", "m_hObserverTarget"),
        field("weapon.attribute_manager", "C_EconEntity", "m_AttributeManager"),
        field("weapon.item", "C_AttributeContainer", "m_Item"),
        field("weapon.item_definition_index", "C_EconItemView", "m_iItemDefinitionIndex"),
        field("planted_c4.is_ticking", "C_PlantedC4", "m_bBombTicking"),
        field("planted_c4.blow_time", "C_PlantedC4", "m_flC4Blow"),
        field("planted_c4.being_defused", "C_PlantedC4", "m_bBeingDefused"),
        field("planted_c4.is_defused", "C_PlantedC4", "m_bBombDefused"),
        field("planted_c4.has_exploded", "C_PlantedC4", "m_bHasExploded"),
        field("planted_c4.defuse_time_left", "C_PlantedC4", "m_flDefuseCountDown"),
        field("planted_c4.bomb_site", "C_PlantedC4", "m_nBombSite"),
    ],
    optional_fields: &[
        OptionalFieldRequest {
            key: "controller.sanitized_name",
            class: "CBasePlayerController",
            fields: &["m_sSanitizedPlayerName"],
        },
        OptionalFieldRequest {
            key: "controller.mvp_count",
            class: "CCSPlayerController",
            fields: &["m_iMVPs"],
        },
        OptionalFieldRequest {
            key: "glow.property",
            class: "C_BaseModelEntity",
            fields: &["m_Glow", "m_GlowProperty"],
        },
        OptionalFieldRequest {
            key: "glow.enabled",
            class: "CGlowProperty",
            fields: &["m_bGlowEnabled"],
        },
        OptionalFieldRequest {
            key: "glow.through_walls",
            class: "CGlowProperty",
            fields: &["m_bGlowThroughWalls"],
        },
    ],
    class_sizes: &[ClassSizeRequest {
        key: "entity_identity.size",
        class: "CEntityIdentity",
    }],
    derived: &[
        DerivedRequest {
            key: "interfaces.entity",
            derivation: Derivation::PointerAt {
                source: "interfaces.resource",
                offset: 0x50,
                addend: 0x10,
            },
        },
        DerivedRequest {
            key: "direct.button_state",
            derivation: Derivation::VirtualSlotU32 {
                source: "interfaces.input",
                index: 19,
                field_offset: 0x14,
            },
        },
        DerivedRequest {
            key: "direct.sdl_window",
            derivation: Derivation::RelativeChain {
                source: "export.keyboard_focus",
                first: (2, 6),
                second: (3, 7),
            },
        },
    ],
};

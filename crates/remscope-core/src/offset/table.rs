use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::offset::error::DiscoveryError;

/// Values produced by a discovery run, keyed by dotted plan key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolved {
    values: BTreeMap<String, u64>,
}

impl Resolved {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: u64) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<u64> {
        self.values.get(key).copied()
    }

    /// Value of an earlier step; missing means the plan is inconsistent.
    pub fn require(&self, key: &str) -> Result<u64, DiscoveryError> {
        self.get(key)
            .ok_or_else(|| DiscoveryError::MissingEntry(key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.values.iter().map(|(key, value)| (key.as_str(), *value))
    }
}

impl FromIterator<(String, u64)> for Resolved {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Declares one group of the offset table.
///
/// Required fields are `u64`, optional ones `Option<u64>`. The generated
/// `from_resolved` reads every field from its `group.field` key and fails
/// with [`DiscoveryError::MissingEntry`] naming the first absent required key.
macro_rules! offset_group {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($field:ident),* $(,)?
        }
        $(optional { $($optional:ident),* $(,)? })?
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
        #[cfg_attr(test, derive(Default))]
        pub struct $name {
            $(pub $field: u64,)*
            $($(pub $optional: Option<u64>,)*)?
        }

        impl $name {
            fn from_resolved(resolved: &Resolved, group: &str) -> Result<Self, DiscoveryError> {
                Ok(Self {
                    $($field: resolved.require(&format!("{}.{}", group, stringify!($field)))?,)*
                    $($($optional: resolved.get(&format!("{}.{}", group, stringify!($optional))),)*)?
                })
            }
        }
    };
}

offset_group!(LibraryOffsets {
    client, engine, tier0, input, sdl, schema,
});

offset_group!(InterfaceOffsets {
    resource, entity, cvar, input,
});

offset_group!(
    /// Absolute addresses of globals found by signature or derivation.
    DirectOffsets {
        local_player, button_state, view_matrix, sdl_window, planted_c4, global_vars,
    }
);

offset_group!(ConvarOffsets { ffa, sensitivity });

offset_group!(
    ControllerOffsets {
        owner_entity, steam_id, name, pawn, desired_fov, color, ping,
    }
    optional { sanitized_name, mvp_count }
);

offset_group!(PawnOffsets {
    health,
    armor,
    team,
    life_state,
    weapon,
    fov_multiplier,
    game_scene_node,
    eye_offset,
    eye_angles,
    velocity,
    flags,
    aim_punch_cache,
    shots_fired,
    view_angles,
    spotted_state,
    crosshair_entity,
    is_scoped,
    flash_alpha,
    flash_duration,
    deathmatch_immunity,
    camera_services,
    item_services,
    weapon_services,
    observer_services,
});

offset_group!(GameSceneNodeOffsets { dormant, origin, model_state });

offset_group!(SkeletonOffsets { skeleton_instance });

offset_group!(SmokeOffsets { did_smoke_effect, smoke_color });

offset_group!(MolotovOffsets { is_incendiary });

offset_group!(InfernoOffsets { is_burning, fire_count, fire_positions });

offset_group!(SpottedStateOffsets { spotted, mask });

offset_group!(CameraServicesOffsets { fov });

offset_group!(ItemServicesOffsets { has_defuser, has_helmet });

offset_group!(WeaponServicesOffsets { weapons });

offset_group!(ObserverServicesOffsets { target });

offset_group!(WeaponOffsets { attribute_manager, item, item_definition_index });

offset_group!(PlantedC4Offsets {
    is_ticking,
    blow_time,
    being_defused,
    is_defused,
    has_exploded,
    defuse_time_left,
    bomb_site,
});

offset_group!(
    /// Glow fields are missing from some target builds.
    GlowOffsets {}
    optional { property, enabled, through_walls }
);

offset_group!(EntityIdentityOffsets { size });

/// Every address and field offset consumers need for typed remote reads.
///
/// Only produced by a successful discovery run (or a saved copy of one);
/// there is no public way to build a partial table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(test, derive(Default))]
pub struct OffsetTable {
    pub library: LibraryOffsets,
    pub interfaces: InterfaceOffsets,
    pub direct: DirectOffsets,
    pub convars: ConvarOffsets,
    pub controller: ControllerOffsets,
    pub pawn: PawnOffsets,
    pub game_scene_node: GameSceneNodeOffsets,
    pub skeleton: SkeletonOffsets,
    pub smoke: SmokeOffsets,
    pub molotov: MolotovOffsets,
    pub inferno: InfernoOffsets,
    pub spotted_state: SpottedStateOffsets,
    pub camera_services: CameraServicesOffsets,
    pub item_services: ItemServicesOffsets,
    pub weapon_services: WeaponServicesOffsets,
    pub observer_services: ObserverServicesOffsets,
    pub weapon: WeaponOffsets,
    pub planted_c4: PlantedC4Offsets,
    pub glow: GlowOffsets,
    pub entity_identity: EntityIdentityOffsets,
}

impl OffsetTable {
    /// Assemble the table from dotted `group.field` values.
    ///
    /// Keys outside the table layout are ignored. A required field without a
    /// value fails with [`DiscoveryError::MissingEntry`] carrying its key.
    pub fn from_resolved(resolved: &Resolved) -> Result<Self, DiscoveryError> {
        Ok(Self {
            library: LibraryOffsets::from_resolved(resolved, "library")?,
            interfaces: InterfaceOffsets::from_resolved(resolved, "interfaces")?,
            direct: DirectOffsets::from_resolved(resolved, "direct")?,
            convars: ConvarOffsets::from_resolved(resolved, "convars")?,
            controller: ControllerOffsets::from_resolved(resolved, "controller")?,
            pawn: PawnOffsets::from_resolved(resolved, "pawn")?,
            game_scene_node: GameSceneNodeOffsets::from_resolved(resolved, "game_scene_node")?,
            skeleton: SkeletonOffsets::from_resolved(resolved, "skeleton")?,
            smoke: SmokeOffsets::from_resolved(resolved, "smoke")?,
            molotov: MolotovOffsets::from_resolved(resolved, "molotov")?,
            inferno: InfernoOffsets::from_resolved(resolved, "inferno")?,
            spotted_state: SpottedStateOffsets::from_resolved(resolved, "spotted_state")?,
            camera_services: CameraServicesOffsets::from_resolved(resolved, "camera_services")?,
            item_services: ItemServicesOffsets::from_resolved(resolved, "item_services")?,
            weapon_services: WeaponServicesOffsets::from_resolved(resolved, "weapon_services")?,
            observer_services: ObserverServicesOffsets::from_resolved(
                resolved,
                "observer_services",
            )?,
            weapon: WeaponOffsets::from_resolved(resolved, "weapon")?,
            planted_c4: PlantedC4Offsets::from_resolved(resolved, "planted_c4")?,
            glow: GlowOffsets::from_resolved(resolved, "glow")?,
            entity_identity: EntityIdentityOffsets::from_resolved(resolved, "entity_identity")?,
        })
    }

    /// Flattened `(group.field, value)` pairs sorted by key. Absent optional
    /// fields are left out.
    pub fn entries(&self) -> Vec<(String, u64)> {
        let mut entries = Vec::new();
        let Ok(Value::Object(groups)) = serde_json::to_value(self) else {
            return entries;
        };
        for (group, fields) in groups {
            let Value::Object(fields) = fields else {
                continue;
            };
            for (field, value) in fields {
                if let Some(value) = value.as_u64() {
                    entries.push((format!("{}.{}", group, field), value));
                }
            }
        }
        entries
    }
}

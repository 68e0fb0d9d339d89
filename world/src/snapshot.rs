//! JSON persistence of the entity store.
//!
//! Entity handles are not stable across processes, so every entity is saved
//! under its numeric id and references between entities (attack targets and
//! follow targets) are rewritten to the fresh handles on restore. Grid
//! linkage is not saved; the grid is rebuilt from positions and factions.

use std::collections::HashMap;

use battlegrid_core::{
    components::{
        AttackTarget, Attacking, DirectDamage, Faction, Follow, Healer, Health, Movement, Position,
        Projectile, ProjectileEmitter, Selected, Unit,
    },
    Entity,
};
use hecs::EntityBuilder;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Format revision written into every snapshot.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Errors raised while encoding or decoding a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The document is not valid snapshot JSON.
    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),
    /// The snapshot was written by an incompatible revision.
    #[error("unsupported snapshot version {found}, expected {expected}")]
    UnsupportedVersion {
        /// Revision found in the document.
        found: u32,
        /// Revision this build understands.
        expected: u32,
    },
}

/// Follow state with the target stored as a saved id.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedFollow {
    /// Saved id of the followed ally.
    pub target: Option<u64>,
    /// Follow speed.
    pub speed: f32,
    /// Distance kept from the ally.
    pub follow_range: f32,
    /// Ally search radius.
    pub search_radius: f32,
    /// Seconds between searches.
    pub target_cooldown: f32,
    /// Seconds accumulated toward the next search.
    pub target_timer: f32,
}

/// One entity and every component it carried.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavedEntity {
    /// Id the entity had when it was saved.
    pub id: u64,
    /// Saved position.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Saved movement order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movement: Option<Movement>,
    /// Saved faction tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faction: Option<Faction>,
    /// Saved archetype tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
    /// Saved health pool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<Health>,
    /// Saved melee attack.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_damage: Option<DirectDamage>,
    /// Saved ranged attack.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projectile_emitter: Option<ProjectileEmitter>,
    /// Saved heal pulse.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healer: Option<Healer>,
    /// Saved in-flight projectile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projectile: Option<Projectile>,
    /// Saved follow state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow: Option<SavedFollow>,
    /// Present when the entity can hold an attack target; the inner value
    /// is the saved id of that target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attack_target: Option<Option<u64>>,
    /// Whether the entity was engaged.
    pub attacking: bool,
    /// Whether the entity was selected.
    pub selected: bool,
}

/// Serializable image of a world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedWorld {
    /// Format revision.
    pub version: u32,
    /// Number of ticks the world had executed.
    pub tick_index: u64,
    /// Seconds accumulated toward the next targeting pass.
    pub targeting_timer: f32,
    /// Every entity, ordered by saved id.
    pub entities: Vec<SavedEntity>,
}

impl SavedWorld {
    /// Encodes the snapshot as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decodes a snapshot and checks its revision.
    pub fn from_json(source: &str) -> Result<Self, SnapshotError> {
        let saved: Self = serde_json::from_str(source)?;
        if saved.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: saved.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        Ok(saved)
    }
}

fn saved_id(entity: Entity) -> u64 {
    entity.to_bits().get()
}

fn copied<T: hecs::Component + Copy>(registry: &hecs::World, entity: Entity) -> Option<T> {
    registry.get::<&T>(entity).ok().map(|component| *component)
}

fn has<T: hecs::Component>(registry: &hecs::World, entity: Entity) -> bool {
    registry.entity(entity).map_or(false, |row| row.has::<T>())
}

pub(crate) fn capture(registry: &hecs::World, tick_index: u64, targeting_timer: f32) -> SavedWorld {
    let mut entities: Vec<SavedEntity> = registry
        .iter()
        .map(|row| {
            let entity = row.entity();
            SavedEntity {
                id: saved_id(entity),
                position: copied(registry, entity),
                movement: copied(registry, entity),
                faction: copied(registry, entity),
                unit: copied(registry, entity),
                health: copied(registry, entity),
                direct_damage: copied(registry, entity),
                projectile_emitter: copied(registry, entity),
                healer: copied(registry, entity),
                projectile: copied(registry, entity),
                follow: copied::<Follow>(registry, entity).map(|follow| SavedFollow {
                    target: follow.target.map(saved_id),
                    speed: follow.speed,
                    follow_range: follow.follow_range,
                    search_radius: follow.search_radius,
                    target_cooldown: follow.target_cooldown,
                    target_timer: follow.target_timer,
                }),
                attack_target: copied::<AttackTarget>(registry, entity)
                    .map(|slot| slot.target.map(saved_id)),
                attacking: has::<Attacking>(registry, entity),
                selected: has::<Selected>(registry, entity),
            }
        })
        .collect();
    entities.sort_by_key(|saved| saved.id);

    SavedWorld {
        version: SNAPSHOT_VERSION,
        tick_index,
        targeting_timer,
        entities,
    }
}

/// Spawns every saved entity into `registry` and rewires references between
/// them. References to ids missing from the snapshot become `None`.
pub(crate) fn respawn(saved: &SavedWorld, registry: &mut hecs::World) {
    let mut handles = HashMap::with_capacity(saved.entities.len());
    let mut builder = EntityBuilder::new();

    for row in &saved.entities {
        add(&mut builder, row.position);
        add(&mut builder, row.movement);
        add(&mut builder, row.faction);
        add(&mut builder, row.unit);
        add(&mut builder, row.health);
        add(&mut builder, row.direct_damage);
        add(&mut builder, row.projectile_emitter);
        add(&mut builder, row.healer);
        add(&mut builder, row.projectile);
        add(&mut builder, row.attacking.then_some(Attacking));
        add(&mut builder, row.selected.then_some(Selected));
        let entity = registry.spawn(builder.build());
        let _ = handles.insert(row.id, entity);
    }

    let resolve = |id: Option<u64>| id.and_then(|id| handles.get(&id).copied());
    for row in &saved.entities {
        let Some(&entity) = handles.get(&row.id) else {
            continue;
        };
        if let Some(target) = row.attack_target {
            let _ = registry.insert_one(
                entity,
                AttackTarget {
                    target: resolve(target),
                },
            );
        }
        if let Some(follow) = row.follow {
            let _ = registry.insert_one(
                entity,
                Follow {
                    target: resolve(follow.target),
                    speed: follow.speed,
                    follow_range: follow.follow_range,
                    search_radius: follow.search_radius,
                    target_cooldown: follow.target_cooldown,
                    target_timer: follow.target_timer,
                },
            );
        }
    }
}

fn add<T: hecs::Component>(builder: &mut EntityBuilder, component: Option<T>) {
    if let Some(component) = component {
        let _ = builder.add(component);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battlegrid_core::Vec2;

    #[test]
    fn references_survive_a_round_trip() {
        let mut registry = hecs::World::new();
        let victim = registry.spawn((
            Position::new(Vec2::new(1.0, 0.0)),
            Faction { id: 1 },
            Health::full(100.0, 0.0),
        ));
        let _hunter = registry.spawn((
            Position::new(Vec2::ZERO),
            Faction { id: 0 },
            AttackTarget {
                target: Some(victim),
            },
            Attacking,
            Selected,
        ));

        let saved = capture(&registry, 12, 0.25);
        let json = saved.to_json().expect("encode");
        let decoded = SavedWorld::from_json(&json).expect("decode");
        assert_eq!(decoded, saved);

        let mut restored = hecs::World::new();
        respawn(&decoded, &mut restored);
        assert_eq!(restored.len(), 2);

        let (new_hunter, slot) = restored
            .query::<&AttackTarget>()
            .iter()
            .map(|(entity, slot)| (entity, *slot))
            .next()
            .expect("hunter restored");
        let new_victim = slot.target.expect("target remapped");
        assert_eq!(
            restored.get::<&Faction>(new_victim).expect("victim faction").id,
            1
        );
        assert!(has::<Attacking>(&restored, new_hunter));
        assert!(has::<Selected>(&restored, new_hunter));
        assert!(!has::<Selected>(&restored, new_victim));
    }

    #[test]
    fn dangling_reference_is_dropped() {
        let mut registry = hecs::World::new();
        let ghost = registry.spawn((Position::new(Vec2::ZERO),));
        let _healer = registry.spawn((Follow {
            target: Some(ghost),
            speed: 2.0,
            follow_range: 1.0,
            search_radius: 5.0,
            target_cooldown: 1.0,
            target_timer: 0.5,
        },));
        registry.despawn(ghost).expect("despawn");

        let mut restored = hecs::World::new();
        respawn(&capture(&registry, 0, 0.0), &mut restored);

        let follow = restored
            .query::<&Follow>()
            .iter()
            .map(|(_, follow)| *follow)
            .next()
            .expect("follower restored");
        assert_eq!(follow.target, None);
        assert_eq!(follow.target_timer, 0.5);
    }

    #[test]
    fn rejects_other_versions() {
        let json = r#"{"version": 99, "tick_index": 0, "targeting_timer": 0.0, "entities": []}"#;
        let error = SavedWorld::from_json(json).unwrap_err();
        assert!(matches!(
            error,
            SnapshotError::UnsupportedVersion {
                found: 99,
                expected: SNAPSHOT_VERSION
            }
        ));
    }
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Battlegrid simulation.
//!
//! This crate defines the data every other crate agrees on: the planar math
//! helpers, the component records stored per entity, and the message surface
//! between adapters and the authoritative world. Adapters submit [`Command`]
//! values, the world executes them through its `apply` entry point, and then
//! reports what happened as a stream of [`Event`] values.

use std::{collections::BTreeMap, time::Duration};

pub mod components;
pub mod math;

pub use components::UnitKind;
pub use hecs::Entity;
pub use math::Vec2;

/// Number of independent factions the spatial grid partitions entities into.
pub const MAX_FACTIONS: usize = 8;

/// Reports whether `faction` addresses one of the [`MAX_FACTIONS`] grids.
#[must_use]
pub fn is_valid_faction(faction: u32) -> bool {
    (faction as usize) < MAX_FACTIONS
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Spawns a single unit of the given archetype.
    SpawnUnit {
        /// Archetype to construct.
        kind: UnitKind,
        /// Faction assigned to the unit.
        faction: u32,
        /// World-space spawn location.
        position: Vec2,
    },
    /// Spawns a block of units spread evenly across a rectangle.
    SpawnFormation {
        /// Archetype to construct.
        kind: UnitKind,
        /// Faction assigned to every unit.
        faction: u32,
        /// Number of units to place.
        count: u32,
        /// One corner of the formation rectangle.
        min: Vec2,
        /// Opposite corner of the formation rectangle.
        max: Vec2,
    },
    /// Deletes every grid-tracked entity inside the rectangle.
    DeleteInRect {
        /// One corner of the rectangle.
        min: Vec2,
        /// Opposite corner of the rectangle.
        max: Vec2,
    },
    /// Replaces the selection with every unit inside the rectangle.
    SelectInRect {
        /// One corner of the rectangle.
        min: Vec2,
        /// Opposite corner of the rectangle.
        max: Vec2,
    },
    /// Orders selected units to move, keeping their relative formation.
    MoveSelected {
        /// Point the centre of the selection's bounding box should reach.
        destination: Vec2,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a unit was created.
    UnitSpawned {
        /// Handle of the new unit.
        entity: Entity,
        /// Archetype the unit was built from.
        kind: UnitKind,
        /// Faction assigned to the unit.
        faction: u32,
        /// Spawn location.
        position: Vec2,
    },
    /// Confirms that an entity was removed by a delete command.
    EntityDeleted {
        /// Handle of the removed entity.
        entity: Entity,
    },
    /// Reports the size of the selection after a select command.
    SelectionChanged {
        /// Number of selected units.
        count: usize,
    },
    /// Confirms that a selected unit received a move order.
    MoveOrdered {
        /// Unit that was ordered to move.
        entity: Entity,
        /// Destination assigned to that unit.
        target: Vec2,
    },
    /// Reports that an attacker locked onto a new target or lost its target.
    TargetChanged {
        /// Attacker whose target changed.
        attacker: Entity,
        /// Newly locked target, `None` when the attacker lost its target.
        target: Option<Entity>,
    },
    /// Reports a melee hit.
    MeleeHit {
        /// Attacking unit.
        attacker: Entity,
        /// Unit that was struck.
        target: Entity,
        /// Damage applied after shields.
        damage: f32,
    },
    /// Reports that a ranged unit launched a projectile.
    ProjectileFired {
        /// Unit that fired.
        shooter: Entity,
        /// Newly spawned projectile entity.
        projectile: Entity,
        /// Point the projectile flies toward.
        destination: Vec2,
    },
    /// Reports that a projectile reached its destination and was destroyed.
    ProjectileImpacted {
        /// Projectile that landed.
        projectile: Entity,
        /// Impact location.
        position: Vec2,
        /// Number of units damaged by the impact.
        hits: usize,
    },
    /// Reports a heal applied to a unit.
    Healed {
        /// Healer that pulsed.
        healer: Entity,
        /// Ally that recovered hit points.
        target: Entity,
        /// Hit points restored.
        amount: f32,
    },
    /// Reports that a unit's health dropped to zero and it was removed.
    UnitDied {
        /// Handle of the dead unit.
        entity: Entity,
        /// Faction the unit belonged to, when known.
        faction: Option<u32>,
    },
}

/// Read-only snapshot of a unit for presentation and reporting.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnitSnapshot {
    /// Handle of the unit.
    pub entity: Entity,
    /// Archetype of the unit.
    pub kind: UnitKind,
    /// Faction of the unit.
    pub faction: u32,
    /// Current world position.
    pub position: Vec2,
    /// Remaining hit points, if the unit has health.
    pub health: Option<f32>,
    /// Whether the unit is currently selected.
    pub selected: bool,
}

/// Aggregate population counts of the world.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnitCounts {
    /// Living units per faction and archetype.
    pub by_faction: BTreeMap<u32, BTreeMap<UnitKind, usize>>,
    /// Number of selected units.
    pub selected: usize,
    /// Number of projectiles in flight.
    pub projectiles: usize,
}

impl UnitCounts {
    /// Total number of units across every faction.
    #[must_use]
    pub fn total_units(&self) -> usize {
        self.by_faction
            .values()
            .flat_map(|kinds| kinds.values())
            .sum()
    }

    /// Number of units in the provided faction.
    #[must_use]
    pub fn faction_total(&self, faction: u32) -> usize {
        self.by_faction
            .get(&faction)
            .map_or(0, |kinds| kinds.values().sum())
    }

    /// Number of factions with at least one living unit.
    #[must_use]
    pub fn factions_alive(&self) -> usize {
        self.by_faction
            .values()
            .filter(|kinds| kinds.values().any(|count| *count > 0))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faction_bounds_match_grid_count() {
        assert!(is_valid_faction(0));
        assert!(is_valid_faction(MAX_FACTIONS as u32 - 1));
        assert!(!is_valid_faction(MAX_FACTIONS as u32));
    }

    #[test]
    fn unit_counts_sum_across_factions() {
        let mut counts = UnitCounts::default();
        let _ = counts
            .by_faction
            .entry(0)
            .or_default()
            .insert(UnitKind::Footman, 3);
        let _ = counts
            .by_faction
            .entry(0)
            .or_default()
            .insert(UnitKind::Archer, 2);
        let _ = counts
            .by_faction
            .entry(1)
            .or_default()
            .insert(UnitKind::Healer, 1);
        let _ = counts
            .by_faction
            .entry(2)
            .or_default()
            .insert(UnitKind::Ballista, 0);

        assert_eq!(counts.total_units(), 6);
        assert_eq!(counts.faction_total(0), 5);
        assert_eq!(counts.faction_total(7), 0);
        assert_eq!(counts.factions_alive(), 2);
    }
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for the Battlegrid simulation.
//!
//! The world owns the component registry, the faction-partitioned spatial
//! grid and the gameplay pipeline. Adapters mutate it exclusively through
//! [`apply`] and read it through the functions in [`query`].

mod clock;
pub mod config;
mod factory;
pub mod snapshot;

use std::fmt;

use battlegrid_core::{
    components::{Movement, Position, Selected, Unit},
    math::ordered_rect,
    Command, Entity, Event, UnitKind, Vec2,
};
use battlegrid_spatial::SpatialGrid;
use battlegrid_system_gameplay::Gameplay;
use log::{debug, info};

pub use clock::{SimulationClock, MAX_SPEED};
pub use config::{ConfigError, GridConfig, UnitStats, WorldConfig};
pub use snapshot::{SavedWorld, SnapshotError};

use factory::UnitFactory;

/// Formations narrower or shorter than this are ignored.
const MIN_FORMATION_EXTENT: f32 = 0.1;

/// Represents the authoritative simulation state.
pub struct World {
    registry: hecs::World,
    grid: SpatialGrid,
    factory: UnitFactory,
    gameplay: Gameplay,
    config: WorldConfig,
    tick_index: u64,
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.registry.len())
            .field("grid_dimensions", &self.grid.dimensions())
            .field("tracked", &self.grid.len())
            .field("gameplay", &self.gameplay)
            .field("tick_index", &self.tick_index)
            .finish_non_exhaustive()
    }
}

impl World {
    /// Creates an empty world from a validated configuration.
    pub fn new(config: WorldConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let grid = SpatialGrid::new(config.grid.width, config.grid.height, config.grid.cell_size)?;
        info!(
            "world ready: {}x{} grid with {} archetype tables",
            config.grid.width,
            config.grid.height,
            config.units.len()
        );
        Ok(Self {
            registry: hecs::World::new(),
            grid,
            factory: UnitFactory::new(config.units.clone()),
            gameplay: Gameplay::new(config.gameplay),
            config,
            tick_index: 0,
        })
    }

    fn spawn_unit(&mut self, kind: UnitKind, faction: u32, position: Vec2, out_events: &mut Vec<Event>) {
        let entity = self.factory.spawn(&mut self.registry, kind, faction, position);
        self.grid
            .insert(&mut self.registry, entity, position, Some(faction));
        out_events.push(Event::UnitSpawned {
            entity,
            kind,
            faction,
            position,
        });
    }

    fn spawn_formation(
        &mut self,
        kind: UnitKind,
        faction: u32,
        count: u32,
        corners: (Vec2, Vec2),
        out_events: &mut Vec<Event>,
    ) {
        let (min, max) = ordered_rect(corners.0, corners.1);
        let extent = max - min;
        if extent.x <= MIN_FORMATION_EXTENT || extent.y <= MIN_FORMATION_EXTENT {
            debug!("formation of {count} {kind:?} ignored, rectangle too small");
            return;
        }

        let side = (count as f32).sqrt().floor() as u32 + 1;
        let spacing = extent / side as f32;
        let mut spawned = 0;
        'rows: for y in 0..=side {
            for x in 0..=side {
                if spawned >= count {
                    break 'rows;
                }
                let offset = Vec2::new(x as f32 * spacing.x, y as f32 * spacing.y);
                self.spawn_unit(kind, faction, min + offset, out_events);
                spawned += 1;
            }
        }
    }

    fn delete_in_rect(&mut self, corners: (Vec2, Vec2), out_events: &mut Vec<Event>) {
        let (min, max) = ordered_rect(corners.0, corners.1);
        let doomed = self.grid.entities_in_rect(&self.registry, min, max);
        for &entity in &doomed {
            self.grid.remove(&mut self.registry, entity);
            let _ = self.registry.despawn(entity);
            out_events.push(Event::EntityDeleted { entity });
        }
        debug!("deleted {} entities", doomed.len());
    }

    fn select_in_rect(&mut self, corners: (Vec2, Vec2), out_events: &mut Vec<Event>) {
        let previous: Vec<Entity> = self
            .registry
            .query::<&Selected>()
            .iter()
            .map(|(entity, _)| entity)
            .collect();
        for entity in previous {
            let _ = self.registry.remove_one::<Selected>(entity);
        }

        let (min, max) = ordered_rect(corners.0, corners.1);
        let picked: Vec<Entity> = self
            .grid
            .entities_in_rect(&self.registry, min, max)
            .into_iter()
            .filter(|&entity| self.registry.get::<&Unit>(entity).is_ok())
            .collect();
        for &entity in &picked {
            let _ = self.registry.insert_one(entity, Selected);
        }
        out_events.push(Event::SelectionChanged {
            count: picked.len(),
        });
    }

    fn move_selected(&mut self, destination: Vec2, out_events: &mut Vec<Event>) {
        let mut members: Vec<(Entity, Vec2)> = self
            .registry
            .query::<(&Selected, &Position, &Movement)>()
            .iter()
            .map(|(entity, (_, position, _))| (entity, position.value))
            .collect();
        if members.is_empty() {
            return;
        }
        members.sort_by_key(|(entity, _)| entity.to_bits());

        let (low, high) = members.iter().fold(
            (Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY)),
            |(low, high), &(_, position)| (low.min(position), high.max(position)),
        );
        let centre = (low + high) * 0.5;

        for (entity, position) in members {
            let target = destination + (position - centre);
            if let Ok(mut movement) = self.registry.get::<&mut Movement>(entity) {
                movement.move_to(position, target);
            }
            out_events.push(Event::MoveOrdered { entity, target });
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            out_events.push(Event::TimeAdvanced { dt });
            world.gameplay.tick(
                &mut world.registry,
                &mut world.grid,
                dt.as_secs_f32(),
                out_events,
            );
        }
        Command::SpawnUnit {
            kind,
            faction,
            position,
        } => world.spawn_unit(kind, faction, position, out_events),
        Command::SpawnFormation {
            kind,
            faction,
            count,
            min,
            max,
        } => world.spawn_formation(kind, faction, count, (min, max), out_events),
        Command::DeleteInRect { min, max } => world.delete_in_rect((min, max), out_events),
        Command::SelectInRect { min, max } => world.select_in_rect((min, max), out_events),
        Command::MoveSelected { destination } => world.move_selected(destination, out_events),
    }
}

/// Replaces the entire world state with a saved image.
///
/// Entities receive fresh handles and the spatial grid is rebuilt from their
/// positions and factions.
pub fn restore(world: &mut World, saved: &SavedWorld) {
    world.registry.clear();
    snapshot::respawn(saved, &mut world.registry);
    world.grid.rebuild(&mut world.registry);
    world.tick_index = saved.tick_index;
    world.gameplay.set_targeting_timer(saved.targeting_timer);
    info!(
        "restored {} entities at tick {}",
        saved.entities.len(),
        saved.tick_index
    );
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use battlegrid_core::{
        components::{Faction, Health, Position, Projectile, Selected, Unit},
        UnitCounts, UnitSnapshot,
    };
    use battlegrid_spatial::SpatialGrid;

    use super::{snapshot, SavedWorld, World, WorldConfig};

    /// Number of ticks the world has executed.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Configuration the world was created with.
    #[must_use]
    pub fn config(world: &World) -> &WorldConfig {
        &world.config
    }

    /// Read-only access to the component registry.
    #[must_use]
    pub fn registry(world: &World) -> &hecs::World {
        &world.registry
    }

    /// Read-only access to the spatial grid.
    #[must_use]
    pub fn spatial_grid(world: &World) -> &SpatialGrid {
        &world.grid
    }

    /// Population per faction and archetype. Projectiles are counted apart.
    #[must_use]
    pub fn unit_counts(world: &World) -> UnitCounts {
        let mut counts = UnitCounts::default();
        for (_, (unit, faction, selected)) in world
            .registry
            .query::<(&Unit, &Faction, Option<&Selected>)>()
            .iter()
        {
            *counts
                .by_faction
                .entry(faction.id)
                .or_default()
                .entry(unit.kind)
                .or_default() += 1;
            if selected.is_some() {
                counts.selected += 1;
            }
        }
        counts.projectiles = world.registry.query::<&Projectile>().iter().count();
        counts
    }

    /// Snapshot of every unit, ordered by entity handle.
    #[must_use]
    pub fn unit_view(world: &World) -> Vec<UnitSnapshot> {
        let mut units: Vec<UnitSnapshot> = world
            .registry
            .query::<(&Unit, &Position, Option<&Health>, Option<&Selected>)>()
            .iter()
            .map(|(entity, (unit, position, health, selected))| UnitSnapshot {
                entity,
                kind: unit.kind,
                faction: unit.faction,
                position: position.value,
                health: health.map(|health| health.current),
                selected: selected.is_some(),
            })
            .collect();
        units.sort_by_key(|unit| unit.entity.to_bits());
        units
    }

    /// Serializable image of the world.
    #[must_use]
    pub fn snapshot(world: &World) -> SavedWorld {
        snapshot::capture(
            &world.registry,
            world.tick_index,
            world.gameplay.targeting_timer(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn world() -> World {
        World::new(WorldConfig::default()).expect("default config is valid")
    }

    #[test]
    fn tick_advances_index_and_reports_time() {
        let mut world = world();
        let mut events = Vec::new();
        let dt = Duration::from_millis(100);

        apply(&mut world, Command::Tick { dt }, &mut events);

        assert_eq!(query::tick_index(&world), 1);
        assert_eq!(events, vec![Event::TimeAdvanced { dt }]);
    }

    #[test]
    fn debug_output_summarizes_state() {
        let mut world = world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SpawnUnit {
                kind: UnitKind::Footman,
                faction: 0,
                position: Vec2::new(5.0, 5.0),
            },
            &mut events,
        );

        let printed = format!("{world:?}");
        assert!(printed.starts_with("World"));
        assert!(printed.contains("entities: 1"));
        assert!(printed.contains("tracked: 1"));
    }

    #[test]
    fn unusable_grid_is_rejected() {
        let mut config = WorldConfig::default();
        config.grid.cell_size = 0.0;
        assert!(matches!(
            World::new(config.clone()),
            Err(ConfigError::NotPositive { .. })
        ));

        config.grid.cell_size = 2000.0;
        assert!(matches!(World::new(config), Err(ConfigError::Grid(_))));
    }

    #[test]
    fn spawned_units_join_the_grid() {
        let mut world = world();
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::SpawnUnit {
                kind: UnitKind::Archer,
                faction: 3,
                position: Vec2::new(12.0, 34.0),
            },
            &mut events,
        );

        let entity = match events.as_slice() {
            [Event::UnitSpawned { entity, .. }] => *entity,
            other => panic!("unexpected events {other:?}"),
        };
        let grid = query::spatial_grid(&world);
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.faction_len(3), 1);
        assert_eq!(
            grid.entities_in_rect(query::registry(&world), Vec2::ZERO, Vec2::splat(50.0)),
            vec![entity]
        );
    }

    #[test]
    fn invalid_faction_spawns_untracked_unit() {
        let mut world = world();
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::SpawnUnit {
                kind: UnitKind::Footman,
                faction: 8,
                position: Vec2::ZERO,
            },
            &mut events,
        );

        assert_eq!(events.len(), 1);
        assert!(query::spatial_grid(&world).is_empty());
        assert_eq!(query::unit_counts(&world).faction_total(8), 1);
    }
}

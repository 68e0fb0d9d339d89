use battlegrid_core::{
    components::{Faction, Health},
    Entity, Event,
};
use battlegrid_spatial::SpatialGrid;
use hecs::World;
use log::debug;

/// Removes every entity whose health dropped to zero or below.
#[derive(Debug, Default)]
pub(crate) struct DeathStage {
    dead: Vec<(Entity, Option<u32>)>,
}

impl DeathStage {
    pub(crate) fn run(&mut self, world: &mut World, grid: &mut SpatialGrid, events: &mut Vec<Event>) {
        self.dead.clear();
        self.dead.extend(
            world
                .query::<(&Health, Option<&Faction>)>()
                .iter()
                .filter(|(_, (health, _))| !health.is_alive())
                .map(|(entity, (_, faction))| (entity, faction.map(|faction| faction.id))),
        );

        for &(entity, faction) in &self.dead {
            grid.remove(world, entity);
            let _ = world.despawn(entity);
            events.push(Event::UnitDied { entity, faction });
        }
        if !self.dead.is_empty() {
            debug!("{} units died", self.dead.len());
        }
    }
}

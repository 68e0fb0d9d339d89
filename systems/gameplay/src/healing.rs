use battlegrid_core::{
    components::{Faction, Healer, Health, Position},
    Entity, Event, Vec2,
};
use battlegrid_spatial::{FactionFilter, SpatialGrid};
use hecs::World;

/// Cooldown-gated heal pulses over nearby allies.
#[derive(Debug, Default)]
pub(crate) struct HealingStage {
    healers: Vec<(Entity, Vec2, u32, Healer)>,
    allies: Vec<Entity>,
}

impl HealingStage {
    pub(crate) fn run(
        &mut self,
        world: &mut World,
        grid: &SpatialGrid,
        dt: f32,
        events: &mut Vec<Event>,
    ) {
        self.healers.clear();
        self.healers.extend(
            world
                .query::<(&Healer, &Position, &Faction)>()
                .iter()
                .map(|(entity, (healer, position, faction))| {
                    (entity, position.value, faction.id, *healer)
                }),
        );

        for &(entity, position, faction, mut healer) in &self.healers {
            healer.timer += dt;
            if healer.timer >= healer.cooldown {
                healer.timer = 0.0;

                self.allies.clear();
                grid.query_radius(
                    world,
                    position,
                    healer.range,
                    FactionFilter::allies_of(faction),
                    |ally| self.allies.push(ally),
                );
                for &ally in &self.allies {
                    let Ok(mut health) = world.get::<&mut Health>(ally) else {
                        continue;
                    };
                    if !health.is_alive() || health.is_full() {
                        continue;
                    }
                    let amount = health.heal(healer.heal_amount);
                    events.push(Event::Healed {
                        healer: entity,
                        target: ally,
                        amount,
                    });
                }
            }

            if let Ok(mut stored) = world.get::<&mut Healer>(entity) {
                stored.timer = healer.timer;
            }
        }
    }
}

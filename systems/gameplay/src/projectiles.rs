use battlegrid_core::{
    components::{Health, Movement, MovementState, Position, Projectile},
    Entity, Event, Vec2,
};
use battlegrid_spatial::{FactionFilter, SpatialGrid};
use hecs::World;
use log::debug;

/// Impact resolution for projectiles that reached their destination.
#[derive(Debug, Default)]
pub(crate) struct ProjectileStage {
    landed: Vec<(Entity, Vec2, Projectile)>,
    victims: Vec<Entity>,
}

impl ProjectileStage {
    pub(crate) fn run(
        &mut self,
        world: &mut World,
        grid: &SpatialGrid,
        impact_radius: f32,
        events: &mut Vec<Event>,
    ) {
        self.landed.clear();
        self.landed.extend(
            world
                .query::<(&Projectile, &Position, &Movement)>()
                .iter()
                .filter(|(_, (_, _, movement))| movement.state == MovementState::NotMoving)
                .map(|(entity, (projectile, position, _))| (entity, position.value, *projectile)),
        );

        for &(entity, position, projectile) in &self.landed {
            let enemies = FactionFilter::enemies_of(projectile.faction);
            self.victims.clear();
            if projectile.is_aoe {
                grid.query_radius(world, position, projectile.aoe_radius, enemies, |enemy| {
                    self.victims.push(enemy)
                });
            } else {
                self.victims
                    .extend(grid.find_nearest(world, position, impact_radius, enemies));
            }

            let mut hits = 0;
            for &victim in &self.victims {
                if let Ok(mut health) = world.get::<&mut Health>(victim) {
                    let _ = health.apply_damage(projectile.damage);
                    hits += 1;
                }
            }
            events.push(Event::ProjectileImpacted {
                projectile: entity,
                position,
                hits,
            });
        }

        for &(entity, _, _) in &self.landed {
            let _ = world.despawn(entity);
        }
        if !self.landed.is_empty() {
            debug!("{} projectiles landed", self.landed.len());
        }
    }
}

//! Cooldown-gated melee hits and projectile launches.

use battlegrid_core::{
    components::{
        AttackTarget, Attacking, DirectDamage, Faction, Health, Movement, Position, Projectile,
        ProjectileEmitter, ProjectileKind,
    },
    Entity, Event, Vec2,
};
use hecs::World;
use log::trace;

fn target_position(world: &World, target: Entity) -> Option<Vec2> {
    world.get::<&Position>(target).ok().map(|position| position.value)
}

/// Melee attackers striking their locked target.
#[derive(Debug, Default)]
pub(crate) struct MeleeStage {
    rows: Vec<(Entity, Vec2, DirectDamage, Option<Entity>)>,
}

impl MeleeStage {
    pub(crate) fn run(&mut self, world: &mut World, dt: f32, events: &mut Vec<Event>) {
        self.rows.clear();
        self.rows.extend(
            world
                .query::<(&DirectDamage, &AttackTarget, &Position, Option<&Attacking>)>()
                .iter()
                .filter(|(_, (_, _, _, attacking))| attacking.is_some())
                .map(|(entity, (melee, target, position, _))| {
                    (entity, position.value, *melee, target.target)
                }),
        );

        for &(entity, position, mut melee, target) in &self.rows {
            melee.timer += dt;
            if melee.timer >= melee.cooldown {
                if let Some(target) = target {
                    let reachable = world.get::<&Health>(target).is_ok()
                        && target_position(world, target)
                            .is_some_and(|at| position.distance(at) <= melee.range);
                    if reachable {
                        let dealt = world
                            .get::<&mut Health>(target)
                            .map_or(0.0, |mut health| health.apply_damage(melee.damage));
                        melee.timer = 0.0;
                        events.push(Event::MeleeHit {
                            attacker: entity,
                            target,
                            damage: dealt,
                        });
                    }
                }
            }

            if let Ok(mut stored) = world.get::<&mut DirectDamage>(entity) {
                stored.timer = melee.timer;
            }
        }
    }
}

#[derive(Debug)]
struct Launch {
    shooter: Entity,
    origin: Vec2,
    destination: Vec2,
    speed: f32,
    payload: Projectile,
}

/// Ranged attackers launching projectiles at their locked target.
///
/// Projectiles are spawned after the pass, so they first move on the next
/// tick.
#[derive(Debug, Default)]
pub(crate) struct RangedStage {
    rows: Vec<(Entity, Vec2, u32, ProjectileEmitter, Option<Entity>)>,
    launches: Vec<Launch>,
}

impl RangedStage {
    pub(crate) fn run(&mut self, world: &mut World, dt: f32, events: &mut Vec<Event>) {
        self.rows.clear();
        self.rows.extend(
            world
                .query::<(
                    &ProjectileEmitter,
                    &AttackTarget,
                    &Position,
                    &Faction,
                    Option<&Attacking>,
                )>()
                .iter()
                .filter(|(_, (_, _, _, _, attacking))| attacking.is_some())
                .map(|(entity, (emitter, target, position, faction, _))| {
                    (entity, position.value, faction.id, *emitter, target.target)
                }),
        );

        self.launches.clear();
        for &(entity, position, faction, mut emitter, target) in &self.rows {
            emitter.timer += dt;
            if emitter.timer >= emitter.cooldown {
                let destination = target
                    .and_then(|target| target_position(world, target))
                    .filter(|at| position.distance(*at) <= emitter.range);
                if let Some(destination) = destination {
                    emitter.timer = 0.0;
                    self.launches.push(Launch {
                        shooter: entity,
                        origin: position,
                        destination,
                        speed: emitter.projectile_speed,
                        payload: Projectile {
                            damage: emitter.damage,
                            faction,
                            is_aoe: emitter.kind == ProjectileKind::Area,
                            aoe_radius: emitter.aoe_radius,
                        },
                    });
                }
            }

            if let Ok(mut stored) = world.get::<&mut ProjectileEmitter>(entity) {
                stored.timer = emitter.timer;
            }
        }

        for launch in self.launches.drain(..) {
            let mut movement = Movement::idle(launch.origin, launch.speed);
            movement.move_to(launch.origin, launch.destination);
            let projectile = world.spawn((Position::new(launch.origin), movement, launch.payload));
            trace!("{:?} fired {projectile:?}", launch.shooter);
            events.push(Event::ProjectileFired {
                shooter: launch.shooter,
                projectile,
                destination: launch.destination,
            });
        }
    }
}

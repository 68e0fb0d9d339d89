use battlegrid_core::{
    components::{
        AttackTarget, Attacking, DirectDamage, Faction, Health, Movement, MovementState, Position,
        ProjectileEmitter,
    },
    Entity, Event, Vec2,
};
use battlegrid_spatial::{FactionFilter, SpatialGrid};
use hecs::World;
use log::debug;

#[derive(Clone, Copy, Debug)]
struct Attacker {
    entity: Entity,
    position: Vec2,
    faction: u32,
    range: f32,
    target: Option<Entity>,
}

/// Periodic enemy acquisition for every attacker.
#[derive(Debug, Default)]
pub(crate) struct TargetingStage {
    timer: f32,
    attackers: Vec<Attacker>,
}

impl TargetingStage {
    pub(crate) fn timer(&self) -> f32 {
        self.timer
    }

    pub(crate) fn set_timer(&mut self, seconds: f32) {
        self.timer = seconds.max(0.0);
    }

    pub(crate) fn run(
        &mut self,
        world: &mut World,
        grid: &SpatialGrid,
        dt: f32,
        interval: f32,
        events: &mut Vec<Event>,
    ) {
        self.timer += dt;
        if self.timer < interval {
            return;
        }
        self.timer = 0.0;

        self.attackers.clear();
        self.attackers.extend(
            world
                .query::<(
                    &AttackTarget,
                    &Position,
                    &Faction,
                    Option<&DirectDamage>,
                    Option<&ProjectileEmitter>,
                )>()
                .iter()
                .filter_map(|(entity, (target, position, faction, melee, ranged))| {
                    let range = melee
                        .map(|melee| melee.range)
                        .or_else(|| ranged.map(|ranged| ranged.range))?;
                    Some(Attacker {
                        entity,
                        position: position.value,
                        faction: faction.id,
                        range,
                        target: target.target,
                    })
                }),
        );

        let mut acquired = 0usize;
        for attacker in &self.attackers {
            let current = attacker
                .target
                .filter(|target| is_valid_target(world, attacker, *target));
            let target = current.or_else(|| {
                grid.find_nearest_by(
                    world,
                    attacker.position,
                    attacker.range,
                    FactionFilter::enemies_of(attacker.faction),
                    |candidate| is_alive(world, candidate),
                )
            });

            if target != attacker.target {
                if target.is_some() {
                    acquired += 1;
                }
                events.push(Event::TargetChanged {
                    attacker: attacker.entity,
                    target,
                });
            }
            sync_engagement(world, attacker.entity, target);
        }

        debug!(
            "targeting pass over {} attackers, {acquired} new targets",
            self.attackers.len()
        );
    }
}

/// Entities without health cannot be damaged and never count as alive.
fn is_alive(world: &World, entity: Entity) -> bool {
    world
        .get::<&Health>(entity)
        .map_or(false, |health| health.is_alive())
}

fn is_valid_target(world: &World, attacker: &Attacker, target: Entity) -> bool {
    let alive = is_alive(world, target);
    let in_range = world.get::<&Position>(target).map_or(false, |position| {
        attacker.position.distance(position.value) <= attacker.range
    });
    alive && in_range
}

/// Stores the target and keeps the attacking marker and movement state in
/// step with it.
fn sync_engagement(world: &mut World, entity: Entity, target: Option<Entity>) {
    if let Ok(mut slot) = world.get::<&mut AttackTarget>(entity) {
        slot.target = target;
    }

    let engaged = target.is_some();
    let marked = world.entity(entity).map_or(false, |row| row.has::<Attacking>());
    if engaged && !marked {
        let _ = world.insert_one(entity, Attacking);
    } else if !engaged && marked {
        let _ = world.remove_one::<Attacking>(entity);
    }

    if let Ok(mut movement) = world.get::<&mut Movement>(entity) {
        movement.state = match (engaged, movement.state) {
            (true, MovementState::Moving) => MovementState::Paused,
            (false, MovementState::Paused) => MovementState::Moving,
            (_, state) => state,
        };
    }
}

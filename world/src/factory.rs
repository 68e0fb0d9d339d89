use battlegrid_core::{
    components::{
        AttackTarget, DirectDamage, Faction, Follow, Healer, Health, Movement, Position,
        ProjectileEmitter, ProjectileKind, Unit,
    },
    Entity, UnitKind, Vec2,
};
use log::warn;

use crate::config::UnitStats;

/// Builds unit entities from per-archetype stat tables.
#[derive(Clone, Debug, Default)]
pub(crate) struct UnitFactory {
    catalog: Vec<UnitStats>,
}

impl UnitFactory {
    pub(crate) fn new(catalog: Vec<UnitStats>) -> Self {
        Self { catalog }
    }

    /// Spawns a unit of `kind`. Without a stat table the entity only carries
    /// its position and tags.
    pub(crate) fn spawn(
        &self,
        registry: &mut hecs::World,
        kind: UnitKind,
        faction: u32,
        position: Vec2,
    ) -> Entity {
        let entity = registry.spawn((
            Position::new(position),
            Unit { kind, faction },
            Faction { id: faction },
        ));

        let Some(stats) = self.catalog.get(kind.index()) else {
            warn!("no stat table for {kind:?}, spawned {entity:?} without combat components");
            return entity;
        };

        let health = Health::full(stats.hp, stats.shield);
        let inserted = match kind {
            UnitKind::Footman => registry.insert(
                entity,
                (
                    health,
                    Movement::idle(position, stats.speed),
                    AttackTarget::default(),
                    DirectDamage {
                        damage: stats.damage,
                        range: stats.range,
                        cooldown: stats.attack_cooldown,
                        timer: 0.0,
                    },
                ),
            ),
            UnitKind::Archer | UnitKind::Ballista => registry.insert(
                entity,
                (
                    health,
                    Movement::idle(position, stats.speed),
                    AttackTarget::default(),
                    emitter(kind, stats),
                ),
            ),
            UnitKind::Healer => registry.insert(
                entity,
                (
                    health,
                    Healer {
                        heal_amount: stats.heal_amount,
                        range: stats.heal_range,
                        cooldown: stats.heal_cooldown,
                        timer: 0.0,
                    },
                    Follow {
                        target: None,
                        speed: stats.speed,
                        follow_range: stats.follow_range,
                        search_radius: stats.follow_search_radius,
                        target_cooldown: stats.follow_target_cooldown,
                        target_timer: 0.0,
                    },
                ),
            ),
        };
        if let Err(error) = inserted {
            warn!("failed to equip {entity:?}: {error}");
        }
        entity
    }
}

fn emitter(kind: UnitKind, stats: &UnitStats) -> ProjectileEmitter {
    let area = kind == UnitKind::Ballista;
    ProjectileEmitter {
        damage: stats.damage,
        range: stats.range,
        cooldown: stats.attack_cooldown,
        timer: 0.0,
        projectile_speed: stats.projectile_speed,
        kind: if area {
            ProjectileKind::Area
        } else {
            ProjectileKind::Single
        },
        aoe_radius: if area { stats.damage_radius } else { 0.0 },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battlegrid_core::components::MovementState;

    fn factory() -> UnitFactory {
        UnitFactory::new(UnitKind::ALL.into_iter().map(UnitStats::defaults).collect())
    }

    #[test]
    fn footman_carries_melee_kit() {
        let mut registry = hecs::World::new();
        let entity = factory().spawn(&mut registry, UnitKind::Footman, 1, Vec2::new(3.0, 4.0));

        let melee = *registry.get::<&DirectDamage>(entity).expect("melee");
        assert_eq!(melee.damage, 10.0);
        assert_eq!(melee.range, 1.5);
        assert_eq!(melee.cooldown, 1.0);

        let movement = *registry.get::<&Movement>(entity).expect("movement");
        assert_eq!(movement.state, MovementState::NotMoving);
        assert_eq!(movement.target, Vec2::new(3.0, 4.0));
        assert_eq!(movement.speed, 10.0);

        assert_eq!(registry.get::<&Faction>(entity).expect("faction").id, 1);
        assert!(registry.get::<&AttackTarget>(entity).is_ok());
        assert!(registry.get::<&ProjectileEmitter>(entity).is_err());
    }

    #[test]
    fn ballista_fires_area_projectiles() {
        let mut registry = hecs::World::new();
        let entity = factory().spawn(&mut registry, UnitKind::Ballista, 0, Vec2::ZERO);

        let emitter = *registry.get::<&ProjectileEmitter>(entity).expect("emitter");
        assert_eq!(emitter.kind, ProjectileKind::Area);
        assert_eq!(emitter.aoe_radius, 3.0);
        assert_eq!(emitter.damage, 50.0);
        assert_eq!(emitter.projectile_speed, 15.0);
    }

    #[test]
    fn archer_fires_single_target_projectiles() {
        let mut registry = hecs::World::new();
        let entity = factory().spawn(&mut registry, UnitKind::Archer, 0, Vec2::ZERO);

        let emitter = *registry.get::<&ProjectileEmitter>(entity).expect("emitter");
        assert_eq!(emitter.kind, ProjectileKind::Single);
        assert_eq!(emitter.range, 10.0);
        assert_eq!(emitter.cooldown, 2.0);
    }

    #[test]
    fn healer_follows_instead_of_moving() {
        let mut registry = hecs::World::new();
        let entity = factory().spawn(&mut registry, UnitKind::Healer, 2, Vec2::ZERO);

        let follow = *registry.get::<&Follow>(entity).expect("follow");
        assert_eq!(follow.target, None);
        assert_eq!(follow.speed, 10.0);
        assert_eq!(follow.follow_range, 2.0);
        assert_eq!(follow.search_radius, 10.0);

        let healer = *registry.get::<&Healer>(entity).expect("healer");
        assert_eq!(healer.heal_amount, 10.0);
        assert_eq!(healer.range, 5.0);
        assert!(registry.get::<&Movement>(entity).is_err());
        assert!(registry.get::<&AttackTarget>(entity).is_err());
    }

    #[test]
    fn missing_table_spawns_bare_unit() {
        let mut registry = hecs::World::new();
        let factory = UnitFactory::new(vec![UnitStats::defaults(UnitKind::Footman)]);
        let entity = factory.spawn(&mut registry, UnitKind::Healer, 0, Vec2::ONE);

        assert_eq!(
            registry.get::<&Position>(entity).expect("position").value,
            Vec2::ONE
        );
        assert!(registry.get::<&Unit>(entity).is_ok());
        assert!(registry.get::<&Health>(entity).is_err());
        assert!(registry.get::<&Follow>(entity).is_err());
    }
}

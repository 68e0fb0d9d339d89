use std::time::Duration;

use battlegrid_core::{
    components::{AttackTarget, Attacking, Faction, Health},
    Command, Event, UnitKind, Vec2,
};
use battlegrid_world::{apply, query, restore, SavedWorld, World, WorldConfig};

fn world() -> World {
    World::new(WorldConfig::default()).expect("default config is valid")
}

fn tick(world: &mut World, millis: u64) -> Vec<Event> {
    let mut events = Vec::new();
    apply(
        world,
        Command::Tick {
            dt: Duration::from_millis(millis),
        },
        &mut events,
    );
    events
}

fn duel() -> World {
    let mut world = world();
    let mut events = Vec::new();
    for (faction, x) in [(0, 0.0), (1, 1.0)] {
        apply(
            &mut world,
            Command::SpawnUnit {
                kind: UnitKind::Footman,
                faction,
                position: Vec2::new(x, 0.0),
            },
            &mut events,
        );
    }
    apply(
        &mut world,
        Command::SpawnUnit {
            kind: UnitKind::Healer,
            faction: 0,
            position: Vec2::new(-3.0, 0.0),
        },
        &mut events,
    );
    world
}

#[test]
fn restored_world_resumes_engagement() {
    let mut original = duel();
    let _ = tick(&mut original, 500);
    let _ = tick(&mut original, 500);

    let json = query::snapshot(&original)
        .to_json()
        .expect("snapshot encodes");
    let saved = SavedWorld::from_json(&json).expect("snapshot decodes");
    assert_eq!(saved.tick_index, 2);
    assert_eq!(saved.entities.len(), 3);

    let mut restored = world();
    let mut events = Vec::new();
    apply(
        &mut restored,
        Command::SpawnUnit {
            kind: UnitKind::Ballista,
            faction: 5,
            position: Vec2::new(300.0, 300.0),
        },
        &mut events,
    );
    restore(&mut restored, &saved);

    assert_eq!(query::tick_index(&restored), 2);
    assert_eq!(query::spatial_grid(&restored).len(), 3);
    let counts = query::unit_counts(&restored);
    assert_eq!(counts.faction_total(0), 2);
    assert_eq!(counts.faction_total(1), 1);
    assert_eq!(counts.faction_total(5), 0);

    let registry = query::registry(&restored);
    let mut engaged = 0;
    for (entity, (slot, faction)) in registry.query::<(&AttackTarget, &Faction)>().iter() {
        let target = slot.target.expect("engagement survives restore");
        let enemy = registry.get::<&Faction>(target).expect("target restored");
        assert_ne!(enemy.id, faction.id);
        assert!(registry.get::<&Attacking>(entity).is_ok());
        engaged += 1;
    }
    assert_eq!(engaged, 2);

    let events = tick(&mut restored, 500);
    let hits = events
        .iter()
        .filter(|event| matches!(event, Event::MeleeHit { .. }))
        .count();
    assert_eq!(hits, 2);
    let registry = query::registry(&restored);
    for (_, (health, _)) in registry.query::<(&Health, &AttackTarget)>().iter() {
        assert_eq!(health.current, 90.0);
    }
}

#[test]
fn snapshot_preserves_unit_state() {
    let mut original = duel();
    for _ in 0..4 {
        let _ = tick(&mut original, 500);
    }

    let saved = query::snapshot(&original);
    let mut restored = world();
    restore(&mut restored, &saved);

    let describe = |world: &World| {
        let mut units: Vec<_> = query::unit_view(world)
            .into_iter()
            .map(|unit| {
                (
                    unit.faction,
                    unit.kind,
                    unit.position.x,
                    unit.position.y,
                    unit.health,
                )
            })
            .collect();
        units.sort_by(|a, b| a.partial_cmp(b).expect("finite unit state"));
        units
    };
    assert_eq!(describe(&restored), describe(&original));
    assert_eq!(query::snapshot(&restored).targeting_timer, saved.targeting_timer);
}

#[test]
fn corrupt_snapshot_is_reported() {
    assert!(SavedWorld::from_json("{\"version\": 1").is_err());
}

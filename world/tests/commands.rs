use std::time::Duration;

use battlegrid_core::{
    components::{Health, Movement, MovementState, Position, Selected},
    Command, Entity, Event, UnitKind, Vec2,
};
use battlegrid_world::{apply, query, World, WorldConfig};

fn world() -> World {
    World::new(WorldConfig::default()).expect("default config is valid")
}

fn spawn(world: &mut World, kind: UnitKind, faction: u32, position: Vec2) -> Entity {
    let mut events = Vec::new();
    apply(
        world,
        Command::SpawnUnit {
            kind,
            faction,
            position,
        },
        &mut events,
    );
    match events.as_slice() {
        [Event::UnitSpawned { entity, .. }] => *entity,
        other => panic!("unexpected events {other:?}"),
    }
}

fn position_of(world: &World, entity: Entity) -> Vec2 {
    query::registry(world)
        .get::<&Position>(entity)
        .expect("position")
        .value
}

fn health_of(world: &World, entity: Entity) -> f32 {
    query::registry(world)
        .get::<&Health>(entity)
        .expect("health")
        .current
}

fn spawned_positions(events: &[Event]) -> Vec<Vec2> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::UnitSpawned { position, .. } => Some(*position),
            _ => None,
        })
        .collect()
}

#[test]
fn formation_fills_lattice_row_by_row() {
    let mut world = world();
    let mut events = Vec::new();

    apply(
        &mut world,
        Command::SpawnFormation {
            kind: UnitKind::Footman,
            faction: 0,
            count: 6,
            min: Vec2::ZERO,
            max: Vec2::new(30.0, 30.0),
        },
        &mut events,
    );

    assert_eq!(
        spawned_positions(&events),
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(20.0, 0.0),
            Vec2::new(30.0, 0.0),
            Vec2::new(0.0, 10.0),
            Vec2::new(10.0, 10.0),
        ]
    );
    let counts = query::unit_counts(&world);
    assert_eq!(counts.faction_total(0), 6);
    assert_eq!(query::spatial_grid(&world).len(), 6);
}

#[test]
fn formation_accepts_inverted_corners() {
    let mut world = world();
    let mut events = Vec::new();

    apply(
        &mut world,
        Command::SpawnFormation {
            kind: UnitKind::Archer,
            faction: 1,
            count: 2,
            min: Vec2::new(40.0, 40.0),
            max: Vec2::new(20.0, 20.0),
        },
        &mut events,
    );

    assert_eq!(
        spawned_positions(&events),
        vec![Vec2::new(20.0, 20.0), Vec2::new(30.0, 20.0)]
    );
}

#[test]
fn thin_formation_is_ignored() {
    let mut world = world();
    let mut events = Vec::new();

    apply(
        &mut world,
        Command::SpawnFormation {
            kind: UnitKind::Footman,
            faction: 0,
            count: 10,
            min: Vec2::ZERO,
            max: Vec2::new(0.05, 50.0),
        },
        &mut events,
    );

    assert!(events.is_empty());
    assert_eq!(query::unit_counts(&world).total_units(), 0);
}

#[test]
fn delete_removes_only_units_inside_rectangle() {
    let mut world = world();
    let inside_a = spawn(&mut world, UnitKind::Footman, 0, Vec2::new(5.0, 5.0));
    let inside_b = spawn(&mut world, UnitKind::Ballista, 2, Vec2::new(10.0, 10.0));
    let outside = spawn(&mut world, UnitKind::Archer, 1, Vec2::new(10.5, 10.0));
    let mut events = Vec::new();

    apply(
        &mut world,
        Command::DeleteInRect {
            min: Vec2::new(10.0, 10.0),
            max: Vec2::ZERO,
        },
        &mut events,
    );

    let mut deleted: Vec<Entity> = events
        .iter()
        .filter_map(|event| match event {
            Event::EntityDeleted { entity } => Some(*entity),
            _ => None,
        })
        .collect();
    deleted.sort_by_key(|entity| entity.to_bits());
    let mut expected = vec![inside_a, inside_b];
    expected.sort_by_key(|entity| entity.to_bits());
    assert_eq!(deleted, expected);

    let registry = query::registry(&world);
    assert!(!registry.contains(inside_a));
    assert!(!registry.contains(inside_b));
    assert!(registry.contains(outside));
    assert_eq!(query::spatial_grid(&world).len(), 1);
}

#[test]
fn selection_replaces_previous_selection() {
    let mut world = world();
    let first = spawn(&mut world, UnitKind::Footman, 0, Vec2::new(5.0, 5.0));
    let second = spawn(&mut world, UnitKind::Footman, 1, Vec2::new(50.0, 50.0));
    let mut events = Vec::new();

    apply(
        &mut world,
        Command::SelectInRect {
            min: Vec2::ZERO,
            max: Vec2::new(10.0, 10.0),
        },
        &mut events,
    );
    assert_eq!(events, vec![Event::SelectionChanged { count: 1 }]);

    events.clear();
    apply(
        &mut world,
        Command::SelectInRect {
            min: Vec2::new(40.0, 40.0),
            max: Vec2::new(60.0, 60.0),
        },
        &mut events,
    );
    assert_eq!(events, vec![Event::SelectionChanged { count: 1 }]);

    let registry = query::registry(&world);
    assert!(registry.get::<&Selected>(first).is_err());
    assert!(registry.get::<&Selected>(second).is_ok());
    assert_eq!(query::unit_counts(&world).selected, 1);

    let view = query::unit_view(&world);
    assert_eq!(view.len(), 2);
    assert!(view
        .iter()
        .all(|unit| unit.selected == (unit.entity == second)));
}

#[test]
fn empty_selection_clears_everything() {
    let mut world = world();
    let _unit = spawn(&mut world, UnitKind::Archer, 0, Vec2::new(5.0, 5.0));
    let mut events = Vec::new();

    apply(
        &mut world,
        Command::SelectInRect {
            min: Vec2::ZERO,
            max: Vec2::new(10.0, 10.0),
        },
        &mut events,
    );
    apply(
        &mut world,
        Command::SelectInRect {
            min: Vec2::new(500.0, 500.0),
            max: Vec2::new(510.0, 510.0),
        },
        &mut events,
    );

    assert_eq!(events.last(), Some(&Event::SelectionChanged { count: 0 }));
    assert_eq!(query::unit_counts(&world).selected, 0);
}

#[test]
fn move_selected_preserves_formation_offsets() {
    let mut world = world();
    let a = spawn(&mut world, UnitKind::Footman, 0, Vec2::new(0.0, 0.0));
    let b = spawn(&mut world, UnitKind::Footman, 0, Vec2::new(10.0, 0.0));
    let c = spawn(&mut world, UnitKind::Footman, 0, Vec2::new(0.0, 10.0));
    let healer = spawn(&mut world, UnitKind::Healer, 0, Vec2::new(5.0, 5.0));
    let mut events = Vec::new();

    apply(
        &mut world,
        Command::SelectInRect {
            min: Vec2::ZERO,
            max: Vec2::new(10.0, 10.0),
        },
        &mut events,
    );
    assert_eq!(events, vec![Event::SelectionChanged { count: 4 }]);

    events.clear();
    apply(
        &mut world,
        Command::MoveSelected {
            destination: Vec2::new(100.0, 100.0),
        },
        &mut events,
    );

    let expected = [
        (a, Vec2::new(95.0, 95.0)),
        (b, Vec2::new(105.0, 95.0)),
        (c, Vec2::new(95.0, 105.0)),
    ];
    assert_eq!(events.len(), 3);
    for (entity, target) in expected {
        assert!(events.contains(&Event::MoveOrdered { entity, target }));
        let movement = *query::registry(&world)
            .get::<&Movement>(entity)
            .expect("movement");
        assert_eq!(movement.target, target);
        assert_eq!(movement.state, MovementState::Moving);
    }

    for _ in 0..200 {
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(100),
            },
            &mut events,
        );
    }

    for (entity, target) in expected {
        assert_eq!(position_of(&world, entity), target);
    }
    let registry = query::registry(&world);
    let arrived = query::spatial_grid(&world).entities_in_rect(
        registry,
        Vec2::new(94.0, 94.0),
        Vec2::new(106.0, 106.0),
    );
    for (entity, _) in expected {
        assert!(arrived.contains(&entity));
    }
    assert!(events.iter().all(|event| !matches!(
        event,
        Event::MoveOrdered { entity, .. } if *entity == healer
    )));
}

#[test]
fn opposing_footmen_trade_blows_through_the_factory() {
    let mut world = world();
    let left = spawn(&mut world, UnitKind::Footman, 0, Vec2::ZERO);
    let right = spawn(&mut world, UnitKind::Footman, 1, Vec2::new(1.0, 0.0));
    let mut events = Vec::new();

    for _ in 0..3 {
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(500),
            },
            &mut events,
        );
    }

    assert!(events.contains(&Event::TargetChanged {
        attacker: left,
        target: Some(right),
    }));
    assert!(events.contains(&Event::MeleeHit {
        attacker: left,
        target: right,
        damage: 10.0,
    }));
    assert_eq!(health_of(&world, left), 90.0);
    assert_eq!(health_of(&world, right), 90.0);
    assert_eq!(query::tick_index(&world), 3);
}

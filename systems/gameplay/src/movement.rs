use battlegrid_core::{
    components::{Attacking, Movement, MovementState, Position},
    math, Entity, Vec2,
};
use battlegrid_spatial::{SpatialGrid, SpatialNode};
use hecs::World;

/// Homing motion for every moving entity that is not engaged in combat.
#[derive(Debug, Default)]
pub(crate) struct MovementStage {
    relocations: Vec<(Entity, Vec2, Vec2)>,
}

impl MovementStage {
    pub(crate) fn run(
        &mut self,
        world: &mut World,
        grid: &mut SpatialGrid,
        dt: f32,
        arrival_threshold: f32,
    ) {
        self.relocations.clear();

        for (entity, (position, movement, attacking, node)) in world.query_mut::<(
            &mut Position,
            &mut Movement,
            Option<&Attacking>,
            Option<&SpatialNode>,
        )>() {
            if attacking.is_some() || movement.state != MovementState::Moving {
                continue;
            }

            let old = position.value;
            step(position, movement, dt, arrival_threshold);
            if node.is_some_and(SpatialNode::is_linked) && old != position.value {
                self.relocations.push((entity, old, position.value));
            }
        }

        for (entity, old, new) in self.relocations.drain(..) {
            grid.update(world, entity, old, new);
        }
    }
}

/// Advances one entity toward its target, snapping onto it on arrival or
/// overshoot.
pub(crate) fn step(position: &mut Position, movement: &mut Movement, dt: f32, arrival_threshold: f32) {
    movement.velocity = math::direction_to(position.value, movement.target) * movement.speed;
    position.value += movement.velocity * dt;

    let remaining = movement.target - position.value;
    if remaining.length() < arrival_threshold || remaining.dot(movement.velocity) < 0.0 {
        position.value = movement.target;
        movement.halt();
    }
}

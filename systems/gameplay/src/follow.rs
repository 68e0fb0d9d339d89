use battlegrid_core::{
    components::{Faction, Follow, Health, Position},
    math, Entity, Vec2,
};
use battlegrid_spatial::{FactionFilter, SpatialGrid};
use hecs::World;
use log::trace;

/// Support units trailing the nearest living ally.
#[derive(Debug, Default)]
pub(crate) struct FollowStage {
    followers: Vec<(Entity, Vec2, u32, Follow)>,
    allies: Vec<Entity>,
}

impl FollowStage {
    pub(crate) fn run(&mut self, world: &mut World, grid: &mut SpatialGrid, dt: f32) {
        self.followers.clear();
        self.followers.extend(
            world
                .query::<(&Follow, &Position, &Faction)>()
                .iter()
                .map(|(entity, (follow, position, faction))| {
                    (entity, position.value, faction.id, *follow)
                }),
        );

        for index in 0..self.followers.len() {
            let (entity, _, faction, mut follow) = self.followers[index];
            let Some(position) = world.get::<&Position>(entity).ok().map(|p| p.value) else {
                continue;
            };

            follow.target_timer += dt;
            if follow.target.is_some_and(|target| !is_alive(world, target)) {
                follow.target = None;
            }
            if follow.target_timer >= follow.target_cooldown {
                follow.target_timer = 0.0;
                if let Some(ally) = self.nearest_ally(world, grid, entity, position, faction, &follow) {
                    follow.target = Some(ally);
                }
            }

            let target_position = follow
                .target
                .and_then(|target| world.get::<&Position>(target).ok().map(|p| p.value));
            let moved_to = target_position
                .and_then(|anchor| trail(position, anchor, &follow, dt));

            if let Ok(mut stored) = world.get::<&mut Follow>(entity) {
                *stored = follow;
            }
            if let Some(new_position) = moved_to {
                if let Ok(mut stored) = world.get::<&mut Position>(entity) {
                    stored.value = new_position;
                }
                grid.update(world, entity, position, new_position);
            }
        }
    }

    fn nearest_ally(
        &mut self,
        world: &World,
        grid: &SpatialGrid,
        entity: Entity,
        position: Vec2,
        faction: u32,
        follow: &Follow,
    ) -> Option<Entity> {
        self.allies.clear();
        grid.query_radius(
            world,
            position,
            follow.search_radius,
            FactionFilter::allies_of(faction),
            |ally| self.allies.push(ally),
        );

        let mut best: Option<(Entity, f32)> = None;
        for &ally in &self.allies {
            if ally == entity || !is_alive(world, ally) {
                continue;
            }
            let Ok(ally_position) = world.get::<&Position>(ally) else {
                continue;
            };
            let distance = position.distance(ally_position.value);
            if distance < best.map_or(follow.search_radius, |(_, d)| d) {
                best = Some((ally, distance));
            }
        }
        if best.is_none() {
            trace!("{entity:?} found no ally to follow");
        }
        best.map(|(ally, _)| ally)
    }
}

/// Position after trailing `anchor` for one step, or `None` when already
/// within follow range.
fn trail(position: Vec2, anchor: Vec2, follow: &Follow, dt: f32) -> Option<Vec2> {
    let gap = position.distance(anchor) - follow.follow_range;
    if gap <= 0.0 {
        return None;
    }

    let travel = follow.speed * dt;
    if travel >= gap {
        Some(anchor + math::direction_to(anchor, position) * follow.follow_range)
    } else {
        Some(position + math::direction_to(position, anchor) * travel)
    }
}

fn is_alive(world: &World, entity: Entity) -> bool {
    world
        .get::<&Health>(entity)
        .map_or(false, |health| health.is_alive())
}

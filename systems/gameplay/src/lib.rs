#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Fixed-step combat pipeline driven by spatial grid queries.
//!
//! [`Gameplay::tick`] advances every unit by `dt` seconds through eight
//! stages in a fixed order: movement, follow, targeting, melee, ranged,
//! healing, projectile impacts and death cleanup. Each stage snapshots the
//! rows it needs from the component store into a reusable scratch buffer
//! before mutating anything, so no view is ever invalidated mid-pass.
//! Projectiles fired during a tick first move on the next one, and entities
//! killed during a tick are destroyed by the death stage of that same tick.

mod combat;
mod death;
mod follow;
mod healing;
mod movement;
mod projectiles;
mod targeting;

use battlegrid_core::Event;
use battlegrid_spatial::SpatialGrid;
use hecs::World;
use serde::{Deserialize, Serialize};

/// Tunables shared by every stage of the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameplayConfig {
    /// Seconds between target acquisition passes.
    pub targeting_interval: f32,
    /// Distance under which a moving entity snaps onto its destination.
    pub arrival_threshold: f32,
    /// Search radius used by single-target projectiles at their impact point.
    pub impact_radius: f32,
}

impl Default for GameplayConfig {
    fn default() -> Self {
        Self {
            targeting_interval: 1.0,
            arrival_threshold: 0.5,
            impact_radius: 1.0,
        }
    }
}

/// The tick pipeline together with its scratch buffers.
#[derive(Debug, Default)]
pub struct Gameplay {
    config: GameplayConfig,
    movement: movement::MovementStage,
    follow: follow::FollowStage,
    targeting: targeting::TargetingStage,
    melee: combat::MeleeStage,
    ranged: combat::RangedStage,
    healing: healing::HealingStage,
    projectiles: projectiles::ProjectileStage,
    death: death::DeathStage,
}

impl Gameplay {
    /// Creates a pipeline using the provided tunables.
    #[must_use]
    pub fn new(config: GameplayConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Tunables the pipeline was created with.
    #[must_use]
    pub fn config(&self) -> &GameplayConfig {
        &self.config
    }

    /// Seconds accumulated toward the next targeting pass.
    #[must_use]
    pub fn targeting_timer(&self) -> f32 {
        self.targeting.timer()
    }

    /// Overrides the targeting accumulator, used when restoring a snapshot.
    pub fn set_targeting_timer(&mut self, seconds: f32) {
        self.targeting.set_timer(seconds);
    }

    /// Advances the simulation by `dt` seconds. A zero step does nothing.
    pub fn tick(&mut self, world: &mut World, grid: &mut SpatialGrid, dt: f32, events: &mut Vec<Event>) {
        if dt <= 0.0 {
            return;
        }

        let config = self.config;
        self.movement.run(world, grid, dt, config.arrival_threshold);
        self.follow.run(world, grid, dt);
        self.targeting
            .run(world, grid, dt, config.targeting_interval, events);
        self.melee.run(world, dt, events);
        self.ranged.run(world, dt, events);
        self.healing.run(world, grid, dt, events);
        self.projectiles
            .run(world, grid, config.impact_radius, events);
        self.death.run(world, grid, events);
    }
}

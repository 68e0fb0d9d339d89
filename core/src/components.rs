//! Component records attached to simulation entities.
//!
//! Every type here is plain data stored in the `hecs` component store. The
//! gameplay pipeline and the spatial grid read and write them directly; none
//! of them own other entities. Cross-entity links ([`AttackTarget`],
//! [`Follow`]) are non-owning handles that must be revalidated before use.

use hecs::Entity;
use serde::{Deserialize, Serialize};

use crate::{math, Vec2};

/// World-space location of an entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Coordinates in world units.
    pub value: Vec2,
}

impl Position {
    /// Creates a position at the provided coordinates.
    #[must_use]
    pub const fn new(value: Vec2) -> Self {
        Self { value }
    }
}

/// Motion state of an entity carrying [`Movement`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementState {
    /// Idle; the entity holds its position.
    #[default]
    NotMoving,
    /// Motion suspended while in combat; the target is retained.
    Paused,
    /// Homing toward the stored target.
    Moving,
}

/// Linear homing motion toward a target point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    /// Velocity applied during the last movement step.
    pub velocity: Vec2,
    /// Destination of the current move order.
    pub target: Vec2,
    /// Scalar speed in world units per second.
    pub speed: f32,
    /// Current motion state.
    pub state: MovementState,
}

impl Movement {
    /// Creates an idle movement record parked at `position`.
    #[must_use]
    pub fn idle(position: Vec2, speed: f32) -> Self {
        Self {
            velocity: Vec2::ZERO,
            target: position,
            speed,
            state: MovementState::NotMoving,
        }
    }

    /// Issues a move order from `from` toward `target`.
    pub fn move_to(&mut self, from: Vec2, target: Vec2) {
        self.target = target;
        self.velocity = math::direction_to(from, target) * self.speed;
        self.state = MovementState::Moving;
    }

    /// Stops motion, leaving the entity idle at its current target.
    pub fn halt(&mut self) {
        self.velocity = Vec2::ZERO;
        self.state = MovementState::NotMoving;
    }
}

/// Faction membership; entities without it are invisible to faction queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Faction {
    /// Faction identifier, valid in `0..MAX_FACTIONS`.
    pub id: u32,
}

/// Hit points with flat damage reduction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Health {
    /// Remaining hit points; may go negative until death cleanup runs.
    pub current: f32,
    /// Upper bound for healing.
    pub max: f32,
    /// Flat reduction subtracted from every incoming hit.
    pub shield: f32,
}

impl Health {
    /// Creates a full health pool.
    #[must_use]
    pub const fn full(max: f32, shield: f32) -> Self {
        Self {
            current: max,
            max,
            shield,
        }
    }

    /// Applies a hit reduced by the shield and returns the damage dealt.
    pub fn apply_damage(&mut self, amount: f32) -> f32 {
        let dealt = (amount - self.shield).max(0.0);
        self.current -= dealt;
        dealt
    }

    /// Restores hit points up to `max` and returns the amount restored.
    pub fn heal(&mut self, amount: f32) -> f32 {
        let before = self.current;
        self.current = (self.current + amount.max(0.0)).min(self.max);
        (self.current - before).max(0.0)
    }

    /// Reports whether the entity is still alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    /// Reports whether the pool is full.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.current >= self.max
    }
}

/// Melee attack state.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DirectDamage {
    /// Damage per hit before shields.
    pub damage: f32,
    /// Maximum reach in world units.
    pub range: f32,
    /// Seconds between hits.
    pub cooldown: f32,
    /// Seconds accumulated toward the next hit.
    pub timer: f32,
}

/// Kind of projectile an emitter launches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectileKind {
    /// Damages the nearest enemy at the impact point.
    #[default]
    Single,
    /// Damages every enemy within the impact radius.
    Area,
}

/// Ranged attack state.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectileEmitter {
    /// Damage carried by each projectile.
    pub damage: f32,
    /// Maximum firing distance.
    pub range: f32,
    /// Seconds between shots.
    pub cooldown: f32,
    /// Seconds accumulated toward the next shot.
    pub timer: f32,
    /// Flight speed of launched projectiles.
    pub projectile_speed: f32,
    /// Single-target or area projectiles.
    pub kind: ProjectileKind,
    /// Impact radius for area projectiles.
    pub aoe_radius: f32,
}

/// Periodic area heal.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Healer {
    /// Hit points restored per pulse.
    pub heal_amount: f32,
    /// Pulse radius.
    pub range: f32,
    /// Seconds between pulses.
    pub cooldown: f32,
    /// Seconds accumulated toward the next pulse.
    pub timer: f32,
}

/// Support-role movement that trails the nearest living ally.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Follow {
    /// Ally currently followed.
    pub target: Option<Entity>,
    /// Movement speed in world units per second.
    pub speed: f32,
    /// Distance kept from the followed ally.
    pub follow_range: f32,
    /// Radius searched when choosing an ally.
    pub search_radius: f32,
    /// Seconds between ally searches.
    pub target_cooldown: f32,
    /// Seconds accumulated toward the next search.
    pub target_timer: f32,
}

/// Currently locked enemy of an attacker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AttackTarget {
    /// Locked enemy, if any.
    pub target: Option<Entity>,
}

/// Marker present while an attacker holds a live target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Attacking;

/// Payload of an in-flight projectile.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Damage applied on impact before shields.
    pub damage: f32,
    /// Faction of the shooter; its members are never hit.
    pub faction: u32,
    /// Whether the impact damages an area.
    pub is_aoe: bool,
    /// Area radius when `is_aoe` is set.
    pub aoe_radius: f32,
}

/// Marker for player-selected units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selected;

/// Unit archetypes known to the factory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitKind {
    /// Melee infantry.
    Footman,
    /// Single-target ranged unit.
    Archer,
    /// Area-damage siege unit.
    Ballista,
    /// Support unit that follows and heals allies.
    Healer,
}

impl UnitKind {
    /// Every archetype in stat-table order.
    pub const ALL: [UnitKind; 4] = [Self::Footman, Self::Archer, Self::Ballista, Self::Healer];

    /// Index of the archetype within the stat table.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Footman => 0,
            Self::Archer => 1,
            Self::Ballista => 2,
            Self::Healer => 3,
        }
    }
}

/// Archetype and faction tag of a spawned unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Archetype the unit was built from.
    pub kind: UnitKind,
    /// Faction assigned at spawn.
    pub faction: u32,
}

//! Seeded opening layout for a headless skirmish.

use std::f32::consts::TAU;

use battlegrid_core::{Command, UnitKind, Vec2};
use rand::{distributions::WeightedIndex, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Half extent of the square each faction musters in.
const MUSTER_SPREAD: f32 = 20.0;

/// Relative likelihood of each archetype in a muster, in table order.
const ARCHETYPE_WEIGHTS: [(UnitKind, u32); 4] = [
    (UnitKind::Footman, 10),
    (UnitKind::Archer, 5),
    (UnitKind::Ballista, 2),
    (UnitKind::Healer, 3),
];

/// Parameters of a generated skirmish.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SkirmishPlan {
    pub(crate) factions: u32,
    pub(crate) units_per_faction: u32,
    pub(crate) seed: u64,
}

impl SkirmishPlan {
    /// Commands that muster every faction on a ring around the map centre
    /// and march each muster toward the centre.
    pub(crate) fn commands(&self, extent: Vec2) -> Vec<Command> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let archetypes = WeightedIndex::new(ARCHETYPE_WEIGHTS.iter().map(|(_, weight)| *weight))
            .ok();
        let centre = extent * 0.5;
        let ring = extent.min_element() * 0.35;
        let spread = Vec2::splat(MUSTER_SPREAD);

        let per_faction = self.units_per_faction as usize + 2;
        let mut commands = Vec::with_capacity(self.factions as usize * per_faction);
        for faction in 0..self.factions {
            let angle = TAU * faction as f32 / self.factions as f32;
            let anchor = centre + Vec2::new(angle.cos(), angle.sin()) * ring;

            for _ in 0..self.units_per_faction {
                let offset = Vec2::new(
                    rng.gen_range(-MUSTER_SPREAD..=MUSTER_SPREAD),
                    rng.gen_range(-MUSTER_SPREAD..=MUSTER_SPREAD),
                );
                commands.push(Command::SpawnUnit {
                    kind: archetypes
                        .as_ref()
                        .map_or(UnitKind::Footman, |dist| {
                            ARCHETYPE_WEIGHTS[rng.sample(dist)].0
                        }),
                    faction,
                    position: anchor + offset,
                });
            }
            commands.push(Command::SelectInRect {
                min: anchor - spread,
                max: anchor + spread,
            });
            commands.push(Command::MoveSelected {
                destination: centre,
            });
        }
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(seed: u64) -> SkirmishPlan {
        SkirmishPlan {
            factions: 3,
            units_per_faction: 12,
            seed,
        }
    }

    #[test]
    fn same_seed_yields_same_layout() {
        let extent = Vec2::splat(1000.0);
        assert_eq!(plan(7).commands(extent), plan(7).commands(extent));
        assert_ne!(plan(7).commands(extent), plan(8).commands(extent));
    }

    #[test]
    fn every_faction_musters_and_marches() {
        let commands = plan(1).commands(Vec2::splat(1000.0));
        assert_eq!(commands.len(), 3 * 14);

        for faction in 0..3 {
            let spawned = commands
                .iter()
                .filter(|command| {
                    matches!(command, Command::SpawnUnit { faction: f, .. } if *f == faction)
                })
                .count();
            assert_eq!(spawned, 12);
        }
        let marches = commands
            .iter()
            .filter(|command| {
                matches!(command, Command::MoveSelected { destination } if *destination == Vec2::splat(500.0))
            })
            .count();
        assert_eq!(marches, 3);
    }

    #[test]
    fn muster_mixes_every_archetype() {
        let commands = SkirmishPlan {
            factions: 1,
            units_per_faction: 400,
            seed: 11,
        }
        .commands(Vec2::splat(1000.0));
        let count = |wanted: UnitKind| {
            commands
                .iter()
                .filter(|command| matches!(command, Command::SpawnUnit { kind, .. } if *kind == wanted))
                .count()
        };
        for (kind, _) in ARCHETYPE_WEIGHTS {
            assert!(count(kind) > 0, "{kind:?} never mustered");
        }
        assert!(count(UnitKind::Footman) > count(UnitKind::Ballista));
    }

    #[test]
    fn units_stay_inside_their_muster() {
        let commands = plan(3).commands(Vec2::splat(1000.0));
        let mut muster = Vec::new();
        for command in &commands {
            match command {
                Command::SpawnUnit { position, .. } => muster.push(*position),
                Command::SelectInRect { min, max } => {
                    assert!(muster
                        .iter()
                        .all(|p| p.x >= min.x && p.y >= min.y && p.x <= max.x && p.y <= max.y));
                    muster.clear();
                }
                _ => {}
            }
        }
    }
}

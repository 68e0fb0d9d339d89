#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless Battlegrid skirmish.

mod skirmish;

use std::{fs, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use battlegrid_core::{Command, Event, UnitCounts};
use battlegrid_world::{
    apply, query, restore, SavedWorld, SimulationClock, World, WorldConfig,
};
use clap::Parser;
use log::{debug, info};

use skirmish::SkirmishPlan;

/// Command-line arguments for the Battlegrid skirmish runner.
#[derive(Debug, Parser)]
#[command(
    name = "battlegrid",
    version,
    about = "Runs a headless faction skirmish on a spatial grid"
)]
struct CliArgs {
    /// TOML file with grid, gameplay and unit settings.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Number of simulation ticks to run.
    #[arg(long, default_value_t = 600)]
    ticks: u64,
    /// Frame time fed to the clock each tick, capped at 100 ms.
    #[arg(long, value_name = "MS", default_value_t = 100)]
    step_ms: u64,
    /// Simulation speed multiplier, clamped to 0..=100.
    #[arg(long, default_value_t = 1.0)]
    speed: f32,
    /// Units mustered per faction.
    #[arg(long, default_value_t = 40)]
    units: u32,
    /// Number of opposing factions.
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(1..=8))]
    factions: u32,
    /// Seed for the opening layout.
    #[arg(long, default_value_t = 0x5eed)]
    seed: u64,
    /// Ticks between progress reports; zero disables them.
    #[arg(long, value_name = "N", default_value_t = 50)]
    report_every: u64,
    /// Writes a JSON snapshot of the final state to this file.
    #[arg(long, value_name = "PATH")]
    save: Option<PathBuf>,
    /// Resumes from a JSON snapshot instead of mustering a new skirmish.
    #[arg(long, value_name = "PATH", conflicts_with_all = ["units", "factions", "seed"])]
    load: Option<PathBuf>,
}

/// Running totals of combat events.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct BattleLog {
    melee_hits: usize,
    projectiles_fired: usize,
    impacts: usize,
    heals: usize,
    deaths: usize,
    damage_dealt: f32,
    healing_done: f32,
}

impl BattleLog {
    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::MeleeHit { damage, .. } => {
                    self.melee_hits += 1;
                    self.damage_dealt += damage;
                }
                Event::ProjectileFired { .. } => self.projectiles_fired += 1,
                Event::ProjectileImpacted { .. } => self.impacts += 1,
                Event::Healed { amount, .. } => {
                    self.heals += 1;
                    self.healing_done += amount;
                }
                Event::UnitDied { .. } => self.deaths += 1,
                _ => {}
            }
        }
    }
}

/// Entry point for the Battlegrid command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    run(&CliArgs::parse())
}

fn run(args: &CliArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => WorldConfig::load(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => WorldConfig::default(),
    };
    let extent = battlegrid_core::Vec2::new(config.grid.width, config.grid.height);
    let mut world = World::new(config).context("failed to build world")?;
    let mut events = Vec::new();

    match &args.load {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("failed to read snapshot {}", path.display()))?;
            let saved = SavedWorld::from_json(&source)
                .with_context(|| format!("failed to decode snapshot {}", path.display()))?;
            restore(&mut world, &saved);
        }
        None => {
            let plan = SkirmishPlan {
                factions: args.factions,
                units_per_faction: args.units,
                seed: args.seed,
            };
            for command in plan.commands(extent) {
                apply(&mut world, command, &mut events);
            }
            debug!("opening layout produced {} events", events.len());
        }
    }

    let opening = query::unit_counts(&world);
    info!(
        "{} units across {} factions",
        opening.total_units(),
        opening.factions_alive()
    );

    let clock = SimulationClock::with_speed(args.speed);
    let frame = Duration::from_millis(args.step_ms);
    let mut log = BattleLog::default();
    for tick in 1..=args.ticks {
        events.clear();
        apply(
            &mut world,
            Command::Tick {
                dt: clock.scaled(frame),
            },
            &mut events,
        );
        log.record(&events);

        if args.report_every > 0 && tick % args.report_every == 0 {
            report(query::tick_index(&world), &query::unit_counts(&world), &log);
        }
        if opening.factions_alive() > 1 && query::unit_counts(&world).factions_alive() <= 1 {
            info!("skirmish decided after {tick} ticks");
            break;
        }
    }

    summarize(&world, &log);

    if let Some(path) = &args.save {
        let json = query::snapshot(&world)
            .to_json()
            .context("failed to encode snapshot")?;
        fs::write(path, json)
            .with_context(|| format!("failed to write snapshot {}", path.display()))?;
        info!("snapshot written to {}", path.display());
    }
    Ok(())
}

fn report(tick: u64, counts: &UnitCounts, log: &BattleLog) {
    let factions: Vec<String> = counts
        .by_faction
        .keys()
        .map(|faction| format!("{faction}:{}", counts.faction_total(*faction)))
        .collect();
    info!(
        "tick {tick}: units [{}], {} projectiles in flight, {} deaths so far",
        factions.join(" "),
        counts.projectiles,
        log.deaths
    );
}

fn summarize(world: &World, log: &BattleLog) {
    let counts = query::unit_counts(world);
    println!("ticks simulated: {}", query::tick_index(world));
    for (faction, kinds) in &counts.by_faction {
        let roster: Vec<String> = kinds
            .iter()
            .map(|(kind, count)| format!("{kind:?} x{count}"))
            .collect();
        println!("faction {faction}: {}", roster.join(", "));
    }
    println!(
        "melee hits: {}, projectiles fired: {}, impacts: {}",
        log.melee_hits, log.projectiles_fired, log.impacts
    );
    println!(
        "damage dealt: {:.1}, healing done: {:.1} over {} pulses",
        log.damage_dealt, log.healing_done, log.heals
    );
    println!("units lost: {}", log.deaths);
}

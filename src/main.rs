//! Headless skirmish runner
//!
//! Spawns two hostile lines of agents, runs the tactics core for a number of
//! ticks and prints a summary of what happened. Agents walk straight toward
//! their movement directives and firing agents may drop their target, which
//! stands in for the navigation and weapon subsystems.

use std::collections::BTreeMap;

use ahash::AHashMap;
use clap::Parser;
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use skirmish_tactics::combat::WeaponState;
use skirmish_tactics::core::config::{FactionSetup, TacticsConfig};
use skirmish_tactics::core::error::Result;
use skirmish_tactics::core::types::{AgentId, FactionId, Tick};
use skirmish_tactics::ecs::world::TacticsWorld;
use skirmish_tactics::entity::agent::AgentSpawn;
use skirmish_tactics::simulation::events::TacticsEvent;
use skirmish_tactics::simulation::tick::run_tactics_tick;

const NORTH: FactionId = FactionId(1);
const SOUTH: FactionId = FactionId(2);

/// Walking speed used by the stand-in navigation (units per second)
const WALK_SPEED: f32 = 3.0;

/// Ticks a downed agent lingers before it is despawned
const DEATH_GRACE_TICKS: Tick = 20;

#[derive(Parser, Debug)]
#[command(name = "skirmish")]
#[command(about = "Run a headless two-sided skirmish through the tactics core")]
struct Args {
    /// Tactics config file (TOML); built-in defaults when omitted
    #[arg(long)]
    config: Option<String>,

    /// Agents spawned per side
    #[arg(long, default_value_t = 8)]
    agents: usize,

    /// Distance between the two starting lines
    #[arg(long, default_value_t = 35.0)]
    gap: f32,

    /// Number of ticks to run
    #[arg(long, default_value_t = 600)]
    ticks: u64,

    /// Chance per tick that a firing agent drops its target
    #[arg(long, default_value_t = 0.02)]
    hit_chance: f64,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Enable debug logging of every state transition
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Serialize)]
struct SkirmishSummary {
    seed: u64,
    ticks: u64,
    agents_per_side: usize,
    north_survivors: usize,
    south_survivors: usize,
    events: BTreeMap<&'static str, usize>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        "skirmish_tactics=debug,skirmish=debug"
    } else {
        "skirmish_tactics=info,skirmish=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => TacticsConfig::load(path)?,
        None => TacticsConfig::default(),
    };
    if config.factions.is_empty() {
        config.factions.push(FactionSetup {
            id: NORTH,
            allies: Vec::new(),
            enemies: vec![SOUTH],
        });
    }

    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1));
    let mut world = TacticsWorld::new(config, seed)?;

    spawn_line(&mut world, &args, NORTH, 0.0, Vec3::Z)?;
    spawn_line(&mut world, &args, SOUTH, args.gap, Vec3::NEG_Z)?;
    tracing::info!(
        "Skirmish started: {} agents, seed {}",
        world.agent_count(),
        seed
    );

    let dt = world.config.tick_seconds;
    let mut destinations: AHashMap<AgentId, Vec3> = AHashMap::new();
    let mut firing: AHashMap<AgentId, bool> = AHashMap::new();
    let mut downed_at: AHashMap<AgentId, Tick> = AHashMap::new();
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();

    for _ in 0..args.ticks {
        let events = run_tactics_tick(&mut world);

        for event in &events {
            *counts.entry(event.kind()).or_default() += 1;
            match event {
                TacticsEvent::MovementDirective {
                    agent,
                    target_point,
                    ..
                } => {
                    destinations.insert(*agent, *target_point);
                }
                TacticsEvent::ShouldFire { agent, fire } => {
                    firing.insert(*agent, *fire);
                }
                TacticsEvent::UnitLost { agent, killer, .. } => {
                    tracing::info!(
                        "Tick {}: {} lost (killer {:?})",
                        world.current_tick,
                        agent,
                        killer
                    );
                    downed_at.insert(*agent, world.current_tick);
                }
                _ => {}
            }
        }

        resolve_fire(&mut world, &firing, args.hit_chance, &mut rng)?;
        walk_agents(&mut world, &destinations, dt)?;

        let mut expired: Vec<AgentId> = downed_at
            .iter()
            .filter(|(_, tick)| world.current_tick >= **tick + DEATH_GRACE_TICKS)
            .map(|(&id, _)| id)
            .collect();
        expired.sort_by_key(|id| id.0);
        for id in expired {
            downed_at.remove(&id);
            destinations.remove(&id);
            firing.remove(&id);
            world.despawn_agent(id)?;
        }

        if side_wiped(&world, NORTH) || side_wiped(&world, SOUTH) {
            break;
        }
    }

    let summary = SkirmishSummary {
        seed,
        ticks: world.current_tick,
        agents_per_side: args.agents,
        north_survivors: survivors(&world, NORTH),
        south_survivors: survivors(&world, SOUTH),
        events: counts,
    };
    print_summary(&summary, &args.format);

    Ok(())
}

fn spawn_line(
    world: &mut TacticsWorld,
    args: &Args,
    faction: FactionId,
    z: f32,
    facing: Vec3,
) -> Result<()> {
    let width = (args.agents.saturating_sub(1)) as f32 * 3.0;
    for i in 0..args.agents {
        let x = i as f32 * 3.0 - width / 2.0;
        // Sequential ids keep seeded runs reproducible
        let id = AgentId(Uuid::from_u128(((faction.0 as u128) << 64) | i as u128));
        let mut spawn = AgentSpawn::new(format!("f{}-{}", faction.0, i))
            .with_id(id)
            .faction(faction)
            .at(Vec3::new(x, 0.0, z))
            .facing(facing);
        // Every third agent carries a bow
        spawn = if i % 3 == 0 {
            spawn.ranged().weapon(WeaponState {
                has_line_up_shot: true,
                range: 30.0,
                ..WeaponState::default()
            })
        } else {
            spawn.melee(2.0).weapon(WeaponState {
                has_line_up_shot: true,
                range: 2.5,
                ..WeaponState::default()
            })
        };
        world.spawn_agent(spawn)?;
    }
    Ok(())
}

/// Firing agents may bring their current target down
fn resolve_fire(
    world: &mut TacticsWorld,
    firing: &AHashMap<AgentId, bool>,
    hit_chance: f64,
    rng: &mut ChaCha8Rng,
) -> Result<()> {
    // Map iteration order is not stable; roll in id order
    let mut shooters: Vec<AgentId> = firing
        .iter()
        .filter(|(_, fire)| **fire)
        .map(|(&id, _)| id)
        .collect();
    shooters.sort_by_key(|id| id.0);

    let mut hits = Vec::new();
    for shooter in shooters {
        let standing = world
            .agents
            .index_of(shooter)
            .is_some_and(|slot| !world.agents.death_states[slot].is_down());
        if !standing {
            continue;
        }
        let Some(target) = world.current_target(shooter) else {
            continue;
        };
        if rng.gen_bool(hit_chance.clamp(0.0, 1.0)) {
            hits.push((target, shooter));
        }
    }
    for (target, shooter) in hits {
        world.mark_dying(target, Some(shooter))?;
    }
    Ok(())
}

/// Straight-line walk toward the latest directive, facing the target
fn walk_agents(
    world: &mut TacticsWorld,
    destinations: &AHashMap<AgentId, Vec3>,
    dt: f32,
) -> Result<()> {
    let step = WALK_SPEED * dt;
    for slot in world.agents.iter_living().collect::<Vec<_>>() {
        let id = world.agents.ids[slot];
        let position = world.agents.positions[slot];
        let mut forward = world.agents.forwards[slot];

        let mut next = position;
        if let Some(&destination) = destinations.get(&id) {
            let offset = destination - position;
            let distance = offset.length();
            if distance > 0.01 {
                next = position + offset / distance * distance.min(step);
                forward = offset;
            }
        }
        if let Some(target) = world.current_target(id).and_then(|t| world.position(t)) {
            let look = target - next;
            if look.length_squared() > 1e-6 {
                forward = look;
            }
        }
        world.set_transform(id, next, forward.normalize_or_zero())?;
    }
    Ok(())
}

fn survivors(world: &TacticsWorld, faction: FactionId) -> usize {
    world
        .agents
        .iter_living()
        .filter(|&slot| world.agents.factions[slot].contains(&faction))
        .count()
}

fn side_wiped(world: &TacticsWorld, faction: FactionId) -> bool {
    survivors(world, faction) == 0
}

fn print_summary(summary: &SkirmishSummary, format: &str) {
    match format {
        "text" => {
            println!("Skirmish Result");
            println!("===============");
            println!("Ticks: {}", summary.ticks);
            println!(
                "Survivors: north {}/{}, south {}/{}",
                summary.north_survivors,
                summary.agents_per_side,
                summary.south_survivors,
                summary.agents_per_side
            );
            println!();
            println!("Events:");
            for (kind, count) in &summary.events {
                println!("  {:<22} {}", kind, count);
            }
            println!();
            println!("Seed: {}", summary.seed);
        }
        other => {
            if other != "json" {
                tracing::warn!("Unknown format '{}', defaulting to json", other);
            }
            match serde_json::to_string_pretty(summary) {
                Ok(json) => println!("{}", json),
                Err(e) => tracing::error!("Failed to serialize summary: {}", e),
            }
        }
    }
}

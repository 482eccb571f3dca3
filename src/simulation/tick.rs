//! Tick system - orchestrates the tactics phases
//!
//! Each tick runs, in order:
//! spatial index -> perception -> detection -> target prioritizer -> combat
//!
//! Data only flows forward. Perception and target evaluation are pure
//! per-agent functions over frozen state and use rayon for large
//! populations; their results are applied sequentially.

use rayon::prelude::*;

use crate::combat::{directive_point, should_fire, CombatState, MovementInput};
use crate::core::types::AgentId;
use crate::ecs::world::TacticsWorld;
use crate::entity::agent::AgentArchetype;
use crate::entity::faction::Relationship;
use crate::simulation::detection::DetectionState;
use crate::simulation::events::TacticsEvent;
use crate::simulation::perception::{perceive, Perception};
use crate::simulation::targeting::{evaluate_targets, CurrentTarget, TargetDecision};
use crate::spatial::sparse_hash::SpatialEntry;

/// Advance the tactics simulation by one fixed step
///
/// Returns every event produced this tick, including those raised by
/// world mutations since the previous tick. The same events are handed to
/// the world's observers first.
pub fn run_tactics_tick(world: &mut TacticsWorld) -> Vec<TacticsEvent> {
    let dt = world.config.tick_seconds;
    let mut events = std::mem::take(&mut world.pending);

    rebuild_spatial_index(world);
    let perceptions = run_perception(world);
    apply_perceptions(world, &perceptions);
    update_detection(world, &perceptions, dt, &mut events);
    update_targets(world, &perceptions, dt, &mut events);
    update_combat(world, &perceptions, dt, &mut events);

    world.zones.tick(dt);
    world.current_tick += 1;
    world.bus.dispatch(world.current_tick, &events);

    events
}

/// Agents whose own tactics run this tick
fn is_driven(agents: &AgentArchetype, player: Option<AgentId>, slot: usize) -> bool {
    !agents.death_states[slot].is_down() && player != Some(agents.ids[slot])
}

fn use_parallel(world: &TacticsWorld) -> bool {
    world.agents.iter_living().count() >= world.config.parallel_threshold
}

fn rebuild_spatial_index(world: &mut TacticsWorld) {
    let agents = &world.agents;
    world
        .spatial
        .rebuild((0..agents.count()).map(|slot| SpatialEntry {
            id: agents.ids[slot],
            slot,
            position: agents.positions[slot],
            is_dead: agents.death_states[slot].is_down(),
        }));
}

/// Perception for every living agent, indexed by slot
///
/// The player is perceived too so that others can score reciprocal sight.
fn run_perception(world: &TacticsWorld) -> Vec<Option<Perception>> {
    let agents = &world.agents;
    let index = &world.spatial;
    let blocker = world.blocker.as_ref();
    let config = &world.config.perception;

    let perceive_slot = |slot: usize| {
        (!agents.death_states[slot].is_down())
            .then(|| perceive(slot, agents, index, blocker, config))
    };

    if use_parallel(world) {
        (0..agents.count()).into_par_iter().map(perceive_slot).collect()
    } else {
        (0..agents.count()).map(perceive_slot).collect()
    }
}

/// Write closest-target caches and grow tracked sets from perception
fn apply_perceptions(world: &mut TacticsWorld, perceptions: &[Option<Perception>]) {
    let memory = world.config.targeting.tracking_memory;

    for (slot, perception) in perceptions.iter().enumerate() {
        let Some(perception) = perception else {
            continue;
        };
        if !is_driven(&world.agents, world.player, slot) {
            continue;
        }

        let closest = perception.closest.map(|c| c.id);
        if world.agents.closest[slot] != closest {
            world.agents.closest[slot] = closest;
        }

        for candidate in &perception.detected {
            let factions = &world.factions;
            let observer_factions = &world.agents.factions[slot];
            let candidate_factions = &world.agents.factions[candidate.slot];

            let inserted = world.agents.tracked[slot].track(candidate.id, memory, || {
                factions.resolve(observer_factions, candidate_factions)
            });

            if !inserted {
                debug_assert_eq!(
                    world.agents.tracked[slot].relationship(candidate.id),
                    Some(world.factions.resolve(
                        &world.agents.factions[slot],
                        &world.agents.factions[candidate.slot]
                    )),
                    "cached relationship disagrees with faction table"
                );
            }
        }
    }
}

fn update_detection(
    world: &mut TacticsWorld,
    perceptions: &[Option<Perception>],
    dt: f32,
    events: &mut Vec<TacticsEvent>,
) {
    for slot in 0..world.agents.count() {
        if !is_driven(&world.agents, world.player, slot) {
            continue;
        }
        let Some(perception) = perceptions[slot].as_ref() else {
            continue;
        };

        let tracked = &world.agents.tracked[slot];
        let hostile_in_sight = perception
            .detected
            .iter()
            .any(|c| tracked.relationship(c.id) == Some(Relationship::Enemy));

        let Some(transition) =
            world.agents.detection[slot].update(hostile_in_sight, dt, &world.config.detection)
        else {
            continue;
        };

        tracing::debug!(
            "Agent {} detection {:?} -> {:?}",
            world.agents.ids[slot],
            transition.from,
            transition.to
        );

        if transition.to == DetectionState::Active {
            raise_invasion_alerts(world, slot, perception, events);
        }
    }
}

/// Hostiles standing in a zone owned by the observer's factions
fn raise_invasion_alerts(
    world: &mut TacticsWorld,
    slot: usize,
    perception: &Perception,
    events: &mut Vec<TacticsEvent>,
) {
    for candidate in &perception.detected {
        if world.agents.tracked[slot].relationship(candidate.id) != Some(Relationship::Enemy) {
            continue;
        }

        let position = world.agents.positions[candidate.slot];
        let Some(zone) = world
            .zones
            .owned_zone_at(position, &world.agents.factions[slot])
            .copied()
        else {
            continue;
        };

        if world.zones.try_alert(zone.id) {
            tracing::debug!("Invasion of zone {:?} by {}", zone.id, candidate.id);
            events.push(TacticsEvent::InvasionAlert {
                zone: zone.id,
                owner: zone.owner,
                position,
                intruder: candidate.id,
            });
        }
    }
}

fn update_targets(
    world: &mut TacticsWorld,
    perceptions: &[Option<Perception>],
    dt: f32,
    events: &mut Vec<TacticsEvent>,
) {
    // Everyone scores against last tick's targets
    let snapshot: Vec<Option<AgentId>> = world.agents.targets.iter().map(|t| t.target).collect();

    let parallel = use_parallel(world);
    let decisions: Vec<Option<TargetDecision>> = {
        let agents = &world.agents;
        let player = world.player;
        let config = &world.config.targeting;
        let decide = |slot: usize| {
            is_driven(agents, player, slot).then(|| {
                evaluate_targets(
                    slot,
                    agents,
                    perceptions,
                    &snapshot,
                    agents.detection[slot].state(),
                    dt,
                    config,
                )
            })
        };

        if parallel {
            (0..agents.count()).into_par_iter().map(decide).collect()
        } else {
            (0..agents.count()).map(decide).collect()
        }
    };

    for (slot, decision) in decisions.into_iter().enumerate() {
        let Some(decision) = decision else {
            continue;
        };

        let tracked = &mut world.agents.tracked[slot];
        if decision.clear_all {
            tracked.clear();
        } else {
            for id in &decision.removals {
                tracked.remove(*id);
            }
            for &(id, countdown) in &decision.countdowns {
                tracked.set_countdown(id, countdown);
            }
        }

        let chosen = decision.chosen;
        let target = chosen.map(|c| c.id);
        let current = &mut world.agents.targets[slot];

        if current.target != target {
            tracing::debug!(
                "Agent {} target {:?} -> {:?}",
                world.agents.ids[slot],
                current.target,
                target
            );
            events.push(TacticsEvent::TargetChanged {
                agent: world.agents.ids[slot],
                target,
            });
        }

        *current = CurrentTarget {
            target,
            priority: chosen.map_or(0.0, |c| c.priority),
            distance: chosen.map_or(0.0, |c| c.distance),
        };
    }
}

fn update_combat(
    world: &mut TacticsWorld,
    perceptions: &[Option<Perception>],
    dt: f32,
    events: &mut Vec<TacticsEvent>,
) {
    for slot in 0..world.agents.count() {
        let id = world.agents.ids[slot];
        if world.is_player(id) {
            continue;
        }

        if world.agents.death_states[slot].is_down() {
            withdraw_fire(world, slot, events);
            continue;
        }

        let detection = world.agents.detection[slot].state();
        let target = world.agents.targets[slot].target;
        let brain = &mut world.agents.combat[slot];

        if let Some(state) = brain.update(detection, target.is_some(), dt, &world.config.combat) {
            tracing::debug!("Agent {} combat state -> {:?}", id, state);
            events.push(TacticsEvent::CombatStateChanged { agent: id, state });
            if state != CombatState::Active {
                brain.movement.reset();
                brain.last_directive = None;
            }
        }

        if brain.state != CombatState::Active {
            withdraw_fire(world, slot, events);
            continue;
        }

        let Some(target_slot) = target.and_then(|t| world.agents.index_of(t)) else {
            continue;
        };

        let position = world.agents.positions[slot];
        let target_position = world.agents.positions[target_slot];
        let distance = position.distance(target_position);
        let movement_config = &world.config.movement;
        let keep_min = world
            .agents
            .keep_min(slot, movement_config.ranged_keep_distance);

        let last_directive = world.agents.combat[slot].last_directive;
        let navigation_stopped = world.agents.navigation[slot].is_some_and(|n| {
            n.is_stuck(position, last_directive, movement_config.repath_distance)
        });
        let input = MovementInput {
            distance,
            keep_min,
            navigation_stopped,
            staggered: world.agents.staggered[slot],
        };

        let brain = &mut world.agents.combat[slot];
        let changed = brain.movement.decide(
            input,
            world.agents.weights[slot].as_ref(),
            dt,
            &mut world.rng,
            movement_config,
        );

        let movement = brain.movement.movement;
        let point = directive_point(
            movement,
            position,
            target_position,
            brain.movement.keep_max(keep_min),
            movement_config.flank_angle,
        );
        let drifted = brain
            .last_directive
            .map_or(true, |last| last.distance(point) > movement_config.repath_distance);

        if changed.is_some() || drifted {
            brain.last_directive = Some(point);
            events.push(TacticsEvent::MovementDirective {
                agent: id,
                movement,
                target_point: point,
            });
        }

        let target_visible = target.is_some_and(|t| {
            perceptions[slot]
                .as_ref()
                .is_some_and(|p| p.detects(t))
        });
        let fire = should_fire(
            brain.state,
            target_visible,
            world.agents.weapons[slot].as_ref(),
            distance,
        );
        if fire != brain.firing {
            brain.firing = fire;
            events.push(TacticsEvent::ShouldFire { agent: id, fire });
        }
    }
}

fn withdraw_fire(world: &mut TacticsWorld, slot: usize, events: &mut Vec<TacticsEvent>) {
    let brain = &mut world.agents.combat[slot];
    if brain.firing {
        brain.firing = false;
        events.push(TacticsEvent::ShouldFire {
            agent: world.agents.ids[slot],
            fire: false,
        });
    }
}
